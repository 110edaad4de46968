use crate::level::Level;
use crate::logger::JsonLogger;
use crate::record::Fields;
use std::future::Future;
use std::time::{Duration, Instant};

/// Measures wall-clock duration of calls and logs it on success.
///
/// A call that fails (returns `Err` through the fallible variants, or
/// panics) is not logged; its error reaches the caller unchanged.
///
/// The wrapped function keeps its signature: [`wrap`](Self::wrap) covers
/// one argument, `wrap0`, `wrap2` and `wrap3` (and their `wrap_fallible*`
/// counterparts) cover the other arities. Wider functions can take a tuple.
#[derive(Clone, Debug)]
pub struct Timeit {
    logger: JsonLogger,
    level: Level,
}

impl JsonLogger {
    /// Timing wrapper logging at `level`.
    ///
    /// ```no_run
    /// use json_log_sink::{JsonLogger, Level};
    ///
    /// fn predict(rows: usize) -> usize { rows * 2 }
    ///
    /// let logger = JsonLogger::new("main");
    /// let predict = logger.timeit(Level::Debug).wrap(predict);
    /// assert_eq!(predict(21), 42);
    /// ```
    pub fn timeit(&self, level: Level) -> Timeit {
        Timeit {
            logger: self.clone(),
            level,
        }
    }
}

impl Timeit {
    /// Wrap `f`; the duration entry is named after the function item.
    pub fn wrap<F, A, R>(&self, f: F) -> impl Fn(A) -> R
    where
        F: Fn(A) -> R,
    {
        let timer = self.clone();
        let name = fn_name::<F>();
        move |arg| timer.run(&name, || f(arg))
    }

    /// Wrap a fallible `f`; `Err` results skip the duration entry.
    pub fn wrap_fallible<F, A, R, E>(&self, f: F) -> impl Fn(A) -> Result<R, E>
    where
        F: Fn(A) -> Result<R, E>,
    {
        let timer = self.clone();
        let name = fn_name::<F>();
        move |arg| timer.try_run(&name, || f(arg))
    }

    /// Time a single call.
    pub fn run<R>(&self, name: &str, f: impl FnOnce() -> R) -> R {
        let start = Instant::now();
        let result = f();
        self.report(name, start.elapsed());
        result
    }

    /// Time a single fallible call, logging only when it succeeds.
    pub fn try_run<R, E>(&self, name: &str, f: impl FnOnce() -> Result<R, E>) -> Result<R, E> {
        let start = Instant::now();
        let result = f()?;
        self.report(name, start.elapsed());
        Ok(result)
    }

    /// Time a future until completion.
    pub async fn run_async<F: Future>(&self, name: &str, fut: F) -> F::Output {
        let start = Instant::now();
        let result = fut.await;
        self.report(name, start.elapsed());
        result
    }

    fn report(&self, name: &str, elapsed: Duration) {
        let secs = format!("{:.2}", elapsed.as_secs_f64());
        let res = self.logger.log(
            self.level,
            "func {} executed in {} seconds",
            &[&name, &secs],
            Fields::new(),
        );
        if let Err(e) = res {
            eprintln!("failed to write timing entry for {}: {}", name, e);
        }
    }
}

macro_rules! arity_wrappers {
    ($($wrap:ident, $wrap_fallible:ident => ($($arg:ident: $ty:ident),*);)*) => {
        impl Timeit {
            $(
                /// [`wrap`](Self::wrap) for this arity.
                pub fn $wrap<F, $($ty,)* R>(&self, f: F) -> impl Fn($($ty),*) -> R
                where
                    F: Fn($($ty),*) -> R,
                {
                    let timer = self.clone();
                    let name = fn_name::<F>();
                    move |$($arg),*| timer.run(&name, || f($($arg),*))
                }

                /// [`wrap_fallible`](Self::wrap_fallible) for this arity.
                pub fn $wrap_fallible<F, $($ty,)* R, E>(
                    &self,
                    f: F,
                ) -> impl Fn($($ty),*) -> Result<R, E>
                where
                    F: Fn($($ty),*) -> Result<R, E>,
                {
                    let timer = self.clone();
                    let name = fn_name::<F>();
                    move |$($arg),*| timer.try_run(&name, || f($($arg),*))
                }
            )*
        }
    };
}

arity_wrappers! {
    wrap0, wrap_fallible0 => ();
    wrap2, wrap_fallible2 => (a: A, b: B);
    wrap3, wrap_fallible3 => (a: A, b: B, c: C);
}

/// Last meaningful path segment of `F`'s type name.
///
/// `my_app::handlers::predict` yields `predict`; closures yield the
/// enclosing function.
fn fn_name<F>() -> String {
    std::any::type_name::<F>()
        .split("::")
        .filter(|segment| !segment.starts_with('{'))
        .last()
        .unwrap_or("<anonymous>")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::tests::memory_logger;
    use std::thread;

    fn sleepy_answer(pause: Duration) -> u32 {
        thread::sleep(pause);
        42
    }

    fn divide(a: i32, b: i32) -> Result<i32, String> {
        if b == 0 {
            return Err("division by zero".to_string());
        }
        Ok(a / b)
    }

    fn elapsed_from(msg: &str) -> f64 {
        msg.split_whitespace()
            .rev()
            .nth(1)
            .and_then(|v| v.parse().ok())
            .expect("duration in message")
    }

    #[test]
    fn names_function_items_and_closures() {
        fn name_of<F>(_: &F) -> String {
            fn_name::<F>()
        }
        assert_eq!(name_of(&sleepy_answer), "sleepy_answer");
        let closure = |x: u32| x + 1;
        assert_eq!(name_of(&closure), "names_function_items_and_closures");
    }

    #[test]
    fn logs_duration_and_keeps_result() {
        let (logger, sink) = memory_logger(Level::Debug);
        let timed = logger.timeit(Level::Info).wrap(sleepy_answer);
        assert_eq!(timed(Duration::from_millis(100)), 42);

        let docs = sink.documents();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["level"], "INFO");
        let msg = docs[0]["msg"].as_str().unwrap();
        assert!(msg.starts_with("func sleepy_answer executed in "), "{msg}");
        let secs = elapsed_from(msg);
        assert!((0.08..=0.12).contains(&secs), "{secs}");
    }

    #[test]
    fn failure_skips_duration_entry() {
        let (logger, sink) = memory_logger(Level::Debug);
        let timed = logger.timeit(Level::Debug).wrap_fallible2(divide);
        assert_eq!(timed(1, 0), Err("division by zero".to_string()));
        assert!(sink.lines().is_empty());

        assert_eq!(timed(8, 2), Ok(4));
        assert_eq!(sink.lines().len(), 1);
        assert!(sink.documents()[0]["msg"]
            .as_str()
            .unwrap()
            .starts_with("func divide executed in "));
    }

    #[test]
    fn wrappers_keep_the_call_signature() {
        fn greet() -> &'static str {
            "hi"
        }
        fn clamp(value: i64, low: i64, high: i64) -> i64 {
            value.max(low).min(high)
        }

        let (logger, sink) = memory_logger(Level::Debug);
        let timer = logger.timeit(Level::Debug);
        assert_eq!(timer.wrap0(greet)(), "hi");
        assert_eq!(timer.wrap3(clamp)(15, 0, 10), 10);

        let names: Vec<String> = sink
            .documents()
            .iter()
            .map(|d| d["msg"].as_str().unwrap().split_whitespace().nth(1).unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["greet", "clamp"]);
    }

    #[test]
    fn panic_propagates_without_entry() {
        let (logger, sink) = memory_logger(Level::Debug);
        let timer = logger.timeit(Level::Debug);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            timer.run("explode", || -> u32 { panic!("boom") })
        }));
        assert!(result.is_err());
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn below_threshold_is_silent() {
        let (logger, sink) = memory_logger(Level::Info);
        let value = logger.timeit(Level::Debug).run("quick", || 7);
        assert_eq!(value, 7);
        assert!(sink.lines().is_empty());
    }

    #[tokio::test]
    async fn times_futures() {
        let (logger, sink) = memory_logger(Level::Debug);
        let timer = logger.timeit(Level::Debug);
        let value = timer
            .run_async("fetch", async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                "done"
            })
            .await;
        assert_eq!(value, "done");
        let msg = sink.documents()[0]["msg"].as_str().unwrap().to_string();
        assert!(msg.starts_with("func fetch executed in 0.0"), "{msg}");
    }
}
