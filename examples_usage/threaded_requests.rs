use std::sync::Arc;
use std::thread;
use std::time::Duration;

use json_log_sink::{Fields, JsonLogger, Level, LoggerConfig, StdoutSink};

/// Simulates a worker pool handling requests: each request binds its own
/// correlation id so its lines can be grouped after the fact.
fn main() {
    let logger = JsonLogger::with_config(LoggerConfig::from_env("worker_pool"), Arc::new(StdoutSink));

    let handles: Vec<_> = (0..4)
        .map(|request| {
            let logger = logger.clone();
            thread::Builder::new()
                .name("request-worker".to_string())
                .spawn(move || {
                    let _scope = JsonLogger::correlation_scope();
                    let fields = Fields::new().with("id", request).with("user_id", 100 + request);
                    if let Err(e) = logger.info_with("request received", fields.clone()) {
                        eprintln!("failed to write log line: {}", e);
                    }
                    logger.timeit(Level::Info).run("predict_trends", || {
                        thread::sleep(Duration::from_millis(20));
                    });
                    if let Err(e) = logger.info_with("response sent", fields) {
                        eprintln!("failed to write log line: {}", e);
                    }
                })
                .expect("spawn worker")
        })
        .collect();

    for handle in handles {
        if handle.join().is_err() {
            eprintln!("request worker panicked");
        }
    }
}
