use std::fmt;
use std::io::Write;

use json_log_sink::{redirect, Fields, JsonLogger, Level};

#[derive(Debug)]
struct ZeroDivision;

impl fmt::Display for ZeroDivision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("division by zero")
    }
}

impl std::error::Error for ZeroDivision {}

fn division(a: i32) -> Result<i32, ZeroDivision> {
    if a == 1 {
        return Err(ZeroDivision);
    }
    Ok(1 / (a - 1))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logger = JsonLogger::new("main");
    let timed_division = logger.timeit(Level::Debug).wrap_fallible(division);

    JsonLogger::bind_correlation_id();

    let extra = Fields::new().with("This", "is").with("e_x_t_r_a", "fields");
    logger.info_with("Logger init!!!", extra)?;

    if let Err(err) = timed_division(1) {
        logger.exception("division finished with an error!", &err)?;
    }
    timed_division(2)?;

    {
        let _guard = logger.redirect_stdout();
        println!("Test json logger stdout hook!");
        writeln!(redirect::stdout(), "written through the redirect handle")?;
    }

    // Dependencies logging through `tracing` land in the same schema.
    tracing::warn!(component = "model", "model file is older than 30 days");

    JsonLogger::flush_correlation_id();
    logger.log(Level::Info, "Server is running on {}:{}", &[&"0.0.0.0", &8000], Fields::new())?;
    Ok(())
}
