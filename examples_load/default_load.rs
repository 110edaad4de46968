use std::sync::Arc;
use std::time::Instant;
use tracing::error;

use json_log_sink::noop_sink::NoopSink;
use json_log_sink::{JsonLogger, LoggerConfig};

fn main() {
    let sink = Arc::new(NoopSink::default());
    let _logger = JsonLogger::with_config(LoggerConfig::new("load"), sink);
    JsonLogger::bind_correlation_id();

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, user_id = i % 97, "default load test error");
    }

    let elapsed = start.elapsed();
    println!("default config: formatted {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );
}
