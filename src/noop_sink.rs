use crate::sink::LogSink;
use std::io;

/// A sink that simply drops all lines.
///
/// Useful for measuring the overhead of formatting without any output
/// I/O, and for tests that only care about side effects such as the
/// correlation registry.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl LogSink for NoopSink {
    fn write_line(&self, _line: &str) -> io::Result<()> {
        Ok(())
    }
}
