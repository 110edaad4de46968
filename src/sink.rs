use crate::stdout_capture;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Sequential destination for serialized log lines.
///
/// Implementations are responsible for writing one complete line per
/// call. A line must never interleave with a line written concurrently
/// from another thread.
pub trait LogSink: Send + Sync {
    /// Write a single serialized document.
    ///
    /// **Parameters**
    /// - `line`: one JSON document without the trailing newline; the
    ///   sink appends the line terminator itself.
    ///
    /// **Returns**
    /// - `Ok(())` once the line was handed to the destination.
    /// - `Err(..)` if the destination is unwritable (closed pipe, full
    ///   disk, ...). Callers surface this to the application.
    fn write_line(&self, line: &str) -> io::Result<()>;

    /// Flush any buffered lines. Default implementation is a no-op.
    fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes lines to the real process stdout.
///
/// The stdout lock is held for the whole line, so concurrent writers
/// never produce partial lines. This always targets the OS stream as it
/// was before any [`crate::StdoutRedirect`], never the redirected one.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdoutSink;

impl LogSink for StdoutSink {
    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');

        stdout_capture::write_stdout(&buf)
    }
}

/// Writes lines to any [`Write`] implementation (file, socket, pipe).
#[derive(Debug)]
pub struct WriterSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Return the wrapped writer.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> LogSink for WriterSink<W> {
    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| io::Error::other("log writer mutex poisoned"))?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")
    }

    fn flush(&self) -> io::Result<()> {
        self.writer
            .lock()
            .map_err(|_| io::Error::other("log writer mutex poisoned"))?
            .flush()
    }
}

/// Keeps every line in memory. Cloning shares the same buffer.
///
/// Useful in tests and for capturing the output of a code region.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the lines written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }

    /// Lines written so far, parsed as JSON.
    pub fn documents(&self) -> Vec<serde_json::Value> {
        self.lines()
            .iter()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.clear();
        }
    }
}

impl LogSink for MemorySink {
    fn write_line(&self, line: &str) -> io::Result<()> {
        self.lines
            .lock()
            .map_err(|_| io::Error::other("memory sink mutex poisoned"))?
            .push(line.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn writer_sink_appends_newlines() {
        let sink = WriterSink::new(Vec::new());
        sink.write_line("{\"a\":1}").unwrap();
        sink.write_line("{\"b\":2}").unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out, "{\"a\":1}\n{\"b\":2}\n");
    }

    #[test]
    fn concurrent_lines_never_interleave() {
        let sink = Arc::new(WriterSink::new(Vec::new()));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let sink = Arc::clone(&sink);
                thread::spawn(move || {
                    for i in 0..200 {
                        sink.write_line(&format!("{{\"t\":{},\"i\":{}}}", t, i)).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let sink = Arc::try_unwrap(sink).ok().unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 8 * 200);
        for line in lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(value["t"].is_u64());
        }
    }

    #[test]
    fn memory_sink_clones_share_buffer() {
        let sink = MemorySink::new();
        let handle = sink.clone();
        handle.write_line("{}").unwrap();
        assert_eq!(sink.lines(), vec!["{}".to_string()]);
        sink.clear();
        assert!(handle.lines().is_empty());
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writer_errors_propagate() {
        let sink = WriterSink::new(BrokenPipe);
        let err = sink.write_line("{}").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
