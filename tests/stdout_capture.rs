//! Descriptor-level capture swaps the process stdout, which is shared with
//! the test harness; this binary therefore holds a single test.

#![cfg(unix)]

use json_log_sink::{redirect, JsonLogger, Level, LoggerConfig, MemorySink, StdoutSink};
use std::io::{self, Write};
use std::sync::Arc;

fn messages(sink: &MemorySink) -> Vec<String> {
    sink.documents()
        .iter()
        .map(|d| d["msg"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn process_stdout_is_logged_while_guard_lives() {
    let sink = MemorySink::new();
    let config = LoggerConfig::new("stdout")
        .context_level(Level::Warning)
        .capture_ambient(false);
    let logger = JsonLogger::with_config(config, Arc::new(sink.clone()));
    let console = JsonLogger::with_config(
        LoggerConfig::new("console").capture_ambient(false),
        Arc::new(StdoutSink),
    );

    {
        let guard = logger.redirect_stdout();
        assert!(guard.captures_descriptor());
        assert!(redirect::is_redirected());

        // `println!` is intercepted by the harness, so write to the stream.
        let mut out = io::stdout();
        out.write_all(b"plain println inside redirect scope\n").unwrap();
        out.write_all(b"\n").unwrap();
        writeln!(out, "second line").unwrap();
        out.flush().unwrap();

        console.info("stdout sink bypasses the capture").unwrap();
    }
    assert!(!redirect::is_redirected());

    let msgs = messages(&sink);
    assert!(msgs.contains(&"plain println inside redirect scope".to_string()), "{msgs:?}");
    assert!(msgs.contains(&"second line".to_string()), "{msgs:?}");
    assert!(msgs.iter().all(|m| !m.trim().is_empty()));
    assert!(!msgs.iter().any(|m| m.contains("stdout sink bypasses the capture")));
    assert!(sink
        .documents()
        .iter()
        .all(|d| d["level"] == "WARNING"));

    let before = sink.lines().len();
    io::stdout().write_all(b"after the scope\n").unwrap();
    io::stdout().flush().unwrap();
    assert_eq!(sink.lines().len(), before);
}
