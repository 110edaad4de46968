//! Scoped stdout redirection.
//!
//! While a [`StdoutRedirect`] guard from [`JsonLogger::redirect_stdout`]
//! is alive, output sent to the process stdout becomes log lines of the
//! guarding logger at its `context_level`:
//!
//! - on unix, file descriptor 1 itself is redirected, so `println!` from
//!   any crate is captured one line at a time;
//! - everywhere, writes to the [`stdout()`] handle of this module are
//!   captured one write at a time.
//!
//! Dropping the guard restores the previous destination.
//!
//! ```no_run
//! use std::io::Write;
//! use json_log_sink::{redirect, JsonLogger};
//!
//! let logger = JsonLogger::new("main");
//! {
//!     let _guard = logger.redirect_stdout();
//!     println!("Test json logger stdout hook!");
//!     writeln!(redirect::stdout(), "written through the handle")?;
//! }
//! # Ok::<(), std::io::Error>(())
//! ```

use crate::logger::JsonLogger;
#[cfg(unix)]
use crate::stdout_capture::FdCapture;
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};

static TARGET: Mutex<Option<JsonLogger>> = Mutex::new(None);

fn target() -> MutexGuard<'static, Option<JsonLogger>> {
    TARGET.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Handle to the process stdout that honours active redirects.
pub fn stdout() -> RedirectableStdout {
    RedirectableStdout { _priv: () }
}

/// Whether a redirect is currently active.
pub fn is_redirected() -> bool {
    target().is_some()
}

/// See [`stdout()`].
#[derive(Debug)]
pub struct RedirectableStdout {
    _priv: (),
}

impl Write for RedirectableStdout {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // Release the lock before logging so the sink may take its own.
        let current = target().clone();
        match current {
            Some(logger) => {
                logger.write_captured(buf)?;
                Ok(buf.len())
            }
            None => io::stdout().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let current = target().clone();
        match current {
            Some(logger) => logger.sink().flush(),
            None => io::stdout().flush(),
        }
    }
}

/// Active stdout redirect. Dropping it restores the previous destination,
/// also when the scope is left by a panic.
///
/// Guards nest; drop them in reverse order of creation.
#[derive(Debug)]
#[must_use = "stdout is restored as soon as the guard is dropped"]
pub struct StdoutRedirect {
    previous: Option<JsonLogger>,
    #[cfg(unix)]
    capture: Option<FdCapture>,
}

impl StdoutRedirect {
    /// Whether descriptor 1 is redirected, not only the [`stdout()`] handle.
    pub fn captures_descriptor(&self) -> bool {
        #[cfg(unix)]
        {
            self.capture.is_some()
        }
        #[cfg(not(unix))]
        {
            false
        }
    }
}

impl Drop for StdoutRedirect {
    fn drop(&mut self) {
        // Restores descriptor 1 and drains the pipe before the handle.
        #[cfg(unix)]
        drop(self.capture.take());
        *target() = self.previous.take();
    }
}

impl JsonLogger {
    /// Route the process stdout into this logger until the guard is dropped.
    ///
    /// If descriptor 1 cannot be redirected the failure is reported on
    /// stderr and only the [`stdout()`] handle is routed.
    pub fn redirect_stdout(&self) -> StdoutRedirect {
        let mut guard = self.redirect_stdout_handle();
        #[cfg(unix)]
        match FdCapture::start(self.clone()) {
            Ok(capture) => guard.capture = Some(capture),
            Err(e) => eprintln!("failed to capture stdout descriptor: {}", e),
        }
        guard
    }

    /// Route only the [`stdout()`] handle into this logger, leaving
    /// descriptor 1 untouched.
    pub fn redirect_stdout_handle(&self) -> StdoutRedirect {
        let previous = target().replace(self.clone());
        StdoutRedirect {
            previous,
            #[cfg(unix)]
            capture: None,
        }
    }
}

/// Lets a logger serve as the writer of a `tracing_subscriber::fmt`
/// layer, so plain-text output of such layers is captured as well.
impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for JsonLogger {
    type Writer = JsonLogger;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
