//! Descriptor-level capture of the process stdout (unix only).
//!
//! While a [`FdCapture`] is alive, file descriptor 1 points at a pipe. A
//! pump thread reads it line by line and hands every line to a
//! [`crate::JsonLogger`], so `print!`/`println!` from any crate, and output of
//! C code sharing the descriptor, become log lines. [`write_stdout`]
//! keeps reaching the stream that was active before the capture, which is
//! how [`crate::StdoutSink`] avoids feeding its own output back into the
//! pipe.

use std::fs::File;
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};

// Duplicate of the stdout that was active before the outermost capture.
static REAL_STDOUT: Mutex<Option<File>> = Mutex::new(None);

fn real_stdout() -> MutexGuard<'static, Option<File>> {
    REAL_STDOUT.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Write `buf` to the process stdout as it was before any capture started.
pub(crate) fn write_stdout(buf: &[u8]) -> io::Result<()> {
    let mut real = real_stdout();
    match real.as_mut() {
        Some(file) => {
            file.write_all(buf)?;
            file.flush()
        }
        None => {
            let mut out = io::stdout().lock();
            out.write_all(buf)?;
            out.flush()
        }
    }
}

#[cfg(unix)]
pub(crate) use self::unix::FdCapture;

#[cfg(unix)]
mod unix {
    use super::real_stdout;
    use crate::logger::JsonLogger;
    use std::fs::File;
    use std::io::{self, BufRead, BufReader, Write};
    use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
    use std::thread::{self, JoinHandle};

    const STDOUT_FD: RawFd = libc::STDOUT_FILENO;

    fn cvt(ret: libc::c_int) -> io::Result<libc::c_int> {
        if ret < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(ret)
        }
    }

    fn dup(fd: RawFd) -> io::Result<OwnedFd> {
        let raw = cvt(unsafe { libc::fcntl(fd, libc::F_DUPFD_CLOEXEC, 0) })?;
        Ok(unsafe { OwnedFd::from_raw_fd(raw) })
    }

    fn pipe() -> io::Result<(OwnedFd, OwnedFd)> {
        let mut fds: [libc::c_int; 2] = [-1; 2];
        cvt(unsafe { libc::pipe(fds.as_mut_ptr()) })?;
        let (read, write) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
        for fd in [&read, &write] {
            cvt(unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_SETFD, libc::FD_CLOEXEC) })?;
        }
        Ok((read, write))
    }

    /// Descriptor 1 redirected into a logger until dropped.
    #[derive(Debug)]
    pub(crate) struct FdCapture {
        saved: Option<OwnedFd>,
        owns_real: bool,
        pump: Option<JoinHandle<()>>,
    }

    impl FdCapture {
        pub(crate) fn start(logger: JsonLogger) -> io::Result<Self> {
            let mut real = real_stdout();
            io::stdout().flush()?;

            let saved = dup(STDOUT_FD)?;
            let (reader, writer) = pipe()?;
            let handle = thread::Builder::new()
                .name("stdout-capture".to_string())
                .spawn(move || pump(File::from(reader), &logger))?;

            let owns_real = real.is_none();
            if owns_real {
                *real = Some(File::from(saved.try_clone()?));
            }
            if let Err(e) = cvt(unsafe { libc::dup2(writer.as_raw_fd(), STDOUT_FD) }) {
                if owns_real {
                    *real = None;
                }
                drop(writer);
                let _ = handle.join();
                return Err(e);
            }

            Ok(Self {
                saved: Some(saved),
                owns_real,
                pump: Some(handle),
            })
        }
    }

    impl Drop for FdCapture {
        /// Restores descriptor 1, then waits until every captured line has
        /// been logged. Blocks while a child process still holds the pipe.
        fn drop(&mut self) {
            let mut real = real_stdout();
            if let Err(e) = io::stdout().flush() {
                eprintln!("failed to flush captured stdout: {}", e);
            }
            if let Some(saved) = self.saved.take() {
                if let Err(e) = cvt(unsafe { libc::dup2(saved.as_raw_fd(), STDOUT_FD) }) {
                    eprintln!("failed to restore stdout: {}", e);
                }
            }
            if self.owns_real {
                *real = None;
            }
            drop(real);

            if let Some(pump) = self.pump.take() {
                if pump.join().is_err() {
                    eprintln!("stdout capture thread panicked");
                }
            }
        }
    }

    fn pump(reader: File, logger: &JsonLogger) {
        let mut reader = BufReader::new(reader);
        let mut line = Vec::new();
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line) {
                Ok(0) => break,
                Ok(_) => {
                    if let Err(e) = logger.write_captured(&line) {
                        eprintln!("failed to write captured stdout: {}", e);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    eprintln!("failed to read captured stdout: {}", e);
                    break;
                }
            }
        }
    }
}
