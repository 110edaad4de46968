use std::io;

/// Error type returned by logging calls.
///
/// Only sink-level I/O failures surface from a log call; template and
/// correlation problems are absorbed by the formatter.
#[derive(thiserror::Error, Debug)]
pub enum LogError {
    #[error("log sink write failed: {0}")]
    Io(#[from] io::Error),

    #[error("field key `{0}` is reserved by the log schema")]
    ReservedField(String),

    #[error("log sink lock poisoned")]
    Poisoned,
}

impl From<LogError> for io::Error {
    fn from(err: LogError) -> Self {
        match err {
            LogError::Io(e) => e,
            other => io::Error::other(other),
        }
    }
}

/// Error type returned when installing the ambient capture layer.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled,
}

/// Error type returned when parsing a [`crate::Level`] from text.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("unknown log level `{0}`")]
pub struct ParseLevelError(pub String);
