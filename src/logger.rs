use crate::correlation::{ContextId, CorrelationGuard, CorrelationRegistry};
use crate::env::{
    env_flag, env_or, JSON_LOG_CAPTURE_AMBIENT_ENV, JSON_LOG_CONTEXT_LEVEL_ENV,
    JSON_LOG_DEBUG_INFO_ENV, JSON_LOG_LEVEL_ENV,
};
use crate::error::LogError;
use crate::formatter::RecordFormatter;
use crate::level::Level;
use crate::message;
use crate::record::{AttachedError, Fields, LogEvent};
use crate::sink::{LogSink, StdoutSink};
use std::error::Error;
use std::fmt::{self, Display};
use std::io;
use std::panic::Location;
use std::sync::Arc;

/// Logger settings.
///
/// **Fields**
/// - `name`: logger name, reported as `debug_info.name`.
/// - `level`: events below this severity are discarded.
/// - `context_level`: severity of lines captured from redirected stdout.
/// - `debug_info`: when `false`, documents carry `"debug_info": null`.
/// - `capture_ambient`: install this logger as the process-wide
///   `tracing`/`log` destination on construction (first logger wins).
#[derive(Clone, Debug)]
pub struct LoggerConfig {
    pub name: String,
    pub level: Level,
    pub context_level: Level,
    pub debug_info: bool,
    pub capture_ambient: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            name: "root".to_string(),
            level: Level::Debug,
            context_level: Level::Debug,
            debug_info: true,
            capture_ambient: true,
        }
    }
}

impl LoggerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Build a config from the `JSON_LOG_*` variables in [`crate::env`].
    /// Absent or unparsable values keep their defaults.
    pub fn from_env(name: impl Into<String>) -> Self {
        let defaults = Self::new(name);
        let level = env_or(JSON_LOG_LEVEL_ENV, defaults.level.as_str())
            .parse()
            .unwrap_or(defaults.level);
        let context_level = env_or(JSON_LOG_CONTEXT_LEVEL_ENV, defaults.context_level.as_str())
            .parse()
            .unwrap_or(defaults.context_level);
        Self {
            level,
            context_level,
            debug_info: env_flag(JSON_LOG_DEBUG_INFO_ENV, defaults.debug_info),
            capture_ambient: env_flag(JSON_LOG_CAPTURE_AMBIENT_ENV, defaults.capture_ambient),
            ..defaults
        }
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn context_level(mut self, level: Level) -> Self {
        self.context_level = level;
        self
    }

    pub fn debug_info(mut self, enabled: bool) -> Self {
        self.debug_info = enabled;
        self
    }

    pub fn capture_ambient(mut self, enabled: bool) -> Self {
        self.capture_ambient = enabled;
        self
    }
}

struct Inner {
    config: LoggerConfig,
    formatter: RecordFormatter,
    sink: Arc<dyn LogSink>,
}

/// Structured JSON logger.
///
/// Every call renders one [`crate::LogDocument`] line into the sink.
/// Cloning is cheap and clones share the same sink.
///
/// ```no_run
/// use json_log_sink::{Fields, JsonLogger};
///
/// let logger = JsonLogger::new("main");
/// JsonLogger::bind_correlation_id();
/// logger.info_with("Logger init!!!", Fields::new().with("e_x_t_r_a", "fields"))?;
/// JsonLogger::flush_correlation_id();
/// # Ok::<(), json_log_sink::LogError>(())
/// ```
#[derive(Clone)]
pub struct JsonLogger {
    inner: Arc<Inner>,
}

impl fmt::Debug for JsonLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonLogger")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl JsonLogger {
    /// Logger writing to stdout with default settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(LoggerConfig::new(name), Arc::new(StdoutSink))
    }

    /// Logger with explicit settings and sink.
    ///
    /// With `capture_ambient` set, the logger also becomes the global
    /// `tracing` subscriber and `log` destination unless another one is
    /// already installed.
    pub fn with_config(config: LoggerConfig, sink: Arc<dyn LogSink>) -> Self {
        let capture = config.capture_ambient;
        let logger = Self {
            inner: Arc::new(Inner {
                formatter: RecordFormatter::new(config.debug_info),
                config,
                sink,
            }),
        };
        if capture {
            // Only the first logger in the process is installed.
            let _ = crate::init::init_tracing(&logger);
        }
        logger
    }

    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.inner.config
    }

    pub fn sink(&self) -> &Arc<dyn LogSink> {
        &self.inner.sink
    }

    pub fn enabled(&self, level: Level) -> bool {
        level >= self.inner.config.level
    }

    /// Format and write a prepared event.
    ///
    /// Events below the configured level are dropped. Only sink failures
    /// are reported.
    pub fn emit(&self, event: LogEvent) -> Result<(), LogError> {
        if !self.enabled(event.level) {
            return Ok(());
        }
        let line = self
            .inner
            .formatter
            .format_line(&event, CorrelationRegistry::global());
        self.inner.sink.write_line(&line)?;
        Ok(())
    }

    /// Log `template` filled with `args` at `level`, with caller fields.
    #[track_caller]
    pub fn log(
        &self,
        level: Level,
        template: &str,
        args: &[&dyn Display],
        extra: Fields,
    ) -> Result<(), LogError> {
        self.log_at(Location::caller(), level, template, args, extra, None)
    }

    fn log_at(
        &self,
        location: &Location<'_>,
        level: Level,
        template: &str,
        args: &[&dyn Display],
        extra: Fields,
        error: Option<AttachedError>,
    ) -> Result<(), LogError> {
        if !self.enabled(level) {
            return Ok(());
        }
        let mut event = LogEvent::new(level, message::render(template, args), self.name())
            .with_location(Some(location.file()), Some(location.line()))
            .with_fields(extra);
        event.error = error;
        self.emit(event)
    }

    #[track_caller]
    pub fn debug(&self, msg: impl Display) -> Result<(), LogError> {
        self.debug_with(msg, Fields::new())
    }

    #[track_caller]
    pub fn debug_with(&self, msg: impl Display, extra: Fields) -> Result<(), LogError> {
        self.log_display(Location::caller(), Level::Debug, msg, extra)
    }

    #[track_caller]
    pub fn info(&self, msg: impl Display) -> Result<(), LogError> {
        self.info_with(msg, Fields::new())
    }

    #[track_caller]
    pub fn info_with(&self, msg: impl Display, extra: Fields) -> Result<(), LogError> {
        self.log_display(Location::caller(), Level::Info, msg, extra)
    }

    #[track_caller]
    pub fn warning(&self, msg: impl Display) -> Result<(), LogError> {
        self.warning_with(msg, Fields::new())
    }

    #[track_caller]
    pub fn warning_with(&self, msg: impl Display, extra: Fields) -> Result<(), LogError> {
        self.log_display(Location::caller(), Level::Warning, msg, extra)
    }

    #[track_caller]
    pub fn error(&self, msg: impl Display) -> Result<(), LogError> {
        self.error_with(msg, Fields::new())
    }

    #[track_caller]
    pub fn error_with(&self, msg: impl Display, extra: Fields) -> Result<(), LogError> {
        self.log_display(Location::caller(), Level::Error, msg, extra)
    }

    #[track_caller]
    pub fn critical(&self, msg: impl Display) -> Result<(), LogError> {
        self.critical_with(msg, Fields::new())
    }

    #[track_caller]
    pub fn critical_with(&self, msg: impl Display, extra: Fields) -> Result<(), LogError> {
        self.log_display(Location::caller(), Level::Critical, msg, extra)
    }

    /// Log at `ERROR` with `err` (its source chain and, when enabled, a
    /// backtrace) attached to `debug_info`.
    #[track_caller]
    pub fn exception(
        &self,
        msg: impl Display,
        err: &(dyn Error + 'static),
    ) -> Result<(), LogError> {
        self.exception_with(msg, err, Fields::new())
    }

    #[track_caller]
    pub fn exception_with(
        &self,
        msg: impl Display,
        err: &(dyn Error + 'static),
        extra: Fields,
    ) -> Result<(), LogError> {
        if !self.enabled(Level::Error) {
            return Ok(());
        }
        let msg = msg.to_string();
        self.log_at(
            Location::caller(),
            Level::Error,
            &msg,
            &[],
            extra,
            Some(AttachedError::from_error(err)),
        )
    }

    fn log_display(
        &self,
        location: &Location<'_>,
        level: Level,
        msg: impl Display,
        extra: Fields,
    ) -> Result<(), LogError> {
        if !self.enabled(level) {
            return Ok(());
        }
        let msg = msg.to_string();
        self.log_at(location, level, &msg, &[], extra, None)
    }

    /// Bind a new correlation id to the calling thread.
    ///
    /// Every line logged from this thread, by any logger, carries the id
    /// until [`flush_correlation_id`](Self::flush_correlation_id).
    pub fn bind_correlation_id() {
        CorrelationRegistry::global().bind(ContextId::current());
    }

    /// Drop the calling thread's correlation id, if any.
    pub fn flush_correlation_id() {
        CorrelationRegistry::global().flush(&ContextId::current());
    }

    /// Correlation id bound to the calling thread.
    pub fn current_correlation_id() -> Option<String> {
        CorrelationRegistry::global().get(&ContextId::current())
    }

    /// Bind for the calling thread until the returned guard is dropped.
    pub fn correlation_scope() -> CorrelationGuard<'static> {
        CorrelationRegistry::global().bind_scoped()
    }

    /// Log one chunk written to this logger as a stream.
    ///
    /// Blank chunks are dropped; a single trailing line terminator is
    /// stripped from the rest.
    pub fn write_captured(&self, buf: &[u8]) -> Result<(), LogError> {
        let text = String::from_utf8_lossy(buf);
        if text.trim().is_empty() {
            return Ok(());
        }
        let text = text
            .strip_suffix('\n')
            .map(|t| t.strip_suffix('\r').unwrap_or(t))
            .unwrap_or(&*text);
        let event = LogEvent::new(self.inner.config.context_level, text, self.name());
        self.emit(event)
    }
}

/// Writing to the logger turns each write into one log line at
/// `context_level`, the way redirected stdout does.
impl io::Write for JsonLogger {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_captured(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.sink.flush()
    }
}
