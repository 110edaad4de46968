use crate::correlation::ContextId;
use crate::error::LogError;
use crate::level::Level;
use crate::schema::is_reserved;
use chrono::{DateTime, Utc};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt::Display;

/// Caller-supplied key/value pairs attached to a single log call.
///
/// Values are stringified on insertion; `None` is emitted as JSON `null`.
/// Schema keys (`user_id`, `item_id`, ...) and `correlation_id` travel in
/// the same bag and are routed to their schema slot by the formatter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields(BTreeMap<String, Option<String>>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert without key validation.
    pub fn with(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.0.insert(key.into(), Some(value.to_string()));
        self
    }

    /// Builder-style insert of an explicit `null`.
    pub fn with_null(mut self, key: impl Into<String>) -> Self {
        self.0.insert(key.into(), None);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Option<String>) {
        self.0.insert(key.into(), value);
    }

    /// Insert a free-form extra field, rejecting keys owned by the schema.
    pub fn try_insert(
        &mut self,
        key: impl Into<String>,
        value: Option<String>,
    ) -> Result<(), LogError> {
        let key = key.into();
        if is_reserved(&key) {
            return Err(LogError::ReservedField(key));
        }
        self.0.insert(key, value);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Option<String>> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Option<String>> {
        self.0.iter()
    }

    pub fn extend(&mut self, other: Fields) {
        self.0.extend(other.0);
    }
}

impl<K, V> FromIterator<(K, V)> for Fields
where
    K: Into<String>,
    V: Display,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), Some(v.to_string())))
                .collect(),
        )
    }
}

impl IntoIterator for Fields {
    type Item = (String, Option<String>);
    type IntoIter = btree_map::IntoIter<String, Option<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// An error attached to a log event, rendered into `debug_info`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachedError {
    /// `Debug` rendering of the error value.
    pub object: Option<String>,
    /// `Display` rendering of the error and its source chain.
    pub text: Option<String>,
    /// Captured stack, when backtraces are enabled.
    pub stack: Option<String>,
}

impl AttachedError {
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut text = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            text.push_str(": ");
            text.push_str(&cause.to_string());
            source = cause.source();
        }

        let backtrace = std::backtrace::Backtrace::capture();
        let stack = match backtrace.status() {
            std::backtrace::BacktraceStatus::Captured => Some(backtrace.to_string()),
            _ => None,
        };

        Self {
            object: Some(format!("{:?}", err)),
            text: Some(text),
            stack,
        }
    }
}

/// A single log call, consumed once by the formatter.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub message: String,
    /// Registry key of the emitting execution context.
    pub context_id: ContextId,
    /// Human-readable name of the emitting thread.
    pub thread_name: String,
    pub logger_name: String,
    pub module_path: Option<String>,
    pub line: Option<u32>,
    pub fields: Fields,
    pub error: Option<AttachedError>,
}

impl LogEvent {
    /// Create an event stamped with the current time and calling thread.
    pub fn new(level: Level, message: impl Into<String>, logger_name: impl Into<String>) -> Self {
        let thread = std::thread::current();
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            context_id: ContextId::from_thread(&thread),
            thread_name: thread.name().unwrap_or("unnamed").to_string(),
            logger_name: logger_name.into(),
            module_path: None,
            line: None,
            fields: Fields::new(),
            error: None,
        }
    }

    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_error(mut self, error: AttachedError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_location(mut self, module_path: Option<&str>, line: Option<u32>) -> Self {
        self.module_path = module_path.map(|s| s.to_string());
        self.line = line;
        self
    }
}
