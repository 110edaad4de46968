use crate::correlation::CorrelationRegistry;
use crate::record::LogEvent;
use crate::schema::{is_reserved, DebugInfo, LogDocument};
use chrono::{Local, SecondsFormat};
use std::collections::BTreeMap;

/// Turns [`LogEvent`]s into schema-conforming [`LogDocument`]s.
///
/// Formatting is total: every event yields a document, whatever mix of
/// fields the caller supplied.
#[derive(Debug, Clone)]
pub struct RecordFormatter {
    include_debug_info: bool,
}

impl Default for RecordFormatter {
    fn default() -> Self {
        Self {
            include_debug_info: true,
        }
    }
}

impl RecordFormatter {
    pub fn new(include_debug_info: bool) -> Self {
        Self { include_debug_info }
    }

    pub fn include_debug_info(&self) -> bool {
        self.include_debug_info
    }

    /// Build the document for `event`.
    ///
    /// A correlation id bound to the event's context in `registry` takes
    /// precedence over a `correlation_id` field supplied by the caller.
    pub fn format(&self, event: &LogEvent, registry: &CorrelationRegistry) -> LogDocument {
        let fields = &event.fields;
        let schema_field = |key: &str| -> String {
            fields.get(key).cloned().flatten().unwrap_or_default()
        };

        let correlation_id = registry
            .get(&event.context_id)
            .unwrap_or_else(|| schema_field("correlation_id"));

        let extra: BTreeMap<String, Option<String>> = fields
            .iter()
            .filter(|(key, _)| !is_reserved(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        LogDocument {
            correlation_id,
            written_at: event
                .timestamp
                .with_timezone(&Local)
                .to_rfc3339_opts(SecondsFormat::Micros, false),
            msg: event.message.clone(),
            level: event.level.to_string(),
            id: schema_field("id"),
            parent_id: schema_field("parent_id"),
            user_id: schema_field("user_id"),
            item_id: schema_field("item_id"),
            merchant_id: schema_field("merchant_id"),
            content_type: schema_field("content_type"),
            extra: (!extra.is_empty()).then_some(extra),
            debug_info: self.include_debug_info.then(|| debug_info(event)),
        }
    }

    /// Format and serialize `event` to one JSON line (no trailing newline).
    pub fn format_line(&self, event: &LogEvent, registry: &CorrelationRegistry) -> String {
        self.format(event, registry).to_json_line()
    }
}

fn debug_info(event: &LogEvent) -> DebugInfo {
    let error = event.error.clone().unwrap_or_default();
    DebugInfo {
        thread_name: Some(event.thread_name.clone()),
        name: Some(event.logger_name.clone()),
        module: event.module_path.clone(),
        lineno: event.line.map(|l| l.to_string()),
        exc_info: error.object,
        exc_text: error.text,
        stack_info: error.stack,
    }
}
