use crate::level::Level;
use crate::logger::JsonLogger;
use crate::record::{AttachedError, Fields, LogEvent};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that renders every event through a
/// [`JsonLogger`].
///
/// Events from third-party code, including `log` records bridged into
/// `tracing`, end up in the same sink and schema as direct logger calls.
/// Event fields become the field bag; a field named `message` is the log
/// message and errors recorded with `record_error` land in `debug_info`.
pub struct JsonLogLayer {
    logger: JsonLogger,
}

impl JsonLogLayer {
    pub fn new(logger: JsonLogger) -> Self {
        Self { logger }
    }

    pub fn logger(&self) -> &JsonLogger {
        &self.logger
    }
}

impl<S> Layer<S> for JsonLogLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        let level = Level::from(*meta.level());
        if !self.logger.enabled(level) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let target = visitor.log_target.take().unwrap_or_else(|| meta.target().to_string());
        let module_path = visitor
            .log_module_path
            .take()
            .or_else(|| meta.module_path().map(|s| s.to_string()));
        let line = visitor.log_line.or(meta.line());

        let mut record = LogEvent::new(level, visitor.message.unwrap_or_default(), target)
            .with_location(module_path.as_deref(), line)
            .with_fields(visitor.fields);
        record.error = visitor.error;

        if let Err(e) = self.logger.emit(record) {
            eprintln!("failed to write log line: {}", e);
        }
    }
}

/// Collects an event's fields into a [`Fields`] bag.
///
/// The `log.*` fields attached to records bridged from the `log` crate
/// replace the bridge's own metadata.
#[derive(Default)]
pub struct FieldVisitor {
    pub fields: Fields,
    pub message: Option<String>,
    pub error: Option<AttachedError>,
    log_target: Option<String>,
    log_module_path: Option<String>,
    log_line: Option<u32>,
}

impl FieldVisitor {
    fn put(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = Some(value),
            "log.target" => self.log_target = Some(value),
            "log.module_path" => self.log_module_path = Some(value),
            "log.file" => {}
            "log.line" => self.log_line = value.parse().ok(),
            name => self.fields.insert(name, Some(value)),
        }
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, value.to_string());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.put(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.error = Some(AttachedError::from_error(value));
        self.put(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        // `message` arrives as fmt::Arguments, whose Debug output is the text.
        self.put(field, format!("{:?}", value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::tests::memory_logger;
    use serde_json::Value;
    use std::fmt;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Registry;

    #[derive(Debug)]
    struct ModelMissing;

    impl fmt::Display for ModelMissing {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("model.pkl not found")
        }
    }

    impl std::error::Error for ModelMissing {}

    fn capture<F: FnOnce()>(level: Level, f: F) -> Vec<Value> {
        let (logger, sink) = memory_logger(level);
        let subscriber = Registry::default().with(JsonLogLayer::new(logger));
        tracing::subscriber::with_default(subscriber, f);
        sink.documents()
    }

    #[test]
    fn renders_tracing_events_in_schema() {
        let docs = capture(Level::Debug, || {
            tracing::warn!(user_id = 42, reason = "deprecated option", "config warning");
        });
        assert_eq!(docs.len(), 1);
        let doc = &docs[0];
        assert_eq!(doc["level"], "WARNING");
        assert_eq!(doc["msg"], "config warning");
        assert_eq!(doc["user_id"], "42");
        assert_eq!(doc["extra"]["reason"], "deprecated option");
        assert_eq!(doc["debug_info"]["name"], module_path!());
        assert!(doc["debug_info"]["lineno"].as_str().is_some());
    }

    #[test]
    fn respects_logger_threshold() {
        let docs = capture(Level::Warning, || {
            tracing::debug!("noise");
            tracing::info!("noise");
            tracing::error!("kept");
        });
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["level"], "ERROR");
    }

    #[test]
    fn errors_land_in_debug_info() {
        let docs = capture(Level::Debug, || {
            let err = ModelMissing;
            tracing::error!(error = &err as &(dyn std::error::Error + 'static), "startup failed");
        });
        let doc = &docs[0];
        assert_eq!(doc["debug_info"]["exc_text"], "model.pkl not found");
        assert_eq!(doc["extra"]["error"], "model.pkl not found");
    }

    #[test]
    fn explicit_correlation_field_is_used() {
        let docs = capture(Level::Debug, || {
            tracing::info!(correlation_id = "from-upstream", "handled");
        });
        assert_eq!(docs[0]["correlation_id"], "from-upstream");
        assert_eq!(docs[0]["extra"], Value::Null);
    }

    #[test]
    fn unicode_stays_literal() {
        let (logger, sink) = memory_logger(Level::Debug);
        let subscriber = Registry::default().with(JsonLogLayer::new(logger));
        tracing::subscriber::with_default(subscriber, || {
            tracing::error!("Выполнение функции завершилось с ошибкой!");
        });
        let line = &sink.lines()[0];
        assert!(line.contains("Выполнение функции завершилось с ошибкой!"));
    }
}
