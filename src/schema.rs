use serde::Serialize;
use std::collections::BTreeMap;

/// Required schema fields filled from the caller's [`crate::Fields`].
pub const SCHEMA_FIELD_KEYS: [&str; 6] = [
    "id",
    "parent_id",
    "user_id",
    "item_id",
    "merchant_id",
    "content_type",
];

/// Every top-level key of a serialized [`LogDocument`], in wire order.
pub const DOCUMENT_KEYS: [&str; 12] = [
    "correlation_id",
    "written_at",
    "msg",
    "level",
    "id",
    "parent_id",
    "user_id",
    "item_id",
    "merchant_id",
    "content_type",
    "extra",
    "debug_info",
];

/// Keys of the `debug_info` mapping.
pub const DEBUG_INFO_KEYS: [&str; 7] = [
    "threadName",
    "name",
    "module",
    "lineno",
    "exc_info",
    "exc_text",
    "stack_info",
];

/// Event metadata keys that never end up in `extra`.
pub const EVENT_METADATA_KEYS: [&str; 4] = ["level", "message", "timestamp", "context_id"];

/// Whether `key` is owned by the schema or event metadata and therefore
/// cannot be used as a free-form extra field.
pub fn is_reserved(key: &str) -> bool {
    DOCUMENT_KEYS.contains(&key)
        || DEBUG_INFO_KEYS.contains(&key)
        || EVENT_METADATA_KEYS.contains(&key)
}

/// Troubleshooting fields attached to every document unless disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DebugInfo {
    #[serde(rename = "threadName")]
    pub thread_name: Option<String>,
    /// Logger name.
    pub name: Option<String>,
    pub module: Option<String>,
    pub lineno: Option<String>,
    pub exc_info: Option<String>,
    pub exc_text: Option<String>,
    pub stack_info: Option<String>,
}

/// One emitted log line.
///
/// Field order matches [`DOCUMENT_KEYS`]; `extra` and `debug_info` are
/// serialized as `null` rather than skipped so the key set never varies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogDocument {
    pub correlation_id: String,
    pub written_at: String,
    pub msg: String,
    pub level: String,
    pub id: String,
    pub parent_id: String,
    pub user_id: String,
    pub item_id: String,
    pub merchant_id: String,
    pub content_type: String,
    pub extra: Option<BTreeMap<String, Option<String>>>,
    pub debug_info: Option<DebugInfo>,
}

impl LogDocument {
    /// Serialize to a single JSON line. Non-ASCII text is kept literal.
    pub fn to_json_line(&self) -> String {
        // Only string keys and string/null values: serialization cannot fail.
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                "{{\"correlation_id\":\"\",\"written_at\":\"\",\"msg\":\"log serialization failed: {}\",\"level\":\"ERROR\",\"id\":\"\",\"parent_id\":\"\",\"user_id\":\"\",\"item_id\":\"\",\"merchant_id\":\"\",\"content_type\":\"\",\"extra\":null,\"debug_info\":null}}",
                e.to_string().replace(['"', '\\'], "'")
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_document() -> LogDocument {
        LogDocument {
            correlation_id: String::new(),
            written_at: "2024-05-01T10:00:00.000000+03:00".to_string(),
            msg: "Привет".to_string(),
            level: "INFO".to_string(),
            id: String::new(),
            parent_id: String::new(),
            user_id: String::new(),
            item_id: String::new(),
            merchant_id: String::new(),
            content_type: String::new(),
            extra: None,
            debug_info: None,
        }
    }

    #[test]
    fn serializes_exact_key_set_in_order() {
        let line = empty_document().to_json_line();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        let mut expected: Vec<&str> = DOCUMENT_KEYS.to_vec();
        expected.sort_unstable();
        let mut got: Vec<&str> = keys.iter().map(|k| k.as_str()).collect();
        got.sort_unstable();
        assert_eq!(got, expected);
        assert!(line.starts_with("{\"correlation_id\":\"\",\"written_at\""));
        assert_eq!(value["extra"], serde_json::Value::Null);
        assert_eq!(value["debug_info"], serde_json::Value::Null);
    }

    #[test]
    fn keeps_non_ascii_literal() {
        let line = empty_document().to_json_line();
        assert!(line.contains("\"msg\":\"Привет\""));
        assert!(!line.contains("\\u"));
        assert!(!line.ends_with('\n'));
    }

    #[test]
    fn debug_info_uses_wire_names() {
        let mut doc = empty_document();
        doc.debug_info = Some(DebugInfo {
            thread_name: Some("main".to_string()),
            lineno: Some("12".to_string()),
            ..DebugInfo::default()
        });
        let value: serde_json::Value = serde_json::from_str(&doc.to_json_line()).unwrap();
        let info = value["debug_info"].as_object().unwrap();
        let mut keys: Vec<&str> = info.keys().map(|k| k.as_str()).collect();
        keys.sort_unstable();
        let mut expected = DEBUG_INFO_KEYS.to_vec();
        expected.sort_unstable();
        assert_eq!(keys, expected);
        assert_eq!(info["threadName"], "main");
        assert_eq!(info["exc_info"], serde_json::Value::Null);
    }

    #[test]
    fn reserved_keys() {
        assert!(is_reserved("user_id"));
        assert!(is_reserved("correlation_id"));
        assert!(is_reserved("lineno"));
        assert!(is_reserved("message"));
        assert!(!is_reserved("e_x_t_r_a"));
    }
}
