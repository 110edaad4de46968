/// Environment variable names used by this crate for convenient
/// configuration of loggers from services.
///
/// These are purely helpers; [`crate::LoggerConfig`] itself stays
/// decoupled from environment access unless built via `from_env`.

/// Minimum severity emitted, e.g. `WARNING`.
pub const JSON_LOG_LEVEL_ENV: &str = "JSON_LOG_LEVEL";

/// Severity used for lines captured from redirected stdout.
pub const JSON_LOG_CONTEXT_LEVEL_ENV: &str = "JSON_LOG_CONTEXT_LEVEL";

/// `false`/`0` emits `"debug_info": null` on every line.
pub const JSON_LOG_DEBUG_INFO_ENV: &str = "JSON_LOG_DEBUG_INFO";

/// `false`/`0` skips installing the global `tracing`/`log` capture.
pub const JSON_LOG_CAPTURE_AMBIENT_ENV: &str = "JSON_LOG_CAPTURE_AMBIENT";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read a boolean flag. Unset or unrecognized values yield `default`.
pub fn env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => parse_flag(&v).unwrap_or(default),
        Err(_) => default,
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
