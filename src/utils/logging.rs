use serde::Serialize;

/// Cut a response body down to something that fits in a log line.
pub(crate) const BODY_PREVIEW_CHARS: usize = 300;

pub(crate) fn body_preview(body: &str) -> String {
    format!("{:.len$}", body, len = BODY_PREVIEW_CHARS)
}

/// Run `log_action` with a pretty-printed `value`, but only when DEBUG is enabled.
pub(crate) fn with_pretty_json_debug<T, F>(value: &T, log_action: F)
where
    T: Serialize,
    F: FnOnce(&str),
{
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }

    let pretty_json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|error| format!("<pretty serialize failed: {error}>"));
    log_action(pretty_json.as_str());
}
