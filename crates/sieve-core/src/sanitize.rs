//! Content sanitization for incoming events.
//!
//! Events come from browsers and may carry attacker-controlled strings
//! (CSP reports echo URLs, login failures echo usernames). Before an event
//! is sampled or forwarded, its type is normalized into a bounded key and
//! string details are stripped of control characters and markup.

use serde_json::Value;

use crate::event::EventRecord;

pub const MAX_EVENT_TYPE_LEN: usize = 128;
pub const MAX_DETAIL_STRING_LEN: usize = 1024;
pub const MAX_DETAIL_DEPTH: usize = 8;

const UNKNOWN_EVENT_TYPE: &str = "unknown";

/// Sanitize an event in place.
pub fn sanitize_event(event: &mut EventRecord) {
    event.event_type = sanitize_event_type(&event.event_type);
    if let Some(details) = event.details.take() {
        event.details = Some(sanitize_value(details, 0));
    }
}

/// Restrict to `[A-Za-z0-9_.:-]`, truncate, never empty.
pub fn sanitize_event_type(raw: &str) -> String {
    let out: String = raw
        .trim()
        .chars()
        .take(MAX_EVENT_TYPE_LEN)
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if out.is_empty() {
        UNKNOWN_EVENT_TYPE.to_string()
    } else {
        out
    }
}

/// Drop control characters, escape angle brackets, truncate.
pub fn sanitize_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len().min(MAX_DETAIL_STRING_LEN));
    for c in raw.chars().filter(|c| !c.is_control()).take(MAX_DETAIL_STRING_LEN) {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    out
}

fn sanitize_value(v: Value, depth: usize) -> Value {
    if depth >= MAX_DETAIL_DEPTH {
        return Value::Null;
    }
    match v {
        Value::String(s) => Value::String(sanitize_text(&s)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| sanitize_value(item, depth + 1))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, item)| (sanitize_text(&k), sanitize_value(item, depth + 1)))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Severity;
    use serde_json::json;

    #[test]
    fn event_type_is_normalized() {
        assert_eq!(sanitize_event_type("  csp violation/img "), "csp_violation_img");
        assert_eq!(sanitize_event_type("auth:login-failed"), "auth:login-failed");
        assert_eq!(sanitize_event_type("   "), "unknown");
        assert_eq!(sanitize_event_type(&"x".repeat(500)).len(), MAX_EVENT_TYPE_LEN);
    }

    #[test]
    fn markup_and_control_chars_are_neutralized() {
        assert_eq!(
            sanitize_text("<script>alert(1)</script>\u{0007}"),
            "&lt;script&gt;alert(1)&lt;/script&gt;"
        );
    }

    #[test]
    fn nested_details_are_sanitized_and_bounded() {
        let mut deep = json!("bottom");
        for _ in 0..12 {
            deep = json!({ "d": deep });
        }

        let mut ev = EventRecord::new("csp", Severity::Medium, 1).with_details(json!({
            "blockedUri": "https://evil.example/<x>",
            "deep": deep,
        }));
        sanitize_event(&mut ev);

        let details = ev.details.unwrap_or_default();
        assert_eq!(details["blockedUri"], "https://evil.example/&lt;x&gt;");

        let mut cursor = &details["deep"];
        let mut levels = 0;
        while let Some(next) = cursor.get("d") {
            cursor = next;
            levels += 1;
        }
        assert!(cursor.is_null());
        assert!(levels < MAX_DETAIL_DEPTH);
    }
}
