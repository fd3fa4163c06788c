//! Assistant event extraction for Codex session JSONL lines.
//!
//! Codex writes one JSON record per line under `~/.codex/sessions/`. Two
//! record shapes carry assistant speech:
//!
//! - `{"type":"event_msg","payload":{"type":"agent_message","message":"..."}}`
//! - `{"type":"response_item","payload":{"type":"message","role":"assistant","content":[...]}}`
//!
//! Everything else is ignored.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

/// Result of extracting one session log line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssistantEvent {
    /// Whitespace-collapsed assistant text, `None` if the line carries none.
    pub message: Option<String>,
    /// Record timestamp in epoch seconds, `None` if absent or unparsable.
    pub timestamp: Option<f64>,
}

/// Extract an assistant message and timestamp from one raw line.
///
/// Malformed input yields an empty event; it never fails.
///
/// # Examples
///
/// ```
/// use codex_session_watch::watcher::extract_assistant_event;
///
/// let line = r#"{"type":"event_msg","payload":{"type":"agent_message","message":"  all   done "}}"#;
/// let event = extract_assistant_event(line);
/// assert_eq!(event.message.as_deref(), Some("all done"));
/// assert_eq!(event.timestamp, None);
/// ```
#[must_use]
pub fn extract_assistant_event(line: &str) -> AssistantEvent {
    // Only a top-level object is a record; arrays and scalars are noise.
    let Ok(Value::Object(record)) = serde_json::from_str::<Value>(line) else {
        return AssistantEvent::default();
    };

    let timestamp = record
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(parse_timestamp);
    let payload = record.get("payload").unwrap_or(&Value::Null);
    let message = match record.get("type").and_then(Value::as_str) {
        Some("event_msg") => agent_message(payload),
        Some("response_item") => response_item_message(payload),
        _ => None,
    };

    AssistantEvent { message, timestamp }
}

fn agent_message(payload: &Value) -> Option<String> {
    match payload.get("type").and_then(Value::as_str) {
        Some("agent_message" | "assistant_message") => {
            payload.get("message").and_then(Value::as_str).and_then(normalize_text)
        }
        _ => None,
    }
}

fn response_item_message(payload: &Value) -> Option<String> {
    if payload.get("type").and_then(Value::as_str) != Some("message")
        || payload.get("role").and_then(Value::as_str) != Some("assistant")
    {
        return None;
    }

    let texts: Vec<&str> = match payload.get("content") {
        Some(Value::String(text)) => vec![text.as_str()],
        Some(Value::Array(blocks)) => blocks.iter().filter_map(block_text).collect(),
        _ => Vec::new(),
    };

    let joined = texts
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    normalize_text(&joined)
}

/// Text carried by a content block. `output_text` blocks are the common
/// case, but any block with a non-empty `text` field counts.
fn block_text(block: &Value) -> Option<&str> {
    let block = block.as_object()?;
    let text = block.get("text")?.as_str()?;
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Collapse runs of whitespace into single spaces; empty results are `None`.
#[must_use]
pub fn normalize_text(text: &str) -> Option<String> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Parse an ISO-8601 instant into epoch seconds.
///
/// Accepts RFC 3339 (including a trailing `Z`) and timezone-naive
/// date-times or dates, which are taken as UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(epoch_seconds(&dt.with_timezone(&Utc)));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(epoch_seconds(&naive.and_utc()));
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| epoch_seconds(&naive.and_utc()))
}

#[allow(clippy::cast_precision_loss)]
fn epoch_seconds(dt: &DateTime<Utc>) -> f64 {
    dt.timestamp_micros() as f64 / 1_000_000.0
}
