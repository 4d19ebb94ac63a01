use serde::Deserialize;
use serde_json::Value;

/// One `data:` record of the chat stream.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StreamRecord {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub chunk: Option<String>,
    #[serde(default)]
    pub trace: Option<Value>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub full_response: Option<String>,
}

impl StreamRecord {
    pub fn parse(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }

    /// The `error` field, when the service actually reported something.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| !e.is_empty())
    }

    pub fn content_chunk(&self) -> Option<&str> {
        self.chunk.as_deref().filter(|c| !c.is_empty())
    }

    /// The final answer of a `done` record; an empty one means "keep what was streamed".
    pub fn final_response(&self) -> Option<&str> {
        self.full_response.as_deref().filter(|f| !f.is_empty())
    }
}

/// First `max_chars` characters of a payload, for log lines.
pub fn truncate_for_log(payload: &str, max_chars: usize) -> String {
    if payload.chars().count() <= max_chars {
        return payload.to_string();
    }
    let mut out: String = payload.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chunk_record() {
        let record = StreamRecord::parse(r#"{"chunk":"hi","done":false}"#).unwrap();
        assert_eq!(record.content_chunk(), Some("hi"));
        assert!(!record.done);
        assert!(record.trace.is_none());
    }

    #[test]
    fn test_parse_terminal_record() {
        let record =
            StreamRecord::parse(r#"{"chunk":"","done":true,"fullResponse":"all"}"#).unwrap();
        assert!(record.done);
        assert_eq!(record.content_chunk(), None);
        assert_eq!(record.full_response.as_deref(), Some("all"));
    }

    #[test]
    fn test_empty_error_is_not_an_error() {
        let record = StreamRecord::parse(r#"{"error":""}"#).unwrap();
        assert_eq!(record.error_message(), None);
    }

    #[test]
    fn test_truncate_for_log() {
        assert_eq!(truncate_for_log("abcdef", 3), "abc...");
        assert_eq!(truncate_for_log("abc", 3), "abc");
    }
}
