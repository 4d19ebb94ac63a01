use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Maximum number of characters shown for a trace before it is collapsed.
pub const TRACE_PREVIEW_CHARS: usize = 300;

/// Closed set of trace categories surfaced by the agent service.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TraceKind {
    Rationale,
    Input,
    Output,
    #[serde(rename = "codeInterpreter")]
    CodeInterpreter,
    #[serde(rename = "knowledgeBase")]
    KnowledgeBase,
    #[serde(rename = "actionGroup")]
    ActionGroup,
    Observation,
    Guardrail,
}

impl TraceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceKind::Rationale => "Rationale",
            TraceKind::Input => "Input",
            TraceKind::Output => "Output",
            TraceKind::CodeInterpreter => "codeInterpreter",
            TraceKind::KnowledgeBase => "knowledgeBase",
            TraceKind::ActionGroup => "actionGroup",
            TraceKind::Observation => "Observation",
            TraceKind::Guardrail => "Guardrail",
        }
    }

    /// Kinds shown by the default trace panel. Every kind is still kept on the message.
    pub fn is_default_visible(&self) -> bool {
        matches!(
            self,
            TraceKind::Rationale | TraceKind::KnowledgeBase | TraceKind::Observation
        )
    }
}

impl fmt::Display for TraceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TraceEvent {
    #[serde(rename = "type")]
    pub kind: TraceKind,
    pub content: String,
    /// The matched sub-payload, kept as-is for diagnostics.
    pub raw_data: Value,
}

impl TraceEvent {
    pub fn new(kind: TraceKind, content: impl Into<String>, raw_data: Value) -> Self {
        Self {
            kind,
            content: content.into(),
            raw_data,
        }
    }

    /// Content cut to [`TRACE_PREVIEW_CHARS`] characters, with an ellipsis when truncated.
    pub fn preview(&self) -> String {
        if self.content.chars().count() <= TRACE_PREVIEW_CHARS {
            return self.content.clone();
        }
        let mut preview: String = self.content.chars().take(TRACE_PREVIEW_CHARS).collect();
        preview.push_str("...");
        preview
    }

    pub fn is_long(&self) -> bool {
        self.content.chars().count() > TRACE_PREVIEW_CHARS
    }
}

/// Traces the default panel shows, in arrival order.
pub fn visible_traces(traces: &[TraceEvent]) -> impl Iterator<Item = &TraceEvent> {
    traces.iter().filter(|t| t.kind.is_default_visible())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_serializes_with_wire_tag() {
        let event = TraceEvent::new(TraceKind::CodeInterpreter, "print(1)", json!({}));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "codeInterpreter");
        assert_eq!(value["rawData"], json!({}));
    }

    #[test]
    fn test_default_filter() {
        let traces = vec![
            TraceEvent::new(TraceKind::Input, "prompt", Value::Null),
            TraceEvent::new(TraceKind::Rationale, "why", Value::Null),
            TraceEvent::new(TraceKind::Guardrail, "blocked", Value::Null),
            TraceEvent::new(TraceKind::Observation, "seen", Value::Null),
            TraceEvent::new(TraceKind::KnowledgeBase, "query", Value::Null),
        ];
        let kinds: Vec<TraceKind> = visible_traces(&traces).map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TraceKind::Rationale,
                TraceKind::Observation,
                TraceKind::KnowledgeBase
            ]
        );
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "가".repeat(TRACE_PREVIEW_CHARS + 5);
        let event = TraceEvent::new(TraceKind::Rationale, long, Value::Null);
        assert!(event.is_long());
        let preview = event.preview();
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), TRACE_PREVIEW_CHARS + 3);

        let short = TraceEvent::new(TraceKind::Rationale, "short", Value::Null);
        assert_eq!(short.preview(), "short");
    }
}
