//! Classification of agent trace payloads.
//!
//! The `trace` field of a stream record is decoded once into a [`TraceShape`], a closed set
//! of variants picked in priority order. Building the human-readable [`TraceEvent`] is then a
//! plain match over that set.

use crate::models::{TraceEvent, TraceKind};
use crate::text::decode_text;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::sync::OnceLock;

const ANSWER_OPEN: &str = "<answer>";
const ANSWER_CLOSE: &str = "</answer>";
const BLOCKED: &str = "BLOCKED";

#[derive(Deserialize, Default, Debug)]
#[serde(rename_all = "camelCase")]
struct TraceEnvelope {
    #[serde(default)]
    trace: Option<TracePart>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(rename_all = "camelCase")]
struct TracePart {
    #[serde(default)]
    orchestration_trace: Option<OrchestrationTrace>,
    #[serde(default)]
    guardrail_trace: Option<Value>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(rename_all = "camelCase")]
struct OrchestrationTrace {
    #[serde(default)]
    rationale: Option<Value>,
    #[serde(default)]
    model_invocation_input: Option<Value>,
    #[serde(default)]
    model_invocation_output: Option<Value>,
    #[serde(default)]
    invocation_input: Option<InvocationInput>,
    #[serde(default)]
    observation: Option<Value>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(rename_all = "camelCase")]
struct InvocationInput {
    #[serde(default)]
    code_interpreter_invocation_input: Option<Value>,
    #[serde(default)]
    knowledge_base_lookup_input: Option<Value>,
    #[serde(default)]
    action_group_invocation_input: Option<Value>,
}

#[derive(Deserialize, Default, Debug, Clone, PartialEq)]
pub struct Rationale {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Deserialize, Default, Debug, Clone, PartialEq)]
pub struct ModelInput {
    /// Either a prompt string or a structured prompt.
    #[serde(default)]
    pub text: Option<Value>,
}

#[derive(Deserialize, Default, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelOutput {
    #[serde(default)]
    pub raw_response: Option<RawResponse>,
    #[serde(default)]
    pub metadata: Option<OutputMetadata>,
}

#[derive(Deserialize, Default, Debug, Clone, PartialEq)]
pub struct RawResponse {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Deserialize, Default, Debug, Clone, PartialEq)]
pub struct OutputMetadata {
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Deserialize, Default, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: Option<u64>,
    #[serde(default)]
    pub output_tokens: Option<u64>,
}

#[derive(Deserialize, Default, Debug, Clone, PartialEq)]
pub struct CodeInterpreterInput {
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Deserialize, Default, Debug, Clone, PartialEq)]
pub struct KnowledgeBaseLookup {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Deserialize, Default, Debug, Clone, PartialEq)]
pub struct ActionGroupInput {
    #[serde(default)]
    pub function: Option<String>,
}

#[derive(Deserialize, Default, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    #[serde(default)]
    pub final_response: Option<TextPayload>,
    #[serde(default)]
    pub code_interpreter_invocation_output: Option<CodeInterpreterOutput>,
    #[serde(default)]
    pub knowledge_base_lookup_output: Option<KnowledgeBaseOutput>,
    #[serde(default)]
    pub action_group_invocation_output: Option<TextPayload>,
}

#[derive(Deserialize, Default, Debug, Clone, PartialEq)]
pub struct TextPayload {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Deserialize, Default, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CodeInterpreterOutput {
    #[serde(default)]
    pub execution_output: Option<String>,
    #[serde(default)]
    pub execution_error: Option<Value>,
}

#[derive(Deserialize, Default, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBaseOutput {
    #[serde(default)]
    pub retrieved_references: Option<Vec<Value>>,
}

#[derive(Deserialize, Default, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GuardrailAssessment {
    #[serde(default, deserialize_with = "lenient_list")]
    pub input_assessments: Vec<InputAssessment>,
}

#[derive(Deserialize, Default, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InputAssessment {
    #[serde(default)]
    pub content_policy: Option<ContentPolicy>,
    #[serde(default)]
    pub topic_policy: Option<TopicPolicy>,
}

#[derive(Deserialize, Default, Debug, Clone, PartialEq)]
pub struct ContentPolicy {
    #[serde(default, deserialize_with = "lenient_list")]
    pub filters: Vec<ContentFilter>,
}

#[derive(Deserialize, Default, Debug, Clone, PartialEq)]
pub struct ContentFilter {
    #[serde(rename = "type", default)]
    pub filter_type: Option<String>,
    #[serde(default)]
    pub confidence: Value,
    #[serde(default)]
    pub action: Option<String>,
}

impl ContentFilter {
    pub fn is_blocked(&self) -> bool {
        self.action.as_deref() == Some(BLOCKED)
    }
}

#[derive(Deserialize, Default, Debug, Clone, PartialEq)]
pub struct TopicPolicy {
    #[serde(default, deserialize_with = "lenient_list")]
    pub topics: Vec<Topic>,
}

#[derive(Deserialize, Default, Debug, Clone, PartialEq)]
pub struct Topic {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
}

impl Topic {
    pub fn is_blocked(&self) -> bool {
        self.action.as_deref() == Some(BLOCKED)
    }
}

/// A list that tolerates `null` (read as empty) and skips entries that fail to decode,
/// so one malformed entry does not take its siblings down with it.
fn lenient_list<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed trace list entry");
                None
            }
        })
        .collect())
}

/// Every payload shape the classifier recognizes.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceShape {
    Rationale(Rationale),
    ModelInput(ModelInput),
    ModelOutput(ModelOutput),
    CodeInterpreter(CodeInterpreterInput),
    KnowledgeBaseLookup(KnowledgeBaseLookup),
    ActionGroup(ActionGroupInput),
    Observation(Observation),
    Guardrail(GuardrailAssessment),
}

/// A recognized shape together with the sub-payload it was decoded from.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapedTrace {
    pub shape: TraceShape,
    pub raw: Value,
}

impl ShapedTrace {
    /// Decode the `trace` field of a stream record. Returns `None` for unknown shapes.
    pub fn from_value(value: &Value) -> Option<Self> {
        let envelope: TraceEnvelope = match serde_json::from_value(value.clone()) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!(error = %e, "trace envelope has an unexpected shape");
                return None;
            }
        };
        let part = envelope.trace?;

        if let Some(orchestration) = part.orchestration_trace {
            if let Some(raw) = orchestration.rationale {
                return Some(Self::decode(raw, TraceShape::Rationale));
            }
            if let Some(raw) = orchestration.model_invocation_input {
                return Some(Self::decode(raw, TraceShape::ModelInput));
            }
            if let Some(raw) = orchestration.model_invocation_output {
                return Some(Self::decode(raw, TraceShape::ModelOutput));
            }
            if let Some(invocation) = orchestration.invocation_input {
                if let Some(raw) = invocation.code_interpreter_invocation_input {
                    return Some(Self::decode(raw, TraceShape::CodeInterpreter));
                }
                if let Some(raw) = invocation.knowledge_base_lookup_input {
                    return Some(Self::decode(raw, TraceShape::KnowledgeBaseLookup));
                }
                if let Some(raw) = invocation.action_group_invocation_input {
                    return Some(Self::decode(raw, TraceShape::ActionGroup));
                }
            }
            if let Some(raw) = orchestration.observation {
                return Some(Self::decode(raw, TraceShape::Observation));
            }
        }

        part.guardrail_trace
            .map(|raw| Self::decode(raw, TraceShape::Guardrail))
    }

    fn decode<T, F>(raw: Value, wrap: F) -> Self
    where
        T: DeserializeOwned + Default,
        F: FnOnce(T) -> TraceShape,
    {
        let payload = serde_json::from_value(raw.clone()).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "trace payload fields have unexpected types");
            T::default()
        });
        Self {
            shape: wrap(payload),
            raw,
        }
    }

    pub fn kind(&self) -> TraceKind {
        match &self.shape {
            TraceShape::Rationale(_) => TraceKind::Rationale,
            TraceShape::ModelInput(_) => TraceKind::Input,
            TraceShape::ModelOutput(_) => TraceKind::Output,
            TraceShape::CodeInterpreter(_) => TraceKind::CodeInterpreter,
            TraceShape::KnowledgeBaseLookup(_) => TraceKind::KnowledgeBase,
            TraceShape::ActionGroup(_) => TraceKind::ActionGroup,
            TraceShape::Observation(_) => TraceKind::Observation,
            TraceShape::Guardrail(_) => TraceKind::Guardrail,
        }
    }

    pub fn into_event(self) -> TraceEvent {
        let content = match &self.shape {
            TraceShape::Rationale(r) => decode_text(r.text.as_deref().unwrap_or_default()),
            TraceShape::ModelInput(input) => model_input_content(input),
            TraceShape::ModelOutput(output) => model_output_content(output),
            TraceShape::CodeInterpreter(code) => {
                decode_text(code.code.as_deref().unwrap_or_default())
            }
            TraceShape::KnowledgeBaseLookup(kb) => {
                decode_text(kb.text.as_deref().unwrap_or_default())
            }
            TraceShape::ActionGroup(action) => match &action.function {
                Some(function) => decode_text(function),
                None => decode_text(&self.raw.to_string()),
            },
            TraceShape::Observation(obs) => observation_content(obs),
            TraceShape::Guardrail(guard) => decode_text(&guardrail_summary(guard)),
        };
        TraceEvent::new(self.kind(), content, self.raw)
    }
}

/// Classify the `trace` field of a stream record into a trace event.
pub fn classify(trace: &Value) -> Option<TraceEvent> {
    ShapedTrace::from_value(trace).map(ShapedTrace::into_event)
}

fn model_input_content(input: &ModelInput) -> String {
    match &input.text {
        Some(Value::String(text)) => decode_text(text),
        Some(Value::Null) | None => String::new(),
        Some(structured) => {
            let pretty =
                serde_json::to_string_pretty(structured).unwrap_or_else(|_| structured.to_string());
            decode_text(&pretty)
        }
    }
}

fn model_output_content(output: &ModelOutput) -> String {
    let mut content = output
        .raw_response
        .as_ref()
        .and_then(|r| r.content.as_deref())
        .map(response_text)
        .unwrap_or_default();

    if let Some(usage) = output.metadata.as_ref().and_then(|m| m.usage.as_ref()) {
        content.push_str(&format!(
            "\n\nToken Usage:\n- Input Tokens: {}\n- Output Tokens: {}",
            usage.input_tokens.unwrap_or(0),
            usage.output_tokens.unwrap_or(0)
        ));
    }
    content
}

/// Pick the most useful part of a raw model response.
fn response_text(raw: &str) -> String {
    if let Some(answer) = structured_answer(raw) {
        return decode_text(&answer);
    }
    if let Some(answer) = answer_tag(raw) {
        return decode_text(&answer);
    }
    if let Some(caps) = thinking_re().captures(raw) {
        let thinking = caps[1].trim();
        if !thinking.is_empty() {
            return format!("Reasoning:\n{}", decode_text(thinking));
        }
    }
    decode_text(raw)
}

/// `<answer>` contents of the first text item of a JSON response body that has one.
fn structured_answer(raw: &str) -> Option<String> {
    if !raw.trim_start().starts_with('{') {
        return None;
    }
    let parsed: Value = serde_json::from_str(raw).ok()?;
    parsed
        .get("content")?
        .as_array()?
        .iter()
        .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|item| item.get("text").and_then(Value::as_str))
        .find_map(answer_tag)
}

/// Text after `<answer>`, up to `</answer>` when the tag is closed.
///
/// Stopping at the closing tag departs from the service's own client, which keeps everything
/// after `<answer>`; trailing tags and citations are not part of the answer.
fn answer_tag(text: &str) -> Option<String> {
    let start = text.find(ANSWER_OPEN)? + ANSWER_OPEN.len();
    let rest = &text[start..];
    let body = match rest.find(ANSWER_CLOSE) {
        Some(end) => &rest[..end],
        None => rest,
    };
    let body = body.trim();
    if body.is_empty() {
        None
    } else {
        Some(body.to_string())
    }
}

fn thinking_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<thinking>(.*?)</thinking>").expect("static regex"))
}

fn observation_content(obs: &Observation) -> String {
    if let Some(final_response) = &obs.final_response {
        return decode_text(final_response.text.as_deref().unwrap_or_default());
    }
    if let Some(code) = &obs.code_interpreter_invocation_output {
        if let Some(output) = &code.execution_output {
            return decode_text(output);
        }
        if let Some(error) = &code.execution_error {
            return format!("Execution error: {}", decode_text(&error.to_string()));
        }
        return String::new();
    }
    if let Some(kb) = &obs.knowledge_base_lookup_output {
        let count = kb.retrieved_references.as_ref().map_or(0, Vec::len);
        return format!("{} documents retrieved", count);
    }
    if let Some(action) = &obs.action_group_invocation_output {
        return decode_text(action.text.as_deref().unwrap_or_default());
    }
    String::new()
}

fn guardrail_summary(guard: &GuardrailAssessment) -> String {
    let mut summary = String::from("Guardrail assessment:");
    for assessment in &guard.input_assessments {
        if let Some(policy) = &assessment.content_policy {
            for filter in policy.filters.iter().filter(|f| f.is_blocked()) {
                summary.push_str(&format!(
                    "\n- {} blocked (confidence: {})",
                    filter.filter_type.as_deref().unwrap_or_default(),
                    display_value(&filter.confidence)
                ));
            }
        }
        if let Some(policy) = &assessment.topic_policy {
            for topic in policy.topics.iter().filter(|t| t.is_blocked()) {
                summary.push_str(&format!(
                    "\n- Topic '{}' blocked",
                    topic.name.as_deref().unwrap_or_default()
                ));
            }
        }
    }
    summary
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn orchestration(inner: Value) -> Value {
        json!({ "agentId": "A1", "trace": { "orchestrationTrace": inner } })
    }

    #[test]
    fn test_rationale() {
        let event = classify(&orchestration(json!({
            "rationale": { "text": "Look up the plan &amp; price", "traceId": "t-1" }
        })))
        .unwrap();
        assert_eq!(event.kind, TraceKind::Rationale);
        assert_eq!(event.content, "Look up the plan & price");
        assert_eq!(event.raw_data["traceId"], "t-1");
    }

    #[test]
    fn test_model_input_structured_text_is_pretty_printed() {
        let event = classify(&orchestration(json!({
            "modelInvocationInput": { "text": { "system": "be nice" } }
        })))
        .unwrap();
        assert_eq!(event.kind, TraceKind::Input);
        assert!(event.content.contains("\"system\": \"be nice\""));
    }

    #[test]
    fn test_model_output_structured_answer_wins() {
        let raw = json!({
            "content": [
                { "type": "text", "text": "<thinking>hmm</thinking><answer>Plan A</answer>" }
            ]
        })
        .to_string();
        let event = classify(&orchestration(json!({
            "modelInvocationOutput": { "rawResponse": { "content": raw } }
        })))
        .unwrap();
        assert_eq!(event.kind, TraceKind::Output);
        assert_eq!(event.content, "Plan A");
    }

    #[test]
    fn test_model_output_plain_answer_to_end() {
        let event = classify(&orchestration(json!({
            "modelInvocationOutput": {
                "rawResponse": { "content": "<thinking>x</thinking>\n<answer> The answer" }
            }
        })))
        .unwrap();
        assert_eq!(event.content, "The answer");
    }

    #[test]
    fn test_model_output_plain_answer_stops_at_closing_tag() {
        let event = classify(&orchestration(json!({
            "modelInvocationOutput": {
                "rawResponse": { "content": "<answer>Roaming is on</answer>\n<sources>1</sources>" }
            }
        })))
        .unwrap();
        assert_eq!(event.content, "Roaming is on");
    }

    #[test]
    fn test_model_output_thinking_only() {
        let event = classify(&orchestration(json!({
            "modelInvocationOutput": {
                "rawResponse": { "content": "<thinking> checking roaming </thinking>" }
            }
        })))
        .unwrap();
        assert_eq!(event.content, "Reasoning:\nchecking roaming");
    }

    #[test]
    fn test_model_output_verbatim_with_usage() {
        let event = classify(&orchestration(json!({
            "modelInvocationOutput": {
                "rawResponse": { "content": "just text" },
                "metadata": { "usage": { "inputTokens": 12, "outputTokens": 3 } }
            }
        })))
        .unwrap();
        assert_eq!(
            event.content,
            "just text\n\nToken Usage:\n- Input Tokens: 12\n- Output Tokens: 3"
        );
    }

    #[test]
    fn test_invocation_inputs() {
        let code = classify(&orchestration(json!({
            "invocationInput": { "codeInterpreterInvocationInput": { "code": "print(1)" } }
        })))
        .unwrap();
        assert_eq!(code.kind, TraceKind::CodeInterpreter);
        assert_eq!(code.content, "print(1)");

        let kb = classify(&orchestration(json!({
            "invocationInput": { "knowledgeBaseLookupInput": { "text": "roaming plans" } }
        })))
        .unwrap();
        assert_eq!(kb.kind, TraceKind::KnowledgeBase);
        assert_eq!(kb.content, "roaming plans");

        let action = classify(&orchestration(json!({
            "invocationInput": { "actionGroupInvocationInput": { "function": "get_customer" } }
        })))
        .unwrap();
        assert_eq!(action.kind, TraceKind::ActionGroup);
        assert_eq!(action.content, "get_customer");
    }

    #[test]
    fn test_action_group_without_function_is_stringified() {
        let event = classify(&orchestration(json!({
            "invocationInput": { "actionGroupInvocationInput": { "apiPath": "/plans" } }
        })))
        .unwrap();
        assert_eq!(event.content, r#"{"apiPath":"/plans"}"#);
    }

    #[test]
    fn test_observation_variants() {
        let final_answer = classify(&orchestration(json!({
            "observation": { "finalResponse": { "text": "Done." } }
        })))
        .unwrap();
        assert_eq!(final_answer.kind, TraceKind::Observation);
        assert_eq!(final_answer.content, "Done.");

        let code_error = classify(&orchestration(json!({
            "observation": { "codeInterpreterInvocationOutput": { "executionError": "NameError" } }
        })))
        .unwrap();
        assert_eq!(code_error.content, "Execution error: \"NameError\"");

        let kb = classify(&orchestration(json!({
            "observation": {
                "knowledgeBaseLookupOutput": { "retrievedReferences": [{}, {}, {}] }
            }
        })))
        .unwrap();
        assert_eq!(kb.content, "3 documents retrieved");

        let action = classify(&orchestration(json!({
            "observation": { "actionGroupInvocationOutput": { "text": "ok" } }
        })))
        .unwrap();
        assert_eq!(action.content, "ok");
    }

    #[test]
    fn test_priority_order() {
        let event = classify(&orchestration(json!({
            "observation": { "finalResponse": { "text": "later" } },
            "rationale": { "text": "first" }
        })))
        .unwrap();
        assert_eq!(event.kind, TraceKind::Rationale);
    }

    #[test]
    fn test_guardrail_lists_blocked_filters_and_topics() {
        let event = classify(&json!({
            "trace": {
                "guardrailTrace": {
                    "action": "INTERVENED",
                    "inputAssessments": [{
                        "contentPolicy": { "filters": [
                            { "type": "X", "confidence": 0.9, "action": "BLOCKED" },
                            { "type": "Y", "confidence": "LOW", "action": "NONE" }
                        ]},
                        "topicPolicy": { "topics": [
                            { "name": "Investment", "action": "BLOCKED" }
                        ]}
                    }]
                }
            }
        }))
        .unwrap();
        assert_eq!(event.kind, TraceKind::Guardrail);
        assert!(event.content.contains("X"));
        assert!(event.content.contains("0.9"));
        assert!(event.content.contains("Investment"));
        assert!(!event.content.contains("Y blocked"));
    }

    #[test]
    fn test_guardrail_null_fields_do_not_hide_blocked_filters() {
        let event = classify(&json!({
            "trace": {
                "guardrailTrace": {
                    "inputAssessments": [{
                        "contentPolicy": { "filters": [
                            { "type": "X", "confidence": 0.9, "action": "BLOCKED" },
                            "not a filter"
                        ]},
                        "topicPolicy": { "topics": [
                            { "name": null, "action": "NONE" }
                        ]}
                    }, {
                        "contentPolicy": { "filters": null },
                        "topicPolicy": { "topics": [
                            { "name": "Loans", "action": "BLOCKED" }
                        ]}
                    }]
                }
            }
        }))
        .unwrap();
        assert_eq!(
            event.content,
            "Guardrail assessment:\n- X blocked (confidence: 0.9)\n- Topic 'Loans' blocked"
        );
    }

    #[test]
    fn test_unknown_shapes_are_ignored() {
        assert!(classify(&json!({ "trace": { "preProcessingTrace": {} } })).is_none());
        assert!(classify(&orchestration(json!({ "somethingElse": 1 }))).is_none());
        assert!(classify(&json!("not an object")).is_none());
        assert!(classify(&json!({})).is_none());
    }

    #[test]
    fn test_mistyped_payload_falls_back_to_empty_content() {
        let event = classify(&orchestration(json!({ "rationale": { "text": 42 } }))).unwrap();
        assert_eq!(event.kind, TraceKind::Rationale);
        assert_eq!(event.content, "");
    }
}
