//! Typed session events decoded from `session.event` notifications.
//!
//! The runtime tags each event with a `type` string and a `data` payload.
//! Kinds this console does not understand decode to [`SessionEvent::Other`]
//! so newer runtimes never break the stream. Fields of known kinds decode
//! leniently: a mistyped field degrades to its JSON text (or its default)
//! instead of dropping the event.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub const KIND_SESSION_INFO: &str = "session.info";
pub const KIND_SESSION_ERROR: &str = "session.error";
pub const KIND_SESSION_IDLE: &str = "session.idle";
pub const KIND_TOOL_START: &str = "tool.execution_start";
pub const KIND_TOOL_PARTIAL: &str = "tool.execution_partial_result";
pub const KIND_TOOL_PROGRESS: &str = "tool.execution_progress";
pub const KIND_TOOL_COMPLETE: &str = "tool.execution_complete";
pub const KIND_ASSISTANT_MESSAGE: &str = "assistant.message";

/// Successful tool output carried by `tool.execution_complete`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ToolResult {
    #[serde(deserialize_with = "lenient_text")]
    pub content: Option<String>,
}

/// Failure detail carried by `tool.execution_complete` when `success=false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ToolFailure {
    #[serde(deserialize_with = "lenient_text")]
    pub message: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub code: Option<String>,
}

/// Strings as-is, null as absent, anything else as its JSON text.
fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(text_of(&Value::deserialize(deserializer)?))
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(lenient_text(deserializer)?.unwrap_or_default())
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(flag) => flag,
        Value::String(text) => text.eq_ignore_ascii_case("true"),
        _ => false,
    })
}

impl ToolResult {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Object(_) => Some(serde_json::from_value(value).unwrap_or_default()),
            other => Some(Self {
                content: text_of(&other),
            }),
        }
    }
}

impl ToolFailure {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Object(_) => Some(serde_json::from_value(value).unwrap_or_default()),
            other => Some(Self {
                message: text_of(&other),
                code: None,
            }),
        }
    }
}

/// One event from the session stream.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Info {
        message: String,
    },
    Error {
        message: String,
    },
    /// The session finished processing the current prompt.
    Idle,
    ToolStart {
        tool_name: String,
        tool_call_id: String,
        arguments: Value,
    },
    ToolPartialResult {
        tool_call_id: String,
        partial_output: String,
    },
    ToolProgress {
        tool_call_id: String,
        progress_message: String,
    },
    ToolComplete {
        tool_call_id: String,
        success: bool,
        result: Option<ToolResult>,
        error: Option<ToolFailure>,
    },
    AssistantMessage {
        content: String,
    },
    /// Any kind not listed above.
    Other {
        kind: String,
    },
}

impl SessionEvent {
    /// Wire `type` tag for this event.
    pub fn kind(&self) -> &str {
        match self {
            Self::Info { .. } => KIND_SESSION_INFO,
            Self::Error { .. } => KIND_SESSION_ERROR,
            Self::Idle => KIND_SESSION_IDLE,
            Self::ToolStart { .. } => KIND_TOOL_START,
            Self::ToolPartialResult { .. } => KIND_TOOL_PARTIAL,
            Self::ToolProgress { .. } => KIND_TOOL_PROGRESS,
            Self::ToolComplete { .. } => KIND_TOOL_COMPLETE,
            Self::AssistantMessage { .. } => KIND_ASSISTANT_MESSAGE,
            Self::Other { kind } => kind,
        }
    }

    /// Decode one wire event. Malformed payloads for known kinds degrade to
    /// `Other` rather than failing the stream.
    pub fn from_wire(event: WireEvent) -> Self {
        let WireEvent { kind, data } = event;
        match decode_known(&kind, data) {
            Ok(Some(event)) => event,
            Ok(None) => Self::Other { kind },
            Err(err) => {
                tracing::debug!(kind = %kind, error = %err, "malformed event payload");
                Self::Other { kind }
            }
        }
    }
}

/// Event envelope as carried in `session.event` params.
#[derive(Debug, Clone, Deserialize)]
pub struct WireEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

/// Params of the `session.event` notification.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEventNotification {
    pub session_id: String,
    pub event: WireEvent,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct MessageData {
    #[serde(deserialize_with = "lenient_string")]
    message: String,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct ToolStartData {
    #[serde(deserialize_with = "lenient_string")]
    tool_name: String,
    #[serde(deserialize_with = "lenient_string")]
    tool_call_id: String,
    arguments: Value,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct ToolPartialData {
    #[serde(deserialize_with = "lenient_string")]
    tool_call_id: String,
    #[serde(deserialize_with = "lenient_string")]
    partial_output: String,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct ToolProgressData {
    #[serde(deserialize_with = "lenient_string")]
    tool_call_id: String,
    #[serde(deserialize_with = "lenient_string")]
    progress_message: String,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct ToolCompleteData {
    #[serde(deserialize_with = "lenient_string")]
    tool_call_id: String,
    #[serde(deserialize_with = "lenient_bool")]
    success: bool,
    result: Value,
    error: Value,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct AssistantMessageData {
    #[serde(deserialize_with = "lenient_string")]
    content: String,
}

fn decode_known(kind: &str, data: Value) -> Result<Option<SessionEvent>, serde_json::Error> {
    // Missing `data` arrives as null; treat it as an empty object.
    let data = if data.is_null() {
        Value::Object(Default::default())
    } else {
        data
    };

    let event = match kind {
        KIND_SESSION_INFO => {
            let d: MessageData = serde_json::from_value(data)?;
            SessionEvent::Info { message: d.message }
        }
        KIND_SESSION_ERROR => {
            let d: MessageData = serde_json::from_value(data)?;
            SessionEvent::Error { message: d.message }
        }
        KIND_SESSION_IDLE => SessionEvent::Idle,
        KIND_TOOL_START => {
            let d: ToolStartData = serde_json::from_value(data)?;
            SessionEvent::ToolStart {
                tool_name: d.tool_name,
                tool_call_id: d.tool_call_id,
                arguments: d.arguments,
            }
        }
        KIND_TOOL_PARTIAL => {
            let d: ToolPartialData = serde_json::from_value(data)?;
            SessionEvent::ToolPartialResult {
                tool_call_id: d.tool_call_id,
                partial_output: d.partial_output,
            }
        }
        KIND_TOOL_PROGRESS => {
            let d: ToolProgressData = serde_json::from_value(data)?;
            SessionEvent::ToolProgress {
                tool_call_id: d.tool_call_id,
                progress_message: d.progress_message,
            }
        }
        KIND_TOOL_COMPLETE => {
            let d: ToolCompleteData = serde_json::from_value(data)?;
            SessionEvent::ToolComplete {
                tool_call_id: d.tool_call_id,
                success: d.success,
                result: ToolResult::from_value(d.result),
                error: ToolFailure::from_value(d.error),
            }
        }
        KIND_ASSISTANT_MESSAGE => {
            let d: AssistantMessageData = serde_json::from_value(data)?;
            SessionEvent::AssistantMessage { content: d.content }
        }
        _ => return Ok(None),
    };
    Ok(Some(event))
}
