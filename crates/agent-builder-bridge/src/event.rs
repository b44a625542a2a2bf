use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::sse::SseFrame;

/// Body of `conversation_id_set`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationIdSet {
    pub conversation_id: String,
}

/// Body of `conversation_created` and `conversation_updated`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationInfo {
    pub conversation_id: String,
    #[serde(default)]
    pub title: String,
}

/// Body of `tool_call`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool_call_id: String,
    pub tool_id: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Body of `tool_progress`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolProgress {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub tool_call_id: String,
}

/// One entry of a tool result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolResultItem {
    #[serde(rename = "type", default)]
    pub result_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub tool_result_id: String,
}

/// Body of `tool_result`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub tool_id: String,
    #[serde(default)]
    pub results: Vec<ToolResultItem>,
}

/// Body of `message_complete`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageComplete {
    /// Empty when the service omitted it.
    #[serde(default)]
    pub message_id: String,
    #[serde(default)]
    pub message_content: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoundInput {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub attachments: Vec<serde_json::Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundResponse {
    #[serde(default)]
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub id: String,
    #[serde(default)]
    pub input: RoundInput,
    #[serde(default)]
    pub steps: Vec<serde_json::Value>,
    #[serde(default)]
    pub response: RoundResponse,
}

/// Body of `round_complete`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundComplete {
    pub round: Round,
}

/// Error reported by the service inside the stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteError {
    #[serde(default)]
    pub code: String,
    pub message: String,
}

impl RemoteError {
    /// Reads `{"error": {"code", "message"}}`, taking whatever part of it is
    /// present. Any other body becomes the message.
    fn from_body(body: &serde_json::Value) -> Self {
        let text = |value: &serde_json::Value| match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let inner = body.get("error").unwrap_or(body);
        match inner {
            serde_json::Value::Object(map) => Self {
                code: map.get("code").map(text).unwrap_or_default(),
                message: map.get("message").map(text).unwrap_or_else(|| text(inner)),
            },
            other => Self {
                code: String::new(),
                message: text(other),
            },
        }
    }
}

/// A decoded converse stream event.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    ConversationIdSet(ConversationIdSet),
    /// Free-form reasoning payload.
    Reasoning(serde_json::Value),
    ToolCall(ToolCall),
    ToolProgress(ToolProgress),
    ToolResult(ToolResult),
    MessageComplete(MessageComplete),
    RoundComplete(RoundComplete),
    ConversationCreated(ConversationInfo),
    ConversationUpdated(ConversationInfo),
    Error(RemoteError),
    /// Unknown tag, or a known tag whose body did not match its shape.
    Unrecognized {
        kind: String,
        body: serde_json::Value,
    },
}

impl Event {
    /// Maps a frame onto its event variant. Never fails.
    pub fn from_frame(frame: SseFrame) -> Self {
        let SseFrame { tag, payload } = frame;
        let body = unwrap_envelope(payload);
        let decoded = match tag.as_str() {
            "conversation_id_set" => decode(&body).map(Self::ConversationIdSet),
            "reasoning" => Some(Self::Reasoning(body.clone())),
            "tool_call" => decode(&body).map(Self::ToolCall),
            "tool_progress" => decode(&body).map(Self::ToolProgress),
            "tool_result" => decode(&body).map(Self::ToolResult),
            "message_complete" => decode(&body).map(Self::MessageComplete),
            "round_complete" => decode(&body).map(Self::RoundComplete),
            "conversation_created" => decode(&body).map(Self::ConversationCreated),
            "conversation_updated" => decode(&body).map(Self::ConversationUpdated),
            "error" => Some(Self::Error(RemoteError::from_body(&body))),
            _ => None,
        };
        decoded.unwrap_or_else(|| {
            debug!(kind = %tag, "forwarding unrecognized event");
            Self::Unrecognized { kind: tag, body }
        })
    }

    /// Returns the wire tag of this event.
    pub fn kind(&self) -> &str {
        match self {
            Self::ConversationIdSet(_) => "conversation_id_set",
            Self::Reasoning(_) => "reasoning",
            Self::ToolCall(_) => "tool_call",
            Self::ToolProgress(_) => "tool_progress",
            Self::ToolResult(_) => "tool_result",
            Self::MessageComplete(_) => "message_complete",
            Self::RoundComplete(_) => "round_complete",
            Self::ConversationCreated(_) => "conversation_created",
            Self::ConversationUpdated(_) => "conversation_updated",
            Self::Error(_) => "error",
            Self::Unrecognized { kind, .. } => kind,
        }
    }
}

// Most events wrap their body as `{"data": {...}}`; `error` does not.
fn unwrap_envelope(payload: serde_json::Value) -> serde_json::Value {
    match payload {
        serde_json::Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(serde_json::Value::Null)
        }
        other => other,
    }
}

fn decode<T: DeserializeOwned>(body: &serde_json::Value) -> Option<T> {
    serde_json::from_value(body.clone()).ok()
}
