//! The recursively nested envelope model (spec §3).
//!
//! Every level is a struct carrying exactly one identifier field plus a
//! flattened payload enum whose variant name becomes the wire key
//! (`#[serde(flatten)]` over an externally-tagged enum renamed
//! `camelCase`), so `ConversationEnvelope { conversation_id: "c1",
//! payload: Exchange(..) }` serializes as
//! `{"conversationId": "c1", "exchange": {...}}` — the exact shape spec
//! §3 describes.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::content_part::ContentPart;
use crate::error_event::ErrorEnvelope;
use crate::role::Role;

/// A marker payload with no fields of its own — `endExchange`,
/// `endMessage`, `endSession`, `endToolCall`, `endStream` all serialize
/// this way. Presence of the key is the entire signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleMarker {}

// ---------------------------------------------------------------------
// Top level: ConversationEnvelope
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationEnvelope {
    pub conversation_id: String,
    #[serde(flatten)]
    pub payload: ConversationPayload,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opts: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConversationPayload {
    SessionError(ErrorEnvelope),
    Exchange(ExchangeEnvelope),
    AsyncOutputStream(StreamEnvelope),
    AsyncInputStream(StreamEnvelope),
    AsyncToolCall(ToolCallEnvelope),
    MetaEvent(Value),
    StartSession(StartSessionPayload),
    EndSession(LifecycleMarker),
}

// ---------------------------------------------------------------------
// Exchange level
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeEnvelope {
    pub exchange_id: String,
    #[serde(flatten)]
    pub payload: ExchangePayload,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartExchangePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExchangePayload {
    StartExchange(StartExchangePayload),
    EndExchange(LifecycleMarker),
    Message(MessageEnvelope),
    ExchangeError(ErrorEnvelope),
    MetaEvent(Value),
}

// ---------------------------------------------------------------------
// Message level
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEnvelope {
    pub message_id: String,
    #[serde(flatten)]
    pub payload: MessagePayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartMessagePayload {
    pub role: Role,
}

/// The `contentPart` event dispatched to a message is the full
/// [`ContentPart`] value object — it has no separate "start" shape
/// because content parts are immutable leaves, not Helpers.
pub type ContentPartEvent = ContentPart;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessagePayload {
    StartMessage(StartMessagePayload),
    EndMessage(LifecycleMarker),
    ToolCall(ToolCallEnvelope),
    ContentPart(ContentPartEvent),
    MessageError(ErrorEnvelope),
    MetaEvent(Value),
}

// ---------------------------------------------------------------------
// ToolCall level (nested in Message, and reused verbatim for the
// Session-scoped `asyncToolCall` variant — same shape, different parent).
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallEnvelope {
    pub tool_call_id: String,
    #[serde(flatten)]
    pub payload: ToolCallPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartToolCallPayload {
    pub tool_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndToolCallPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default)]
    pub cancelled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolCallPayload {
    StartToolCall(StartToolCallPayload),
    EndToolCall(EndToolCallPayload),
    ToolCallError(ErrorEnvelope),
    MetaEvent(Value),
}

// ---------------------------------------------------------------------
// Async stream level (Session-scoped output/input streams)
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamEnvelope {
    pub stream_id: String,
    #[serde(flatten)]
    pub payload: StreamPayload,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartStreamPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamChunkPayload {
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StreamPayload {
    StartStream(StartStreamPayload),
    EndStream(LifecycleMarker),
    Chunk(StreamChunkPayload),
    StreamError(ErrorEnvelope),
    MetaEvent(Value),
}

#[cfg(test)]
#[path = "envelope.test.rs"]
mod tests;
