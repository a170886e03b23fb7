//! Historical-record types consumed by `duplex-replay`.
//!
//! These mirror the shape the REST service façade's `getById` returns: a
//! conversation snapshot with its past exchanges, messages, tool calls
//! and content parts, each carrying an `ended` flag for entities that
//! never received a closing event before the snapshot was taken.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::content_part::ContentPart;
use crate::role::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSnapshot {
    pub conversation_id: String,
    #[serde(default)]
    pub exchanges: Vec<ExchangeRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRecord {
    pub exchange_id: String,
    #[serde(default)]
    pub ended: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub messages: Vec<MessageRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub message_id: String,
    pub role: Role,
    #[serde(default)]
    pub ended: bool,
    #[serde(default)]
    pub content_parts: Vec<ContentPart>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallRecord {
    pub tool_call_id: String,
    pub tool_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(default)]
    pub ended: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default)]
    pub cancelled: bool,
}

#[cfg(test)]
#[path = "history.test.rs"]
mod tests;
