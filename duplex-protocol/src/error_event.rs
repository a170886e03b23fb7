use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// The opening half of an error start/end pair (spec §3 "Error shape").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEvent {
    pub error_id: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// The closing half of an error start/end pair, indicating recovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEndEvent {
    pub error_id: String,
}

/// Every `*Error` field in the envelope model (`sessionError`,
/// `exchangeError`, `messageError`, `toolCallError`, the stream
/// equivalents) carries one of these two shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorEnvelope {
    StartError(ErrorEvent),
    EndError(ErrorEndEvent),
}

impl ErrorEnvelope {
    pub fn error_id(&self) -> &str {
        match self {
            ErrorEnvelope::StartError(e) => &e.error_id,
            ErrorEnvelope::EndError(e) => &e.error_id,
        }
    }
}

#[cfg(test)]
#[path = "error_event.test.rs"]
mod tests;
