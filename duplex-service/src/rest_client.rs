//! REST boundary consumed by the façade (spec §6). Out of scope for this
//! design beyond its interface — a concrete implementation is one of the
//! auto-generated REST method wrappers excluded from §1's scope.

use async_trait::async_trait;
use duplex_error::RuntimeError;
use duplex_protocol::ConversationSnapshot;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListConversationsOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConversationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedAttachment {
    pub uri: String,
    pub name: String,
    pub mime_type: String,
}

/// Boundary interface for conversation REST operations (spec §6). The
/// core session runtime never reaches into REST directly — only this
/// façade does, to back `create/get/update/delete` and to fetch the
/// historical snapshot that `duplex-replay` turns into envelopes.
#[async_trait]
pub trait ConversationRestClient: Send + Sync {
    async fn create(&self, agent_id: &str, folder_id: Option<&str>, opts: CreateConversationOptions) -> Result<ConversationSnapshot, RuntimeError>;

    async fn get_by_id(&self, id: &str) -> Result<ConversationSnapshot, RuntimeError>;

    async fn get_all(&self, opts: ListConversationsOptions) -> Result<Vec<ConversationSnapshot>, RuntimeError>;

    async fn update_by_id(&self, id: &str, patch: UpdateConversationPatch) -> Result<ConversationSnapshot, RuntimeError>;

    async fn delete_by_id(&self, id: &str) -> Result<(), RuntimeError>;

    async fn upload_attachment(&self, conversation_id: &str, file_name: &str, bytes: Vec<u8>) -> Result<UploadedAttachment, RuntimeError>;
}
