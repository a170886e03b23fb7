use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// A single citation anchored to an offset/length span within a
/// [`ContentPart`]'s text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    #[serde(rename = "citationId")]
    pub id: String,
    pub offset: u64,
    pub length: u64,
    pub sources: Vec<String>,
}

/// Either the content is inlined in the envelope, or it lives behind a
/// URI the caller fetches on demand. Distinguished by field name rather
/// than an explicit tag, matching the wire shape in spec §4.7.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentData {
    Inline {
        inline: String,
    },
    External {
        uri: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        byte_count: Option<u64>,
    },
}

/// Immutable value object dispatched whenever a `contentPart` envelope
/// arrives for a Message. Not a Helper: it has no lifecycle, no
/// handlers, no children — it is constructed once from the dispatched
/// event and handed to `onContentPart` listeners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPart {
    #[serde(rename = "contentPartId")]
    pub id: String,
    pub mime_type: String,
    pub data: ContentData,
    #[serde(default)]
    pub citations: Vec<Citation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_transcript: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_incomplete: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub created_time: DateTime<Utc>,
    pub updated_time: DateTime<Utc>,
}

/// Resolved content: either the inline string or a fetched byte buffer.
/// Returned by `ContentPart::get_data`.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedContent {
    Inline(String),
    Fetched(Vec<u8>),
}

impl ContentPart {
    /// Resolve this part's data.
    ///
    /// Inline content resolves immediately. External content performs a
    /// `fetch` of `uri` through the supplied fetcher — the caller picks
    /// the fetcher implementation (a real HTTP client in production, a
    /// canned response in tests); this crate has no opinion on transport.
    /// No caching: a second call fetches again.
    pub async fn get_data<F, Fut, E>(&self, fetch: F) -> Result<ResolvedContent, E>
    where
        F: FnOnce(&str) -> Fut,
        Fut: std::future::Future<Output = Result<Vec<u8>, E>>,
    {
        match &self.data {
            ContentData::Inline { inline } => Ok(ResolvedContent::Inline(inline.clone())),
            ContentData::External { uri, .. } => fetch(uri).await.map(ResolvedContent::Fetched),
        }
    }
}

#[cfg(test)]
#[path = "content_part.test.rs"]
mod tests;
