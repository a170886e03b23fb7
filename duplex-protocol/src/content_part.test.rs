use super::*;
use pretty_assertions::assert_eq;

fn sample(data: ContentData) -> ContentPart {
    let now = DateTime::<Utc>::from_timestamp(0, 0).unwrap();
    ContentPart {
        id: "cp1".to_string(),
        mime_type: "text/plain".to_string(),
        data,
        citations: Vec::new(),
        is_transcript: None,
        is_incomplete: None,
        name: None,
        created_time: now,
        updated_time: now,
    }
}

#[test]
fn inline_content_round_trips() {
    let part = sample(ContentData::Inline {
        inline: "hi".to_string(),
    });
    let json = serde_json::to_value(&part).unwrap();
    assert_eq!(json["data"], serde_json::json!({"inline": "hi"}));
    let back: ContentPart = serde_json::from_value(json).unwrap();
    assert_eq!(back, part);
}

#[test]
fn external_content_round_trips_with_byte_count() {
    let part = sample(ContentData::External {
        uri: "https://example.com/a".to_string(),
        byte_count: Some(42),
    });
    let json = serde_json::to_value(&part).unwrap();
    assert_eq!(
        json["data"],
        serde_json::json!({"uri": "https://example.com/a", "byteCount": 42})
    );
    let back: ContentPart = serde_json::from_value(json).unwrap();
    assert_eq!(back, part);
}

#[tokio::test]
async fn get_data_resolves_inline_without_calling_fetcher() {
    let part = sample(ContentData::Inline {
        inline: "hi".to_string(),
    });
    let result = part
        .get_data(|_uri: &str| async { Err::<Vec<u8>, String>("should not be called".into()) })
        .await
        .unwrap();
    assert_eq!(result, ResolvedContent::Inline("hi".to_string()));
}

#[tokio::test]
async fn get_data_fetches_external_uri() {
    let part = sample(ContentData::External {
        uri: "https://example.com/a".to_string(),
        byte_count: None,
    });
    let result = part
        .get_data(|uri: &str| {
            let uri = uri.to_string();
            async move { Ok::<Vec<u8>, String>(uri.into_bytes()) }
        })
        .await
        .unwrap();
    assert_eq!(
        result,
        ResolvedContent::Fetched(b"https://example.com/a".to_vec())
    );
}
