use super::*;
use chrono::DateTime;
use pretty_assertions::assert_eq;

#[test]
fn start_session_serializes_with_flattened_opts() {
    let env = ConversationEnvelope {
        conversation_id: "c1".to_string(),
        payload: ConversationPayload::StartSession(StartSessionPayload {
            opts: Some(serde_json::json!({"title": "hi"})),
        }),
    };
    let json = serde_json::to_value(&env).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "conversationId": "c1",
            "startSession": {"opts": {"title": "hi"}},
        })
    );
}

#[test]
fn nested_exchange_message_content_part_round_trips() {
    let now = DateTime::<chrono::Utc>::from_timestamp(0, 0).unwrap();
    let env = ConversationEnvelope {
        conversation_id: "c1".to_string(),
        payload: ConversationPayload::Exchange(ExchangeEnvelope {
            exchange_id: "e1".to_string(),
            payload: ExchangePayload::Message(MessageEnvelope {
                message_id: "m1".to_string(),
                payload: MessagePayload::ContentPart(ContentPart {
                    id: "cp1".to_string(),
                    mime_type: "text/plain".to_string(),
                    data: ContentData::Inline {
                        inline: "hi".to_string(),
                    },
                    citations: Vec::new(),
                    is_transcript: None,
                    is_incomplete: None,
                    name: None,
                    created_time: now,
                    updated_time: now,
                }),
            }),
        }),
    };

    let json = serde_json::to_value(&env).unwrap();
    assert_eq!(json["conversationId"], "c1");
    assert_eq!(json["exchange"]["exchangeId"], "e1");
    assert_eq!(json["exchange"]["message"]["messageId"], "m1");
    assert_eq!(
        json["exchange"]["message"]["contentPart"]["contentPartId"],
        "cp1"
    );
    assert_eq!(
        json["exchange"]["message"]["contentPart"]["data"],
        serde_json::json!({"inline": "hi"})
    );

    let back: ConversationEnvelope = serde_json::from_value(json).unwrap();
    assert_eq!(back, env);
}

#[test]
fn end_tool_call_carries_output_and_flags() {
    let env = ToolCallEnvelope {
        tool_call_id: "tc1".to_string(),
        payload: ToolCallPayload::EndToolCall(EndToolCallPayload {
            output: Some(serde_json::json!("done")),
            is_error: false,
            cancelled: false,
        }),
    };
    let json = serde_json::to_value(&env).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "toolCallId": "tc1",
            "endToolCall": {"output": "done", "isError": false, "cancelled": false},
        })
    );
    let back: ToolCallEnvelope = serde_json::from_value(json).unwrap();
    assert_eq!(back, env);
}

#[test]
fn meta_event_is_opaque_json_at_every_level() {
    let env = ConversationEnvelope {
        conversation_id: "c1".to_string(),
        payload: ConversationPayload::MetaEvent(serde_json::json!({"anything": [1, 2, 3]})),
    };
    let json = serde_json::to_value(&env).unwrap();
    assert_eq!(json["metaEvent"], serde_json::json!({"anything": [1, 2, 3]}));
}

#[test]
fn async_tool_call_reuses_the_message_scoped_tool_call_shape() {
    let env = ConversationEnvelope {
        conversation_id: "c1".to_string(),
        payload: ConversationPayload::AsyncToolCall(ToolCallEnvelope {
            tool_call_id: "atc1".to_string(),
            payload: ToolCallPayload::StartToolCall(StartToolCallPayload {
                tool_name: "search".to_string(),
                input: None,
            }),
        }),
    };
    let json = serde_json::to_value(&env).unwrap();
    assert_eq!(
        json["asyncToolCall"]["startToolCall"]["toolName"],
        "search"
    );
}
