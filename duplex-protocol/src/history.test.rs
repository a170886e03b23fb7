use super::*;
use pretty_assertions::assert_eq;

#[test]
fn snapshot_defaults_missing_optional_fields() {
    let json = serde_json::json!({"conversationId": "c1"});
    let snapshot: ConversationSnapshot = serde_json::from_value(json).unwrap();
    assert_eq!(snapshot.conversation_id, "c1");
    assert!(snapshot.exchanges.is_empty());
}

#[test]
fn still_open_exchange_has_ended_false() {
    let json = serde_json::json!({
        "conversationId": "c1",
        "exchanges": [{
            "exchangeId": "e1",
            "messages": [{
                "messageId": "m1",
                "role": "assistant",
                "ended": true,
                "toolCalls": [{
                    "toolCallId": "tc1",
                    "toolName": "search",
                    "ended": true,
                    "output": "done",
                }],
            }],
        }],
    });
    let snapshot: ConversationSnapshot = serde_json::from_value(json).unwrap();
    let exchange = &snapshot.exchanges[0];
    assert!(!exchange.ended);
    assert!(exchange.messages[0].ended);
    assert!(exchange.messages[0].tool_calls[0].ended);
}
