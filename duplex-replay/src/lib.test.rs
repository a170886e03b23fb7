use super::*;
use duplex_protocol::ContentData;
use duplex_protocol::ContentPart;
use duplex_protocol::Role;
use duplex_runtime::Manager;
use pretty_assertions::assert_eq;
use std::rc::Rc;

fn content_part(id: &str) -> ContentPart {
    let now = chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().into();
    ContentPart {
        id: id.to_string(),
        mime_type: "text/plain".to_string(),
        data: ContentData::Inline { inline: "hi".to_string() },
        citations: Vec::new(),
        is_transcript: None,
        is_incomplete: None,
        name: None,
        created_time: now,
        updated_time: now,
    }
}

/// Scenario E: one exchange with one assistant message with one completed
/// tool call, and the exchange itself still open (no `endExchange`).
fn scenario_e_snapshot() -> ConversationSnapshot {
    ConversationSnapshot {
        conversation_id: "c1".to_string(),
        exchanges: vec![ExchangeRecord {
            exchange_id: "e1".to_string(),
            ended: false,
            metadata: None,
            messages: vec![MessageRecord {
                message_id: "m1".to_string(),
                role: Role::Assistant,
                ended: true,
                content_parts: vec![content_part("cp1")],
                tool_calls: vec![ToolCallRecord {
                    tool_call_id: "tc1".to_string(),
                    tool_name: "search".to_string(),
                    input: None,
                    ended: true,
                    output: None,
                    is_error: false,
                    cancelled: false,
                }],
            }],
        }],
    }
}

#[test]
fn scenario_e_yields_start_then_message_then_tool_call_pair_then_end_message_no_end_exchange() {
    let snapshot = scenario_e_snapshot();
    let envelopes = conversation(&snapshot);

    let kinds: Vec<&str> = envelopes
        .iter()
        .map(|env| match &env.payload {
            ConversationPayload::Exchange(ex) => match &ex.payload {
                ExchangePayload::StartExchange(_) => "startExchange",
                ExchangePayload::EndExchange(_) => "endExchange",
                ExchangePayload::Message(msg) => match &msg.payload {
                    MessagePayload::StartMessage(_) => "startMessage",
                    MessagePayload::EndMessage(_) => "endMessage",
                    MessagePayload::ContentPart(_) => "contentPart",
                    MessagePayload::ToolCall(tc) => match &tc.payload {
                        ToolCallPayload::StartToolCall(_) => "startToolCall",
                        ToolCallPayload::EndToolCall(_) => "endToolCall",
                        _ => "other",
                    },
                    _ => "other",
                },
                _ => "other",
            },
            _ => "other",
        })
        .collect();

    assert_eq!(
        kinds,
        vec!["startExchange", "startMessage", "contentPart", "startToolCall", "endToolCall", "endMessage"]
    );
}

#[test]
fn scenario_e_dispatched_into_a_fresh_session_matches_the_live_shape() {
    let snapshot = scenario_e_snapshot();
    let manager = Manager::new(Rc::new(|_| {}));
    let session = manager.ensure_session(snapshot.conversation_id.clone());

    for envelope in conversation(&snapshot) {
        manager.dispatch(envelope);
    }

    let exchange = session.exchange("e1").unwrap();
    assert!(!exchange.ended());
    assert!(exchange.start_event().is_ok());

    // The message ended, so it was removed from the exchange's children
    // map as part of normal dispatch — observably identical to the live
    // path, where an ended Message is likewise dropped from its parent.
    assert!(exchange.message("m1").is_none());
}

#[test]
fn exchange_without_end_in_record_omits_end_exchange_envelope() {
    let record = ExchangeRecord {
        exchange_id: "e1".to_string(),
        ended: false,
        metadata: None,
        messages: Vec::new(),
    };

    let envelopes = exchange(&record);
    assert!(!envelopes.iter().any(|e| matches!(e.payload, ExchangePayload::EndExchange(_))));
}

#[test]
fn tool_call_without_end_in_record_omits_end_tool_call_envelope() {
    let record = ToolCallRecord {
        tool_call_id: "tc1".to_string(),
        tool_name: "search".to_string(),
        input: None,
        ended: false,
        output: None,
        is_error: false,
        cancelled: false,
    };

    let payloads = tool_call(&record);
    assert_eq!(payloads.len(), 1);
    assert!(matches!(payloads[0], ToolCallPayload::StartToolCall(_)));
}
