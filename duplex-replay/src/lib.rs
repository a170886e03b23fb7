//! Replay (spec §4.8): turns a historical [`ConversationSnapshot`] fetched
//! over REST into the exact envelope sequence that would have produced it
//! live, so a freshly-constructed Helper tree can rehydrate without ever
//! touching the transport.
//!
//! Static, per-entity functions, one level of the envelope nesting at a
//! time — mirroring the recursive `dispatch` on the runtime side (spec
//! §9 "Recursive envelope unwrapping"). [`conversation`] is the only
//! entry point most callers need; the narrower functions exist so tests
//! (and scenario E in the design) can assert on one entity's sequence in
//! isolation.

use duplex_protocol::ConversationEnvelope;
use duplex_protocol::ConversationPayload;
use duplex_protocol::ConversationSnapshot;
use duplex_protocol::EndToolCallPayload;
use duplex_protocol::ExchangeEnvelope;
use duplex_protocol::ExchangePayload;
use duplex_protocol::ExchangeRecord;
use duplex_protocol::LifecycleMarker;
use duplex_protocol::MessageEnvelope;
use duplex_protocol::MessagePayload;
use duplex_protocol::MessageRecord;
use duplex_protocol::StartExchangePayload;
use duplex_protocol::StartMessagePayload;
use duplex_protocol::StartToolCallPayload;
use duplex_protocol::ToolCallEnvelope;
use duplex_protocol::ToolCallPayload;
use duplex_protocol::ToolCallRecord;

/// Yields the full sequence of envelopes for a conversation snapshot, in
/// the order a fresh [`duplex_runtime::Manager`] expects to receive them
/// once its Session has already been seeded (e.g. via
/// `Manager::ensure_session`) — no `startSession`/`endSession` markers
/// are yielded here, since replay reconstructs a Session's *children*,
/// not the Session lifecycle itself.
pub fn conversation(snapshot: &ConversationSnapshot) -> Vec<ConversationEnvelope> {
    snapshot
        .exchanges
        .iter()
        .flat_map(|record| exchange(record))
        .map(|payload| ConversationEnvelope {
            conversation_id: snapshot.conversation_id.clone(),
            payload: ConversationPayload::Exchange(payload),
        })
        .collect()
}

/// One exchange's envelopes: `startExchange`, then every message's
/// envelopes in recorded order, then `endExchange` only if the record
/// says the exchange completed (spec §4.8, scenario E: "no `endExchange`
/// if the entity was not completed in the record").
pub fn exchange(record: &ExchangeRecord) -> Vec<ExchangeEnvelope> {
    let mut out = Vec::new();
    out.push(ExchangeEnvelope {
        exchange_id: record.exchange_id.clone(),
        payload: ExchangePayload::StartExchange(StartExchangePayload {
            metadata: record.metadata.clone(),
        }),
    });
    for message_record in &record.messages {
        for payload in message(message_record) {
            out.push(ExchangeEnvelope {
                exchange_id: record.exchange_id.clone(),
                payload: ExchangePayload::Message(MessageEnvelope {
                    message_id: message_record.message_id.clone(),
                    payload,
                }),
            });
        }
    }
    if record.ended {
        out.push(ExchangeEnvelope {
            exchange_id: record.exchange_id.clone(),
            payload: ExchangePayload::EndExchange(LifecycleMarker::default()),
        });
    }
    out
}

/// One message's envelopes: `startMessage`, its content parts in
/// recorded order, each tool call's `startToolCall`/`endToolCall` pair,
/// then `endMessage` if completed.
pub fn message(record: &MessageRecord) -> Vec<MessagePayload> {
    let mut out = Vec::new();
    out.push(MessagePayload::StartMessage(StartMessagePayload { role: record.role }));
    for part in &record.content_parts {
        out.push(MessagePayload::ContentPart(part.clone()));
    }
    for tool_call_record in &record.tool_calls {
        for payload in tool_call(tool_call_record) {
            out.push(MessagePayload::ToolCall(ToolCallEnvelope {
                tool_call_id: tool_call_record.tool_call_id.clone(),
                payload,
            }));
        }
    }
    if record.ended {
        out.push(MessagePayload::EndMessage(LifecycleMarker::default()));
    }
    out
}

/// One tool call's envelopes: `startToolCall`, then `endToolCall` only
/// if the record says it completed.
pub fn tool_call(record: &ToolCallRecord) -> Vec<ToolCallPayload> {
    let mut out = vec![ToolCallPayload::StartToolCall(StartToolCallPayload {
        tool_name: record.tool_name.clone(),
        input: record.input.clone(),
    })];
    if record.ended {
        out.push(ToolCallPayload::EndToolCall(EndToolCallPayload {
            output: record.output.clone(),
            is_error: record.is_error,
            cancelled: record.cancelled,
        }));
    }
    out
}

#[cfg(test)]
#[path = "lib.test.rs"]
mod tests;
