use super::*;
use crate::core::ConnectionStatus;
use pretty_assertions::assert_eq;
use std::cell::Cell;
use std::cell::RefCell;

fn recording_message() -> (MessageHandle, Rc<RefCell<Vec<MessageEnvelope>>>) {
    let emitted = Rc::new(RefCell::new(Vec::new()));
    let sink = emitted.clone();
    let handle = MessageHandle::new(
        "m1",
        Some(StartMessagePayload { role: Role::User }),
        Rc::new(move |env: MessageEnvelope| sink.borrow_mut().push(env)),
        ManagerSinks::new(),
        Rc::new(Cell::new(ConnectionStatus::Connected)),
    );
    (handle, emitted)
}

#[test]
fn role_reads_from_the_start_event() {
    let (message, _emitted) = recording_message();
    assert_eq!(message.role().unwrap(), Role::User);
}

#[test]
fn start_tool_call_creates_a_child_and_emits_a_wrapped_envelope() {
    let (message, emitted) = recording_message();
    let tool_call = message.start_tool_call("tc1", "search", None).unwrap();

    assert_eq!(tool_call.id(), "tc1");
    assert_eq!(emitted.borrow().len(), 1);
    assert!(matches!(emitted.borrow()[0].payload, MessagePayload::ToolCall(_)));
}

#[test]
fn inbound_start_tool_call_fires_on_tool_call_start() {
    let (message, _emitted) = recording_message();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_clone = seen.clone();
    message.on_tool_call_start(move |tc| seen_clone.borrow_mut().push(tc.id()));

    message.dispatch(MessagePayload::ToolCall(ToolCallEnvelope {
        tool_call_id: "tc1".to_string(),
        payload: ToolCallPayload::StartToolCall(StartToolCallPayload {
            tool_name: "search".to_string(),
            input: None,
        }),
    }));

    assert_eq!(*seen.borrow(), vec!["tc1".to_string()]);
    assert!(message.tool_call("tc1").is_some());
}

#[test]
fn end_tool_call_removes_it_from_the_children_map() {
    let (message, _emitted) = recording_message();
    message.start_tool_call("tc1", "search", None).unwrap();
    let tool_call = message.tool_call("tc1").unwrap();

    message.dispatch(MessagePayload::ToolCall(ToolCallEnvelope {
        tool_call_id: "tc1".to_string(),
        payload: ToolCallPayload::EndToolCall(EndToolCallPayload::default()),
    }));

    assert!(tool_call.ended());
    assert!(message.tool_call("tc1").is_none());
}

#[test]
fn end_message_cascades_to_open_tool_calls() {
    let (message, _emitted) = recording_message();
    let tool_call = message.start_tool_call("tc1", "search", None).unwrap();
    let tool_call_deleted = Rc::new(RefCell::new(false));
    let tool_call_deleted_clone = tool_call_deleted.clone();
    tool_call.on_deleted(move |_| *tool_call_deleted_clone.borrow_mut() = true);

    message.send_end_message().unwrap();

    assert!(*tool_call_deleted.borrow());
}

#[test]
fn content_part_dispatch_fires_on_content_part_without_creating_a_child() {
    let (message, _emitted) = recording_message();
    let seen = Rc::new(RefCell::new(None));
    let seen_clone = seen.clone();
    message.on_content_part(move |part| *seen_clone.borrow_mut() = Some(part.id.clone()));

    message.dispatch(MessagePayload::ContentPart(ContentPartEvent {
        id: "cp1".to_string(),
        mime_type: "text/plain".to_string(),
        data: duplex_protocol::ContentData::Inline { inline: "hi".to_string() },
        citations: Vec::new(),
        is_transcript: None,
        is_incomplete: None,
        name: None,
        created_time: chrono::Utc::now(),
        updated_time: chrono::Utc::now(),
    }));

    assert_eq!(seen.borrow().as_deref(), Some("cp1"));
}

#[test]
fn send_fails_while_the_owning_sessions_transport_is_disconnected() {
    let status = Rc::new(Cell::new(ConnectionStatus::Connected));
    let message = MessageHandle::new(
        "m1",
        Some(StartMessagePayload { role: Role::User }),
        Rc::new(|_: MessageEnvelope| {}),
        ManagerSinks::new(),
        status.clone(),
    );

    status.set(ConnectionStatus::Disconnected);
    let err = message.send_meta_event(Value::from(1)).unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidOperation { .. }));

    status.set(ConnectionStatus::Connected);
    assert!(message.send_meta_event(Value::from(1)).is_ok());
}
