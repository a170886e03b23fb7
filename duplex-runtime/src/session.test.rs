use super::*;
use duplex_protocol::Role;
use pretty_assertions::assert_eq;
use std::cell::RefCell;

fn recording_session() -> (SessionHandle, Rc<RefCell<Vec<ConversationEnvelope>>>) {
    let (session, emitted, _ended) = recording_session_with_ended_flag();
    (session, emitted)
}

fn recording_session_with_ended_flag() -> (SessionHandle, Rc<RefCell<Vec<ConversationEnvelope>>>, Rc<RefCell<bool>>) {
    let emitted = Rc::new(RefCell::new(Vec::new()));
    let sink = emitted.clone();
    let ended = Rc::new(RefCell::new(false));
    let ended_clone = ended.clone();
    let handle = SessionHandle::new(
        "c1",
        Some(StartSessionPayload { opts: None }),
        Rc::new(move |env: ConversationEnvelope| sink.borrow_mut().push(env)),
        ManagerSinks::new(),
        Rc::new(move || *ended_clone.borrow_mut() = true),
    );
    (handle, emitted, ended)
}

#[test]
fn start_exchange_creates_a_child_and_emits_a_wrapped_envelope() {
    let (session, emitted) = recording_session();
    let exchange = session.start_exchange("e1", None).unwrap();

    assert_eq!(exchange.id(), "e1");
    assert_eq!(emitted.borrow().len(), 1);
    assert!(matches!(emitted.borrow()[0].payload, ConversationPayload::Exchange(_)));
    assert_eq!(emitted.borrow()[0].conversation_id, "c1");
}

#[test]
fn start_async_output_stream_and_async_tool_call_are_addressed_directly_by_session() {
    let (session, _emitted) = recording_session();
    let stream = session.start_async_output_stream("s1", Some("audio/wav".to_string())).unwrap();
    let tool_call = session.start_async_tool_call("tc1", "search", None).unwrap();

    assert_eq!(stream.mime_type(), Some("audio/wav".to_string()));
    assert_eq!(tool_call.tool_name().unwrap(), "search");
    assert!(session.async_output_stream("s1").is_some());
    assert!(session.async_tool_call("tc1").is_some());
}

#[test]
fn inbound_start_exchange_fires_on_exchange_start() {
    let (session, _emitted) = recording_session();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_clone = seen.clone();
    session.on_exchange_start(move |ex| seen_clone.borrow_mut().push(ex.id()));

    session.dispatch(ConversationPayload::Exchange(duplex_protocol::ExchangeEnvelope {
        exchange_id: "e1".to_string(),
        payload: duplex_protocol::ExchangePayload::StartExchange(StartExchangePayload { metadata: None }),
    }));

    assert_eq!(*seen.borrow(), vec!["e1".to_string()]);
    assert!(session.exchange("e1").is_some());
}

#[test]
fn end_exchange_removes_it_from_the_children_map() {
    let (session, _emitted) = recording_session();
    session.start_exchange("e1", None).unwrap();

    session.dispatch(ConversationPayload::Exchange(duplex_protocol::ExchangeEnvelope {
        exchange_id: "e1".to_string(),
        payload: duplex_protocol::ExchangePayload::EndExchange(LifecycleMarker::default()),
    }));

    assert!(session.exchange("e1").is_none());
}

#[test]
fn send_end_session_marks_ended_deletes_then_emits() {
    let (session, emitted) = recording_session();
    let deleted = Rc::new(RefCell::new(false));
    let deleted_clone = deleted.clone();
    session.on_deleted(move |_| *deleted_clone.borrow_mut() = true);

    session.send_end_session().unwrap();

    assert!(session.ended());
    assert!(session.deleted());
    assert!(*deleted.borrow());
    assert_eq!(emitted.borrow().len(), 1);
}

#[test]
fn outbound_send_end_session_fires_on_ended_same_as_an_inbound_one() {
    let (session, _emitted, ended) = recording_session_with_ended_flag();
    assert!(!*ended.borrow());

    session.send_end_session().unwrap();

    assert!(*ended.borrow());
}

#[test]
fn inbound_end_session_also_fires_on_ended() {
    let (session, _emitted, ended) = recording_session_with_ended_flag();

    session.dispatch(ConversationPayload::EndSession(LifecycleMarker::default()));

    assert!(*ended.borrow());
}

#[test]
fn deleting_session_cascades_to_all_four_child_maps() {
    let (session, _emitted) = recording_session();
    let exchange = session.start_exchange("e1", None).unwrap();
    let out_stream = session.start_async_output_stream("s1", None).unwrap();
    let in_stream = session.start_async_input_stream("s2", None).unwrap();
    let tool_call = session.start_async_tool_call("tc1", "search", None).unwrap();

    let flags: Vec<Rc<RefCell<bool>>> = (0..4).map(|_| Rc::new(RefCell::new(false))).collect();
    let f = flags.clone();
    exchange.on_deleted(move |_| *f[0].borrow_mut() = true);
    let f = flags.clone();
    out_stream.on_deleted(move |_| *f[1].borrow_mut() = true);
    let f = flags.clone();
    in_stream.on_deleted(move |_| *f[2].borrow_mut() = true);
    let f = flags.clone();
    tool_call.on_deleted(move |_| *f[3].borrow_mut() = true);

    session.send_end_session().unwrap();

    assert!(flags.iter().all(|f| *f.borrow()));
}

#[test]
fn send_fails_once_connection_status_is_disconnected() {
    let (session, _emitted) = recording_session();
    session.set_connection_status(ConnectionStatus::Disconnected);

    let err = session.send_meta_event(Value::from(1)).unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidOperation { .. }));

    session.set_connection_status(ConnectionStatus::Connected);
    assert!(session.send_meta_event(Value::from(1)).is_ok());
}

#[test]
fn disconnecting_the_session_also_blocks_sends_on_every_child_helper() {
    let (session, _emitted) = recording_session();
    let exchange = session.start_exchange("e1", None).unwrap();
    let message = exchange.start_message("m1", Role::User).unwrap();
    let tool_call = message.start_tool_call("tc1", "search", None).unwrap();
    let out_stream = session.start_async_output_stream("s1", None).unwrap();
    let async_tool_call = session.start_async_tool_call("tc2", "search", None).unwrap();

    session.set_connection_status(ConnectionStatus::Disconnected);

    assert!(matches!(exchange.send_meta_event(Value::from(1)), Err(RuntimeError::InvalidOperation { .. })));
    assert!(matches!(message.send_meta_event(Value::from(1)), Err(RuntimeError::InvalidOperation { .. })));
    assert!(matches!(tool_call.send_meta_event(Value::from(1)), Err(RuntimeError::InvalidOperation { .. })));
    assert!(matches!(out_stream.send_meta_event(Value::from(1)), Err(RuntimeError::InvalidOperation { .. })));
    assert!(matches!(async_tool_call.send_meta_event(Value::from(1)), Err(RuntimeError::InvalidOperation { .. })));

    session.set_connection_status(ConnectionStatus::Connected);
    assert!(exchange.send_meta_event(Value::from(1)).is_ok());
    assert!(message.send_meta_event(Value::from(1)).is_ok());
    assert!(tool_call.send_meta_event(Value::from(1)).is_ok());
    assert!(out_stream.send_meta_event(Value::from(1)).is_ok());
    assert!(async_tool_call.send_meta_event(Value::from(1)).is_ok());
}

#[test]
fn send_after_end_is_an_invalid_operation() {
    let (session, _emitted) = recording_session();
    session.send_end_session().unwrap();

    let err = session.send_meta_event(Value::from(1)).unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidOperation { .. }));
}

#[test]
fn pause_buffers_and_resume_drains_in_order() {
    let (session, _emitted) = recording_session();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_clone = seen.clone();
    session.on_meta_event(move |v| seen_clone.borrow_mut().push(v.clone()));

    session.pause();
    session.dispatch(ConversationPayload::MetaEvent(Value::from(1)));
    session.dispatch(ConversationPayload::MetaEvent(Value::from(2)));
    assert!(seen.borrow().is_empty());

    session.resume();
    assert_eq!(*seen.borrow(), vec![Value::from(1), Value::from(2)]);
}

#[test]
fn error_start_then_end_clears_has_error() {
    let (session, _emitted) = recording_session();
    session.dispatch(ConversationPayload::SessionError(ErrorEnvelope::StartError(ErrorEvent {
        error_id: "e1".to_string(),
        message: "bad".to_string(),
        code: None,
        details: None,
    })));
    assert!(session.has_error());

    session.dispatch(ConversationPayload::SessionError(ErrorEnvelope::EndError(ErrorEndEvent {
        error_id: "e1".to_string(),
    })));
    assert!(!session.has_error());
}
