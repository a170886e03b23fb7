use super::*;
use crate::core::ConnectionStatus;
use pretty_assertions::assert_eq;
use std::cell::Cell;
use std::cell::RefCell;

fn recording_exchange() -> (ExchangeHandle, Rc<RefCell<Vec<ExchangeEnvelope>>>) {
    let emitted = Rc::new(RefCell::new(Vec::new()));
    let sink = emitted.clone();
    let handle = ExchangeHandle::new(
        "e1",
        Some(StartExchangePayload { metadata: None }),
        Rc::new(move |env: ExchangeEnvelope| sink.borrow_mut().push(env)),
        ManagerSinks::new(),
        Rc::new(Cell::new(ConnectionStatus::Connected)),
    );
    (handle, emitted)
}

#[test]
fn start_message_creates_a_child_and_emits_a_wrapped_envelope() {
    let (exchange, emitted) = recording_exchange();
    let message = exchange.start_message("m1", Role::User).unwrap();

    assert_eq!(message.id(), "m1");
    assert_eq!(message.role().unwrap(), Role::User);
    assert_eq!(emitted.borrow().len(), 1);
    assert!(matches!(emitted.borrow()[0].payload, ExchangePayload::Message(_)));
}

#[test]
fn inbound_start_message_fires_on_message_start() {
    let (exchange, _emitted) = recording_exchange();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_clone = seen.clone();
    exchange.on_message_start(move |m| seen_clone.borrow_mut().push(m.id()));

    exchange.dispatch(ExchangePayload::Message(MessageEnvelope {
        message_id: "m1".to_string(),
        payload: MessagePayload::StartMessage(StartMessagePayload { role: Role::Assistant }),
    }));

    assert_eq!(*seen.borrow(), vec!["m1".to_string()]);
    assert!(exchange.message("m1").is_some());
}

#[test]
fn end_message_removes_it_from_the_children_map() {
    let (exchange, _emitted) = recording_exchange();
    exchange.start_message("m1", Role::User).unwrap();
    assert!(exchange.message("m1").is_some());

    exchange.dispatch(ExchangePayload::Message(MessageEnvelope {
        message_id: "m1".to_string(),
        payload: MessagePayload::EndMessage(LifecycleMarker::default()),
    }));

    assert!(exchange.message("m1").is_none());
}

#[test]
fn send_end_exchange_marks_ended_deletes_then_emits() {
    let (exchange, emitted) = recording_exchange();
    let deleted = Rc::new(RefCell::new(false));
    let deleted_clone = deleted.clone();
    exchange.on_deleted(move |_| *deleted_clone.borrow_mut() = true);

    exchange.send_end_exchange().unwrap();

    assert!(exchange.ended());
    assert!(exchange.deleted());
    assert!(*deleted.borrow());
    assert_eq!(emitted.borrow().len(), 1);
}

#[test]
fn deleting_exchange_cascades_to_open_messages() {
    let (exchange, _emitted) = recording_exchange();
    let message = exchange.start_message("m1", Role::User).unwrap();
    let message_deleted = Rc::new(RefCell::new(false));
    let message_deleted_clone = message_deleted.clone();
    message.on_deleted(move |_| *message_deleted_clone.borrow_mut() = true);

    exchange.send_end_exchange().unwrap();

    assert!(*message_deleted.borrow());
}

#[test]
fn send_after_end_is_an_invalid_operation() {
    let (exchange, _emitted) = recording_exchange();
    exchange.send_end_exchange().unwrap();

    let err = exchange.send_meta_event(Value::from(1)).unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidOperation { .. }));
}

#[test]
fn send_fails_while_the_owning_sessions_transport_is_disconnected() {
    let status = Rc::new(Cell::new(ConnectionStatus::Connected));
    let exchange = ExchangeHandle::new(
        "e1",
        Some(StartExchangePayload { metadata: None }),
        Rc::new(|_: ExchangeEnvelope| {}),
        ManagerSinks::new(),
        status.clone(),
    );

    status.set(ConnectionStatus::Disconnected);
    let err = exchange.send_meta_event(Value::from(1)).unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidOperation { .. }));

    status.set(ConnectionStatus::Connected);
    assert!(exchange.send_meta_event(Value::from(1)).is_ok());
}

#[test]
fn pause_buffers_and_resume_drains_in_order() {
    let (exchange, _emitted) = recording_exchange();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_clone = seen.clone();
    exchange.on_meta_event(move |v| seen_clone.borrow_mut().push(v.clone()));

    exchange.pause();
    exchange.dispatch(ExchangePayload::MetaEvent(Value::from(1)));
    exchange.dispatch(ExchangePayload::MetaEvent(Value::from(2)));
    assert!(seen.borrow().is_empty());

    exchange.resume();
    assert_eq!(*seen.borrow(), vec![Value::from(1), Value::from(2)]);
}

#[test]
fn error_start_then_end_clears_has_error() {
    let (exchange, _emitted) = recording_exchange();
    exchange.dispatch(ExchangePayload::ExchangeError(ErrorEnvelope::StartError(ErrorEvent {
        error_id: "e1".to_string(),
        message: "bad".to_string(),
        code: None,
        details: None,
    })));
    assert!(exchange.has_error());

    exchange.dispatch(ExchangePayload::ExchangeError(ErrorEnvelope::EndError(ErrorEndEvent {
        error_id: "e1".to_string(),
    })));
    assert!(!exchange.has_error());
}
