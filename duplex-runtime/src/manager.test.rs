use super::*;
use duplex_protocol::ExchangeEnvelope;
use duplex_protocol::ExchangePayload;
use duplex_protocol::StartExchangePayload;
use duplex_protocol::StartSessionPayload;
use pretty_assertions::assert_eq;
use std::cell::RefCell;

fn recording_manager() -> (Manager, Rc<RefCell<Vec<ConversationEnvelope>>>) {
    let emitted = Rc::new(RefCell::new(Vec::new()));
    let sink = emitted.clone();
    let manager = Manager::new(Rc::new(move |env: ConversationEnvelope| sink.borrow_mut().push(env)));
    (manager, emitted)
}

#[test]
fn start_session_registers_it_and_emits_start_session() {
    let (manager, emitted) = recording_manager();
    let session = manager.start_session("c1", None).unwrap();

    assert_eq!(session.id(), "c1");
    assert_eq!(manager.active_count(), 1);
    assert_eq!(emitted.borrow().len(), 1);
    assert!(matches!(emitted.borrow()[0].payload, ConversationPayload::StartSession(_)));
}

#[test]
fn start_session_twice_for_the_same_conversation_is_an_invalid_operation() {
    let (manager, _emitted) = recording_manager();
    manager.start_session("c1", None).unwrap();

    let err = manager.start_session("c1", None).unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidOperation { .. }));
}

#[test]
fn dispatch_creates_a_session_for_an_unknown_conversation_on_start_session() {
    let (manager, _emitted) = recording_manager();

    manager.dispatch(ConversationEnvelope {
        conversation_id: "c1".to_string(),
        payload: ConversationPayload::StartSession(StartSessionPayload { opts: None }),
    });

    assert!(manager.session("c1").is_some());
    assert_eq!(manager.active_count(), 1);
}

#[test]
fn dispatch_routes_to_unhandled_sink_for_unknown_conversation() {
    let (manager, _emitted) = recording_manager();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_clone = seen.clone();
    manager.on_unhandled_envelope(move |env| seen_clone.borrow_mut().push(env.conversation_id.clone()));

    manager.dispatch(ConversationEnvelope {
        conversation_id: "ghost".to_string(),
        payload: ConversationPayload::MetaEvent(Value::from(1)),
    });

    assert_eq!(*seen.borrow(), vec!["ghost".to_string()]);
    assert!(manager.session("ghost").is_none());
}

#[test]
fn dispatch_forwards_nested_envelopes_into_the_matching_session() {
    let (manager, _emitted) = recording_manager();
    manager.start_session("c1", None).unwrap();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_clone = seen.clone();
    manager.session("c1").unwrap().on_exchange_start(move |ex| seen_clone.borrow_mut().push(ex.id()));

    manager.dispatch(ConversationEnvelope {
        conversation_id: "c1".to_string(),
        payload: ConversationPayload::Exchange(ExchangeEnvelope {
            exchange_id: "e1".to_string(),
            payload: ExchangePayload::StartExchange(StartExchangePayload { metadata: None }),
        }),
    });

    assert_eq!(*seen.borrow(), vec!["e1".to_string()]);
}

#[test]
fn end_session_unregisters_the_session_from_the_manager() {
    let (manager, _emitted) = recording_manager();
    manager.start_session("c1", None).unwrap();
    assert_eq!(manager.active_count(), 1);

    manager.dispatch(ConversationEnvelope {
        conversation_id: "c1".to_string(),
        payload: ConversationPayload::EndSession(duplex_protocol::LifecycleMarker::default()),
    });

    assert_eq!(manager.active_count(), 0);
    assert!(manager.session("c1").is_none());
}

#[test]
fn any_error_start_fires_regardless_of_a_local_handler() {
    let (manager, _emitted) = recording_manager();
    manager.start_session("c1", None).unwrap();
    let any_count = Rc::new(RefCell::new(0));
    let any_clone = any_count.clone();
    manager.on_any_error_start(move |_| *any_clone.borrow_mut() += 1);

    manager.dispatch(ConversationEnvelope {
        conversation_id: "c1".to_string(),
        payload: ConversationPayload::SessionError(duplex_protocol::ErrorEnvelope::StartError(ErrorEvent {
            error_id: "e1".to_string(),
            message: "bad".to_string(),
            code: None,
            details: None,
        })),
    });

    assert_eq!(*any_count.borrow(), 1);
}

#[test]
fn unhandled_error_start_fires_only_when_no_local_handler_is_registered() {
    let (manager, _emitted) = recording_manager();
    manager.start_session("c1", None).unwrap();
    let unhandled_count = Rc::new(RefCell::new(0));
    let unhandled_clone = unhandled_count.clone();
    manager.on_unhandled_error_start(move |_| *unhandled_clone.borrow_mut() += 1);

    manager.dispatch(ConversationEnvelope {
        conversation_id: "c1".to_string(),
        payload: ConversationPayload::SessionError(duplex_protocol::ErrorEnvelope::StartError(ErrorEvent {
            error_id: "e2".to_string(),
            message: "bad".to_string(),
            code: None,
            details: None,
        })),
    });

    assert_eq!(*unhandled_count.borrow(), 1);
    assert!(manager.session("c1").unwrap().has_error());
}
