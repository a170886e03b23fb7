use super::*;
use crate::core::ConnectionStatus;
use pretty_assertions::assert_eq;
use std::cell::Cell;
use std::cell::RefCell;

fn recording_tool_call() -> (ToolCallHandle, Rc<RefCell<Vec<ToolCallEnvelope>>>) {
    let emitted = Rc::new(RefCell::new(Vec::new()));
    let sink = emitted.clone();
    let handle = ToolCallHandle::new(
        "tc1",
        Some(StartToolCallPayload {
            tool_name: "search".to_string(),
            input: None,
        }),
        Rc::new(move |env: ToolCallEnvelope| sink.borrow_mut().push(env)),
        ManagerSinks::new(),
        Rc::new(Cell::new(ConnectionStatus::Connected)),
    );
    (handle, emitted)
}

#[test]
fn send_tool_call_end_marks_ended_deletes_then_emits() {
    let (tool_call, emitted) = recording_tool_call();
    let deleted = Rc::new(RefCell::new(false));
    let deleted_clone = deleted.clone();
    tool_call.on_deleted(move |_| *deleted_clone.borrow_mut() = true);

    tool_call.send_tool_call_end(Some(Value::from("ok")), false, false).unwrap();

    assert!(tool_call.ended());
    assert!(tool_call.deleted());
    assert!(*deleted.borrow());
    assert_eq!(emitted.borrow().len(), 1);
    assert_eq!(emitted.borrow()[0].tool_call_id, "tc1");
}

#[test]
fn send_after_end_is_an_invalid_operation() {
    let (tool_call, _emitted) = recording_tool_call();
    tool_call.send_tool_call_end(None, false, false).unwrap();

    let err = tool_call.send_meta_event(Value::from(1)).unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidOperation { .. }));
}

#[test]
fn on_deleted_fires_exactly_once() {
    let (tool_call, _emitted) = recording_tool_call();
    let count = Rc::new(RefCell::new(0));
    let count_clone = count.clone();
    tool_call.on_deleted(move |_| *count_clone.borrow_mut() += 1);

    tool_call.dispatch(ToolCallPayload::EndToolCall(EndToolCallPayload::default()));
    // A stray second end dispatched after deletion must not re-fire onDeleted.
    tool_call.dispatch(ToolCallPayload::MetaEvent(Value::Null));

    assert_eq!(*count.borrow(), 1);
}

#[test]
fn error_start_then_end_clears_has_error_and_fires_any_sinks() {
    let (tool_call, _emitted) = recording_tool_call();
    let sinks = tool_call.0.borrow().sinks.clone();
    let any_start = Rc::new(RefCell::new(0));
    let any_start_clone = any_start.clone();
    sinks.on_any_error_start(move |_| *any_start_clone.borrow_mut() += 1);
    let local_start = Rc::new(RefCell::new(0));
    let local_start_clone = local_start.clone();
    tool_call.on_error_start(move |_| *local_start_clone.borrow_mut() += 1);

    tool_call.dispatch(ToolCallPayload::ToolCallError(ErrorEnvelope::StartError(ErrorEvent {
        error_id: "e1".to_string(),
        message: "bad".to_string(),
        code: None,
        details: None,
    })));
    assert!(tool_call.has_error());
    assert_eq!(*any_start.borrow(), 1);
    assert_eq!(*local_start.borrow(), 1);

    tool_call.dispatch(ToolCallPayload::ToolCallError(ErrorEnvelope::EndError(ErrorEndEvent {
        error_id: "e1".to_string(),
    })));
    assert!(!tool_call.has_error());
}

#[test]
fn pause_buffers_and_resume_drains_in_order() {
    let (tool_call, _emitted) = recording_tool_call();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_clone = seen.clone();
    tool_call.on_meta_event(move |v| seen_clone.borrow_mut().push(v.clone()));

    tool_call.pause();
    tool_call.dispatch(ToolCallPayload::MetaEvent(Value::from(1)));
    tool_call.dispatch(ToolCallPayload::MetaEvent(Value::from(2)));
    assert!(seen.borrow().is_empty());

    tool_call.resume();
    assert_eq!(*seen.borrow(), vec![Value::from(1), Value::from(2)]);
}

#[test]
fn send_fails_while_the_owning_sessions_transport_is_disconnected() {
    let status = Rc::new(Cell::new(ConnectionStatus::Connected));
    let tool_call = ToolCallHandle::new(
        "tc1",
        Some(StartToolCallPayload {
            tool_name: "search".to_string(),
            input: None,
        }),
        Rc::new(|_: ToolCallEnvelope| {}),
        ManagerSinks::new(),
        status.clone(),
    );

    status.set(ConnectionStatus::Disconnected);
    let err = tool_call.send_meta_event(Value::from(1)).unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidOperation { .. }));

    status.set(ConnectionStatus::Connected);
    assert!(tool_call.send_meta_event(Value::from(1)).is_ok());
}
