use super::*;
use crate::core::ConnectionStatus;
use pretty_assertions::assert_eq;
use std::cell::Cell;
use std::cell::RefCell;

fn recording_stream() -> (AsyncOutputStreamHandle, Rc<RefCell<Vec<StreamEnvelope>>>) {
    let emitted = Rc::new(RefCell::new(Vec::new()));
    let sink = emitted.clone();
    let handle = AsyncOutputStreamHandle::new(
        "s1",
        Some(StartStreamPayload {
            mime_type: Some("audio/pcm".to_string()),
        }),
        Rc::new(move |env: StreamEnvelope| sink.borrow_mut().push(env)),
        ManagerSinks::new(),
        Rc::new(Cell::new(ConnectionStatus::Connected)),
    );
    (handle, emitted)
}

#[test]
fn send_chunk_then_end_emits_in_order() {
    let (stream, emitted) = recording_stream();
    stream.send_chunk("abc").unwrap();
    stream.send_end_stream().unwrap();

    assert!(stream.ended());
    assert!(stream.deleted());
    let envs = emitted.borrow();
    assert_eq!(envs.len(), 2);
    assert!(matches!(envs[0].payload, StreamPayload::Chunk(_)));
    assert!(matches!(envs[1].payload, StreamPayload::EndStream(_)));
}

#[test]
fn mime_type_reads_from_the_start_event() {
    let (stream, _emitted) = recording_stream();
    assert_eq!(stream.mime_type(), Some("audio/pcm".to_string()));
}

#[test]
fn pause_resume_drains_chunks_in_order() {
    let (stream, _emitted) = recording_stream();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_clone = seen.clone();
    stream.on_chunk(move |c| seen_clone.borrow_mut().push(c.data.clone()));

    stream.pause();
    stream.dispatch(StreamPayload::Chunk(StreamChunkPayload { data: "a".to_string() }));
    stream.dispatch(StreamPayload::Chunk(StreamChunkPayload { data: "b".to_string() }));
    assert!(seen.borrow().is_empty());

    stream.resume();
    assert_eq!(*seen.borrow(), vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn send_fails_while_the_owning_sessions_transport_is_disconnected() {
    let status = Rc::new(Cell::new(ConnectionStatus::Connected));
    let stream = AsyncOutputStreamHandle::new(
        "s1",
        Some(StartStreamPayload { mime_type: None }),
        Rc::new(|_: StreamEnvelope| {}),
        ManagerSinks::new(),
        status.clone(),
    );

    status.set(ConnectionStatus::Disconnected);
    let err = stream.send_meta_event(Value::from(1)).unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidOperation { .. }));

    status.set(ConnectionStatus::Connected);
    assert!(stream.send_meta_event(Value::from(1)).is_ok());
}
