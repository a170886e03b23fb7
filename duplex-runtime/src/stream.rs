//! Session-scoped async streams (spec §4.6). `AsyncOutputStreamHandle`
//! and `AsyncInputStreamHandle` are thin, differently-named wrappers
//! around the same `StreamInner` — the wire shape, lifecycle, and
//! handler set are identical; only the direction of travel (and thus
//! which Session map it lives in) differs, and that distinction lives in
//! `session.rs`, not here.

use std::cell::RefCell;
use std::rc::Rc;

use duplex_error::RuntimeError;
use duplex_protocol::ErrorEndEvent;
use duplex_protocol::ErrorEnvelope;
use duplex_protocol::ErrorEvent;
use duplex_protocol::LifecycleMarker;
use duplex_protocol::StartStreamPayload;
use duplex_protocol::StreamChunkPayload;
use duplex_protocol::StreamEnvelope;
use duplex_protocol::StreamPayload;
use serde_json::Map;
use serde_json::Value;

use crate::core::CommonCore;
use crate::core::SharedConnectionStatus;
use crate::handler::fire;
use crate::handler::HandlerList;
use crate::handler::Unsubscribe;
use crate::sinks::ManagerSinks;

struct StreamInner {
    core: CommonCore<StreamPayload>,
    start_event: Option<StartStreamPayload>,
    emit_up: Rc<dyn Fn(StreamEnvelope)>,
    sinks: ManagerSinks,
    on_chunk: HandlerList<StreamChunkPayload>,
    on_end_stream: HandlerList<()>,
    on_meta_event: HandlerList<Value>,
    on_error_start: HandlerList<ErrorEvent>,
    on_error_end: HandlerList<ErrorEndEvent>,
}

macro_rules! stream_handle {
    ($name:ident) => {
        #[derive(Clone)]
        pub struct $name(Rc<RefCell<StreamInner>>);

        impl $name {
            pub(crate) fn new(
                id: impl Into<String>,
                start_event: Option<StartStreamPayload>,
                emit_up: Rc<dyn Fn(StreamEnvelope)>,
                sinks: ManagerSinks,
                connection_status: SharedConnectionStatus,
            ) -> Self {
                Self(Rc::new(RefCell::new(StreamInner {
                    core: CommonCore::new(id, connection_status),
                    start_event,
                    emit_up,
                    sinks,
                    on_chunk: HandlerList::new(),
                    on_end_stream: HandlerList::new(),
                    on_meta_event: HandlerList::new(),
                    on_error_start: HandlerList::new(),
                    on_error_end: HandlerList::new(),
                })))
            }

            pub fn id(&self) -> String {
                self.0.borrow().core.id.clone()
            }

            pub fn ended(&self) -> bool {
                self.0.borrow().core.ended
            }

            pub fn deleted(&self) -> bool {
                self.0.borrow().core.deleted
            }

            pub fn paused(&self) -> bool {
                self.0.borrow().core.paused
            }

            pub fn has_error(&self) -> bool {
                self.0.borrow().core.has_error()
            }

            pub fn errors(&self) -> Vec<ErrorEvent> {
                self.0.borrow().core.errors.values().cloned().collect()
            }

            pub fn start_event(&self) -> Result<StartStreamPayload, RuntimeError> {
                self.0
                    .borrow()
                    .start_event
                    .clone()
                    .ok_or_else(|| RuntimeError::validation("startEvent", "stream was rehydrated without a start event"))
            }

            pub fn start_event_maybe(&self) -> Option<StartStreamPayload> {
                self.0.borrow().start_event.clone()
            }

            pub fn mime_type(&self) -> Option<String> {
                self.0.borrow().start_event.as_ref().and_then(|e| e.mime_type.clone())
            }

            pub fn get_properties(&self) -> Map<String, Value> {
                self.0.borrow().core.properties.clone()
            }

            pub fn set_properties(&self, patch: Map<String, Value>) {
                self.0.borrow_mut().core.set_properties(patch);
            }

            pub fn pause(&self) {
                self.0.borrow_mut().core.paused = true;
            }

            pub fn resume(&self) {
                self.0.borrow_mut().core.paused = false;
                loop {
                    let next = self.0.borrow_mut().core.buffer.pop_front();
                    match next {
                        Some(payload) => self.dispatch_inner(payload),
                        None => break,
                    }
                }
            }

            pub fn on_chunk(&self, handler: impl Fn(&StreamChunkPayload) + 'static) -> Unsubscribe {
                let id = self.0.borrow_mut().on_chunk.register(handler);
                let weak = Rc::downgrade(&self.0);
                Unsubscribe::new(move || {
                    if let Some(rc) = weak.upgrade() {
                        rc.borrow_mut().on_chunk.remove(id);
                    }
                })
            }

            pub fn on_end_stream(&self, handler: impl Fn(&()) + 'static) -> Unsubscribe {
                let id = self.0.borrow_mut().on_end_stream.register(handler);
                let weak = Rc::downgrade(&self.0);
                Unsubscribe::new(move || {
                    if let Some(rc) = weak.upgrade() {
                        rc.borrow_mut().on_end_stream.remove(id);
                    }
                })
            }

            pub fn on_meta_event(&self, handler: impl Fn(&Value) + 'static) -> Unsubscribe {
                let id = self.0.borrow_mut().on_meta_event.register(handler);
                let weak = Rc::downgrade(&self.0);
                Unsubscribe::new(move || {
                    if let Some(rc) = weak.upgrade() {
                        rc.borrow_mut().on_meta_event.remove(id);
                    }
                })
            }

            pub fn on_error_start(&self, handler: impl Fn(&ErrorEvent) + 'static) -> Unsubscribe {
                let id = self.0.borrow_mut().on_error_start.register(handler);
                let weak = Rc::downgrade(&self.0);
                Unsubscribe::new(move || {
                    if let Some(rc) = weak.upgrade() {
                        rc.borrow_mut().on_error_start.remove(id);
                    }
                })
            }

            pub fn on_error_end(&self, handler: impl Fn(&ErrorEndEvent) + 'static) -> Unsubscribe {
                let id = self.0.borrow_mut().on_error_end.register(handler);
                let weak = Rc::downgrade(&self.0);
                Unsubscribe::new(move || {
                    if let Some(rc) = weak.upgrade() {
                        rc.borrow_mut().on_error_end.remove(id);
                    }
                })
            }

            pub fn on_deleted(&self, handler: impl Fn(&()) + 'static) -> Unsubscribe {
                let id = self.0.borrow_mut().core.on_deleted.register(handler);
                let weak = Rc::downgrade(&self.0);
                Unsubscribe::new(move || {
                    if let Some(rc) = weak.upgrade() {
                        rc.borrow_mut().core.on_deleted.remove(id);
                    }
                })
            }

            pub fn send_chunk(&self, data: impl Into<String>) -> Result<(), RuntimeError> {
                self.ensure_not_ended("sendChunk")?;
                self.forward(StreamPayload::Chunk(StreamChunkPayload { data: data.into() }));
                Ok(())
            }

            pub fn send_end_stream(&self) -> Result<(), RuntimeError> {
                self.ensure_not_ended("sendEndStream")?;
                self.0.borrow_mut().core.ended = true;
                self.mark_deleted();
                self.forward(StreamPayload::EndStream(LifecycleMarker::default()));
                Ok(())
            }

            pub fn send_meta_event(&self, value: Value) -> Result<(), RuntimeError> {
                self.ensure_not_ended("sendMetaEvent")?;
                self.forward(StreamPayload::MetaEvent(value));
                Ok(())
            }

            pub fn send_error_start(&self, event: ErrorEvent) -> Result<(), RuntimeError> {
                self.ensure_not_ended("sendErrorStart")?;
                self.forward(StreamPayload::StreamError(ErrorEnvelope::StartError(event)));
                Ok(())
            }

            pub fn send_error_end(&self, error_id: impl Into<String>) -> Result<(), RuntimeError> {
                self.ensure_not_ended("sendErrorEnd")?;
                self.forward(StreamPayload::StreamError(ErrorEnvelope::EndError(ErrorEndEvent {
                    error_id: error_id.into(),
                })));
                Ok(())
            }

            pub(crate) fn dispatch(&self, payload: StreamPayload) {
                let paused = self.0.borrow().core.paused;
                if paused {
                    self.0.borrow_mut().core.buffer.push_back(payload);
                    return;
                }
                self.dispatch_inner(payload);
            }

            fn dispatch_inner(&self, payload: StreamPayload) {
                match payload {
                    StreamPayload::StartStream(_) => {
                        tracing::warn!(id = %self.id(), "duplicate startStream ignored");
                    }
                    StreamPayload::EndStream(_) => {
                        let snapshot = self.0.borrow().on_end_stream.snapshot();
                        fire(&snapshot, &());
                        self.0.borrow_mut().core.ended = true;
                        self.mark_deleted();
                    }
                    StreamPayload::Chunk(chunk) => {
                        let snapshot = self.0.borrow().on_chunk.snapshot();
                        fire(&snapshot, &chunk);
                    }
                    StreamPayload::MetaEvent(value) => {
                        let snapshot = self.0.borrow().on_meta_event.snapshot();
                        fire(&snapshot, &value);
                    }
                    StreamPayload::StreamError(envelope) => self.handle_error_envelope(envelope),
                }
            }

            fn handle_error_envelope(&self, envelope: ErrorEnvelope) {
                match envelope {
                    ErrorEnvelope::StartError(event) => {
                        self.0.borrow_mut().core.errors.insert(event.error_id.clone(), event.clone());
                        let local = self.0.borrow().on_error_start.snapshot();
                        let sinks = self.0.borrow().sinks.clone();
                        if local.is_empty() {
                            sinks.fire_unhandled_error_start(&event);
                        } else {
                            fire(&local, &event);
                        }
                        sinks.fire_any_error_start(&event);
                    }
                    ErrorEnvelope::EndError(event) => {
                        self.0.borrow_mut().core.errors.remove(&event.error_id);
                        let local = self.0.borrow().on_error_end.snapshot();
                        fire(&local, &event);
                        self.0.borrow().sinks.fire_any_error_end(&event);
                    }
                }
            }

            /// See `ToolCallHandle::cascade_delete`: local-only teardown
            /// invoked when the owning Session is deleted.
            pub(crate) fn cascade_delete(&self) {
                self.mark_deleted();
            }

            fn mark_deleted(&self) {
                let should_fire = {
                    let mut inner = self.0.borrow_mut();
                    if inner.core.deleted {
                        false
                    } else {
                        inner.core.deleted = true;
                        true
                    }
                };
                if should_fire {
                    let snapshot = self.0.borrow().core.on_deleted.snapshot();
                    fire(&snapshot, &());
                }
            }

            fn ensure_not_ended(&self, operation: &'static str) -> Result<(), RuntimeError> {
                self.0.borrow().core.ensure_sendable(operation, "stream")
            }

            fn forward(&self, payload: StreamPayload) {
                let (id, emit_up) = {
                    let inner = self.0.borrow();
                    (inner.core.id.clone(), inner.emit_up.clone())
                };
                emit_up(StreamEnvelope { stream_id: id, payload });
            }
        }
    };
}

stream_handle!(AsyncOutputStreamHandle);
stream_handle!(AsyncInputStreamHandle);

#[cfg(test)]
#[path = "stream.test.rs"]
mod tests;
