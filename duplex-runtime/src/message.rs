//! The Message Helper (spec §4.5). Owns ToolCall children and dispatches
//! (but does not own, since they are value objects) ContentPart events.

use std::cell::RefCell;
use std::rc::Rc;

use duplex_error::RuntimeError;
use duplex_protocol::ContentPartEvent;
use duplex_protocol::ErrorEndEvent;
use duplex_protocol::ErrorEnvelope;
use duplex_protocol::ErrorEvent;
use duplex_protocol::LifecycleMarker;
use duplex_protocol::MessageEnvelope;
use duplex_protocol::MessagePayload;
use duplex_protocol::Role;
use duplex_protocol::StartMessagePayload;
use duplex_protocol::StartToolCallPayload;
use duplex_protocol::ToolCallEnvelope;
use duplex_protocol::ToolCallPayload;
use serde_json::Map;
use serde_json::Value;

use crate::collections::OrderedMap;
use crate::core::CommonCore;
use crate::core::SharedConnectionStatus;
use crate::handler::fire;
use crate::handler::HandlerList;
use crate::handler::Unsubscribe;
use crate::sinks::ManagerSinks;
use crate::tool_call::ToolCallHandle;

struct MessageInner {
    core: CommonCore<MessagePayload>,
    start_event: Option<StartMessagePayload>,
    emit_up: Rc<dyn Fn(MessageEnvelope)>,
    sinks: ManagerSinks,
    tool_calls: OrderedMap<ToolCallHandle>,
    on_tool_call_start: HandlerList<ToolCallHandle>,
    on_content_part: HandlerList<ContentPartEvent>,
    on_end_message: HandlerList<()>,
    on_meta_event: HandlerList<Value>,
    on_error_start: HandlerList<ErrorEvent>,
    on_error_end: HandlerList<ErrorEndEvent>,
}

#[derive(Clone)]
pub struct MessageHandle(Rc<RefCell<MessageInner>>);

impl MessageHandle {
    pub(crate) fn new(
        id: impl Into<String>,
        start_event: Option<StartMessagePayload>,
        emit_up: Rc<dyn Fn(MessageEnvelope)>,
        sinks: ManagerSinks,
        connection_status: SharedConnectionStatus,
    ) -> Self {
        Self(Rc::new(RefCell::new(MessageInner {
            core: CommonCore::new(id, connection_status),
            start_event,
            emit_up,
            sinks,
            tool_calls: OrderedMap::new(),
            on_tool_call_start: HandlerList::new(),
            on_content_part: HandlerList::new(),
            on_end_message: HandlerList::new(),
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

    pub fn start_event(&self) -> Result<StartMessagePayload, RuntimeError> {
        self.0
            .borrow()
            .start_event
            .clone()
            .ok_or_else(|| RuntimeError::validation("startEvent", "message was rehydrated without a start event"))
    }

    pub fn start_event_maybe(&self) -> Option<StartMessagePayload> {
        self.0.borrow().start_event.clone()
    }

    pub fn role(&self) -> Result<Role, RuntimeError> {
        self.start_event().map(|e| e.role)
    }

    pub fn tool_call(&self, tool_call_id: &str) -> Option<ToolCallHandle> {
        self.0.borrow().tool_calls.get(tool_call_id).cloned()
    }

    pub fn tool_call_ids(&self) -> Vec<String> {
        self.0.borrow().tool_calls.ids()
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

    pub fn on_tool_call_start(&self, handler: impl Fn(&ToolCallHandle) + 'static) -> Unsubscribe {
        let id = self.0.borrow_mut().on_tool_call_start.register(handler);
        let weak = Rc::downgrade(&self.0);
        Unsubscribe::new(move || {
            if let Some(rc) = weak.upgrade() {
                rc.borrow_mut().on_tool_call_start.remove(id);
            }
        })
    }

    pub fn on_content_part(&self, handler: impl Fn(&ContentPartEvent) + 'static) -> Unsubscribe {
        let id = self.0.borrow_mut().on_content_part.register(handler);
        let weak = Rc::downgrade(&self.0);
        Unsubscribe::new(move || {
            if let Some(rc) = weak.upgrade() {
                rc.borrow_mut().on_content_part.remove(id);
            }
        })
    }

    pub fn on_end_message(&self, handler: impl Fn(&()) + 'static) -> Unsubscribe {
        let id = self.0.borrow_mut().on_end_message.register(handler);
        let weak = Rc::downgrade(&self.0);
        Unsubscribe::new(move || {
            if let Some(rc) = weak.upgrade() {
                rc.borrow_mut().on_end_message.remove(id);
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

    pub fn start_tool_call(&self, tool_call_id: impl Into<String>, tool_name: impl Into<String>, input: Option<Value>) -> Result<ToolCallHandle, RuntimeError> {
        self.ensure_not_ended("startToolCall")?;
        let tool_call_id = tool_call_id.into();
        let start = StartToolCallPayload {
            tool_name: tool_name.into(),
            input,
        };
        let tool_call = self.make_tool_call(tool_call_id.clone(), Some(start.clone()));
        self.0.borrow_mut().tool_calls.insert(tool_call_id.clone(), tool_call.clone());
        self.forward(MessagePayload::ToolCall(ToolCallEnvelope {
            tool_call_id,
            payload: ToolCallPayload::StartToolCall(start),
        }));
        Ok(tool_call)
    }

    pub fn send_content_part(&self, part: ContentPartEvent) -> Result<(), RuntimeError> {
        self.ensure_not_ended("sendContentPart")?;
        self.forward(MessagePayload::ContentPart(part));
        Ok(())
    }

    pub fn send_end_message(&self) -> Result<(), RuntimeError> {
        self.ensure_not_ended("sendEndMessage")?;
        self.0.borrow_mut().core.ended = true;
        self.mark_deleted();
        self.forward(MessagePayload::EndMessage(LifecycleMarker::default()));
        Ok(())
    }

    pub fn send_meta_event(&self, value: Value) -> Result<(), RuntimeError> {
        self.ensure_not_ended("sendMetaEvent")?;
        self.forward(MessagePayload::MetaEvent(value));
        Ok(())
    }

    pub fn send_error_start(&self, event: ErrorEvent) -> Result<(), RuntimeError> {
        self.ensure_not_ended("sendErrorStart")?;
        self.forward(MessagePayload::MessageError(ErrorEnvelope::StartError(event)));
        Ok(())
    }

    pub fn send_error_end(&self, error_id: impl Into<String>) -> Result<(), RuntimeError> {
        self.ensure_not_ended("sendErrorEnd")?;
        self.forward(MessagePayload::MessageError(ErrorEnvelope::EndError(ErrorEndEvent {
            error_id: error_id.into(),
        })));
        Ok(())
    }

    pub(crate) fn dispatch(&self, payload: MessagePayload) {
        let paused = self.0.borrow().core.paused;
        if paused {
            self.0.borrow_mut().core.buffer.push_back(payload);
            return;
        }
        self.dispatch_inner(payload);
    }

    fn dispatch_inner(&self, payload: MessagePayload) {
        match payload {
            MessagePayload::StartMessage(_) => {
                tracing::warn!(id = %self.id(), "duplicate startMessage ignored");
            }
            MessagePayload::EndMessage(_) => {
                let snapshot = self.0.borrow().on_end_message.snapshot();
                fire(&snapshot, &());
                self.0.borrow_mut().core.ended = true;
                self.mark_deleted();
            }
            MessagePayload::ToolCall(env) => self.dispatch_tool_call(env),
            MessagePayload::ContentPart(part) => {
                let snapshot = self.0.borrow().on_content_part.snapshot();
                fire(&snapshot, &part);
            }
            MessagePayload::MessageError(envelope) => self.handle_error_envelope(envelope),
            MessagePayload::MetaEvent(value) => {
                let snapshot = self.0.borrow().on_meta_event.snapshot();
                fire(&snapshot, &value);
            }
        }
    }

    fn dispatch_tool_call(&self, env: ToolCallEnvelope) {
        let existing = self.0.borrow().tool_calls.get(&env.tool_call_id).cloned();
        match (existing, &env.payload) {
            (None, ToolCallPayload::StartToolCall(start)) => {
                let tool_call = self.make_tool_call(env.tool_call_id.clone(), Some(start.clone()));
                self.0.borrow_mut().tool_calls.insert(env.tool_call_id, tool_call.clone());
                let snapshot = self.0.borrow().on_tool_call_start.snapshot();
                fire(&snapshot, &tool_call);
            }
            (Some(tool_call), _) => {
                let is_end = matches!(env.payload, ToolCallPayload::EndToolCall(_));
                tool_call.dispatch(env.payload);
                if is_end {
                    self.0.borrow_mut().tool_calls.remove(&env.tool_call_id);
                }
            }
            (None, _) => {
                tracing::warn!(tool_call_id = %env.tool_call_id, "envelope for unknown tool call ignored");
            }
        }
    }

    fn make_tool_call(&self, id: String, start: Option<StartToolCallPayload>) -> ToolCallHandle {
        let weak = Rc::downgrade(&self.0);
        let emit_up: Rc<dyn Fn(ToolCallEnvelope)> = Rc::new(move |env: ToolCallEnvelope| {
            if let Some(inner) = weak.upgrade() {
                MessageHandle(inner).forward(MessagePayload::ToolCall(env));
            }
        });
        let sinks = self.0.borrow().sinks.clone();
        let connection_status = self.0.borrow().core.connection_status.clone();
        ToolCallHandle::new(id, start, emit_up, sinks, connection_status)
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

    /// See `ToolCallHandle::cascade_delete`: local-only teardown invoked
    /// when the owning Exchange is deleted.
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
            let remaining = self.0.borrow_mut().tool_calls.drain_in_order();
            for (_, tool_call) in remaining {
                tool_call.cascade_delete();
            }
        }
    }

    fn ensure_not_ended(&self, operation: &'static str) -> Result<(), RuntimeError> {
        self.0.borrow().core.ensure_sendable(operation, "message")
    }

    fn forward(&self, payload: MessagePayload) {
        let (id, emit_up) = {
            let inner = self.0.borrow();
            (inner.core.id.clone(), inner.emit_up.clone())
        };
        emit_up(MessageEnvelope { message_id: id, payload });
    }
}

#[cfg(test)]
#[path = "message.test.rs"]
mod tests;
