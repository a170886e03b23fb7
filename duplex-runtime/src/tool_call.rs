//! The ToolCall Helper (spec §4.5, §4.6). The same concrete type serves
//! both message-scoped tool calls (`MessagePayload::ToolCall`) and
//! Session-scoped async tool calls (`ConversationPayload::AsyncToolCall`)
//! — they share an identical wire shape, so there is no reason to carry
//! two structs.

use std::cell::RefCell;
use std::rc::Rc;

use duplex_error::RuntimeError;
use duplex_protocol::EndToolCallPayload;
use duplex_protocol::ErrorEndEvent;
use duplex_protocol::ErrorEnvelope;
use duplex_protocol::ErrorEvent;
use duplex_protocol::StartToolCallPayload;
use duplex_protocol::ToolCallEnvelope;
use duplex_protocol::ToolCallPayload;
use serde_json::Map;
use serde_json::Value;

use crate::core::CommonCore;
use crate::core::SharedConnectionStatus;
use crate::handler::fire;
use crate::handler::HandlerList;
use crate::handler::Unsubscribe;
use crate::sinks::ManagerSinks;

struct ToolCallInner {
    core: CommonCore<ToolCallPayload>,
    start_event: Option<StartToolCallPayload>,
    emit_up: Rc<dyn Fn(ToolCallEnvelope)>,
    sinks: ManagerSinks,
    on_end_tool_call: HandlerList<EndToolCallPayload>,
    on_meta_event: HandlerList<Value>,
    on_error_start: HandlerList<ErrorEvent>,
    on_error_end: HandlerList<ErrorEndEvent>,
}

#[derive(Clone)]
pub struct ToolCallHandle(Rc<RefCell<ToolCallInner>>);

impl ToolCallHandle {
    pub(crate) fn new(
        id: impl Into<String>,
        start_event: Option<StartToolCallPayload>,
        emit_up: Rc<dyn Fn(ToolCallEnvelope)>,
        sinks: ManagerSinks,
        connection_status: SharedConnectionStatus,
    ) -> Self {
        Self(Rc::new(RefCell::new(ToolCallInner {
            core: CommonCore::new(id, connection_status),
            start_event,
            emit_up,
            sinks,
            on_end_tool_call: HandlerList::new(),
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

    pub fn start_event(&self) -> Result<StartToolCallPayload, RuntimeError> {
        self.0
            .borrow()
            .start_event
            .clone()
            .ok_or_else(|| RuntimeError::validation("startEvent", "tool call was rehydrated without a start event"))
    }

    pub fn start_event_maybe(&self) -> Option<StartToolCallPayload> {
        self.0.borrow().start_event.clone()
    }

    pub fn tool_name(&self) -> Result<String, RuntimeError> {
        self.start_event().map(|e| e.tool_name)
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

    pub fn on_end_tool_call(&self, handler: impl Fn(&EndToolCallPayload) + 'static) -> Unsubscribe {
        let id = self.0.borrow_mut().on_end_tool_call.register(handler);
        let weak = Rc::downgrade(&self.0);
        Unsubscribe::new(move || {
            if let Some(rc) = weak.upgrade() {
                rc.borrow_mut().on_end_tool_call.remove(id);
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

    pub fn send_tool_call_end(&self, output: Option<Value>, is_error: bool, cancelled: bool) -> Result<(), RuntimeError> {
        self.ensure_not_ended("sendToolCallEnd")?;
        self.0.borrow_mut().core.ended = true;
        self.mark_deleted();
        self.forward(ToolCallPayload::EndToolCall(EndToolCallPayload {
            output,
            is_error,
            cancelled,
        }));
        Ok(())
    }

    pub fn send_meta_event(&self, value: Value) -> Result<(), RuntimeError> {
        self.ensure_not_ended("sendMetaEvent")?;
        self.forward(ToolCallPayload::MetaEvent(value));
        Ok(())
    }

    pub fn send_error_start(&self, event: ErrorEvent) -> Result<(), RuntimeError> {
        self.ensure_not_ended("sendErrorStart")?;
        self.forward(ToolCallPayload::ToolCallError(ErrorEnvelope::StartError(event)));
        Ok(())
    }

    pub fn send_error_end(&self, error_id: impl Into<String>) -> Result<(), RuntimeError> {
        self.ensure_not_ended("sendErrorEnd")?;
        self.forward(ToolCallPayload::ToolCallError(ErrorEnvelope::EndError(ErrorEndEvent {
            error_id: error_id.into(),
        })));
        Ok(())
    }

    pub(crate) fn dispatch(&self, payload: ToolCallPayload) {
        let paused = self.0.borrow().core.paused;
        if paused {
            self.0.borrow_mut().core.buffer.push_back(payload);
            return;
        }
        self.dispatch_inner(payload);
    }

    fn dispatch_inner(&self, payload: ToolCallPayload) {
        match payload {
            ToolCallPayload::StartToolCall(_) => {
                tracing::warn!(id = %self.id(), "duplicate startToolCall ignored");
            }
            ToolCallPayload::EndToolCall(end) => {
                let snapshot = self.0.borrow().on_end_tool_call.snapshot();
                fire(&snapshot, &end);
                self.0.borrow_mut().core.ended = true;
                self.mark_deleted();
            }
            ToolCallPayload::MetaEvent(value) => {
                let snapshot = self.0.borrow().on_meta_event.snapshot();
                fire(&snapshot, &value);
            }
            ToolCallPayload::ToolCallError(envelope) => self.handle_error_envelope(envelope),
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

    /// Invoked by an owning parent (Message or Session) when the parent
    /// itself is deleted (spec §9: "when a parent is deleted, it first
    /// deletes all children"). Local bookkeeping only — no envelope is
    /// emitted, since the parent's own deletion already implies the
    /// remote end will tear down everything beneath it.
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
        self.0.borrow().core.ensure_sendable(operation, "tool call")
    }

    fn forward(&self, payload: ToolCallPayload) {
        let (id, emit_up) = {
            let inner = self.0.borrow();
            (inner.core.id.clone(), inner.emit_up.clone())
        };
        emit_up(ToolCallEnvelope { tool_call_id: id, payload });
    }
}

#[cfg(test)]
#[path = "tool_call.test.rs"]
mod tests;
