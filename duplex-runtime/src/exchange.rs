//! The Exchange Helper (spec §4.5). Owns Message children.

use std::cell::RefCell;
use std::rc::Rc;

use duplex_error::RuntimeError;
use duplex_protocol::ErrorEndEvent;
use duplex_protocol::ErrorEnvelope;
use duplex_protocol::ErrorEvent;
use duplex_protocol::ExchangeEnvelope;
use duplex_protocol::ExchangePayload;
use duplex_protocol::LifecycleMarker;
use duplex_protocol::MessageEnvelope;
use duplex_protocol::MessagePayload;
use duplex_protocol::Role;
use duplex_protocol::StartExchangePayload;
use duplex_protocol::StartMessagePayload;
use serde_json::Map;
use serde_json::Value;

use crate::collections::OrderedMap;
use crate::core::CommonCore;
use crate::core::SharedConnectionStatus;
use crate::handler::fire;
use crate::handler::HandlerList;
use crate::handler::Unsubscribe;
use crate::message::MessageHandle;
use crate::sinks::ManagerSinks;

struct ExchangeInner {
    core: CommonCore<ExchangePayload>,
    start_event: Option<StartExchangePayload>,
    emit_up: Rc<dyn Fn(ExchangeEnvelope)>,
    sinks: ManagerSinks,
    messages: OrderedMap<MessageHandle>,
    on_message_start: HandlerList<MessageHandle>,
    on_end_exchange: HandlerList<()>,
    on_meta_event: HandlerList<Value>,
    on_error_start: HandlerList<ErrorEvent>,
    on_error_end: HandlerList<ErrorEndEvent>,
}

#[derive(Clone)]
pub struct ExchangeHandle(Rc<RefCell<ExchangeInner>>);

impl ExchangeHandle {
    pub(crate) fn new(
        id: impl Into<String>,
        start_event: Option<StartExchangePayload>,
        emit_up: Rc<dyn Fn(ExchangeEnvelope)>,
        sinks: ManagerSinks,
        connection_status: SharedConnectionStatus,
    ) -> Self {
        Self(Rc::new(RefCell::new(ExchangeInner {
            core: CommonCore::new(id, connection_status),
            start_event,
            emit_up,
            sinks,
            messages: OrderedMap::new(),
            on_message_start: HandlerList::new(),
            on_end_exchange: HandlerList::new(),
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

    pub fn start_event(&self) -> Result<StartExchangePayload, RuntimeError> {
        self.0
            .borrow()
            .start_event
            .clone()
            .ok_or_else(|| RuntimeError::validation("startEvent", "exchange was rehydrated without a start event"))
    }

    pub fn start_event_maybe(&self) -> Option<StartExchangePayload> {
        self.0.borrow().start_event.clone()
    }

    pub fn message(&self, message_id: &str) -> Option<MessageHandle> {
        self.0.borrow().messages.get(message_id).cloned()
    }

    pub fn message_ids(&self) -> Vec<String> {
        self.0.borrow().messages.ids()
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

    pub fn on_message_start(&self, handler: impl Fn(&MessageHandle) + 'static) -> Unsubscribe {
        let id = self.0.borrow_mut().on_message_start.register(handler);
        let weak = Rc::downgrade(&self.0);
        Unsubscribe::new(move || {
            if let Some(rc) = weak.upgrade() {
                rc.borrow_mut().on_message_start.remove(id);
            }
        })
    }

    pub fn on_end_exchange(&self, handler: impl Fn(&()) + 'static) -> Unsubscribe {
        let id = self.0.borrow_mut().on_end_exchange.register(handler);
        let weak = Rc::downgrade(&self.0);
        Unsubscribe::new(move || {
            if let Some(rc) = weak.upgrade() {
                rc.borrow_mut().on_end_exchange.remove(id);
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

    pub fn start_message(&self, message_id: impl Into<String>, role: Role) -> Result<MessageHandle, RuntimeError> {
        self.ensure_not_ended("startMessage")?;
        let message_id = message_id.into();
        let start = StartMessagePayload { role };
        let message = self.make_message(message_id.clone(), Some(start.clone()));
        self.0.borrow_mut().messages.insert(message_id.clone(), message.clone());
        self.forward(ExchangePayload::Message(MessageEnvelope {
            message_id,
            payload: MessagePayload::StartMessage(start),
        }));
        Ok(message)
    }

    pub fn send_end_exchange(&self) -> Result<(), RuntimeError> {
        self.ensure_not_ended("sendEndExchange")?;
        self.0.borrow_mut().core.ended = true;
        self.mark_deleted();
        self.forward(ExchangePayload::EndExchange(LifecycleMarker::default()));
        Ok(())
    }

    pub fn send_meta_event(&self, value: Value) -> Result<(), RuntimeError> {
        self.ensure_not_ended("sendMetaEvent")?;
        self.forward(ExchangePayload::MetaEvent(value));
        Ok(())
    }

    pub fn send_error_start(&self, event: ErrorEvent) -> Result<(), RuntimeError> {
        self.ensure_not_ended("sendErrorStart")?;
        self.forward(ExchangePayload::ExchangeError(ErrorEnvelope::StartError(event)));
        Ok(())
    }

    pub fn send_error_end(&self, error_id: impl Into<String>) -> Result<(), RuntimeError> {
        self.ensure_not_ended("sendErrorEnd")?;
        self.forward(ExchangePayload::ExchangeError(ErrorEnvelope::EndError(ErrorEndEvent {
            error_id: error_id.into(),
        })));
        Ok(())
    }

    pub(crate) fn dispatch(&self, payload: ExchangePayload) {
        let paused = self.0.borrow().core.paused;
        if paused {
            self.0.borrow_mut().core.buffer.push_back(payload);
            return;
        }
        self.dispatch_inner(payload);
    }

    fn dispatch_inner(&self, payload: ExchangePayload) {
        match payload {
            ExchangePayload::StartExchange(_) => {
                tracing::warn!(id = %self.id(), "duplicate startExchange ignored");
            }
            ExchangePayload::EndExchange(_) => {
                let snapshot = self.0.borrow().on_end_exchange.snapshot();
                fire(&snapshot, &());
                self.0.borrow_mut().core.ended = true;
                self.mark_deleted();
            }
            ExchangePayload::Message(env) => self.dispatch_message(env),
            ExchangePayload::ExchangeError(envelope) => self.handle_error_envelope(envelope),
            ExchangePayload::MetaEvent(value) => {
                let snapshot = self.0.borrow().on_meta_event.snapshot();
                fire(&snapshot, &value);
            }
        }
    }

    fn dispatch_message(&self, env: MessageEnvelope) {
        let existing = self.0.borrow().messages.get(&env.message_id).cloned();
        match (existing, &env.payload) {
            (None, MessagePayload::StartMessage(start)) => {
                let message = self.make_message(env.message_id.clone(), Some(start.clone()));
                self.0.borrow_mut().messages.insert(env.message_id, message.clone());
                let snapshot = self.0.borrow().on_message_start.snapshot();
                fire(&snapshot, &message);
            }
            (Some(message), _) => {
                let is_end = matches!(env.payload, MessagePayload::EndMessage(_));
                message.dispatch(env.payload);
                if is_end {
                    self.0.borrow_mut().messages.remove(&env.message_id);
                }
            }
            (None, _) => {
                tracing::warn!(message_id = %env.message_id, "envelope for unknown message ignored");
            }
        }
    }

    fn make_message(&self, id: String, start: Option<StartMessagePayload>) -> MessageHandle {
        let weak = Rc::downgrade(&self.0);
        let emit_up: Rc<dyn Fn(MessageEnvelope)> = Rc::new(move |env: MessageEnvelope| {
            if let Some(inner) = weak.upgrade() {
                ExchangeHandle(inner).forward(ExchangePayload::Message(env));
            }
        });
        let sinks = self.0.borrow().sinks.clone();
        let connection_status = self.0.borrow().core.connection_status.clone();
        MessageHandle::new(id, start, emit_up, sinks, connection_status)
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
    /// when the owning Session is deleted.
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
            let remaining = self.0.borrow_mut().messages.drain_in_order();
            for (_, message) in remaining {
                message.cascade_delete();
            }
        }
    }

    fn ensure_not_ended(&self, operation: &'static str) -> Result<(), RuntimeError> {
        self.0.borrow().core.ensure_sendable(operation, "exchange")
    }

    fn forward(&self, payload: ExchangePayload) {
        let (id, emit_up) = {
            let inner = self.0.borrow();
            (inner.core.id.clone(), inner.emit_up.clone())
        };
        emit_up(ExchangeEnvelope { exchange_id: id, payload });
    }
}

#[cfg(test)]
#[path = "exchange.test.rs"]
mod tests;
