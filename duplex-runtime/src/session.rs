//! The Session Helper (spec §4.4). Root of the conversation-scoped tree:
//! owns Exchange, AsyncOutputStream, AsyncInputStream and AsyncToolCall
//! children, plus a session-level error set. Unlike every other Helper,
//! a Session also surfaces a read-only `connection_status` — when the
//! transport drops to `Disconnected`, every `send_*` on this Session or
//! any of its children fails with `InvalidOperation` until it recovers.

use std::cell::Cell;
use std::cell::RefCell;
use std::rc::Rc;

use duplex_error::RuntimeError;
use duplex_protocol::ConversationEnvelope;
use duplex_protocol::ConversationPayload;
use duplex_protocol::ErrorEndEvent;
use duplex_protocol::ErrorEnvelope;
use duplex_protocol::ErrorEvent;
use duplex_protocol::LifecycleMarker;
use duplex_protocol::StartExchangePayload;
use duplex_protocol::StartSessionPayload;
use duplex_protocol::StartStreamPayload;
use duplex_protocol::StartToolCallPayload;
use duplex_protocol::StreamEnvelope;
use duplex_protocol::StreamPayload;
use duplex_protocol::ToolCallEnvelope;
use duplex_protocol::ToolCallPayload;
use serde_json::Map;
use serde_json::Value;

use crate::collections::OrderedMap;
pub use crate::core::ConnectionStatus;
use crate::core::CommonCore;
use crate::exchange::ExchangeHandle;
use crate::handler::fire;
use crate::handler::HandlerList;
use crate::handler::Unsubscribe;
use crate::sinks::ManagerSinks;
use crate::stream::AsyncInputStreamHandle;
use crate::stream::AsyncOutputStreamHandle;
use crate::tool_call::ToolCallHandle;

struct SessionInner {
    core: CommonCore<ConversationPayload>,
    start_event: Option<StartSessionPayload>,
    emit_up: Rc<dyn Fn(ConversationEnvelope)>,
    sinks: ManagerSinks,
    /// Invoked exactly once, the moment this Session actually processes
    /// an `endSession` (outbound send or inbound dispatch) — the Manager
    /// uses this to unregister the session from its map (spec §4.4:
    /// "Manager then un-registers it"; §3: "destroyed when endSession is
    /// sent or received").
    on_ended: Rc<dyn Fn()>,
    exchanges: OrderedMap<ExchangeHandle>,
    async_output_streams: OrderedMap<AsyncOutputStreamHandle>,
    async_input_streams: OrderedMap<AsyncInputStreamHandle>,
    async_tool_calls: OrderedMap<ToolCallHandle>,
    on_exchange_start: HandlerList<ExchangeHandle>,
    on_async_output_stream_start: HandlerList<AsyncOutputStreamHandle>,
    on_async_input_stream_start: HandlerList<AsyncInputStreamHandle>,
    on_async_tool_call_start: HandlerList<ToolCallHandle>,
    on_end_session: HandlerList<()>,
    on_meta_event: HandlerList<Value>,
    on_error_start: HandlerList<ErrorEvent>,
    on_error_end: HandlerList<ErrorEndEvent>,
}

#[derive(Clone)]
pub struct SessionHandle(Rc<RefCell<SessionInner>>);

impl SessionHandle {
    pub(crate) fn new(
        id: impl Into<String>,
        start_event: Option<StartSessionPayload>,
        emit_up: Rc<dyn Fn(ConversationEnvelope)>,
        sinks: ManagerSinks,
        on_ended: Rc<dyn Fn()>,
    ) -> Self {
        let connection_status = Rc::new(Cell::new(ConnectionStatus::Connected));
        Self(Rc::new(RefCell::new(SessionInner {
            core: CommonCore::new(id, connection_status),
            start_event,
            emit_up,
            sinks,
            on_ended,
            exchanges: OrderedMap::new(),
            async_output_streams: OrderedMap::new(),
            async_input_streams: OrderedMap::new(),
            async_tool_calls: OrderedMap::new(),
            on_exchange_start: HandlerList::new(),
            on_async_output_stream_start: HandlerList::new(),
            on_async_input_stream_start: HandlerList::new(),
            on_async_tool_call_start: HandlerList::new(),
            on_end_session: HandlerList::new(),
            on_meta_event: HandlerList::new(),
            on_error_start: HandlerList::new(),
            on_error_end: HandlerList::new(),
        })))
    }

    pub fn id(&self) -> String {
        self.0.borrow().core.id.clone()
    }

    pub fn conversation_id(&self) -> String {
        self.id()
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

    pub fn start_event(&self) -> Result<StartSessionPayload, RuntimeError> {
        self.0
            .borrow()
            .start_event
            .clone()
            .ok_or_else(|| RuntimeError::validation("startEvent", "session was rehydrated without a start event"))
    }

    pub fn start_event_maybe(&self) -> Option<StartSessionPayload> {
        self.0.borrow().start_event.clone()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.0.borrow().core.connection_status.get()
    }

    /// Set by the façade when the underlying transport's status changes
    /// (spec §4.4). Not part of the public wire protocol. Visible to
    /// every child Helper through the shared cell, so a disconnect here
    /// also blocks `send_*` on every Exchange/Message/ToolCall/Stream
    /// beneath this Session.
    pub fn set_connection_status(&self, status: ConnectionStatus) {
        self.0.borrow().core.connection_status.set(status);
    }

    pub fn exchange(&self, exchange_id: &str) -> Option<ExchangeHandle> {
        self.0.borrow().exchanges.get(exchange_id).cloned()
    }

    pub fn exchange_ids(&self) -> Vec<String> {
        self.0.borrow().exchanges.ids()
    }

    pub fn async_output_stream(&self, stream_id: &str) -> Option<AsyncOutputStreamHandle> {
        self.0.borrow().async_output_streams.get(stream_id).cloned()
    }

    pub fn async_input_stream(&self, stream_id: &str) -> Option<AsyncInputStreamHandle> {
        self.0.borrow().async_input_streams.get(stream_id).cloned()
    }

    pub fn async_tool_call(&self, tool_call_id: &str) -> Option<ToolCallHandle> {
        self.0.borrow().async_tool_calls.get(tool_call_id).cloned()
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

    pub fn on_exchange_start(&self, handler: impl Fn(&ExchangeHandle) + 'static) -> Unsubscribe {
        let id = self.0.borrow_mut().on_exchange_start.register(handler);
        let weak = Rc::downgrade(&self.0);
        Unsubscribe::new(move || {
            if let Some(rc) = weak.upgrade() {
                rc.borrow_mut().on_exchange_start.remove(id);
            }
        })
    }

    pub fn on_async_output_stream_start(&self, handler: impl Fn(&AsyncOutputStreamHandle) + 'static) -> Unsubscribe {
        let id = self.0.borrow_mut().on_async_output_stream_start.register(handler);
        let weak = Rc::downgrade(&self.0);
        Unsubscribe::new(move || {
            if let Some(rc) = weak.upgrade() {
                rc.borrow_mut().on_async_output_stream_start.remove(id);
            }
        })
    }

    pub fn on_async_input_stream_start(&self, handler: impl Fn(&AsyncInputStreamHandle) + 'static) -> Unsubscribe {
        let id = self.0.borrow_mut().on_async_input_stream_start.register(handler);
        let weak = Rc::downgrade(&self.0);
        Unsubscribe::new(move || {
            if let Some(rc) = weak.upgrade() {
                rc.borrow_mut().on_async_input_stream_start.remove(id);
            }
        })
    }

    pub fn on_async_tool_call_start(&self, handler: impl Fn(&ToolCallHandle) + 'static) -> Unsubscribe {
        let id = self.0.borrow_mut().on_async_tool_call_start.register(handler);
        let weak = Rc::downgrade(&self.0);
        Unsubscribe::new(move || {
            if let Some(rc) = weak.upgrade() {
                rc.borrow_mut().on_async_tool_call_start.remove(id);
            }
        })
    }

    pub fn on_end_session(&self, handler: impl Fn(&()) + 'static) -> Unsubscribe {
        let id = self.0.borrow_mut().on_end_session.register(handler);
        let weak = Rc::downgrade(&self.0);
        Unsubscribe::new(move || {
            if let Some(rc) = weak.upgrade() {
                rc.borrow_mut().on_end_session.remove(id);
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

    pub fn start_exchange(&self, exchange_id: impl Into<String>, metadata: Option<Value>) -> Result<ExchangeHandle, RuntimeError> {
        self.ensure_sendable("startExchange")?;
        let exchange_id = exchange_id.into();
        let start = StartExchangePayload { metadata };
        let exchange = self.make_exchange(exchange_id.clone(), Some(start.clone()));
        self.0.borrow_mut().exchanges.insert(exchange_id.clone(), exchange.clone());
        self.forward(ConversationPayload::Exchange(duplex_protocol::ExchangeEnvelope {
            exchange_id,
            payload: duplex_protocol::ExchangePayload::StartExchange(start),
        }));
        Ok(exchange)
    }

    pub fn start_async_output_stream(&self, stream_id: impl Into<String>, mime_type: Option<String>) -> Result<AsyncOutputStreamHandle, RuntimeError> {
        self.ensure_sendable("startAsyncOutputStream")?;
        let stream_id = stream_id.into();
        let start = StartStreamPayload { mime_type };
        let stream = self.make_async_output_stream(stream_id.clone(), Some(start.clone()));
        self.0.borrow_mut().async_output_streams.insert(stream_id.clone(), stream.clone());
        self.forward(ConversationPayload::AsyncOutputStream(StreamEnvelope {
            stream_id,
            payload: StreamPayload::StartStream(start),
        }));
        Ok(stream)
    }

    pub fn start_async_input_stream(&self, stream_id: impl Into<String>, mime_type: Option<String>) -> Result<AsyncInputStreamHandle, RuntimeError> {
        self.ensure_sendable("startAsyncInputStream")?;
        let stream_id = stream_id.into();
        let start = StartStreamPayload { mime_type };
        let stream = self.make_async_input_stream(stream_id.clone(), Some(start.clone()));
        self.0.borrow_mut().async_input_streams.insert(stream_id.clone(), stream.clone());
        self.forward(ConversationPayload::AsyncInputStream(StreamEnvelope {
            stream_id,
            payload: StreamPayload::StartStream(start),
        }));
        Ok(stream)
    }

    pub fn start_async_tool_call(&self, tool_call_id: impl Into<String>, tool_name: impl Into<String>, input: Option<Value>) -> Result<ToolCallHandle, RuntimeError> {
        self.ensure_sendable("startAsyncToolCall")?;
        let tool_call_id = tool_call_id.into();
        let start = StartToolCallPayload {
            tool_name: tool_name.into(),
            input,
        };
        let tool_call = self.make_async_tool_call(tool_call_id.clone(), Some(start.clone()));
        self.0.borrow_mut().async_tool_calls.insert(tool_call_id.clone(), tool_call.clone());
        self.forward(ConversationPayload::AsyncToolCall(ToolCallEnvelope {
            tool_call_id,
            payload: ToolCallPayload::StartToolCall(start),
        }));
        Ok(tool_call)
    }

    pub fn send_end_session(&self) -> Result<(), RuntimeError> {
        self.ensure_sendable("sendEndSession")?;
        self.0.borrow_mut().core.ended = true;
        self.mark_deleted();
        self.forward(ConversationPayload::EndSession(LifecycleMarker::default()));
        self.fire_on_ended();
        Ok(())
    }

    pub fn send_meta_event(&self, value: Value) -> Result<(), RuntimeError> {
        self.ensure_sendable("sendMetaEvent")?;
        self.forward(ConversationPayload::MetaEvent(value));
        Ok(())
    }

    pub fn send_error_start(&self, event: ErrorEvent) -> Result<(), RuntimeError> {
        self.ensure_sendable("sendErrorStart")?;
        self.forward(ConversationPayload::SessionError(ErrorEnvelope::StartError(event)));
        Ok(())
    }

    pub fn send_error_end(&self, error_id: impl Into<String>) -> Result<(), RuntimeError> {
        self.ensure_sendable("sendErrorEnd")?;
        self.forward(ConversationPayload::SessionError(ErrorEnvelope::EndError(ErrorEndEvent {
            error_id: error_id.into(),
        })));
        Ok(())
    }

    pub(crate) fn dispatch(&self, payload: ConversationPayload) {
        let paused = self.0.borrow().core.paused;
        if paused {
            self.0.borrow_mut().core.buffer.push_back(payload);
            return;
        }
        self.dispatch_inner(payload);
    }

    fn dispatch_inner(&self, payload: ConversationPayload) {
        match payload {
            ConversationPayload::StartSession(_) => {
                tracing::warn!(id = %self.id(), "duplicate startSession ignored");
            }
            ConversationPayload::EndSession(_) => {
                let snapshot = self.0.borrow().on_end_session.snapshot();
                fire(&snapshot, &());
                self.0.borrow_mut().core.ended = true;
                self.mark_deleted();
                self.fire_on_ended();
            }
            ConversationPayload::Exchange(env) => self.dispatch_exchange(env),
            ConversationPayload::AsyncOutputStream(env) => self.dispatch_async_output_stream(env),
            ConversationPayload::AsyncInputStream(env) => self.dispatch_async_input_stream(env),
            ConversationPayload::AsyncToolCall(env) => self.dispatch_async_tool_call(env),
            ConversationPayload::SessionError(envelope) => self.handle_error_envelope(envelope),
            ConversationPayload::MetaEvent(value) => {
                let snapshot = self.0.borrow().on_meta_event.snapshot();
                fire(&snapshot, &value);
            }
        }
    }

    fn dispatch_exchange(&self, env: duplex_protocol::ExchangeEnvelope) {
        let existing = self.0.borrow().exchanges.get(&env.exchange_id).cloned();
        match (existing, &env.payload) {
            (None, duplex_protocol::ExchangePayload::StartExchange(start)) => {
                let exchange = self.make_exchange(env.exchange_id.clone(), Some(start.clone()));
                self.0.borrow_mut().exchanges.insert(env.exchange_id, exchange.clone());
                let snapshot = self.0.borrow().on_exchange_start.snapshot();
                fire(&snapshot, &exchange);
            }
            (Some(exchange), _) => {
                let is_end = matches!(env.payload, duplex_protocol::ExchangePayload::EndExchange(_));
                exchange.dispatch(env.payload);
                if is_end {
                    self.0.borrow_mut().exchanges.remove(&env.exchange_id);
                }
            }
            (None, _) => {
                tracing::warn!(exchange_id = %env.exchange_id, "envelope for unknown exchange ignored");
            }
        }
    }

    fn dispatch_async_output_stream(&self, env: StreamEnvelope) {
        let existing = self.0.borrow().async_output_streams.get(&env.stream_id).cloned();
        match (existing, &env.payload) {
            (None, StreamPayload::StartStream(start)) => {
                let stream = self.make_async_output_stream(env.stream_id.clone(), Some(start.clone()));
                self.0.borrow_mut().async_output_streams.insert(env.stream_id, stream.clone());
                let snapshot = self.0.borrow().on_async_output_stream_start.snapshot();
                fire(&snapshot, &stream);
            }
            (Some(stream), _) => {
                let is_end = matches!(env.payload, StreamPayload::EndStream(_));
                stream.dispatch(env.payload);
                if is_end {
                    self.0.borrow_mut().async_output_streams.remove(&env.stream_id);
                }
            }
            (None, _) => {
                tracing::warn!(stream_id = %env.stream_id, "envelope for unknown async output stream ignored");
            }
        }
    }

    fn dispatch_async_input_stream(&self, env: StreamEnvelope) {
        let existing = self.0.borrow().async_input_streams.get(&env.stream_id).cloned();
        match (existing, &env.payload) {
            (None, StreamPayload::StartStream(start)) => {
                let stream = self.make_async_input_stream(env.stream_id.clone(), Some(start.clone()));
                self.0.borrow_mut().async_input_streams.insert(env.stream_id, stream.clone());
                let snapshot = self.0.borrow().on_async_input_stream_start.snapshot();
                fire(&snapshot, &stream);
            }
            (Some(stream), _) => {
                let is_end = matches!(env.payload, StreamPayload::EndStream(_));
                stream.dispatch(env.payload);
                if is_end {
                    self.0.borrow_mut().async_input_streams.remove(&env.stream_id);
                }
            }
            (None, _) => {
                tracing::warn!(stream_id = %env.stream_id, "envelope for unknown async input stream ignored");
            }
        }
    }

    fn dispatch_async_tool_call(&self, env: ToolCallEnvelope) {
        let existing = self.0.borrow().async_tool_calls.get(&env.tool_call_id).cloned();
        match (existing, &env.payload) {
            (None, ToolCallPayload::StartToolCall(start)) => {
                let tool_call = self.make_async_tool_call(env.tool_call_id.clone(), Some(start.clone()));
                self.0.borrow_mut().async_tool_calls.insert(env.tool_call_id, tool_call.clone());
                let snapshot = self.0.borrow().on_async_tool_call_start.snapshot();
                fire(&snapshot, &tool_call);
            }
            (Some(tool_call), _) => {
                let is_end = matches!(env.payload, ToolCallPayload::EndToolCall(_));
                tool_call.dispatch(env.payload);
                if is_end {
                    self.0.borrow_mut().async_tool_calls.remove(&env.tool_call_id);
                }
            }
            (None, _) => {
                tracing::warn!(tool_call_id = %env.tool_call_id, "envelope for unknown async tool call ignored");
            }
        }
    }

    fn make_exchange(&self, id: String, start: Option<StartExchangePayload>) -> ExchangeHandle {
        let weak = Rc::downgrade(&self.0);
        let emit_up: Rc<dyn Fn(duplex_protocol::ExchangeEnvelope)> = Rc::new(move |env| {
            if let Some(inner) = weak.upgrade() {
                SessionHandle(inner).forward(ConversationPayload::Exchange(env));
            }
        });
        let sinks = self.0.borrow().sinks.clone();
        let connection_status = self.0.borrow().core.connection_status.clone();
        ExchangeHandle::new(id, start, emit_up, sinks, connection_status)
    }

    fn make_async_output_stream(&self, id: String, start: Option<StartStreamPayload>) -> AsyncOutputStreamHandle {
        let weak = Rc::downgrade(&self.0);
        let emit_up: Rc<dyn Fn(StreamEnvelope)> = Rc::new(move |env| {
            if let Some(inner) = weak.upgrade() {
                SessionHandle(inner).forward(ConversationPayload::AsyncOutputStream(env));
            }
        });
        let sinks = self.0.borrow().sinks.clone();
        let connection_status = self.0.borrow().core.connection_status.clone();
        AsyncOutputStreamHandle::new(id, start, emit_up, sinks, connection_status)
    }

    fn make_async_input_stream(&self, id: String, start: Option<StartStreamPayload>) -> AsyncInputStreamHandle {
        let weak = Rc::downgrade(&self.0);
        let emit_up: Rc<dyn Fn(StreamEnvelope)> = Rc::new(move |env| {
            if let Some(inner) = weak.upgrade() {
                SessionHandle(inner).forward(ConversationPayload::AsyncInputStream(env));
            }
        });
        let sinks = self.0.borrow().sinks.clone();
        let connection_status = self.0.borrow().core.connection_status.clone();
        AsyncInputStreamHandle::new(id, start, emit_up, sinks, connection_status)
    }

    fn make_async_tool_call(&self, id: String, start: Option<StartToolCallPayload>) -> ToolCallHandle {
        let weak = Rc::downgrade(&self.0);
        let emit_up: Rc<dyn Fn(ToolCallEnvelope)> = Rc::new(move |env| {
            if let Some(inner) = weak.upgrade() {
                SessionHandle(inner).forward(ConversationPayload::AsyncToolCall(env));
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
            let exchanges = self.0.borrow_mut().exchanges.drain_in_order();
            for (_, exchange) in exchanges {
                exchange.cascade_delete();
            }
            let out_streams = self.0.borrow_mut().async_output_streams.drain_in_order();
            for (_, stream) in out_streams {
                stream.cascade_delete();
            }
            let in_streams = self.0.borrow_mut().async_input_streams.drain_in_order();
            for (_, stream) in in_streams {
                stream.cascade_delete();
            }
            let tool_calls = self.0.borrow_mut().async_tool_calls.drain_in_order();
            for (_, tool_call) in tool_calls {
                tool_call.cascade_delete();
            }
        }
    }

    fn ensure_sendable(&self, operation: &'static str) -> Result<(), RuntimeError> {
        self.0.borrow().core.ensure_sendable(operation, "session")
    }

    fn forward(&self, payload: ConversationPayload) {
        let (id, emit_up) = {
            let inner = self.0.borrow();
            (inner.core.id.clone(), inner.emit_up.clone())
        };
        emit_up(ConversationEnvelope { conversation_id: id, payload });
    }

    /// Notifies the Manager this Session has actually processed an
    /// `endSession`, whether sent outbound or received inbound, so it
    /// can unregister the Session from its map (spec §4.4, §3).
    fn fire_on_ended(&self) {
        let on_ended = self.0.borrow().on_ended.clone();
        on_ended();
    }
}

#[cfg(test)]
#[path = "session.test.rs"]
mod tests;
