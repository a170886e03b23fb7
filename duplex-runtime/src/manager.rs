//! The Manager (spec §4.2): single root of the Helper tree. Tracks every
//! Session by conversation id, owns the cross-cutting error sinks, and is
//! the single dispatch entry point for inbound envelopes arriving from
//! the transport.

use std::cell::RefCell;
use std::rc::Rc;

use duplex_error::RuntimeError;
use duplex_protocol::ConversationEnvelope;
use duplex_protocol::ConversationPayload;
use duplex_protocol::ErrorEndEvent;
use duplex_protocol::ErrorEvent;
use duplex_protocol::StartSessionPayload;
use serde_json::Value;

use crate::collections::OrderedMap;
use crate::handler::fire;
use crate::handler::HandlerList;
use crate::handler::Unsubscribe;
use crate::session::SessionHandle;
use crate::sinks::ManagerSinks;

struct ManagerInner {
    sessions: OrderedMap<SessionHandle>,
    sinks: ManagerSinks,
    emit_outbound: Rc<dyn Fn(ConversationEnvelope)>,
    on_unhandled_envelope: HandlerList<ConversationEnvelope>,
}

/// Owns the session map exclusively (spec §3 "Ownership"); no other
/// component reaches into it. `emit_outbound` is the seam a
/// `duplex-service` façade wires to the transport's `emit`.
#[derive(Clone)]
pub struct Manager(Rc<RefCell<ManagerInner>>);

impl Manager {
    pub fn new(emit_outbound: Rc<dyn Fn(ConversationEnvelope)>) -> Self {
        Self(Rc::new(RefCell::new(ManagerInner {
            sessions: OrderedMap::new(),
            sinks: ManagerSinks::new(),
            emit_outbound,
            on_unhandled_envelope: HandlerList::new(),
        })))
    }

    pub fn session(&self, conversation_id: &str) -> Option<SessionHandle> {
        self.0.borrow().sessions.get(conversation_id).cloned()
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.0.borrow().sessions.ids()
    }

    pub fn active_count(&self) -> usize {
        self.0.borrow().sessions.len()
    }

    /// Caller-initiated session creation (spec §4.4 lifecycle: "created
    /// when caller invokes `startSession`"). Emits the `startSession`
    /// envelope and registers the new Session in the map.
    pub fn start_session(&self, conversation_id: impl Into<String>, opts: Option<Value>) -> Result<SessionHandle, RuntimeError> {
        let conversation_id = conversation_id.into();
        if self.0.borrow().sessions.contains_key(&conversation_id) {
            return Err(RuntimeError::invalid_operation("startSession", "a session for this conversation already exists"));
        }
        let start = StartSessionPayload { opts };
        let session = self.make_session(conversation_id.clone(), Some(start.clone()));
        self.0.borrow_mut().sessions.insert(conversation_id.clone(), session.clone());
        self.emit(ConversationEnvelope {
            conversation_id,
            payload: ConversationPayload::StartSession(start),
        });
        Ok(session)
    }

    pub fn on_unhandled_envelope(&self, handler: impl Fn(&ConversationEnvelope) + 'static) -> Unsubscribe {
        let id = self.0.borrow_mut().on_unhandled_envelope.register(handler);
        let weak = Rc::downgrade(&self.0);
        Unsubscribe::new(move || {
            if let Some(rc) = weak.upgrade() {
                rc.borrow_mut().on_unhandled_envelope.remove(id);
            }
        })
    }

    pub fn on_any_error_start(&self, handler: impl Fn(&ErrorEvent) + 'static) -> u64 {
        self.0.borrow().sinks.on_any_error_start(handler)
    }

    pub fn off_any_error_start(&self, id: u64) {
        self.0.borrow().sinks.off_any_error_start(id);
    }

    pub fn on_any_error_end(&self, handler: impl Fn(&ErrorEndEvent) + 'static) -> u64 {
        self.0.borrow().sinks.on_any_error_end(handler)
    }

    pub fn off_any_error_end(&self, id: u64) {
        self.0.borrow().sinks.off_any_error_end(id);
    }

    pub fn on_unhandled_error_start(&self, handler: impl Fn(&ErrorEvent) + 'static) -> u64 {
        self.0.borrow().sinks.on_unhandled_error_start(handler)
    }

    pub fn off_unhandled_error_start(&self, id: u64) {
        self.0.borrow().sinks.off_unhandled_error_start(id);
    }

    pub fn on_unhandled_error_end(&self, handler: impl Fn(&ErrorEndEvent) + 'static) -> u64 {
        self.0.borrow().sinks.on_unhandled_error_end(handler)
    }

    pub fn off_unhandled_error_end(&self, id: u64) {
        self.0.borrow().sinks.off_unhandled_error_end(id);
    }

    /// Single dispatch entry point for inbound envelopes (spec §4.2).
    /// Looks up the Session by `conversationId`; creates one if the
    /// envelope is a `startSession` for an unknown conversation; routes
    /// to `onUnhandledEnvelope` if there is no addressee. Unregistration
    /// on `endSession` happens via the Session's own `on_ended` callback
    /// (see [`Manager::make_session`]), not here, so a paused session
    /// only drops out of the map once it actually processes the
    /// buffered `endSession`, not the moment the envelope arrives.
    pub fn dispatch(&self, envelope: ConversationEnvelope) {
        let conversation_id = envelope.conversation_id.clone();
        let existing = self.0.borrow().sessions.get(&conversation_id).cloned();

        let session = match (existing, &envelope.payload) {
            (Some(session), _) => session,
            (None, ConversationPayload::StartSession(start)) => {
                let session = self.make_session(conversation_id.clone(), Some(start.clone()));
                self.0.borrow_mut().sessions.insert(conversation_id.clone(), session.clone());
                session
            }
            (None, _) => {
                let snapshot = self.0.borrow().on_unhandled_envelope.snapshot();
                fire(&snapshot, &envelope);
                return;
            }
        };

        session.dispatch(envelope.payload);
    }

    /// Drops `conversation_id` from the session map. Called exactly once
    /// per Session, from its own `on_ended` callback the moment it
    /// actually processes an `endSession` — outbound (`send_end_session`)
    /// or inbound (`dispatch`) alike (spec §4.4, §3).
    fn remove_session(&self, conversation_id: &str) {
        self.0.borrow_mut().sessions.remove(conversation_id);
    }

    /// Rehydrates a Session from a replayed envelope sequence without
    /// involving the transport at all (spec §4.8). The caller feeds each
    /// yielded envelope from `duplex-replay` into [`Manager::dispatch`];
    /// this just gives replay a session id to seed `startSession` with
    /// when the historical record had no live `startSession` of its own.
    pub fn ensure_session(&self, conversation_id: impl Into<String>) -> SessionHandle {
        let conversation_id = conversation_id.into();
        if let Some(session) = self.0.borrow().sessions.get(&conversation_id).cloned() {
            return session;
        }
        let session = self.make_session(conversation_id.clone(), None);
        self.0.borrow_mut().sessions.insert(conversation_id, session.clone());
        session
    }

    fn make_session(&self, id: String, start: Option<StartSessionPayload>) -> SessionHandle {
        let manager = self.clone();
        let emit_up: Rc<dyn Fn(ConversationEnvelope)> = Rc::new(move |env| manager.emit(env));
        let sinks = self.0.borrow().sinks.clone();
        let manager = self.clone();
        let conversation_id = id.clone();
        let on_ended: Rc<dyn Fn()> = Rc::new(move || manager.remove_session(&conversation_id));
        SessionHandle::new(id, start, emit_up, sinks, on_ended)
    }

    fn emit(&self, envelope: ConversationEnvelope) {
        let emit_outbound = self.0.borrow().emit_outbound.clone();
        emit_outbound(envelope);
    }
}

#[cfg(test)]
#[path = "manager.test.rs"]
mod tests;
