//! State shared by every Helper variant (spec §3 "Helpers" table, §9
//! "Polymorphic Helpers"). Rust has no struct inheritance, so the shared
//! shape is a plain field embedded by composition in each concrete
//! `*Inner` struct, with common behaviour implemented once here as
//! inherent methods taking `&mut CommonCore<P>` rather than duplicated
//! seven times.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::rc::Rc;

use duplex_error::RuntimeError;
use duplex_protocol::ErrorEvent;
use serde_json::Map;
use serde_json::Value;

use crate::handler::HandlerList;

/// Mirrors `duplex_transport::ConnectionStatus` without this crate
/// depending on the transport crate (spec §4.4: "surfaced read-only" on
/// the Session). The façade (`duplex-service`) is what actually keeps
/// this in sync with the real transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Connected,
    Connecting,
    Disconnected,
}

/// Shared by a Session and every Helper beneath it in its tree, so a
/// transport drop is visible to the whole subtree without each child
/// polling its parent (spec §4.4: "when status drops to Disconnected,
/// all send-* on any child of this session fail with InvalidOperation
/// until status restores").
pub type SharedConnectionStatus = Rc<Cell<ConnectionStatus>>;

/// Fields every Helper carries regardless of its position in the tree,
/// parameterised over `Payload` (the type buffered while paused, e.g.
/// `ExchangePayload` for an Exchange).
pub struct CommonCore<Payload> {
    pub id: String,
    pub ended: bool,
    pub deleted: bool,
    pub paused: bool,
    pub buffer: VecDeque<Payload>,
    pub errors: BTreeMap<String, ErrorEvent>,
    pub properties: Map<String, Value>,
    pub on_deleted: HandlerList<()>,
    pub connection_status: SharedConnectionStatus,
}

impl<Payload> CommonCore<Payload> {
    pub fn new(id: impl Into<String>, connection_status: SharedConnectionStatus) -> Self {
        Self {
            id: id.into(),
            ended: false,
            deleted: false,
            paused: false,
            buffer: VecDeque::new(),
            errors: BTreeMap::new(),
            properties: Map::new(),
            on_deleted: HandlerList::new(),
            connection_status,
        }
    }

    pub fn has_error(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn set_properties(&mut self, patch: Map<String, Value>) {
        for (key, value) in patch {
            self.properties.insert(key, value);
        }
    }

    /// Shared send guard (spec §4.4): every Helper rejects sends once it
    /// has ended, and every Helper rejects sends while its Session's
    /// transport is disconnected, regardless of its own state.
    pub fn ensure_sendable(&self, operation: &'static str, entity: &'static str) -> Result<(), RuntimeError> {
        if self.ended {
            return Err(RuntimeError::invalid_operation(operation, format!("{entity} has already ended")));
        }
        if self.connection_status.get() == ConnectionStatus::Disconnected {
            return Err(RuntimeError::invalid_operation(operation, "session transport is disconnected"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "core.test.rs"]
mod tests;
