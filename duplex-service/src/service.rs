//! The façade (spec §2 "Service façade", §4.4): binds a [`Manager`] to an
//! authenticated [`Transport`] and exposes the REST operations plus
//! `start_session`/`get_session`/`end_session` on top of it.
//!
//! Ownership split (DESIGN.md open question 2): `Transport` is `Send`
//! and runs its own reconnect/backoff loop on Tokio; the `Manager`'s
//! Helper tree is `Rc`-based and is not. This struct is the seam —
//! outbound envelopes cross from the `Rc` side to the `Send` side as
//! plain `serde_json::Value`, via an unbounded channel drained by a
//! spawned task that only ever touches `Transport`. Inbound envelopes
//! must be pumped by [`DuplexService::run`] on the same task that
//! constructed this façade, since that pump calls straight into
//! `Manager::dispatch`.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use duplex_error::RuntimeError;
use duplex_protocol::ConversationEnvelope;
use duplex_protocol::ConversationSnapshot;
use duplex_runtime::ConnectionStatus as RuntimeConnectionStatus;
use duplex_runtime::Manager;
use duplex_runtime::SessionHandle;
use duplex_transport::ConnectRequestOptions;
use duplex_transport::ConnectionStatus as TransportConnectionStatus;
use duplex_transport::SocketConnector;
use duplex_transport::TokenProvider;
use duplex_transport::Transport;
use duplex_transport::TransportConfig;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::rest_client::ConversationRestClient;
use crate::rest_client::CreateConversationOptions;
use crate::rest_client::ListConversationsOptions;
use crate::rest_client::UpdateConversationPatch;
use crate::rest_client::UploadedAttachment;

/// The single socket.io event name every envelope travels under (spec
/// §6 "Transport wire format").
pub const EVENT_NAME: &str = "conversation";

pub struct DuplexService {
    manager: Manager,
    transport: Transport,
    rest_client: Arc<dyn ConversationRestClient>,
    inbound_rx: RefCell<mpsc::UnboundedReceiver<Value>>,
}

impl DuplexService {
    pub fn new(config: TransportConfig, connector: Arc<dyn SocketConnector>, token_provider: Arc<dyn TokenProvider>, rest_client: Arc<dyn ConversationRestClient>) -> Self {
        let (transport, inbound_rx) = Transport::new(config, connector, token_provider);

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ConversationEnvelope>();
        let manager = Manager::new(Rc::new(move |envelope: ConversationEnvelope| {
            let _ = outbound_tx.send(envelope);
        }));

        let outbound_transport = transport.clone();
        tokio::spawn(async move {
            while let Some(envelope) = outbound_rx.recv().await {
                match serde_json::to_value(&envelope) {
                    Ok(value) => outbound_transport.emit(EVENT_NAME, value).await,
                    Err(err) => tracing::error!(%err, "failed to serialize outbound envelope"),
                }
            }
        });

        Self {
            manager,
            transport,
            rest_client,
            inbound_rx: RefCell::new(inbound_rx),
        }
    }

    pub fn manager(&self) -> &Manager {
        &self.manager
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub async fn connect(&self, opts: ConnectRequestOptions) -> Result<(), RuntimeError> {
        self.transport.connect_with_options(opts).await
    }

    pub async fn disconnect(&self) {
        self.transport.disconnect().await;
    }

    /// Drives the façade until the transport's inbound channel closes:
    /// pumps raw JSON events into [`Manager::dispatch`] and mirrors the
    /// transport's connection status onto every live Session (spec
    /// §4.4: "when status drops to Disconnected, all send-* on any
    /// child of this session fail"). Must run on the task that
    /// constructed this `DuplexService`.
    pub async fn run(&self) {
        let mut status_rx = self.transport.subscribe_status();
        loop {
            let mut inbound_rx = self.inbound_rx.borrow_mut();
            tokio::select! {
                value = inbound_rx.recv() => {
                    drop(inbound_rx);
                    match value {
                        Some(value) => self.dispatch_raw(value),
                        None => break,
                    }
                }
                changed = status_rx.changed() => {
                    drop(inbound_rx);
                    if changed.is_err() {
                        break;
                    }
                    self.sync_connection_status(status_rx.borrow().status);
                }
            }
        }
    }

    fn dispatch_raw(&self, value: Value) {
        match serde_json::from_value::<ConversationEnvelope>(value) {
            Ok(envelope) => self.manager.dispatch(envelope),
            Err(err) => tracing::warn!(%err, "dropping malformed inbound envelope"),
        }
    }

    fn sync_connection_status(&self, status: TransportConnectionStatus) {
        let mapped = match status {
            TransportConnectionStatus::Connected => RuntimeConnectionStatus::Connected,
            TransportConnectionStatus::Connecting => RuntimeConnectionStatus::Connecting,
            TransportConnectionStatus::Disconnected => RuntimeConnectionStatus::Disconnected,
        };
        for id in self.manager.session_ids() {
            if let Some(session) = self.manager.session(&id) {
                session.set_connection_status(mapped);
            }
        }
    }

    pub fn start_session(&self, conversation_id: impl Into<String>, opts: Option<Value>) -> Result<SessionHandle, RuntimeError> {
        self.manager.start_session(conversation_id, opts)
    }

    pub fn get_session(&self, conversation_id: &str) -> Option<SessionHandle> {
        self.manager.session(conversation_id)
    }

    pub fn end_session(&self, conversation_id: &str) -> Result<(), RuntimeError> {
        let session = self
            .get_session(conversation_id)
            .ok_or_else(|| RuntimeError::invalid_operation("endSession", "no active session for this conversation"))?;
        session.send_end_session()
    }

    /// Fetches the historical snapshot and rehydrates it into a fresh
    /// Session via `duplex-replay`, without touching the transport at
    /// all (spec §4.8).
    pub async fn resume_session(&self, conversation_id: &str) -> Result<SessionHandle, RuntimeError> {
        let snapshot = self.rest_client.get_by_id(conversation_id).await?;
        let session = self.manager.ensure_session(conversation_id.to_string());
        for envelope in duplex_replay::conversation(&snapshot) {
            self.manager.dispatch(envelope);
        }
        Ok(session)
    }

    pub async fn create(&self, agent_id: &str, folder_id: Option<&str>, opts: CreateConversationOptions) -> Result<ConversationSnapshot, RuntimeError> {
        self.rest_client.create(agent_id, folder_id, opts).await
    }

    pub async fn get_by_id(&self, id: &str) -> Result<ConversationSnapshot, RuntimeError> {
        self.rest_client.get_by_id(id).await
    }

    pub async fn get_all(&self, opts: ListConversationsOptions) -> Result<Vec<ConversationSnapshot>, RuntimeError> {
        self.rest_client.get_all(opts).await
    }

    pub async fn update_by_id(&self, id: &str, patch: UpdateConversationPatch) -> Result<ConversationSnapshot, RuntimeError> {
        self.rest_client.update_by_id(id, patch).await
    }

    pub async fn delete_by_id(&self, id: &str) -> Result<(), RuntimeError> {
        self.rest_client.delete_by_id(id).await
    }

    pub async fn upload_attachment(&self, conversation_id: &str, file_name: &str, bytes: Vec<u8>) -> Result<UploadedAttachment, RuntimeError> {
        self.rest_client.upload_attachment(conversation_id, file_name, bytes).await
    }
}

#[cfg(test)]
#[path = "service.test.rs"]
mod tests;
