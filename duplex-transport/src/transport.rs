use std::collections::HashMap;
use std::sync::Arc;

use duplex_error::NetworkError;
use duplex_error::RuntimeError;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tokio::sync::watch;

use crate::backoff::Backoff;
use crate::config::TransportConfig;
use crate::event_bus::ConnectOptions;
use crate::event_bus::Socket;
use crate::event_bus::SocketConnector;
use crate::status::ConnectionStatus;
use crate::status::ConnectionStatusEvent;
use crate::token_provider::TokenProvider;

/// Caller-supplied connect parameters, distinct from the parts of
/// [`ConnectOptions`] (token, timeout) the transport fills in itself.
#[derive(Debug, Clone, Default)]
pub struct ConnectRequestOptions {
    pub query: HashMap<String, String>,
    pub path: Option<String>,
}

/// An opaque reference to whichever socket was current at the moment
/// [`Transport::get_connected_socket`] resolved. Passed back to
/// [`Transport::deprecate_socket`], which only acts on it if it is
/// still the current socket (spec invariant 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketHandle(u64);

struct ActiveSocket {
    generation: u64,
    socket: Box<dyn Socket>,
}

struct TransportInner {
    /// The generation the transport is currently trying to reach
    /// `Connected` for, or `None` when the caller has disconnected.
    live_generation: Option<u64>,
    next_generation: u64,
    socket: Option<ActiveSocket>,
    last_options: Option<ConnectRequestOptions>,
}

/// Owns one socket for the whole process: fresh-token acquisition on
/// every (re)connect, exponential-backoff reconnection, abandonment of
/// stale connection attempts, graceful socket deprecation (spec §4.1).
#[derive(Clone)]
pub struct Transport {
    config: TransportConfig,
    connector: Arc<dyn SocketConnector>,
    token_provider: Arc<dyn TokenProvider>,
    status_tx: watch::Sender<ConnectionStatusEvent>,
    inner: Arc<Mutex<TransportInner>>,
    inbound_tx: mpsc::UnboundedSender<Value>,
}

impl Transport {
    /// Returns the transport plus the single sink of raw inbound events
    /// (spec §2's "forwards raw incoming events to a single sink").
    pub fn new(
        config: TransportConfig,
        connector: Arc<dyn SocketConnector>,
        token_provider: Arc<dyn TokenProvider>,
    ) -> (Self, mpsc::UnboundedReceiver<Value>) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (status_tx, _) = watch::channel(ConnectionStatusEvent::ok(ConnectionStatus::Disconnected));
        let transport = Self {
            config,
            connector,
            token_provider,
            status_tx,
            inner: Arc::new(Mutex::new(TransportInner {
                live_generation: None,
                next_generation: 0,
                socket: None,
                last_options: None,
            })),
            inbound_tx,
        };
        (transport, inbound_rx)
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status_tx.borrow().status
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatusEvent> {
        self.status_tx.subscribe()
    }

    fn set_status(&self, event: ConnectionStatusEvent) {
        let _ = self.status_tx.send(event);
    }

    /// Idempotent from the caller's view: disconnects any existing
    /// socket, then opens a fresh one, fetching a fresh token first.
    pub async fn connect_with_options(&self, opts: ConnectRequestOptions) -> Result<(), RuntimeError> {
        self.disconnect().await;

        let generation = {
            let mut inner = self.inner.lock().await;
            inner.next_generation += 1;
            let generation = inner.next_generation;
            inner.live_generation = Some(generation);
            inner.last_options = Some(opts.clone());
            generation
        };

        self.set_status(ConnectionStatusEvent::ok(ConnectionStatus::Connecting));
        self.run_connect_loop(generation, opts).await
    }

    /// `disconnect()` — behaviour depends on state (spec §4.1).
    pub async fn disconnect(&self) {
        let mut inner = self.inner.lock().await;
        match self.status() {
            ConnectionStatus::Disconnected => return,
            ConnectionStatus::Connecting => {
                inner.live_generation = None;
            }
            ConnectionStatus::Connected => {
                if let Some(active) = inner.socket.take() {
                    active.socket.close();
                }
                inner.live_generation = None;
            }
        }
        drop(inner);
        self.set_status(ConnectionStatusEvent::ok(ConnectionStatus::Disconnected));
    }

    /// Drops the reference to `handle`'s socket without closing it,
    /// ignored if `handle` is not the current socket (spec invariant 5).
    pub async fn deprecate_socket(&self, handle: SocketHandle) {
        let mut inner = self.inner.lock().await;
        if inner.socket.as_ref().map(|a| a.generation) == Some(handle.0) {
            inner.socket = None;
        }
    }

    /// Resolves once `status` reaches `Connected`, triggering a connect
    /// attempt if currently `Disconnected`; rejects if `Disconnected` is
    /// reached before `Connected`.
    pub async fn get_connected_socket(&self) -> Result<SocketHandle, RuntimeError> {
        if self.status() == ConnectionStatus::Disconnected {
            let opts = {
                let inner = self.inner.lock().await;
                inner.last_options.clone().unwrap_or_default()
            };
            // Best effort: the loop below observes the outcome regardless
            // of whether this particular call path returns an error.
            let _ = self.connect_with_options(opts).await;
        }

        let mut rx = self.subscribe_status();
        loop {
            let status = rx.borrow().status;
            match status {
                ConnectionStatus::Connected => {
                    let generation = self.inner.lock().await.socket.as_ref().map(|a| a.generation);
                    if let Some(generation) = generation {
                        return Ok(SocketHandle(generation));
                    }
                }
                ConnectionStatus::Disconnected => {
                    return Err(RuntimeError::Network(NetworkError::SocketClosed {
                        reason: "disconnected before a connection was established".to_string(),
                    }));
                }
                ConnectionStatus::Connecting => {}
            }
            if rx.changed().await.is_err() {
                return Err(RuntimeError::Network(NetworkError::SocketClosed {
                    reason: "status channel dropped".to_string(),
                }));
            }
        }
    }

    /// Fire-and-forget; silently dropped if there is no current socket
    /// (deprecated or disconnected) — see spec §9 design note.
    pub async fn emit(&self, event: &str, payload: Value) {
        let inner = self.inner.lock().await;
        if let Some(active) = inner.socket.as_ref() {
            active.socket.emit(event, payload);
        }
    }

    async fn is_live_generation(&self, generation: u64) -> bool {
        self.inner.lock().await.live_generation == Some(generation)
    }

    async fn run_connect_loop(
        &self,
        generation: u64,
        opts: ConnectRequestOptions,
    ) -> Result<(), RuntimeError> {
        let mut backoff = Backoff::new(
            self.config.reconnection_delay_ms,
            self.config.reconnection_delay_max_ms,
        );
        let mut attempt: u32 = 0;

        loop {
            if !self.is_live_generation(generation).await {
                return Err(RuntimeError::Network(NetworkError::SocketClosed {
                    reason: "connect attempt superseded".to_string(),
                }));
            }

            let token = match self.token_provider.get_valid_token().await {
                Ok(token) => token,
                Err(_) => String::new(),
            };

            let url = self
                .config
                .websocket_url()
                .map(|u| u.to_string())
                .unwrap_or_else(|_| self.config.base_url.clone());
            let mut query = opts.query.clone();
            if let Some(organization_id) = &self.config.organization_id {
                query.insert("organizationId".to_string(), organization_id.clone());
            }
            if let Some(tenant_id) = &self.config.tenant_id {
                query.insert("tenantId".to_string(), tenant_id.clone());
            }
            let connect_opts = ConnectOptions {
                url,
                query,
                path: opts.path.clone(),
                token,
                timeout_ms: self.config.timeout_ms,
            };

            match self.connector.connect(connect_opts).await {
                Ok((socket, rx)) => {
                    if !self.is_live_generation(generation).await {
                        socket.close();
                        return Err(RuntimeError::Network(NetworkError::SocketClosed {
                            reason: "abandoned: disconnect requested mid-connect".to_string(),
                        }));
                    }
                    {
                        let mut inner = self.inner.lock().await;
                        inner.socket = Some(ActiveSocket { generation, socket });
                    }
                    self.set_status(ConnectionStatusEvent::ok(ConnectionStatus::Connected));
                    self.spawn_inbound_pump(generation, rx, opts);
                    return Ok(());
                }
                Err(network_err) => {
                    attempt += 1;
                    let exhausted = self
                        .config
                        .reconnection_attempts
                        .is_some_and(|max| attempt >= max);
                    if !self.config.reconnection || exhausted {
                        let err = RuntimeError::Network(network_err);
                        self.set_status(ConnectionStatusEvent::err(
                            ConnectionStatus::Disconnected,
                            err.clone(),
                        ));
                        let mut inner = self.inner.lock().await;
                        if inner.live_generation == Some(generation) {
                            inner.live_generation = None;
                        }
                        return Err(err);
                    }
                    self.set_status(ConnectionStatusEvent::err(
                        ConnectionStatus::Connecting,
                        RuntimeError::Network(network_err),
                    ));
                    tokio::time::sleep(backoff.next_delay()).await;
                }
            }
        }
    }

    fn spawn_inbound_pump(
        &self,
        generation: u64,
        mut rx: mpsc::UnboundedReceiver<Value>,
        opts: ConnectRequestOptions,
    ) {
        let transport = self.clone();
        tokio::spawn(async move {
            while let Some(value) = rx.recv().await {
                let _ = transport.inbound_tx.send(value);
            }

            if !transport.is_live_generation(generation).await {
                return;
            }
            {
                let mut inner = transport.inner.lock().await;
                inner.socket = None;
            }
            if !transport.config.reconnection {
                transport.set_status(ConnectionStatusEvent::err(
                    ConnectionStatus::Disconnected,
                    RuntimeError::Network(NetworkError::SocketClosed {
                        reason: "socket closed and reconnection is disabled".to_string(),
                    }),
                ));
                let mut inner = transport.inner.lock().await;
                inner.live_generation = None;
                return;
            }

            tracing::warn!(generation, "socket closed unexpectedly, reconnecting");
            transport.set_status(ConnectionStatusEvent::ok(ConnectionStatus::Connecting));
            if let Err(err) = transport.run_connect_loop(generation, opts).await {
                tracing::warn!(%err, "reconnect attempt ultimately failed");
            }
        });
    }
}

#[cfg(test)]
#[path = "transport.test.rs"]
mod tests;
