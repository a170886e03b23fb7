//! An in-memory `SocketConnector`/`Socket` double, the transport-layer
//! equivalent of this codebase's `wiremock` stand-ins for real HTTP
//! services. Used by this crate's own tests and reusable from
//! `duplex-service` without opening a real socket.

use crate::event_bus::ConnectOptions;
use crate::event_bus::Socket;
use crate::event_bus::SocketConnector;
use async_trait::async_trait;
use duplex_error::NetworkError;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    Succeed,
    Fail(NetworkError),
}

#[derive(Default)]
pub struct FakeSocket {
    emitted: Mutex<Vec<(String, Value)>>,
    closed: AtomicBool,
    inbound_tx: Mutex<Option<mpsc::UnboundedSender<Value>>>,
}

impl FakeSocket {
    pub fn emitted_events(&self) -> Vec<(String, Value)> {
        self.emitted.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Simulate the server pushing an inbound event.
    pub fn push_inbound(&self, value: Value) {
        if let Some(tx) = self.inbound_tx.lock().unwrap().as_ref() {
            let _ = tx.send(value);
        }
    }

    /// Simulate an unexpected connection drop: the inbound channel's
    /// sender is dropped, so the transport's pump sees `rx.recv() ==
    /// None` the same way it would if the physical socket died.
    pub fn simulate_drop(&self) {
        *self.inbound_tx.lock().unwrap() = None;
    }
}

impl Socket for Arc<FakeSocket> {
    fn emit(&self, event: &str, payload: Value) {
        self.emitted.lock().unwrap().push((event.to_string(), payload));
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        *self.inbound_tx.lock().unwrap() = None;
    }
}

pub struct FakeSocketConnector {
    state: Mutex<FakeConnectorState>,
}

struct FakeConnectorState {
    script: VecDeque<ScriptedOutcome>,
    attempt_tokens: Vec<String>,
    attempt_queries: Vec<std::collections::HashMap<String, String>>,
    sockets: Vec<Arc<FakeSocket>>,
}

impl FakeSocketConnector {
    /// Attempts beyond the scripted queue default to `Succeed`.
    pub fn new(script: impl IntoIterator<Item = ScriptedOutcome>) -> Self {
        Self {
            state: Mutex::new(FakeConnectorState {
                script: script.into_iter().collect(),
                attempt_tokens: Vec::new(),
                attempt_queries: Vec::new(),
                sockets: Vec::new(),
            }),
        }
    }

    pub fn always_succeeds() -> Self {
        Self::new([])
    }

    pub fn attempt_tokens(&self) -> Vec<String> {
        self.state.lock().unwrap().attempt_tokens.clone()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempt_tokens().len()
    }

    pub fn last_query(&self) -> Option<std::collections::HashMap<String, String>> {
        self.state.lock().unwrap().attempt_queries.last().cloned()
    }

    pub fn last_socket(&self) -> Option<Arc<FakeSocket>> {
        self.state.lock().unwrap().sockets.last().cloned()
    }
}

#[async_trait]
impl SocketConnector for FakeSocketConnector {
    async fn connect(
        &self,
        opts: ConnectOptions,
    ) -> Result<(Box<dyn Socket>, mpsc::UnboundedReceiver<Value>), NetworkError> {
        let outcome = {
            let mut state = self.state.lock().unwrap();
            state.attempt_tokens.push(opts.token.clone());
            state.attempt_queries.push(opts.query.clone());
            state.script.pop_front().unwrap_or(ScriptedOutcome::Succeed)
        };

        match outcome {
            ScriptedOutcome::Fail(err) => Err(err),
            ScriptedOutcome::Succeed => {
                let (tx, rx) = mpsc::unbounded_channel();
                let socket = Arc::new(FakeSocket::default());
                *socket.inbound_tx.lock().unwrap() = Some(tx);
                self.state.lock().unwrap().sockets.push(socket.clone());
                Ok((Box::new(socket) as Box<dyn Socket>, rx))
            }
        }
    }
}
