use super::*;
use crate::test_support::FakeSocketConnector;
use crate::test_support::ScriptedOutcome;
use crate::token_provider::StaticTokenProvider;
use async_trait::async_trait;
use std::sync::atomic::AtomicUsize;
use tokio::sync::oneshot;

struct SequencedTokenProvider {
    tokens: Mutex<std::collections::VecDeque<String>>,
}

impl SequencedTokenProvider {
    fn new(tokens: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            tokens: Mutex::new(tokens.into_iter().map(str::to_string).collect()),
        }
    }
}

#[async_trait]
impl TokenProvider for SequencedTokenProvider {
    async fn get_valid_token(&self) -> Result<String, NetworkError> {
        let mut tokens = self.tokens.lock().await;
        Ok(tokens.pop_front().unwrap_or_else(|| "exhausted".to_string()))
    }
}

fn test_config(base_url: &str) -> TransportConfig {
    TransportConfig::builder(base_url)
        .reconnection_delay_ms(1)
        .reconnection_delay_max_ms(4)
        .build()
}

#[tokio::test]
async fn connect_reaches_connected_and_uses_a_token_per_attempt() {
    let connector = Arc::new(FakeSocketConnector::always_succeeds());
    let token_provider = Arc::new(SequencedTokenProvider::new(["t1", "t2"]));
    let (transport, _inbound) = Transport::new(
        test_config("https://api.example.com"),
        connector.clone(),
        token_provider,
    );

    transport
        .connect_with_options(ConnectRequestOptions::default())
        .await
        .unwrap();
    assert_eq!(transport.status(), ConnectionStatus::Connected);

    // Force a reconnect: the outbound auth payload on the second attempt
    // must use the second token, not the first (spec §8 scenario F).
    transport
        .connect_with_options(ConnectRequestOptions::default())
        .await
        .unwrap();

    assert_eq!(connector.attempt_tokens(), vec!["t1".to_string(), "t2".to_string()]);
}

#[tokio::test]
async fn disconnect_while_connecting_abandons_the_eventual_socket() {
    struct SlowConnector {
        gate: Mutex<Option<oneshot::Receiver<()>>>,
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl SocketConnector for SlowConnector {
        async fn connect(
            &self,
            _opts: ConnectOptions,
        ) -> Result<(Box<dyn Socket>, mpsc::UnboundedReceiver<Value>), NetworkError> {
            self.attempts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            let gate = self.gate.lock().await.take().expect("connect called twice");
            gate.await.ok();
            let (_tx, rx) = mpsc::unbounded_channel();
            let socket = Arc::new(crate::test_support::FakeSocket::default());
            Ok((Box::new(socket) as Box<dyn Socket>, rx))
        }
    }

    let (release_tx, release_rx) = oneshot::channel();
    let connector = Arc::new(SlowConnector {
        gate: Mutex::new(Some(release_rx)),
        attempts: AtomicUsize::new(0),
    });
    let token_provider = Arc::new(StaticTokenProvider::new("t"));
    let (transport, _inbound) = Transport::new(
        test_config("https://api.example.com"),
        connector,
        token_provider,
    );

    let connect_future = {
        let transport = transport.clone();
        tokio::spawn(async move { transport.connect_with_options(ConnectRequestOptions::default()).await })
    };

    // Give the connect attempt a chance to register as `Connecting`.
    tokio::task::yield_now().await;
    assert_eq!(transport.status(), ConnectionStatus::Connecting);

    transport.disconnect().await;
    assert_eq!(transport.status(), ConnectionStatus::Disconnected);

    release_tx.send(()).unwrap();
    let result = connect_future.await.unwrap();
    assert!(result.is_err());
    assert_eq!(transport.status(), ConnectionStatus::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn failed_attempts_retry_with_backoff_until_success() {
    let connector = Arc::new(FakeSocketConnector::new([
        ScriptedOutcome::Fail(NetworkError::ConnectTimeout { timeout_ms: 5000 }),
        ScriptedOutcome::Fail(NetworkError::ConnectTimeout { timeout_ms: 5000 }),
        ScriptedOutcome::Succeed,
    ]));
    let token_provider = Arc::new(StaticTokenProvider::new("t"));
    let (transport, _inbound) = Transport::new(
        test_config("https://api.example.com"),
        connector.clone(),
        token_provider,
    );

    let handle = tokio::spawn({
        let transport = transport.clone();
        async move { transport.connect_with_options(ConnectRequestOptions::default()).await }
    });

    tokio::time::advance(std::time::Duration::from_millis(100)).await;
    handle.await.unwrap().unwrap();

    assert_eq!(transport.status(), ConnectionStatus::Connected);
    assert_eq!(connector.attempt_count(), 3);
}

#[tokio::test]
async fn organization_and_tenant_id_are_propagated_as_query_params() {
    let connector = Arc::new(FakeSocketConnector::always_succeeds());
    let token_provider = Arc::new(StaticTokenProvider::new("t"));
    let config = TransportConfig::builder("https://api.example.com")
        .reconnection_delay_ms(1)
        .reconnection_delay_max_ms(4)
        .organization_id("org-1")
        .tenant_id("tenant-1")
        .build();
    let (transport, _inbound) = Transport::new(config, connector.clone(), token_provider);

    transport
        .connect_with_options(ConnectRequestOptions::default())
        .await
        .unwrap();

    let query = connector.last_query().expect("a connect attempt was made");
    assert_eq!(query.get("organizationId"), Some(&"org-1".to_string()));
    assert_eq!(query.get("tenantId"), Some(&"tenant-1".to_string()));
}

#[tokio::test]
async fn disconnect_on_a_disconnected_transport_is_a_no_op() {
    let connector = Arc::new(FakeSocketConnector::always_succeeds());
    let token_provider = Arc::new(StaticTokenProvider::new("t"));
    let (transport, _inbound) = Transport::new(
        test_config("https://api.example.com"),
        connector,
        token_provider,
    );
    assert_eq!(transport.status(), ConnectionStatus::Disconnected);
    transport.disconnect().await;
    assert_eq!(transport.status(), ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn deprecate_socket_ignores_a_stale_handle() {
    let connector = Arc::new(FakeSocketConnector::always_succeeds());
    let token_provider = Arc::new(StaticTokenProvider::new("t"));
    let (transport, _inbound) = Transport::new(
        test_config("https://api.example.com"),
        connector,
        token_provider,
    );
    transport
        .connect_with_options(ConnectRequestOptions::default())
        .await
        .unwrap();
    let stale = SocketHandle(0);
    transport.deprecate_socket(stale).await;
    // The real socket (generation 1) is untouched by a stale handle.
    transport.emit("x", serde_json::json!(null)).await;
    assert_eq!(transport.status(), ConnectionStatus::Connected);
}
