use super::*;
use async_trait::async_trait;
use duplex_protocol::ExchangeRecord;
use duplex_protocol::MessageRecord;
use duplex_protocol::Role;
use duplex_transport::StaticTokenProvider;
use duplex_transport::TransportConfigBuilder;
use duplex_transport::test_support::FakeSocketConnector;
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::sync::Mutex;
use std::time::Duration;

struct StubRestClient {
    snapshot: Mutex<Option<ConversationSnapshot>>,
}

#[async_trait]
impl ConversationRestClient for StubRestClient {
    async fn create(&self, _agent_id: &str, _folder_id: Option<&str>, _opts: CreateConversationOptions) -> Result<ConversationSnapshot, RuntimeError> {
        unimplemented!("not exercised by these tests")
    }

    async fn get_by_id(&self, _id: &str) -> Result<ConversationSnapshot, RuntimeError> {
        Ok(self.snapshot.lock().unwrap().clone().expect("snapshot configured"))
    }

    async fn get_all(&self, _opts: ListConversationsOptions) -> Result<Vec<ConversationSnapshot>, RuntimeError> {
        Ok(Vec::new())
    }

    async fn update_by_id(&self, _id: &str, _patch: UpdateConversationPatch) -> Result<ConversationSnapshot, RuntimeError> {
        unimplemented!("not exercised by these tests")
    }

    async fn delete_by_id(&self, _id: &str) -> Result<(), RuntimeError> {
        Ok(())
    }

    async fn upload_attachment(&self, _conversation_id: &str, _file_name: &str, _bytes: Vec<u8>) -> Result<UploadedAttachment, RuntimeError> {
        unimplemented!("not exercised by these tests")
    }
}

fn service_with_connector(snapshot: Option<ConversationSnapshot>) -> (DuplexService, Arc<FakeSocketConnector>) {
    let config = TransportConfigBuilder::new("https://example.test").build();
    let connector = Arc::new(FakeSocketConnector::always_succeeds());
    let token_provider = Arc::new(StaticTokenProvider::new("t1"));
    let rest_client = Arc::new(StubRestClient {
        snapshot: Mutex::new(snapshot),
    });
    let service = DuplexService::new(config, connector.clone(), token_provider, rest_client);
    (service, connector)
}

#[tokio::test]
async fn start_session_emits_the_wrapped_envelope_through_the_transport() {
    let (service, connector) = service_with_connector(None);
    service.connect(ConnectRequestOptions::default()).await.unwrap();
    service.start_session("c1", None).unwrap();

    // The outbound pump is a separate spawned task; give it a turn.
    tokio::time::sleep(Duration::from_millis(10)).await;

    let socket = connector.last_socket().unwrap();
    let emitted = socket.emitted_events();
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].0, EVENT_NAME);
    assert_eq!(emitted[0].1["conversationId"], "c1");
    assert!(emitted[0].1.get("startSession").is_some());
}

#[tokio::test]
async fn run_dispatches_inbound_raw_events_into_the_manager() {
    let (service, connector) = service_with_connector(None);
    service.connect(ConnectRequestOptions::default()).await.unwrap();
    let session = service.start_session("c1", None).unwrap();

    let seen = Rc::new(RefCell::new(false));
    let seen_clone = seen.clone();
    session.on_exchange_start(move |_| *seen_clone.borrow_mut() = true);

    let socket = connector.last_socket().unwrap();
    socket.push_inbound(serde_json::json!({
        "conversationId": "c1",
        "exchange": {
            "exchangeId": "e1",
            "startExchange": {}
        }
    }));

    let _ = tokio::time::timeout(Duration::from_millis(200), service.run()).await;
    assert!(*seen.borrow());
    assert!(session.exchange("e1").is_some());
}

#[tokio::test]
async fn run_mirrors_transport_disconnects_onto_live_sessions() {
    let (service, _connector) = service_with_connector(None);
    service.connect(ConnectRequestOptions::default()).await.unwrap();
    let session = service.start_session("c1", None).unwrap();
    assert_eq!(session.connection_status(), duplex_runtime::ConnectionStatus::Connected);

    service.disconnect().await;
    let _ = tokio::time::timeout(Duration::from_millis(200), service.run()).await;

    assert_eq!(session.connection_status(), duplex_runtime::ConnectionStatus::Disconnected);
    let err = session.send_meta_event(Value::from(1)).unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidOperation { .. }));
}

#[tokio::test]
async fn resume_session_replays_a_snapshot_without_touching_the_transport() {
    let snapshot = ConversationSnapshot {
        conversation_id: "c2".to_string(),
        exchanges: vec![ExchangeRecord {
            exchange_id: "e1".to_string(),
            ended: true,
            metadata: None,
            messages: vec![MessageRecord {
                message_id: "m1".to_string(),
                role: Role::Assistant,
                ended: true,
                content_parts: Vec::new(),
                tool_calls: Vec::new(),
            }],
        }],
    };
    let (service, _connector) = service_with_connector(Some(snapshot));

    let session = service.resume_session("c2").await.unwrap();
    assert_eq!(session.id(), "c2");
    // The exchange ended in the snapshot and was removed from its
    // parent's children map during replay dispatch, same as the live
    // path for any other ended child Helper.
    assert!(session.exchange("e1").is_none());
}

#[test]
fn event_name_matches_the_single_wire_event() {
    assert_eq!(EVENT_NAME, "conversation");
}
