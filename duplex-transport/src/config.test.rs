use super::*;
use pretty_assertions::assert_eq;

#[test]
fn builder_fills_in_documented_defaults() {
    let config = TransportConfig::builder("https://api.example.com").build();
    assert_eq!(config.timeout_ms, 5000);
    assert!(config.reconnection);
    assert_eq!(config.reconnection_attempts, None);
    assert_eq!(config.reconnection_delay_ms, 200);
    assert_eq!(config.reconnection_delay_max_ms, 30_000);
    assert_eq!(config.log_level, LogLevel::Info);
}

#[test]
fn websocket_url_swaps_https_to_wss() {
    let config = TransportConfig::builder("https://api.example.com/agent").build();
    let url = config.websocket_url().unwrap();
    assert_eq!(url.scheme(), "wss");
    assert_eq!(url.path(), "/agent");
}

#[test]
fn websocket_url_swaps_http_to_ws() {
    let config = TransportConfig::builder("http://api.example.com").build();
    let url = config.websocket_url().unwrap();
    assert_eq!(url.scheme(), "ws");
}

#[test]
fn websocket_url_defaults_socket_io_path_for_localhost() {
    let config = TransportConfig::builder("http://localhost:8080").build();
    let url = config.websocket_url().unwrap();
    assert_eq!(url.path(), "/socket.io");
}

#[test]
fn websocket_url_leaves_cloud_path_alone() {
    let config = TransportConfig::builder("https://cloud.example.com/custom").build();
    let url = config.websocket_url().unwrap();
    assert_eq!(url.path(), "/custom");
}

#[test]
fn deserializes_from_json_with_only_base_url() {
    let config: TransportConfig =
        serde_json::from_value(serde_json::json!({"baseUrl": "https://x.test"})).unwrap();
    assert_eq!(config.base_url, "https://x.test");
    assert_eq!(config.timeout_ms, 5000);
}
