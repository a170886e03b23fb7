//! WebSocket transport for the conversational-agent session runtime
//! (spec §4.1). Treats the wire as a black-box JSON event bus; framing
//! (handshake, packet types) lives in a concrete [`event_bus::SocketConnector`]
//! implementation, not here.

mod backoff;
pub mod config;
pub mod event_bus;
pub mod status;
pub mod test_support;
mod token_provider;
mod transport;

pub use config::LogLevel;
pub use config::TransportConfig;
pub use config::TransportConfigBuilder;
pub use event_bus::ConnectOptions;
pub use event_bus::Socket;
pub use event_bus::SocketConnector;
pub use status::ConnectionStatus;
pub use status::ConnectionStatusEvent;
pub use token_provider::StaticTokenProvider;
pub use token_provider::TokenProvider;
pub use transport::ConnectRequestOptions;
pub use transport::SocketHandle;
pub use transport::Transport;
