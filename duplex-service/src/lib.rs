//! Service façade for the conversational-agent session runtime (spec
//! §2 "Service façade"). Binds [`duplex_runtime::Manager`] to an
//! authenticated [`duplex_transport::Transport`], wires `duplex-replay`
//! in for session resumption, and exposes the REST surface the CLI and
//! SDK wrappers (out of scope here — see spec §1) call into.

mod rest_client;
mod service;

pub use rest_client::ConversationRestClient;
pub use rest_client::CreateConversationOptions;
pub use rest_client::ListConversationsOptions;
pub use rest_client::UpdateConversationPatch;
pub use rest_client::UploadedAttachment;
pub use service::DuplexService;
pub use service::EVENT_NAME;
