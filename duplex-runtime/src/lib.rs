//! The Helper tree and Manager for the conversational-agent session
//! runtime (spec §4.3-§4.6, §9 "Polymorphic Helpers").
//!
//! Every Helper variant (`SessionHandle`, `ExchangeHandle`,
//! `MessageHandle`, `ToolCallHandle`, `AsyncOutputStreamHandle`,
//! `AsyncInputStreamHandle`) is a cheap `Rc<RefCell<_>>` clone handle
//! over its own `*Inner` state, composed from the shared
//! [`core::CommonCore`] fields rather than inherited from a base class —
//! Rust has no struct inheritance, and the shared shape is small enough
//! that composition plus a little repetition per variant reads better
//! than a trait-object detour.
//!
//! This crate is not `Send`: the Helper tree is single-threaded
//! cooperative (spec §5). `duplex-transport` is the only `Send`/async
//! boundary; `duplex-service` is the seam that pumps decoded envelopes
//! from the transport into [`manager::Manager::dispatch`] on the task
//! that owns this tree.

pub mod collections;
pub mod core;
pub mod exchange;
pub mod handler;
pub mod manager;
pub mod message;
pub mod session;
pub mod sinks;
pub mod stream;
pub mod tool_call;

pub use core::ConnectionStatus;
pub use exchange::ExchangeHandle;
pub use manager::Manager;
pub use message::MessageHandle;
pub use session::SessionHandle;
pub use sinks::ManagerSinks;
pub use stream::AsyncInputStreamHandle;
pub use stream::AsyncOutputStreamHandle;
pub use tool_call::ToolCallHandle;
