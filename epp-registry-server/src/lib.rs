//! TCP frontend for the EPP registry backend.
//!
//! Speaks EPP over the RFC 5734 length-prefixed framing: greeting on
//! connect, then a command/response loop driven through the flow engine in
//! `epp-registry-core`. Library form so integration tests can run a full
//! server on an ephemeral port.

pub mod config;
pub mod frame;
pub mod server;
pub mod session;

pub use config::ServerConfig;
pub use server::Server;
