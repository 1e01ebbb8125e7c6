//! MCP proxy surface
//!
//! The HTTP server, route table, and the forwarding handlers that relay MCP
//! traffic to downstream servers.

pub mod forwarder;
pub mod server;

pub use server::{AppState, ProxyServer};
