//! authtunnel - OAuth 2.1 credential-translating reverse proxy for MCP servers
//!
//! This crate fronts downstream MCP servers that authenticate with static API
//! keys, bearer tokens, or their own OAuth providers, and exposes each of them
//! behind a standards-compliant OAuth 2.1 authorization server with PKCE.
//! The proxy holds no per-user server-side state: authorization codes are
//! AEAD-sealed blobs and chained-OAuth flow state is HMAC-signed, so any
//! instance can serve any request.

pub mod auth;
pub mod config;
pub mod error;
pub mod mcp;
pub mod oauth;
pub mod registry;

pub use config::{AuthStrategy, Config, DownstreamConfig, ServerConfig};
pub use error::{ProxyError, Result};
pub use mcp::{AppState, ProxyServer};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";
