//! Authentication primitives for authtunnel
//!
//! This module holds the stateless building blocks the authorization server
//! and the MCP forwarder are assembled from: PKCE verification, AEAD-sealed
//! authorization codes, HMAC-signed flow state, and the downstream
//! auth-header remapper.

pub mod auth_code;
pub mod flow_state;
pub mod header_remap;
pub mod pkce;

pub use auth_code::{AuthCodeGrant, DownstreamTokens};
pub use flow_state::FlowState;
pub use header_remap::{extract_bearer, remap_header};

use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix time in seconds. The codecs take `now` as a parameter so
/// tests control the clock; request handlers call this.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
