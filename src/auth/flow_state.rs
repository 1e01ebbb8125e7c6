//! HMAC-signed OAuth flow state
//!
//! Chained-OAuth authorization round-trips through a third-party IdP. The
//! proxy is stateless, so everything needed to finish the flow — the client's
//! original state and redirect URI plus the PKCE challenge — travels inside
//! the `state` parameter itself, HMAC-SHA256 signed so the callback can trust
//! it came from this proxy.
//!
//! Wire format: `base64url_no_pad(payload_json) . base64url_no_pad(tag)`

use crate::error::{ProxyError, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Lifetime of a signed flow state. Generous enough for a user to complete
/// an IdP login page.
pub const FLOW_STATE_TTL_SECS: u64 = 600;

/// State carried through the third-party IdP and back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowState {
    /// The client's opaque state, returned unchanged on the final redirect
    pub claude_state: String,
    /// The client's redirect URI
    pub claude_redirect_uri: String,
    /// S256 challenge to embed in the eventual authorization code
    pub pkce_challenge: String,
    /// Challenge method, always "S256"
    pub pkce_method: String,
    /// Absolute expiry, unix seconds
    pub exp: u64,
}

impl FlowState {
    /// Build a flow state expiring `FLOW_STATE_TTL_SECS` from `now`
    pub fn new(claude_state: String, claude_redirect_uri: String, pkce_challenge: String, now: u64) -> Self {
        Self {
            claude_state,
            claude_redirect_uri,
            pkce_challenge,
            pkce_method: "S256".to_string(),
            exp: now + FLOW_STATE_TTL_SECS,
        }
    }
}

/// Sign a flow state for the trip through the IdP.
pub fn sign(state: &FlowState, secret: &[u8]) -> Result<String> {
    let payload = serde_json::to_vec(state)?;
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| ProxyError::grant(format!("failed to key HMAC: {}", e)))?;
    mac.update(&payload);
    let tag = mac.finalize().into_bytes();
    Ok(format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(&payload),
        URL_SAFE_NO_PAD.encode(tag)
    ))
}

/// Verify a signed flow state and return the payload.
///
/// Every failure — bad framing, bad encoding, MAC mismatch, malformed
/// payload, expiry — returns the same error so callers cannot leak which
/// check failed.
pub fn verify(signed: &str, secret: &[u8], now: u64) -> Result<FlowState> {
    let invalid = || ProxyError::grant("flow state invalid or expired");

    // Split at the LAST dot; the payload may not contain one, but don't
    // depend on that.
    let (payload_b64, tag_b64) = signed.rsplit_once('.').ok_or_else(invalid)?;
    let payload = URL_SAFE_NO_PAD.decode(payload_b64).map_err(|_| invalid())?;
    let tag = URL_SAFE_NO_PAD.decode(tag_b64).map_err(|_| invalid())?;

    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| invalid())?;
    mac.update(&payload);
    mac.verify_slice(&tag).map_err(|_| invalid())?;

    let state: FlowState = serde_json::from_slice(&payload).map_err(|_| invalid())?;
    if state.exp <= now {
        return Err(invalid());
    }
    Ok(state)
}
