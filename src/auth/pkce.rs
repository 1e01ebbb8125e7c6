//! PKCE (Proof Key for Code Exchange) verification
//!
//! Implements the verifier side of RFC 7636 S256: hash the submitted
//! verifier, compare to the challenge stored inside the authorization code.
//! Only S256 is supported; `plain` is rejected at the authorize endpoint.

use crate::error::{ProxyError, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// RFC 7636 §4.1 bounds on the code verifier
const MIN_VERIFIER_LEN: usize = 43;
const MAX_VERIFIER_LEN: usize = 128;

/// Verify an S256 code verifier against a stored challenge.
///
/// Returns `Ok(false)` for a well-formed verifier that does not match, and an
/// error for protocol violations: a verifier outside the RFC 7636 length or
/// character set, or an empty stored challenge (which means the authorization
/// code was issued without PKCE and must never validate).
pub fn verify(code_verifier: &str, stored_challenge: &str) -> Result<bool> {
    if stored_challenge.is_empty() {
        return Err(ProxyError::grant("stored PKCE challenge is empty"));
    }
    if code_verifier.len() < MIN_VERIFIER_LEN || code_verifier.len() > MAX_VERIFIER_LEN {
        return Err(ProxyError::grant(format!(
            "code_verifier length {} outside [{}, {}]",
            code_verifier.len(),
            MIN_VERIFIER_LEN,
            MAX_VERIFIER_LEN
        )));
    }
    if !code_verifier.bytes().all(is_unreserved) {
        return Err(ProxyError::grant(
            "code_verifier contains characters outside the RFC 7636 set",
        ));
    }

    let computed = URL_SAFE_NO_PAD.encode(Sha256::digest(code_verifier.as_bytes()));
    Ok(computed.as_bytes().ct_eq(stored_challenge.as_bytes()).into())
}

/// RFC 7636 unreserved characters: ALPHA / DIGIT / "-" / "." / "_" / "~"
fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~')
}
