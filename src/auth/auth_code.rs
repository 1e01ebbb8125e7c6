//! Stateless encrypted authorization codes
//!
//! The authorization code handed to the client is itself an AES-256-GCM
//! sealed blob carrying the downstream tokens, the PKCE challenge, the
//! redirect URI, and an embedded expiry. Redemption decrypts and checks the
//! expiry; no server-side store, sweeper, or cross-instance coordination
//! exists. The GCM tag makes tampering indistinguishable from corruption.
//!
//! Wire format: `base64url_no_pad( nonce(12) || ciphertext || tag )`

use crate::error::{ProxyError, Result};
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Upper bound on an encoded code before any decoding happens
const MAX_SEALED_LEN: usize = 64 * 1024;

/// AES-GCM nonce size in bytes
const NONCE_LEN: usize = 12;

/// Tokens embedded inside the encrypted authorization code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DownstreamTokens {
    /// A user-supplied static credential treated as the access token
    #[serde(rename = "passthrough")]
    Passthrough { access_token: String },
    /// Tokens obtained from the downstream's own identity provider
    #[serde(rename = "chained_oauth")]
    ChainedOauth {
        access_token: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        refresh_token: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        expires_in: Option<u64>,
    },
}

/// The plaintext grant sealed inside an authorization code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthCodeGrant {
    /// Downstream credential material
    pub downstream_tokens: DownstreamTokens,
    /// S256 challenge the redeeming verifier must hash to
    pub pkce_challenge: String,
    /// Client redirect URI, matched byte-for-byte at redemption
    pub redirect_uri: String,
    /// Absolute expiry, unix seconds
    pub exp: u64,
}

/// Derive the 256-bit AEAD key from the server's raw secret bytes.
/// Hashing gives a fixed-size key for any ≥32-byte operator secret without a
/// separate KDF step.
fn derive_key(secret: &[u8]) -> [u8; 32] {
    Sha256::digest(secret).into()
}

/// Seal a grant into an authorization code safe for use as a URL query value.
pub fn seal(grant: &AuthCodeGrant, secret: &[u8]) -> Result<String> {
    let plaintext = serde_json::to_vec(grant)?;

    let cipher = Aes256Gcm::new_from_slice(&derive_key(secret))
        .map_err(|e| ProxyError::grant(format!("failed to create cipher: {}", e)))?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_ref())
        .map_err(|e| ProxyError::grant(format!("encryption failed: {}", e)))?;

    let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&ciphertext);

    Ok(URL_SAFE_NO_PAD.encode(&blob))
}

/// Open an authorization code and return the embedded grant.
///
/// Every failure mode — bad encoding, truncation, tampering, wrong key,
/// malformed payload, expiry — surfaces as a `Grant` error. The messages
/// differ for internal logging, but the token endpoint collapses all of them
/// into a single `invalid_grant` response.
pub fn open(code: &str, secret: &[u8], now: u64) -> Result<AuthCodeGrant> {
    if code.len() > MAX_SEALED_LEN {
        return Err(ProxyError::grant("authorization code exceeds size limit"));
    }

    let blob = URL_SAFE_NO_PAD
        .decode(code)
        .map_err(|_| ProxyError::grant("authorization code is not valid base64url"))?;

    if blob.len() <= NONCE_LEN {
        return Err(ProxyError::grant("authorization code too short"));
    }
    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(&derive_key(secret))
        .map_err(|e| ProxyError::grant(format!("failed to create cipher: {}", e)))?;

    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| ProxyError::grant("authorization code failed authentication"))?;

    let grant: AuthCodeGrant = serde_json::from_slice(&plaintext)
        .map_err(|_| ProxyError::grant("authorization code payload is malformed"))?;

    if grant.exp <= now {
        return Err(ProxyError::grant("authorization code expired"));
    }

    Ok(grant)
}
