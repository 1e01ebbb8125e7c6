//! Configuration types and loading for authtunnel
//!
//! The proxy is configured from a TOML file with one `[server]` table and one
//! `[[downstream]]` entry per proxied MCP server. Environment overrides and
//! validation are applied by the `environment` and `validator` modules.

use crate::error::{ProxyError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use std::path::Path;

/// Top-level configuration parsed from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server-level settings
    pub server: ServerConfig,
    /// Downstream MCP server definitions
    #[serde(rename = "downstream")]
    pub downstreams: Vec<DownstreamConfig>,
}

/// Server-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Externally visible base URL, no trailing slash. All discovery documents
    /// and redirect URIs are derived from it.
    pub public_url: String,
    /// Base64-encoded secret seeding both the AES-256-GCM key for stateless
    /// authorization codes and the HMAC key for signed flow state.
    /// Must decode to at least 32 bytes.
    pub state_secret: String,
    /// Lifetime of issued authorization codes in seconds. The expiry is
    /// embedded inside the encrypted code itself.
    #[serde(default = "default_auth_code_ttl")]
    pub auth_code_ttl: u64,
}

impl ServerConfig {
    /// Decode the base64 state secret into raw key material.
    ///
    /// Validation guarantees this succeeds after startup; the error path only
    /// fires when called on an unvalidated config.
    pub fn decoded_state_secret(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(&self.state_secret)
            .map_err(|e| ProxyError::config(format!("state_secret is not valid base64: {}", e)))
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_auth_code_ttl() -> u64 {
    300
}

/// Authentication strategy for a downstream MCP server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStrategy {
    /// The user pastes a static credential which becomes the access token
    Passthrough,
    /// Full OAuth code flow against the downstream's own identity provider
    ChainedOauth,
}

/// Configuration for a single downstream MCP server
#[derive(Debug, Clone, Deserialize)]
pub struct DownstreamConfig {
    /// URL path segment identifying this downstream. Must match `[a-z0-9-]+`
    /// and be unique across all entries.
    pub name: String,
    /// Human-readable label shown on the authorization page
    pub display_name: String,
    /// Credential translation strategy
    pub strategy: AuthStrategy,
    /// Absolute URL of the MCP endpoint requests are forwarded to
    pub downstream_url: String,
    /// How the downstream expects its credential: `Bearer`, `token`, `Basic`,
    /// or any custom header name such as `X-API-Key`.
    #[serde(default = "default_auth_header_format")]
    pub auth_header_format: String,
    /// Scopes advertised in discovery metadata (may be empty)
    #[serde(default)]
    pub scopes: String,

    // Passthrough-only fields
    /// Help text shown on the credential form
    #[serde(default)]
    pub auth_hint: String,

    // Chained OAuth fields
    #[serde(default)]
    pub oauth_authorize_url: String,
    #[serde(default)]
    pub oauth_token_url: String,
    #[serde(default)]
    pub oauth_client_id: String,
    #[serde(default)]
    pub oauth_client_secret: String,
    #[serde(default)]
    pub oauth_scopes: String,
    /// Whether the IdP issues refresh tokens
    #[serde(default)]
    pub oauth_supports_refresh: bool,
    /// Accept header sent on the IdP code exchange. GitHub wants
    /// `application/json` explicitly; some providers want `application/x-www-form-urlencoded`.
    #[serde(default = "default_oauth_token_accept")]
    pub oauth_token_accept: String,
}

fn default_auth_header_format() -> String {
    "Bearer".to_string()
}

fn default_oauth_token_accept() -> String {
    "application/json".to_string()
}

impl Config {
    /// Read and parse a TOML config file. No validation is performed here;
    /// callers go through `config::load_config` for the full pipeline.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProxyError::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
