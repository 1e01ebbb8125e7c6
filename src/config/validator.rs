//! Startup configuration validation
//!
//! All invariants on the configuration are checked once here, before the
//! server binds. Request-time code can therefore assume a well-formed
//! registry and never re-validate.

use crate::config::{AuthStrategy, Config, DownstreamConfig, ServerConfig};
use crate::error::{ProxyError, Result};
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, warn};
use url::Url;

/// Validator for the proxy configuration. Fails fast with a descriptive
/// error on the first violation.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the entire configuration
    pub fn validate(config: &Config) -> Result<()> {
        debug!("Validating proxy configuration");
        Self::validate_server(&config.server)?;
        Self::validate_downstreams(&config.downstreams)?;
        Ok(())
    }

    fn validate_server(server: &ServerConfig) -> Result<()> {
        if server.public_url.is_empty() {
            return Err(ProxyError::validation("server.public_url is required"));
        }
        if server.public_url.ends_with('/') {
            return Err(ProxyError::validation(
                "server.public_url must not have a trailing slash",
            ));
        }
        match Url::parse(&server.public_url) {
            Ok(url) => {
                // http:// is tolerated for local development
                if url.scheme() != "https" {
                    warn!(
                        "server.public_url uses scheme '{}' — HTTPS is required for production deployments",
                        url.scheme()
                    );
                }
            }
            Err(e) => {
                return Err(ProxyError::validation(format!(
                    "server.public_url is not a valid URL: {}",
                    e
                )));
            }
        }

        if server.state_secret.is_empty() {
            return Err(ProxyError::validation("server.state_secret is required"));
        }
        let decoded = server.decoded_state_secret().map_err(|e| {
            ProxyError::validation(format!("server.state_secret: {}", e))
        })?;
        if decoded.len() < 32 {
            return Err(ProxyError::validation(format!(
                "server.state_secret must decode to at least 32 bytes (got {}). Generate one with: openssl rand -base64 32",
                decoded.len()
            )));
        }

        Ok(())
    }

    fn validate_downstreams(downstreams: &[DownstreamConfig]) -> Result<()> {
        if downstreams.is_empty() {
            return Err(ProxyError::validation(
                "At least one [[downstream]] entry is required",
            ));
        }

        let name_pattern = Regex::new(r"^[a-z0-9-]+$").expect("static pattern");
        let mut seen_names = HashSet::new();

        for ds in downstreams {
            if !name_pattern.is_match(&ds.name) {
                return Err(ProxyError::validation(format!(
                    "downstream '{}': name must match ^[a-z0-9-]+$ (lowercase alphanumerics and hyphens)",
                    ds.name
                )));
            }
            if !seen_names.insert(ds.name.as_str()) {
                return Err(ProxyError::validation(format!(
                    "downstream '{}': duplicate name — each downstream needs a unique name",
                    ds.name
                )));
            }
            if ds.display_name.is_empty() {
                return Err(ProxyError::validation(format!(
                    "downstream '{}': display_name is required",
                    ds.name
                )));
            }

            match Url::parse(&ds.downstream_url) {
                Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
                Ok(url) => {
                    return Err(ProxyError::validation(format!(
                        "downstream '{}': downstream_url must be http(s), got scheme '{}'",
                        ds.name,
                        url.scheme()
                    )));
                }
                Err(e) => {
                    return Err(ProxyError::validation(format!(
                        "downstream '{}': downstream_url is not a valid URL: {}",
                        ds.name, e
                    )));
                }
            }

            // Any header-name-shaped value is accepted; the three scheme
            // formats are handled specially by the remapper.
            if !matches!(ds.auth_header_format.as_str(), "Bearer" | "token" | "Basic")
                && reqwest::header::HeaderName::from_bytes(ds.auth_header_format.as_bytes())
                    .is_err()
            {
                return Err(ProxyError::validation(format!(
                    "downstream '{}': auth_header_format '{}' is neither a known scheme (Bearer, token, Basic) nor a valid header name",
                    ds.name, ds.auth_header_format
                )));
            }

            if ds.strategy == AuthStrategy::ChainedOauth {
                let missing: Vec<&str> = [
                    ("oauth_authorize_url", ds.oauth_authorize_url.as_str()),
                    ("oauth_token_url", ds.oauth_token_url.as_str()),
                    ("oauth_client_id", ds.oauth_client_id.as_str()),
                    ("oauth_client_secret", ds.oauth_client_secret.as_str()),
                ]
                .iter()
                .filter(|(_, v)| v.is_empty())
                .map(|(k, _)| *k)
                .collect();

                if !missing.is_empty() {
                    return Err(ProxyError::validation(format!(
                        "downstream '{}': chained_oauth strategy requires: {}",
                        ds.name,
                        missing.join(", ")
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    fn valid_server() -> ServerConfig {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 8080,
            public_url: "https://proxy.example.com".to_string(),
            state_secret: STANDARD.encode([0u8; 32]),
            auth_code_ttl: 300,
        }
    }

    fn passthrough_downstream(name: &str) -> DownstreamConfig {
        DownstreamConfig {
            name: name.to_string(),
            display_name: "Test".to_string(),
            strategy: AuthStrategy::Passthrough,
            downstream_url: "https://mcp.example.com/sse".to_string(),
            auth_header_format: "Bearer".to_string(),
            scopes: String::new(),
            auth_hint: String::new(),
            oauth_authorize_url: String::new(),
            oauth_token_url: String::new(),
            oauth_client_id: String::new(),
            oauth_client_secret: String::new(),
            oauth_scopes: String::new(),
            oauth_supports_refresh: false,
            oauth_token_accept: "application/json".to_string(),
        }
    }

    fn config_with(downstreams: Vec<DownstreamConfig>) -> Config {
        Config {
            server: valid_server(),
            downstreams,
        }
    }

    #[test]
    fn accepts_valid_config() {
        let config = config_with(vec![passthrough_downstream("linear")]);
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn rejects_empty_downstream_list() {
        let config = config_with(vec![]);
        assert!(ConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn rejects_invalid_name_pattern() {
        let config = config_with(vec![passthrough_downstream("Not_Valid")]);
        let err = ConfigValidator::validate(&config).unwrap_err();
        assert!(err.to_string().contains("must match"));
    }

    #[test]
    fn rejects_duplicate_names() {
        let config = config_with(vec![
            passthrough_downstream("linear"),
            passthrough_downstream("linear"),
        ]);
        let err = ConfigValidator::validate(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate name"));
    }

    #[test]
    fn rejects_short_state_secret() {
        let mut config = config_with(vec![passthrough_downstream("linear")]);
        config.server.state_secret = STANDARD.encode([0u8; 16]);
        let err = ConfigValidator::validate(&config).unwrap_err();
        assert!(err.to_string().contains("at least 32 bytes"));
    }

    #[test]
    fn rejects_trailing_slash_public_url() {
        let mut config = config_with(vec![passthrough_downstream("linear")]);
        config.server.public_url = "https://proxy.example.com/".to_string();
        assert!(ConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn rejects_chained_oauth_missing_fields() {
        let mut ds = passthrough_downstream("github");
        ds.strategy = AuthStrategy::ChainedOauth;
        ds.oauth_authorize_url = "https://github.com/login/oauth/authorize".to_string();
        let config = config_with(vec![ds]);
        let err = ConfigValidator::validate(&config).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("oauth_token_url"));
        assert!(msg.contains("oauth_client_id"));
        assert!(msg.contains("oauth_client_secret"));
        assert!(!msg.contains("oauth_authorize_url"));
    }

    #[test]
    fn accepts_custom_header_format() {
        let mut ds = passthrough_downstream("custom");
        ds.auth_header_format = "X-API-Key".to_string();
        let config = config_with(vec![ds]);
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn rejects_malformed_header_format() {
        let mut ds = passthrough_downstream("bad");
        ds.auth_header_format = "not a header\nname".to_string();
        let config = config_with(vec![ds]);
        assert!(ConfigValidator::validate(&config).is_err());
    }
}
