//! Token endpoint
//!
//! Redeems encrypted authorization codes and relays refresh requests.
//! Request bodies are `application/x-www-form-urlencoded`, responses are
//! always JSON, and every error body follows RFC 6749 §5.2. Failure
//! descriptions never reveal which internal check rejected the grant.

use crate::auth::{auth_code, pkce, unix_now, DownstreamTokens};
use crate::config::{AuthStrategy, DownstreamConfig};
use crate::mcp::server::AppState;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Per-request timeout on the refresh relay
const REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

/// Token endpoint form body. `client_id` is accepted but unverified: all
/// clients are public clients bound only by PKCE.
#[derive(Debug, Deserialize)]
pub struct TokenForm {
    pub grant_type: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub code_verifier: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    pub client_id: Option<String>,
}

/// Successful token response
#[derive(Debug, Serialize)]
struct TokenResponse {
    access_token: String,
    token_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_in: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

/// POST /token/mcp/{name} — code exchange and refresh
pub async fn token(
    name: web::Path<String>,
    form: web::Form<TokenForm>,
    state: web::Data<Arc<AppState>>,
) -> HttpResponse {
    let Some(ds) = state.registry.lookup(&name) else {
        return HttpResponse::NotFound().body(format!("Unknown MCP server: {}", name));
    };

    match form.grant_type.as_str() {
        "authorization_code" => exchange_code(&name, &form, &state).await,
        "refresh_token" => {
            if ds.strategy != AuthStrategy::ChainedOauth {
                return oauth_error(
                    "unsupported_grant_type",
                    "This server does not issue refresh tokens",
                );
            }
            refresh(ds, &form, &state).await
        }
        other => {
            warn!("Token request with unsupported grant_type '{}'", other);
            oauth_error(
                "unsupported_grant_type",
                "Supported grant types: authorization_code, refresh_token",
            )
        }
    }
}

async fn exchange_code(
    name: &str,
    form: &TokenForm,
    state: &web::Data<Arc<AppState>>,
) -> HttpResponse {
    let (Some(code), Some(verifier), Some(redirect_uri)) =
        (&form.code, &form.code_verifier, &form.redirect_uri)
    else {
        return oauth_error(
            "invalid_request",
            "code, code_verifier and redirect_uri are required",
        );
    };

    let grant = match auth_code::open(code, state.state_secret(), unix_now()) {
        Ok(grant) => grant,
        Err(e) => {
            // Log the internal reason; the client sees a uniform rejection.
            warn!("Rejected authorization code for '{}': {}", name, e);
            return invalid_grant();
        }
    };

    if grant.redirect_uri != *redirect_uri {
        warn!("Redirect URI mismatch on code redemption for '{}'", name);
        return invalid_grant();
    }

    match pkce::verify(verifier, &grant.pkce_challenge) {
        Ok(true) => {}
        Ok(false) => {
            warn!("PKCE verification failed for '{}'", name);
            return invalid_grant();
        }
        Err(e) => {
            warn!("PKCE protocol error for '{}': {}", name, e);
            return invalid_grant();
        }
    }

    let body = match grant.downstream_tokens {
        DownstreamTokens::Passthrough { access_token } => TokenResponse {
            access_token,
            token_type: "Bearer",
            expires_in: None,
            refresh_token: None,
        },
        DownstreamTokens::ChainedOauth {
            access_token,
            refresh_token,
            expires_in,
        } => TokenResponse {
            access_token,
            token_type: "Bearer",
            expires_in,
            refresh_token,
        },
    };

    info!("Redeemed authorization code for '{}'", name);
    HttpResponse::Ok()
        .insert_header(("Cache-Control", "no-store"))
        .json(body)
}

async fn refresh(
    ds: &DownstreamConfig,
    form: &TokenForm,
    state: &web::Data<Arc<AppState>>,
) -> HttpResponse {
    let Some(refresh_token) = &form.refresh_token else {
        return oauth_error("invalid_request", "refresh_token is required");
    };

    let response = state
        .http_client
        .post(&ds.oauth_token_url)
        .timeout(REFRESH_TIMEOUT)
        .header("Accept", &ds.oauth_token_accept)
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", &ds.oauth_client_id),
            ("client_secret", &ds.oauth_client_secret),
        ])
        .send()
        .await;

    match response {
        Ok(response) if response.status().is_success() => {
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("application/json")
                .to_string();
            match response.bytes().await {
                Ok(body) => {
                    info!("Relayed token refresh for '{}'", ds.name);
                    HttpResponse::Ok()
                        .insert_header(("Cache-Control", "no-store"))
                        .content_type(content_type)
                        .body(body)
                }
                Err(e) => {
                    warn!("Failed reading refresh response for '{}': {}", ds.name, e);
                    refresh_rejected()
                }
            }
        }
        Ok(response) => {
            warn!(
                "Token refresh for '{}' rejected upstream with status {}",
                ds.name,
                response.status()
            );
            refresh_rejected()
        }
        Err(e) => {
            warn!("Token refresh for '{}' failed: {}", ds.name, e);
            refresh_rejected()
        }
    }
}

fn invalid_grant() -> HttpResponse {
    oauth_error(
        "invalid_grant",
        "Authorization code is invalid, expired, or does not match this request",
    )
}

fn refresh_rejected() -> HttpResponse {
    oauth_error(
        "invalid_grant",
        "Refresh token invalid or expired. User must re-authorize.",
    )
}

/// RFC 6749 §5.2 error body
fn oauth_error(error: &str, description: &str) -> HttpResponse {
    HttpResponse::BadRequest()
        .insert_header(("Cache-Control", "no-store"))
        .json(serde_json::json!({
            "error": error,
            "error_description": description,
        }))
}
