//! Authorization endpoints
//!
//! The authorize step has two shapes. Passthrough downstreams get an HTML
//! form where the user pastes a static credential; submitting it mints the
//! encrypted authorization code directly. Chained-OAuth downstreams get a
//! 302 to their IdP with the whole flow context signed into the `state`
//! parameter; the IdP calls back here, the proxy exchanges the IdP code
//! server-to-server, and only then mints its own code.

use crate::auth::{auth_code, flow_state, unix_now, AuthCodeGrant, DownstreamTokens, FlowState};
use crate::config::{AuthStrategy, DownstreamConfig};
use crate::mcp::server::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use urlencoding::encode;

/// Per-request timeout on the IdP code exchange
const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(30);

/// GET /authorize/mcp/{name} — start an authorization flow
pub async fn authorize_get(
    name: web::Path<String>,
    query: web::Query<HashMap<String, String>>,
    state: web::Data<Arc<AppState>>,
) -> HttpResponse {
    let Some(ds) = state.registry.lookup(&name) else {
        return HttpResponse::NotFound().body(format!("Unknown MCP server: {}", name));
    };

    // OAuth 2.1 request validation. Every parameter below is required; only
    // code + S256 are supported.
    let mut params = HashMap::new();
    for key in [
        "response_type",
        "redirect_uri",
        "code_challenge",
        "code_challenge_method",
        "state",
    ] {
        match query.get(key) {
            Some(value) if !value.is_empty() => {
                params.insert(key, value.as_str());
            }
            _ => {
                return HttpResponse::BadRequest()
                    .body(format!("Missing required parameter: {}", key));
            }
        }
    }
    if params["response_type"] != "code" {
        return HttpResponse::BadRequest().body("Unsupported response_type: only 'code' is supported");
    }
    if params["code_challenge_method"] != "S256" {
        return HttpResponse::BadRequest()
            .body("Unsupported code_challenge_method: only 'S256' is supported");
    }

    match ds.strategy {
        AuthStrategy::Passthrough => {
            info!("Rendering credential form for downstream '{}'", ds.name);
            HttpResponse::Ok()
                .content_type("text/html; charset=utf-8")
                .body(render_credential_form(ds, &params))
        }
        AuthStrategy::ChainedOauth => {
            let now = unix_now();
            let flow = FlowState::new(
                params["state"].to_string(),
                params["redirect_uri"].to_string(),
                params["code_challenge"].to_string(),
                now,
            );
            let signed = match flow_state::sign(&flow, state.state_secret()) {
                Ok(signed) => signed,
                Err(e) => {
                    error!("Failed to sign flow state: {}", e);
                    return HttpResponse::InternalServerError().body("Internal error");
                }
            };

            let callback_url = format!("{}/callback/mcp/{}", state.public_url, ds.name);
            let location = format!(
                "{}?client_id={}&redirect_uri={}&state={}&scope={}&response_type=code",
                ds.oauth_authorize_url,
                encode(&ds.oauth_client_id),
                encode(&callback_url),
                encode(&signed),
                encode(&ds.oauth_scopes),
            );
            info!("Redirecting to IdP for downstream '{}'", ds.name);
            HttpResponse::Found()
                .append_header(("Location", location))
                .finish()
        }
    }
}

/// Form body for the passthrough credential submit
#[derive(Debug, Deserialize)]
pub struct CredentialForm {
    pub state: String,
    pub redirect_uri: String,
    pub code_challenge: String,
    pub code_challenge_method: String,
    pub token: String,
}

/// POST /authorize/mcp/{name} — passthrough credential submit
pub async fn authorize_post(
    name: web::Path<String>,
    form: web::Form<CredentialForm>,
    state: web::Data<Arc<AppState>>,
) -> HttpResponse {
    let Some(ds) = state.registry.lookup(&name) else {
        return HttpResponse::NotFound().body(format!("Unknown MCP server: {}", name));
    };
    if ds.strategy != AuthStrategy::Passthrough {
        return HttpResponse::BadRequest()
            .body("Credential submit is only available for passthrough servers");
    }
    if form.code_challenge_method != "S256" {
        return HttpResponse::BadRequest()
            .body("Unsupported code_challenge_method: only 'S256' is supported");
    }
    if form.token.is_empty() {
        return HttpResponse::BadRequest().body("A credential is required");
    }

    let grant = AuthCodeGrant {
        downstream_tokens: DownstreamTokens::Passthrough {
            access_token: form.token.clone(),
        },
        pkce_challenge: form.code_challenge.clone(),
        redirect_uri: form.redirect_uri.clone(),
        exp: unix_now() + state.auth_code_ttl,
    };
    let code = match auth_code::seal(&grant, state.state_secret()) {
        Ok(code) => code,
        Err(e) => {
            error!("Failed to seal authorization code: {}", e);
            return HttpResponse::InternalServerError().body("Internal error");
        }
    };

    info!("Issued authorization code for downstream '{}'", ds.name);
    let location = format!(
        "{}?code={}&state={}",
        form.redirect_uri,
        encode(&code),
        encode(&form.state)
    );
    HttpResponse::Found()
        .append_header(("Location", location))
        .finish()
}

/// Token response from a third-party IdP code exchange. Providers vary in
/// what they return beyond `access_token`; everything else is optional.
#[derive(Debug, Deserialize)]
struct IdpTokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// GET /callback/mcp/{name} — chained-OAuth IdP callback
pub async fn callback(
    name: web::Path<String>,
    query: web::Query<HashMap<String, String>>,
    state: web::Data<Arc<AppState>>,
) -> HttpResponse {
    let Some(ds) = state.registry.lookup(&name) else {
        return HttpResponse::NotFound().body(format!("Unknown MCP server: {}", name));
    };

    let (Some(idp_code), Some(signed_state)) = (query.get("code"), query.get("state")) else {
        return HttpResponse::BadRequest().body("Missing code or state parameter");
    };

    // Verify the signed state before any side effect. A bad signature means
    // the callback was not initiated by this proxy.
    let now = unix_now();
    let flow = match flow_state::verify(signed_state, state.state_secret(), now) {
        Ok(flow) => flow,
        Err(e) => {
            warn!("Rejected callback for '{}': {}", ds.name, e);
            return HttpResponse::BadRequest().body("Invalid or expired state");
        }
    };

    // Server-to-server code exchange with the IdP
    let callback_url = format!("{}/callback/mcp/{}", state.public_url, ds.name);
    let response = state
        .http_client
        .post(&ds.oauth_token_url)
        .timeout(EXCHANGE_TIMEOUT)
        .header("Accept", &ds.oauth_token_accept)
        .json(&serde_json::json!({
            "client_id": ds.oauth_client_id,
            "client_secret": ds.oauth_client_secret,
            "code": idp_code,
            "redirect_uri": callback_url,
        }))
        .send()
        .await;

    let response = match response {
        Ok(response) => response,
        Err(e) => {
            error!("IdP code exchange failed for '{}': {}", ds.name, e);
            return HttpResponse::BadGateway().body("Upstream authorization server unreachable");
        }
    };
    if !response.status().is_success() {
        error!(
            "IdP code exchange for '{}' returned status {}",
            ds.name,
            response.status()
        );
        return HttpResponse::BadGateway().body("Upstream authorization server rejected the code");
    }

    let tokens: IdpTokenResponse = match response.json().await {
        Ok(tokens) => tokens,
        Err(e) => {
            error!("Failed to parse IdP token response for '{}': {}", ds.name, e);
            return HttpResponse::BadGateway().body("Invalid upstream token response");
        }
    };

    let grant = AuthCodeGrant {
        downstream_tokens: DownstreamTokens::ChainedOauth {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
        },
        pkce_challenge: flow.pkce_challenge,
        redirect_uri: flow.claude_redirect_uri.clone(),
        exp: now + state.auth_code_ttl,
    };
    let code = match auth_code::seal(&grant, state.state_secret()) {
        Ok(code) => code,
        Err(e) => {
            error!("Failed to seal authorization code: {}", e);
            return HttpResponse::InternalServerError().body("Internal error");
        }
    };

    info!("Completed chained OAuth flow for downstream '{}'", ds.name);
    let location = format!(
        "{}?code={}&state={}",
        flow.claude_redirect_uri,
        encode(&code),
        encode(&flow.claude_state)
    );
    HttpResponse::Found()
        .append_header(("Location", location))
        .finish()
}

/// Render the passthrough credential form. All request-derived values land
/// in attribute position and are escaped.
fn render_credential_form(ds: &DownstreamConfig, params: &HashMap<&str, &str>) -> String {
    let hint = if ds.auth_hint.is_empty() {
        String::new()
    } else {
        format!("<p class=\"hint\">{}</p>", escape_html(&ds.auth_hint))
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Connect to {display_name}</title>
  <style>
    body {{ font-family: system-ui, sans-serif; max-width: 26rem; margin: 4rem auto; padding: 0 1rem; }}
    label {{ display: block; margin-bottom: .5rem; }}
    input[type=password] {{ width: 100%; padding: .5rem; margin-bottom: 1rem; }}
    button {{ padding: .5rem 1.5rem; }}
    .hint {{ color: #555; }}
  </style>
</head>
<body>
  <h1>Connect to {display_name}</h1>
  {hint}
  <form method="post" action="">
    <input type="hidden" name="state" value="{state}">
    <input type="hidden" name="redirect_uri" value="{redirect_uri}">
    <input type="hidden" name="code_challenge" value="{code_challenge}">
    <input type="hidden" name="code_challenge_method" value="{code_challenge_method}">
    <label for="token">API credential</label>
    <input type="password" id="token" name="token" autocomplete="off" required>
    <button type="submit">Authorize</button>
  </form>
</body>
</html>
"#,
        display_name = escape_html(&ds.display_name),
        hint = hint,
        state = escape_html(params["state"]),
        redirect_uri = escape_html(params["redirect_uri"]),
        code_challenge = escape_html(params["code_challenge"]),
        code_challenge_method = escape_html(params["code_challenge_method"]),
    )
}

/// Minimal HTML attribute/body escaping
fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
