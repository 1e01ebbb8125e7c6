//! OAuth discovery metadata endpoints
//!
//! Two static documents per downstream, with every URL derived from the
//! configured public URL and the downstream's path segment. Clients find the
//! authorization server through these before starting a flow.

use crate::config::AuthStrategy;
use crate::mcp::server::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;
use std::sync::Arc;

/// GET /.well-known/oauth-protected-resource/mcp/{name}
pub async fn protected_resource(
    name: web::Path<String>,
    state: web::Data<Arc<AppState>>,
) -> HttpResponse {
    let Some(ds) = state.registry.lookup(&name) else {
        return HttpResponse::NotFound().body(format!("Unknown MCP server: {}", name));
    };

    let resource = format!("{}/mcp/{}", state.public_url, ds.name);
    let mut doc = json!({
        "resource": resource,
        "authorization_servers": [resource],
    });
    if !ds.scopes.is_empty() {
        doc["scopes_supported"] =
            json!(ds.scopes.split_whitespace().collect::<Vec<_>>());
    }

    HttpResponse::Ok().json(doc)
}

/// GET /.well-known/oauth-authorization-server/mcp/{name}
pub async fn authorization_server(
    name: web::Path<String>,
    state: web::Data<Arc<AppState>>,
) -> HttpResponse {
    let Some(ds) = state.registry.lookup(&name) else {
        return HttpResponse::NotFound().body(format!("Unknown MCP server: {}", name));
    };

    // Passthrough codes carry a static credential, so there is nothing to
    // refresh; chained downstreams relay refresh requests to their IdP.
    let grant_types: Vec<&str> = match ds.strategy {
        AuthStrategy::ChainedOauth => vec!["authorization_code", "refresh_token"],
        AuthStrategy::Passthrough => vec!["authorization_code"],
    };

    let base = &state.public_url;
    let mut doc = json!({
        "issuer": format!("{}/mcp/{}", base, ds.name),
        "authorization_endpoint": format!("{}/authorize/mcp/{}", base, ds.name),
        "token_endpoint": format!("{}/token/mcp/{}", base, ds.name),
        "response_types_supported": ["code"],
        "grant_types_supported": grant_types,
        "code_challenge_methods_supported": ["S256"],
        "token_endpoint_auth_methods_supported": ["none"],
    });
    if !ds.scopes.is_empty() {
        doc["scopes_supported"] =
            json!(ds.scopes.split_whitespace().collect::<Vec<_>>());
    }

    HttpResponse::Ok().json(doc)
}
