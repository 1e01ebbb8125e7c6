//! MCP request forwarding
//!
//! Two passthrough shapes: a long-lived SSE stream (GET) and unary JSON-RPC
//! (POST). Both translate the client's bearer credential into the
//! downstream's auth header and otherwise touch nothing — SSE bytes are
//! forwarded verbatim with no re-framing, so backpressure and framing are
//! whatever the downstream produced. Dropping the client response drops the
//! outbound request with it, which is how cancellation propagates.

use crate::auth::{extract_bearer, remap_header};
use crate::config::DownstreamConfig;
use crate::mcp::server::AppState;
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// GET /mcp/{name} — SSE streaming proxy
pub async fn mcp_sse(
    req: HttpRequest,
    name: web::Path<String>,
    state: web::Data<Arc<AppState>>,
) -> HttpResponse {
    let Some(ds) = state.registry.lookup(&name) else {
        return HttpResponse::NotFound().body(format!("Unknown MCP server: {}", name));
    };

    let (header_name, header_value) = match authenticate(&req, ds, &state) {
        Ok(pair) => pair,
        Err(response) => return response,
    };

    debug!("Opening SSE stream to downstream '{}'", ds.name);
    let response = state
        .http_client
        .get(&ds.downstream_url)
        .header(header_name, header_value)
        .header("Accept", "text/event-stream")
        .send()
        .await;

    let response = match response {
        Ok(response) => response,
        Err(e) => {
            error!("SSE connect to '{}' failed: {}", ds.name, e);
            return HttpResponse::BadGateway().body("Downstream MCP server unreachable");
        }
    };
    if !response.status().is_success() {
        warn!(
            "SSE connect to '{}' returned status {}",
            ds.name,
            response.status()
        );
        return HttpResponse::BadGateway().body("Downstream MCP server refused the connection");
    }

    info!("SSE stream established for '{}'", ds.name);
    // Raw byte passthrough: the downstream's bytes are the response body.
    // actix polls the reqwest stream chunk by chunk, so client-side
    // backpressure reaches the downstream socket, and a client disconnect
    // drops the stream and aborts the outbound request.
    HttpResponse::Ok()
        .insert_header(("Content-Type", "text/event-stream"))
        .insert_header(("Cache-Control", "no-cache"))
        .insert_header(("Connection", "keep-alive"))
        .streaming(response.bytes_stream())
}

/// POST /mcp/{name} — unary JSON-RPC proxy
pub async fn mcp_post(
    req: HttpRequest,
    name: web::Path<String>,
    body: web::Bytes,
    state: web::Data<Arc<AppState>>,
) -> HttpResponse {
    let Some(ds) = state.registry.lookup(&name) else {
        return HttpResponse::NotFound().body(format!("Unknown MCP server: {}", name));
    };

    let (header_name, header_value) = match authenticate(&req, ds, &state) {
        Ok(pair) => pair,
        Err(response) => return response,
    };

    let response = state
        .http_client
        .post(&ds.downstream_url)
        .header(header_name, header_value)
        .header("Content-Type", "application/json")
        .body(body)
        .send()
        .await;

    let response = match response {
        Ok(response) => response,
        Err(e) => {
            error!("JSON-RPC forward to '{}' failed: {}", ds.name, e);
            return HttpResponse::BadGateway().body("Downstream MCP server unreachable");
        }
    };

    let status = StatusCode::from_u16(response.status().as_u16())
        .unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/json")
        .to_string();

    match response.bytes().await {
        Ok(bytes) => {
            debug!(
                "JSON-RPC forward to '{}' completed with status {}",
                ds.name, status
            );
            HttpResponse::build(status).content_type(content_type).body(bytes)
        }
        Err(e) => {
            error!("Failed reading downstream response from '{}': {}", ds.name, e);
            HttpResponse::BadGateway().body("Downstream MCP server connection lost")
        }
    }
}

/// Extract the bearer credential and translate it for the downstream.
/// Failures become the 401 handed back to the client, with a
/// `WWW-Authenticate` challenge pointing at this downstream's resource
/// metadata so MCP clients can discover the authorization server.
fn authenticate(
    req: &HttpRequest,
    ds: &DownstreamConfig,
    state: &web::Data<Arc<AppState>>,
) -> Result<(reqwest::header::HeaderName, reqwest::header::HeaderValue), HttpResponse> {
    let token = extract_bearer(req).map_err(|e| {
        debug!("Rejected MCP request for '{}': {}", ds.name, e);
        unauthorized(&state.public_url, &ds.name)
    })?;
    remap_header(&ds.auth_header_format, &token).map_err(|e| {
        warn!("Credential remap failed for '{}': {}", ds.name, e);
        unauthorized(&state.public_url, &ds.name)
    })
}

fn unauthorized(public_url: &str, name: &str) -> HttpResponse {
    let challenge = format!(
        r#"Bearer resource_metadata="{}/.well-known/oauth-protected-resource/mcp/{}""#,
        public_url, name
    );
    HttpResponse::Unauthorized()
        .insert_header(("WWW-Authenticate", challenge))
        .body("Missing or invalid bearer token")
}
