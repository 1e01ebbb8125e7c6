//! HTTP server and shared request state
//!
//! `ProxyServer` owns the actix-web application: the path-multiplexed route
//! table keyed by the `{name}` segment, and the `AppState` every handler
//! reads. All state is immutable after startup — the registry, the decoded
//! state secret, and a single pooled outbound HTTP client.

use crate::config::Config;
use crate::error::{ProxyError, Result};
use crate::mcp::forwarder;
use crate::oauth::{authorize, discovery, token};
use crate::registry::DownstreamRegistry;
use actix_web::{middleware::Logger, web, App, HttpResponse, HttpServer};
use secrecy::{ExposeSecret, Secret};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Connect timeout for outbound requests. No overall timeout is set on the
/// client because SSE responses stream for arbitrarily long; unary calls add
/// their own per-request timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Immutable state shared by all request handlers
pub struct AppState {
    /// Path segment → downstream definition
    pub registry: DownstreamRegistry,
    /// Externally visible base URL, no trailing slash
    pub public_url: String,
    /// Lifetime of issued authorization codes, seconds
    pub auth_code_ttl: u64,
    /// Pooled outbound HTTP client shared by the forwarder and the
    /// chained-OAuth exchange logic
    pub http_client: reqwest::Client,
    /// Decoded state secret seeding the AEAD and HMAC keys
    state_secret: Secret<Vec<u8>>,
}

impl AppState {
    /// Build request state from a validated config
    pub fn from_config(config: &Config) -> Result<Self> {
        let secret = config.server.decoded_state_secret()?;
        let http_client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ProxyError::connection(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            registry: DownstreamRegistry::new(config.downstreams.clone()),
            public_url: config.server.public_url.clone(),
            auth_code_ttl: config.server.auth_code_ttl,
            http_client,
            state_secret: Secret::new(secret),
        })
    }

    /// Raw secret bytes, exposed only at key-derivation and MAC sites
    pub fn state_secret(&self) -> &[u8] {
        self.state_secret.expose_secret()
    }
}

/// The proxy HTTP server
pub struct ProxyServer {
    state: Arc<AppState>,
    host: String,
    port: u16,
}

impl ProxyServer {
    /// Create a server from a validated config
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            state: Arc::new(AppState::from_config(config)?),
            host: config.server.host.clone(),
            port: config.server.port,
        })
    }

    /// Shared state, for tests that drive handlers without binding a socket
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Bind and serve until shutdown
    pub async fn run(self) -> Result<()> {
        let state_data = web::Data::new(Arc::clone(&self.state));
        info!("Starting authtunnel on {}:{}", self.host, self.port);

        HttpServer::new(move || {
            App::new()
                .app_data(state_data.clone())
                .wrap(Logger::default())
                .configure(configure_routes)
        })
        .bind(format!("{}:{}", self.host, self.port))?
        .run()
        .await?;

        debug!("Server stopped");
        Ok(())
    }
}

/// Register every route on an actix `App` or test service.
///
/// Factored out so integration tests can build the identical route table
/// with `actix_web::test::init_service`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Health check
        .route("/health", web::get().to(health_check))
        // Discovery endpoints
        .route(
            "/.well-known/oauth-protected-resource/mcp/{name}",
            web::get().to(discovery::protected_resource),
        )
        .route(
            "/.well-known/oauth-authorization-server/mcp/{name}",
            web::get().to(discovery::authorization_server),
        )
        // Authorization endpoints
        .service(
            web::resource("/authorize/mcp/{name}")
                .route(web::get().to(authorize::authorize_get))
                .route(web::post().to(authorize::authorize_post)),
        )
        .route("/callback/mcp/{name}", web::get().to(authorize::callback))
        // Token endpoint
        .route("/token/mcp/{name}", web::post().to(token::token))
        // MCP proxy endpoints
        .service(
            web::resource("/mcp/{name}")
                .route(web::get().to(forwarder::mcp_sse))
                .route(web::post().to(forwarder::mcp_post)),
        );
}

/// Liveness probe
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "authtunnel"
    }))
}
