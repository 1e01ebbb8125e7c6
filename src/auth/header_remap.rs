//! Credential extraction and downstream auth-header translation
//!
//! Clients always present `Authorization: Bearer <token>`. Downstreams want
//! the credential in whatever shape their API uses: a different scheme word,
//! or a custom header like `X-API-Key`. The remapper owns that table.

use crate::error::{ProxyError, Result};
use actix_web::HttpRequest;
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION};

/// Extract the bearer credential from an incoming request.
///
/// The `Bearer ` prefix is stripped; the raw credential is returned. Missing
/// or malformed headers are an auth error the caller turns into a 401.
pub fn extract_bearer(req: &HttpRequest) -> Result<String> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .ok_or_else(|| ProxyError::auth("Missing Authorization header"))?
        .to_str()
        .map_err(|_| ProxyError::auth("Invalid Authorization header encoding"))?;

    if let Some(token) = auth_header.strip_prefix("Bearer ") {
        let token = token.trim();
        if token.is_empty() {
            return Err(ProxyError::auth("Empty bearer token"));
        }
        Ok(token.to_string())
    } else {
        Err(ProxyError::auth(
            "Invalid Authorization header format. Expected: Bearer <token>",
        ))
    }
}

/// Translate a bearer credential into the downstream's expected header.
///
/// | format        | header          | value        |
/// |---------------|-----------------|--------------|
/// | `Bearer`      | `Authorization` | `Bearer T`   |
/// | `token`       | `Authorization` | `token T`    |
/// | `Basic`       | `Authorization` | `Basic T`    |
/// | anything else | that name       | `T`          |
///
/// `Basic` forwards the credential verbatim; no base64 re-encoding happens
/// here, the user supplies it pre-encoded.
pub fn remap_header(auth_header_format: &str, token: &str) -> Result<(HeaderName, HeaderValue)> {
    let (name, value) = match auth_header_format {
        "Bearer" => (AUTHORIZATION, format!("Bearer {}", token)),
        "token" => (AUTHORIZATION, format!("token {}", token)),
        "Basic" => (AUTHORIZATION, format!("Basic {}", token)),
        custom => {
            let name = HeaderName::from_bytes(custom.as_bytes()).map_err(|e| {
                ProxyError::auth(format!("Invalid auth header name '{}': {}", custom, e))
            })?;
            (name, token.to_string())
        }
    };
    let value = HeaderValue::from_str(&value)
        .map_err(|_| ProxyError::auth("Credential contains invalid header characters"))?;
    Ok((name, value))
}
