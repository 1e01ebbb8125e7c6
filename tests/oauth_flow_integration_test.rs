//! Integration tests for the passthrough authorization flow
//!
//! Drives the full HTTP surface end to end: discovery, credential submit,
//! code redemption with PKCE, and the failure paths a hostile client would
//! probe (wrong verifier, expired code, mismatched redirect URI).

use actix_web::{test, web, App};
use authtunnel::mcp::server::{configure_routes, AppState};
use authtunnel::{Config, ProxyServer};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::sync::Arc;

// RFC 7636 Appendix B verifier/challenge pair
const VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
const CHALLENGE: &str = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";
const REDIRECT_URI: &str = "http://c/cb";

fn test_config(auth_code_ttl: u64) -> Config {
    let toml_str = format!(
        r#"
[server]
public_url = "https://proxy.example.com"
state_secret = "{secret}"
auth_code_ttl = {ttl}

[[downstream]]
name = "linear"
display_name = "Linear"
strategy = "passthrough"
downstream_url = "http://fake/linear"
auth_hint = "Create a key under Settings > API"
"#,
        secret = STANDARD.encode([0u8; 32]),
        ttl = auth_code_ttl,
    );
    toml::from_str(&toml_str).unwrap()
}

fn app_state(config: &Config) -> web::Data<Arc<AppState>> {
    web::Data::new(ProxyServer::new(config).unwrap().state())
}

/// Extract a query parameter from a Location header value
fn location_param(location: &str, key: &str) -> String {
    let query = location.split_once('?').expect("location has query").1;
    for pair in query.split('&') {
        let (k, v) = pair.split_once('=').unwrap();
        if k == key {
            return urlencoding::decode(v).unwrap().into_owned();
        }
    }
    panic!("parameter '{}' not in location '{}'", key, location);
}

#[actix_web::test]
async fn discovery_documents_for_passthrough() {
    let config = test_config(300);
    let app = test::init_service(
        App::new()
            .app_data(app_state(&config))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/.well-known/oauth-authorization-server/mcp/linear")
        .to_request();
    let doc: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(doc["issuer"], "https://proxy.example.com/mcp/linear");
    assert_eq!(
        doc["authorization_endpoint"],
        "https://proxy.example.com/authorize/mcp/linear"
    );
    assert_eq!(
        doc["token_endpoint"],
        "https://proxy.example.com/token/mcp/linear"
    );
    // Passthrough never issues refresh tokens
    assert_eq!(doc["grant_types_supported"], serde_json::json!(["authorization_code"]));
    assert_eq!(doc["code_challenge_methods_supported"], serde_json::json!(["S256"]));
    assert_eq!(doc["token_endpoint_auth_methods_supported"], serde_json::json!(["none"]));

    let req = test::TestRequest::get()
        .uri("/.well-known/oauth-protected-resource/mcp/linear")
        .to_request();
    let doc: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(doc["resource"], "https://proxy.example.com/mcp/linear");
    assert_eq!(
        doc["authorization_servers"],
        serde_json::json!(["https://proxy.example.com/mcp/linear"])
    );
}

#[actix_web::test]
async fn discovery_unknown_prefix_is_404() {
    let config = test_config(300);
    let app = test::init_service(
        App::new()
            .app_data(app_state(&config))
            .configure(configure_routes),
    )
    .await;

    for uri in [
        "/.well-known/oauth-authorization-server/mcp/nope",
        "/.well-known/oauth-protected-resource/mcp/nope",
        "/authorize/mcp/nope?response_type=code",
        "/mcp/nope",
    ] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404, "expected 404 for {}", uri);
    }
}

#[actix_web::test]
async fn authorize_get_renders_credential_form() {
    let config = test_config(300);
    let app = test::init_service(
        App::new()
            .app_data(app_state(&config))
            .configure(configure_routes),
    )
    .await;

    let uri = format!(
        "/authorize/mcp/linear?response_type=code&redirect_uri={}&code_challenge={}&code_challenge_method=S256&state=xyz",
        urlencoding::encode(REDIRECT_URI),
        CHALLENGE,
    );
    let req = test::TestRequest::get().uri(&uri).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("Linear"));
    assert!(body.contains("Create a key under Settings &gt; API"));
    assert!(body.contains(CHALLENGE));
    assert!(body.contains(r#"name="token""#));
}

#[actix_web::test]
async fn authorize_get_rejects_bad_request_params() {
    let config = test_config(300);
    let app = test::init_service(
        App::new()
            .app_data(app_state(&config))
            .configure(configure_routes),
    )
    .await;

    // Wrong response_type
    let uri = format!(
        "/authorize/mcp/linear?response_type=token&redirect_uri={}&code_challenge={}&code_challenge_method=S256&state=xyz",
        urlencoding::encode(REDIRECT_URI),
        CHALLENGE,
    );
    let req = test::TestRequest::get().uri(&uri).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    // plain challenge method
    let uri = format!(
        "/authorize/mcp/linear?response_type=code&redirect_uri={}&code_challenge={}&code_challenge_method=plain&state=xyz",
        urlencoding::encode(REDIRECT_URI),
        CHALLENGE,
    );
    let req = test::TestRequest::get().uri(&uri).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    // Missing code_challenge
    let uri = format!(
        "/authorize/mcp/linear?response_type=code&redirect_uri={}&code_challenge_method=S256&state=xyz",
        urlencoding::encode(REDIRECT_URI),
    );
    let req = test::TestRequest::get().uri(&uri).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);
}

/// Submit the credential form and return the issued code
async fn obtain_code(
    app: &impl actix_web::dev::Service<
        actix_http::Request,
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
    >,
) -> String {
    let req = test::TestRequest::post()
        .uri("/authorize/mcp/linear")
        .set_form([
            ("state", "xyz"),
            ("redirect_uri", REDIRECT_URI),
            ("code_challenge", CHALLENGE),
            ("code_challenge_method", "S256"),
            ("token", "SECRET"),
        ])
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), 302);
    let location = resp
        .headers()
        .get("Location")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(location.starts_with(REDIRECT_URI));
    assert_eq!(location_param(&location, "state"), "xyz");
    location_param(&location, "code")
}

#[actix_web::test]
async fn passthrough_code_exchange_happy_path() {
    let config = test_config(300);
    let app = test::init_service(
        App::new()
            .app_data(app_state(&config))
            .configure(configure_routes),
    )
    .await;

    let code = obtain_code(&app).await;

    let req = test::TestRequest::post()
        .uri("/token/mcp/linear")
        .set_form([
            ("grant_type", "authorization_code"),
            ("code", &code),
            ("code_verifier", VERIFIER),
            ("redirect_uri", REDIRECT_URI),
            ("client_id", "any"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["access_token"], "SECRET");
    assert_eq!(body["token_type"], "Bearer");
    // Passthrough responses never carry refresh material
    assert!(body.get("refresh_token").is_none());
    assert!(body.get("expires_in").is_none());
}

#[actix_web::test]
async fn wrong_verifier_is_invalid_grant() {
    let config = test_config(300);
    let app = test::init_service(
        App::new()
            .app_data(app_state(&config))
            .configure(configure_routes),
    )
    .await;

    let code = obtain_code(&app).await;

    // Well-formed but non-matching verifier
    let wrong = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    let req = test::TestRequest::post()
        .uri("/token/mcp/linear")
        .set_form([
            ("grant_type", "authorization_code"),
            ("code", &code),
            ("code_verifier", wrong),
            ("redirect_uri", REDIRECT_URI),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "invalid_grant");

    // Malformed verifier (too short) collapses to the same error
    let code = obtain_code(&app).await;
    let req = test::TestRequest::post()
        .uri("/token/mcp/linear")
        .set_form([
            ("grant_type", "authorization_code"),
            ("code", &code),
            ("code_verifier", "wrong"),
            ("redirect_uri", REDIRECT_URI),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "invalid_grant");
}

#[actix_web::test]
async fn expired_code_is_invalid_grant() {
    // TTL of zero: the code is already expired when redeemed
    let config = test_config(0);
    let app = test::init_service(
        App::new()
            .app_data(app_state(&config))
            .configure(configure_routes),
    )
    .await;

    let code = obtain_code(&app).await;

    let req = test::TestRequest::post()
        .uri("/token/mcp/linear")
        .set_form([
            ("grant_type", "authorization_code"),
            ("code", &code),
            ("code_verifier", VERIFIER),
            ("redirect_uri", REDIRECT_URI),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "invalid_grant");
}

#[actix_web::test]
async fn redirect_uri_mismatch_is_invalid_grant() {
    let config = test_config(300);
    let app = test::init_service(
        App::new()
            .app_data(app_state(&config))
            .configure(configure_routes),
    )
    .await;

    let code = obtain_code(&app).await;

    let req = test::TestRequest::post()
        .uri("/token/mcp/linear")
        .set_form([
            ("grant_type", "authorization_code"),
            ("code", &code),
            ("code_verifier", VERIFIER),
            ("redirect_uri", "http://evil/cb"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "invalid_grant");
}

#[actix_web::test]
async fn tampered_code_is_invalid_grant() {
    let config = test_config(300);
    let app = test::init_service(
        App::new()
            .app_data(app_state(&config))
            .configure(configure_routes),
    )
    .await;

    let code = obtain_code(&app).await;
    let mut tampered = code.into_bytes();
    let mid = tampered.len() / 2;
    tampered[mid] = if tampered[mid] == b'A' { b'B' } else { b'A' };
    let tampered = String::from_utf8(tampered).unwrap();

    let req = test::TestRequest::post()
        .uri("/token/mcp/linear")
        .set_form([
            ("grant_type", "authorization_code"),
            ("code", &tampered),
            ("code_verifier", VERIFIER),
            ("redirect_uri", REDIRECT_URI),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "invalid_grant");
}

#[actix_web::test]
async fn unsupported_grant_type_is_rejected() {
    let config = test_config(300);
    let app = test::init_service(
        App::new()
            .app_data(app_state(&config))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/token/mcp/linear")
        .set_form([("grant_type", "client_credentials")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "unsupported_grant_type");

    // refresh_token against a passthrough downstream is also unsupported
    let req = test::TestRequest::post()
        .uri("/token/mcp/linear")
        .set_form([("grant_type", "refresh_token"), ("refresh_token", "rt")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "unsupported_grant_type");
}

#[actix_web::test]
async fn authorize_post_rejects_chained_downstream() {
    let toml_str = format!(
        r#"
[server]
public_url = "https://proxy.example.com"
state_secret = "{secret}"

[[downstream]]
name = "github"
display_name = "GitHub"
strategy = "chained_oauth"
downstream_url = "http://fake/github"
oauth_authorize_url = "https://idp.example.com/authorize"
oauth_token_url = "https://idp.example.com/token"
oauth_client_id = "cid"
oauth_client_secret = "csecret"
"#,
        secret = STANDARD.encode([0u8; 32]),
    );
    let config: Config = toml::from_str(&toml_str).unwrap();
    let app = test::init_service(
        App::new()
            .app_data(app_state(&config))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/authorize/mcp/github")
        .set_form([
            ("state", "xyz"),
            ("redirect_uri", REDIRECT_URI),
            ("code_challenge", CHALLENGE),
            ("code_challenge_method", "S256"),
            ("token", "SECRET"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}
