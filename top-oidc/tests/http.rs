use std::sync::Arc;

use serde_json::json;
use top_oidc::token::IdTokenClaims;
use top_oidc::{router, OidcProvider, OidcProviderConfig};
use top_test::TestApp;

const REDIRECT_URI: &str = "https://rp.test/callback";

fn setup() -> (Arc<OidcProvider>, TestApp) {
    let provider = Arc::new(OidcProvider::new(OidcProviderConfig::default()).unwrap());
    let app = TestApp::new(router(provider.clone(), "http://localhost:8080/"));
    (provider, app)
}

async fn login(app: &TestApp, body: serde_json::Value) -> String {
    app.post("/login").json(&body).send().await.assert_created().text()
}

async fn authorize(app: &TestApp) -> top_test::TestResponse {
    app.get("/authorize")
        .query("response_type", "code")
        .query("client_id", "my-app")
        .query("redirect_uri", REDIRECT_URI)
        .query("scope", "openid profile email")
        .query("state", "af0ifjsldkj")
        .query("nonce", "n-0S6_WzA2Mj")
        .send()
        .await
}

#[tokio::test]
async fn discovery_document() {
    let (_, app) = setup();
    app.get("/.well-known/openid-configuration")
        .send()
        .await
        .assert_ok()
        .assert_json_path("issuer", "https://op.test")
        .assert_json_path("jwks_uri", "http://localhost:8080/jwks")
        .assert_json_path("authorization_endpoint", "http://localhost:8080/authorize")
        .assert_json_path("token_endpoint", "http://localhost:8080/token")
        .assert_json_path("userinfo_endpoint", "http://localhost:8080/userinfo")
        .assert_json_path("scopes_supported", json!(["openid", "profile", "email"]))
        .assert_json_path("claims_supported", json!(["sub", "name", "email"]))
        .assert_json_path("response_types_supported", json!(["code"]))
        .assert_json_path("id_token_signing_alg_values_supported", json!(["ES256"]))
        .assert_json_path("userinfo_signing_alg_values_supported", json!(["ES256"]))
        .assert_json_path("version", env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn jwks_endpoint() {
    let (provider, app) = setup();
    let resp = app
        .get("/jwks")
        .send()
        .await
        .assert_ok()
        .assert_json_path("keys[0].kty", "EC")
        .assert_json_path("keys[0].kid", "test")
        .assert_json_path("keys[0].use", "sig");
    let published: top_oidc::Jwks = resp.json();
    assert_eq!(published, provider.jwks());
}

#[tokio::test]
async fn login_returns_jwt() {
    let (_, app) = setup();
    let resp = app
        .post("/login")
        .json(&json!({ "name": "John Doe" }))
        .send()
        .await
        .assert_created();
    assert_eq!(resp.header("content-type"), Some("application/jwt"));
    assert_eq!(resp.text().split('.').count(), 3);
}

#[tokio::test]
async fn login_rejects_invalid_input() {
    let (_, app) = setup();
    for body in [
        json!({ "name": "" }),
        json!({ "name": "John Doe", "email": "nope" }),
        json!({ "name": "John Doe", "valid_seconds": 0 }),
        json!({ "name": "John Doe", "valid_seconds": 0.0 }),
        json!({ "name": "John Doe", "valid_seconds": -1 }),
        json!({ "email": "john@home.org" }),
    ] {
        app.post("/login").json(&body).send().await.assert_unprocessable();
    }
}

#[tokio::test]
async fn login_accepts_fractional_lifetime() {
    let (provider, app) = setup();
    for secs in [0.5, 1.5] {
        let token = login(&app, json!({ "name": "Short John", "valid_seconds": secs })).await;
        let identity = provider.current_user().unwrap();
        assert_eq!(identity.lifetime_ms, (secs * 1000.0) as u64);
        app.get("/userinfo")
            .bearer(&token)
            .send()
            .await
            .assert_ok()
            .assert_json_path("name", "Short John");
    }
}

#[tokio::test]
async fn userinfo_for_login_token() {
    let (_, app) = setup();
    let token = login(&app, json!({ "name": "Dr. Jane Roe", "email": "jane@foo.edu", "sub": "sub-of-jane" })).await;

    app.get("/userinfo")
        .bearer(&token)
        .send()
        .await
        .assert_ok()
        .assert_json_path("sub", "sub-of-jane")
        .assert_json_path("name", "Jane Roe")
        .assert_json_path("email", "jane@foo.edu");
}

#[tokio::test]
async fn bearer_scheme_is_case_insensitive() {
    let (_, app) = setup();
    let token = login(&app, json!({ "name": "John Doe" })).await;
    for scheme in ["bearer", "BEARER", "Bearer"] {
        app.get("/userinfo")
            .header("authorization", format!("{scheme} {token}"))
            .send()
            .await
            .assert_ok()
            .assert_json_path("name", "John Doe");
    }
}

#[tokio::test]
async fn userinfo_requires_valid_token() {
    let (_, app) = setup();
    app.get("/userinfo").send().await.assert_forbidden();
    app.get("/userinfo")
        .header("authorization", "Basic Zm9vOmJhcg==")
        .send()
        .await
        .assert_forbidden();
    app.get("/userinfo")
        .header("authorization", "Bearer ")
        .send()
        .await
        .assert_forbidden();
    app.get("/userinfo")
        .bearer("not.a.token")
        .send()
        .await
        .assert_forbidden()
        .assert_json_path("error", "invalid_token");
}

#[tokio::test]
async fn authorization_code_flow() {
    let (provider, app) = setup();
    login(&app, json!({ "name": "Alice", "email": "alice@home.org", "valid_seconds": 60 })).await;

    let resp = authorize(&app).await.assert_found();
    let location = resp.location();
    assert_eq!(location.host_str(), Some("rp.test"));
    assert_eq!(location.path(), "/callback");
    let params = resp.location_params();
    assert_eq!(params["state"], "af0ifjsldkj");
    let code = params["code"].clone();

    let resp = app
        .post("/token")
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("client_id", "my-app"),
            ("redirect_uri", REDIRECT_URI),
        ])
        .send()
        .await
        .assert_ok()
        .assert_json_path("token_type", "Bearer")
        .assert_json_path("expires_in", 60)
        .assert_json_path("scope", "openid profile email");
    assert_eq!(resp.header("cache-control"), Some("no-store"));

    let id_token: String = resp.json_path("id_token");
    let claims: IdTokenClaims = provider.keys().verify(&id_token, "https://op.test").unwrap();
    assert_eq!(claims.aud, "my-app");
    assert_eq!(claims.nonce.as_deref(), Some("n-0S6_WzA2Mj"));

    let access_token: String = resp.json_path("access_token");
    app.get("/userinfo")
        .bearer(&access_token)
        .send()
        .await
        .assert_ok()
        .assert_json_path("name", "Alice")
        .assert_json_path("email", "alice@home.org")
        .assert_json_path("sub", claims.sub.as_str());

    app.post("/token")
        .form(&[("grant_type", "authorization_code"), ("code", code.as_str())])
        .send()
        .await
        .assert_bad_request()
        .assert_json_path("error", "invalid_grant");
}

#[tokio::test]
async fn authorize_without_login_redirects_with_error() {
    let (_, app) = setup();
    let resp = authorize(&app).await.assert_found();
    let params = resp.location_params();
    assert_eq!(params["error"], "login_required");
    assert_eq!(params["state"], "af0ifjsldkj");
    assert!(!params.contains_key("code"));
}

#[tokio::test]
async fn reset_ends_the_session() {
    let (_, app) = setup();
    let token = login(&app, json!({ "name": "Alice" })).await;

    app.post("/reset").send().await.assert_no_content();

    let resp = authorize(&app).await.assert_found();
    assert_eq!(resp.location_params()["error"], "login_required");
    // verification is stateless
    app.get("/userinfo").bearer(&token).send().await.assert_ok();
}

#[tokio::test]
async fn authorize_rejects_other_response_types() {
    let (_, app) = setup();
    login(&app, json!({ "name": "Alice" })).await;
    let resp = app
        .get("/authorize")
        .query("response_type", "token")
        .query("redirect_uri", REDIRECT_URI)
        .query("state", "xyz")
        .send()
        .await
        .assert_found();
    let params = resp.location_params();
    assert_eq!(params["error"], "unsupported_response_type");
    assert_eq!(params["state"], "xyz");
}

#[tokio::test]
async fn authorize_needs_redirect_uri() {
    let (_, app) = setup();
    app.get("/authorize")
        .query("response_type", "code")
        .send()
        .await
        .assert_bad_request()
        .assert_json_path("error", "invalid_request");
    app.get("/authorize")
        .query("response_type", "code")
        .query("redirect_uri", "not a url")
        .send()
        .await
        .assert_bad_request();
}

#[tokio::test]
async fn token_endpoint_errors() {
    let (_, app) = setup();
    login(&app, json!({ "name": "Alice" })).await;

    app.post("/token")
        .form(&[("grant_type", "password")])
        .send()
        .await
        .assert_bad_request()
        .assert_json_path("error", "unsupported_grant_type");
    app.post("/token")
        .form(&[("grant_type", "authorization_code")])
        .send()
        .await
        .assert_bad_request()
        .assert_json_path("error", "invalid_request");
    app.post("/token")
        .form(&[("grant_type", "authorization_code"), ("code", "unknown")])
        .send()
        .await
        .assert_bad_request()
        .assert_json_path("error", "invalid_grant");
    app.post("/token")
        .form(&[("code", "unknown")])
        .send()
        .await
        .assert_unprocessable();
}

#[tokio::test]
async fn token_exchange_checks_redirect_uri() {
    let (_, app) = setup();
    login(&app, json!({ "name": "Alice" })).await;
    let code = authorize(&app).await.location_params()["code"].clone();

    app.post("/token")
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("redirect_uri", "https://evil.test/callback"),
        ])
        .send()
        .await
        .assert_bad_request()
        .assert_json_path("error", "invalid_grant");
}
