use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use tracing::{debug, warn};
use url::Url;

use crate::error::OidcError;
use crate::keys::Jwks;
use crate::models::{AuthorizeRequest, OidcConfiguration, TokenRequest, UserInfo, DEFAULT_SCOPE};
use crate::session::LoginInfo;
use crate::state::OidcState;

/// RFC 6749 §5.1 required headers for token responses.
type TokenResponseHeaders = [(header::HeaderName, &'static str); 2];
const TOKEN_HEADERS: TokenResponseHeaders = [
    (header::CACHE_CONTROL, "no-store"),
    (header::PRAGMA, "no-cache"),
];

/// GET /.well-known/openid-configuration
pub(crate) async fn discovery_handler(
    State(state): State<Arc<OidcState>>,
) -> Json<OidcConfiguration> {
    Json(state.provider.discovery(&state.root_url))
}

/// GET /jwks
pub(crate) async fn jwks_handler(State(state): State<Arc<OidcState>>) -> Json<Jwks> {
    Json(state.provider.jwks())
}

/// GET /authorize
///
/// Redirects straight back to the client: with a code when a test user is
/// logged in, with `error=login_required` otherwise.
pub(crate) async fn authorize_handler(
    State(state): State<Arc<OidcState>>,
    Query(req): Query<AuthorizeRequest>,
) -> Result<Response, OidcError> {
    let redirect_uri = req
        .redirect_uri
        .as_deref()
        .ok_or_else(|| OidcError::InvalidRequest("missing 'redirect_uri' parameter".into()))?;
    let location = Url::parse(redirect_uri)
        .map_err(|e| OidcError::InvalidRequest(format!("invalid 'redirect_uri': {e}")))?;

    if req.response_type.as_deref() != Some("code") {
        warn!(response_type = ?req.response_type, "Unsupported response type");
        return Ok(redirect_with(location, "error", "unsupported_response_type", req.state));
    }

    let provider = &state.provider;
    let client_id = req
        .client_id
        .as_deref()
        .unwrap_or(provider.config().client_id.as_str());
    let scope = req.scope.as_deref().unwrap_or(DEFAULT_SCOPE);

    match provider.authorize(client_id, redirect_uri, scope, req.nonce) {
        Ok(code) => {
            debug!(client_id, "Authorization granted");
            Ok(redirect_with(location, "code", &code, req.state))
        }
        Err(OidcError::NoActiveSession) => {
            debug!(client_id, "Authorization requested without a logged-in user");
            Ok(redirect_with(location, "error", "login_required", req.state))
        }
        Err(e) => Err(e),
    }
}

fn redirect_with(mut location: Url, key: &str, value: &str, state: Option<String>) -> Response {
    {
        let mut query = location.query_pairs_mut();
        query.append_pair(key, value);
        if let Some(state) = &state {
            query.append_pair("state", state);
        }
    }
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// POST /login
pub(crate) async fn login_handler(
    State(state): State<Arc<OidcState>>,
    Json(info): Json<LoginInfo>,
) -> Result<impl IntoResponse, OidcError> {
    let token = state.provider.login(info).inspect_err(|e| {
        warn!(error = %e, "Login rejected");
    })?;
    Ok((
        StatusCode::CREATED,
        [(header::CONTENT_TYPE, "application/jwt")],
        token,
    ))
}

/// POST /token
pub(crate) async fn token_handler(
    State(state): State<Arc<OidcState>>,
    Form(req): Form<TokenRequest>,
) -> Result<impl IntoResponse, OidcError> {
    if req.grant_type != "authorization_code" {
        return Err(OidcError::UnsupportedGrantType(format!(
            "grant_type '{}' is not supported",
            req.grant_type
        )));
    }
    let code = req
        .code
        .as_deref()
        .ok_or_else(|| OidcError::InvalidRequest("missing 'code' parameter".into()))?;

    debug!(client_id = ?req.client_id, "Processing authorization_code grant");

    let response = state
        .provider
        .exchange_code(code, req.redirect_uri.as_deref())?;
    // RFC 6749 §5.1: token responses MUST include Cache-Control: no-store.
    Ok((TOKEN_HEADERS, Json(response)))
}

/// GET /userinfo
pub(crate) async fn userinfo_handler(
    State(state): State<Arc<OidcState>>,
    headers: HeaderMap,
) -> Result<Json<UserInfo>, OidcError> {
    let token = extract_bearer_token(&headers)?;
    Ok(Json(state.provider.user_info(token)?))
}

/// POST /reset
pub(crate) async fn reset_handler(State(state): State<Arc<OidcState>>) -> StatusCode {
    state.provider.reset();
    StatusCode::NO_CONTENT
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, OidcError> {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| OidcError::InvalidToken("missing Authorization header".into()))?;

    // RFC 6750 §2.1: the auth scheme is case-insensitive
    auth.split_once(' ')
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim())
        .filter(|token| !token.is_empty())
        .ok_or_else(|| OidcError::InvalidToken("expected Bearer token".into()))
}
