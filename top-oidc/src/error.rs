use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// OAuth 2.0 error response per RFC 6749 Section 5.2.
#[derive(Debug, Serialize)]
pub struct OidcErrorBody {
    pub error: &'static str,
    pub error_description: String,
}

/// Test OIDC provider error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OidcError {
    /// Malformed login request: empty name, bad email, non-positive duration.
    InvalidLoginInput(String),
    /// The operation requires a logged-in test identity but none exists.
    NoActiveSession,
    /// Signature mismatch, malformed token, wrong issuer or wrong token class.
    InvalidToken(String),
    /// Valid signature but the token is past its expiry.
    TokenExpired,
    /// The token could not be signed or the key could not be generated.
    SigningError(String),
    /// Missing or malformed protocol parameters.
    InvalidRequest(String),
    /// Unknown, reused or mismatching authorization code.
    InvalidGrant(String),
    /// Unsupported grant type.
    UnsupportedGrantType(String),
    /// Invalid provider configuration.
    Config(String),
}

impl OidcError {
    pub fn error_code(&self) -> &'static str {
        match self {
            OidcError::InvalidLoginInput(_) => "invalid_login_input",
            OidcError::NoActiveSession => "login_required",
            OidcError::InvalidToken(_) => "invalid_token",
            OidcError::TokenExpired => "invalid_token",
            OidcError::SigningError(_) => "server_error",
            OidcError::InvalidRequest(_) => "invalid_request",
            OidcError::InvalidGrant(_) => "invalid_grant",
            OidcError::UnsupportedGrantType(_) => "unsupported_grant_type",
            OidcError::Config(_) => "server_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            OidcError::InvalidLoginInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            OidcError::NoActiveSession => StatusCode::FORBIDDEN,
            OidcError::InvalidToken(_) => StatusCode::FORBIDDEN,
            OidcError::TokenExpired => StatusCode::FORBIDDEN,
            OidcError::SigningError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            OidcError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            OidcError::InvalidGrant(_) => StatusCode::BAD_REQUEST,
            OidcError::UnsupportedGrantType(_) => StatusCode::BAD_REQUEST,
            OidcError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn description(&self) -> String {
        match self {
            OidcError::NoActiveSession => "no test user is logged in".into(),
            OidcError::TokenExpired => "the token has expired".into(),
            OidcError::InvalidLoginInput(s)
            | OidcError::InvalidToken(s)
            | OidcError::SigningError(s)
            | OidcError::InvalidRequest(s)
            | OidcError::InvalidGrant(s)
            | OidcError::UnsupportedGrantType(s)
            | OidcError::Config(s) => s.clone(),
        }
    }
}

impl IntoResponse for OidcError {
    fn into_response(self) -> Response {
        let body = OidcErrorBody {
            error: self.error_code(),
            error_description: self.description(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

impl std::fmt::Display for OidcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.description())
    }
}

impl std::error::Error for OidcError {}

impl From<top_core::ConfigError> for OidcError {
    fn from(err: top_core::ConfigError) -> Self {
        OidcError::Config(err.to_string())
    }
}
