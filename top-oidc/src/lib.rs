//! Test OpenID Connect provider.
//!
//! Issues signed ID and access tokens for a single fabricated test user, so
//! that client applications can run their OIDC flows in integration tests
//! without a real identity provider.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use top_oidc::{router, LoginInfo, OidcProvider, OidcProviderConfig};
//!
//! let provider = Arc::new(OidcProvider::new(OidcProviderConfig::default())?);
//! let token = provider.login(LoginInfo::new("John Doe"))?;
//! let app = router(provider, "https://op.test/");
//! ```

pub mod config;
pub mod error;
pub mod keys;
pub mod models;
pub mod provider;
pub mod session;
pub mod token;

mod handlers;
mod state;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::routing::{get, post};
use axum::Router;

pub use config::OidcProviderConfig;
pub use error::OidcError;
pub use keys::{Jwk, Jwks, SigningAlgorithm, SigningKeys};
pub use models::{OidcConfiguration, TokenResponse, UserInfo};
pub use provider::OidcProvider;
pub use session::{LoginInfo, SessionStore, TestIdentity};
pub use token::TokenIssuer;

/// Build the OIDC router.
///
/// `root_url` is the public URL the router is served below, used for the
/// endpoint URLs in the discovery document.
pub fn router(provider: Arc<OidcProvider>, root_url: impl Into<String>) -> Router {
    let mut root_url = root_url.into();
    if !root_url.ends_with('/') {
        root_url.push('/');
    }
    let state = Arc::new(state::OidcState { provider, root_url });

    Router::new()
        .route(
            "/.well-known/openid-configuration",
            get(handlers::discovery_handler),
        )
        .route("/jwks", get(handlers::jwks_handler))
        .route("/authorize", get(handlers::authorize_handler))
        .route("/login", post(handlers::login_handler))
        .route("/token", post(handlers::token_handler))
        .route("/userinfo", get(handlers::userinfo_handler))
        .route("/reset", post(handlers::reset_handler))
        .with_state(state)
}

/// Current UNIX time in milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}
