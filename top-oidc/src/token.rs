use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::OidcError;
use crate::keys::SigningKeys;
use crate::models::{TokenResponse, UserInfo};
use crate::session::TestIdentity;

pub const ACCESS_TOKEN_CLASS: &str = "access_token";

/// Claims of an access token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub jti: String,
    pub sid: String,
    pub iss: String,
    pub sub: String,
    pub client_id: String,
    pub token_class: String,
    pub scope: String,
    pub aud: Vec<String>,
    pub iat: u64,
    pub exp: u64,
    pub name: String,
    pub email: String,
}

/// Claims of an ID token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub iat: u64,
    pub exp: u64,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

/// Mints and verifies tokens for test identities.
///
/// Tokens are never stored: verification only looks at the signature,
/// the issuer and the expiry. `now_ms` arguments are UNIX milliseconds,
/// claim times are whole seconds with `exp` rounded up.
pub struct TokenIssuer {
    keys: Arc<SigningKeys>,
    issuer: String,
}

impl TokenIssuer {
    pub fn new(keys: Arc<SigningKeys>, issuer: impl Into<String>) -> Self {
        Self {
            keys,
            issuer: issuer.into(),
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn issue_access_token(
        &self,
        identity: &TestIdentity,
        client_id: &str,
        scope: &str,
        jti: &str,
        now_ms: u64,
    ) -> Result<String, OidcError> {
        let (iat, exp) = lifetime_claims(identity, now_ms);
        let claims = AccessTokenClaims {
            jti: jti.to_string(),
            sid: jti.to_string(),
            iss: self.issuer.clone(),
            sub: identity.sub.clone(),
            client_id: client_id.to_string(),
            token_class: ACCESS_TOKEN_CLASS.into(),
            scope: scope.to_string(),
            aud: vec![client_id.to_string()],
            iat,
            exp,
            name: identity.name.clone(),
            email: identity.email.clone(),
        };
        debug!(%jti, sub = %claims.sub, exp = claims.exp, "Issuing access token");
        self.keys.sign(&claims)
    }

    /// Mint an ID token and an access token for the identity.
    pub fn issue_tokens(
        &self,
        identity: &TestIdentity,
        client_id: &str,
        scope: &str,
        nonce: Option<String>,
        jti: &str,
        now_ms: u64,
    ) -> Result<TokenResponse, OidcError> {
        let access_token = self.issue_access_token(identity, client_id, scope, jti, now_ms)?;
        let (iat, exp) = lifetime_claims(identity, now_ms);
        let id_claims = IdTokenClaims {
            iss: self.issuer.clone(),
            sub: identity.sub.clone(),
            aud: client_id.to_string(),
            iat,
            exp,
            name: identity.name.clone(),
            email: identity.email.clone(),
            nonce,
        };
        let id_token = self.keys.sign(&id_claims)?;

        Ok(TokenResponse {
            access_token,
            id_token,
            token_type: "Bearer".into(),
            expires_in: identity.valid_seconds(),
            scope: scope.to_string(),
        })
    }

    pub fn verify_access_token(&self, token: &str) -> Result<UserInfo, OidcError> {
        self.verify_access_token_at(token, crate::now_millis())
    }

    /// Verify an access token against the given time; `now >= exp` is expired.
    pub fn verify_access_token_at(&self, token: &str, now_ms: u64) -> Result<UserInfo, OidcError> {
        let claims: AccessTokenClaims = self.keys.verify(token, &self.issuer).inspect_err(|e| {
            warn!(error = %e, "Rejected access token");
        })?;
        if claims.token_class != ACCESS_TOKEN_CLASS {
            warn!(token_class = %claims.token_class, "Rejected token of wrong class");
            return Err(OidcError::InvalidToken("not an access token".into()));
        }
        if now_ms >= claims.exp.saturating_mul(1000) {
            debug!(sub = %claims.sub, exp = claims.exp, "Access token expired");
            return Err(OidcError::TokenExpired);
        }
        Ok(UserInfo {
            sub: claims.sub,
            name: claims.name,
            email: claims.email,
        })
    }
}

/// `iat` and `exp` for a token minted at `now_ms`.
fn lifetime_claims(identity: &TestIdentity, now_ms: u64) -> (u64, u64) {
    let expires_ms = now_ms.saturating_add(identity.lifetime_ms);
    (now_ms / 1000, expires_ms.div_ceil(1000))
}
