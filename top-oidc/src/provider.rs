use std::sync::Arc;

use tracing::info;

use crate::config::OidcProviderConfig;
use crate::error::OidcError;
use crate::keys::{Jwks, SigningKeys};
use crate::models::{OidcConfiguration, TokenResponse, UserInfo, DEFAULT_SCOPE};
use crate::now_millis;
use crate::session::{LoginInfo, SessionStore, TestIdentity};
use crate::token::TokenIssuer;

/// The test OIDC provider: one signing key, one session, one token issuer.
///
/// Shared between request handlers behind an `Arc`.
pub struct OidcProvider {
    config: OidcProviderConfig,
    keys: Arc<SigningKeys>,
    sessions: SessionStore,
    tokens: TokenIssuer,
}

impl OidcProvider {
    /// Validate the configuration and generate the signing key.
    pub fn new(config: OidcProviderConfig) -> Result<Self, OidcError> {
        let config = config.validated()?;
        let keys = Arc::new(SigningKeys::generate(
            config.signing_algorithm,
            &config.key_id,
        )?);
        let tokens = TokenIssuer::new(keys.clone(), config.issuer.clone());
        info!(
            issuer = %config.issuer,
            algorithm = %config.signing_algorithm,
            kid = %config.key_id,
            "Test OIDC provider ready"
        );
        Ok(Self {
            config,
            keys,
            sessions: SessionStore::new(),
            tokens,
        })
    }

    pub fn config(&self) -> &OidcProviderConfig {
        &self.config
    }

    pub fn keys(&self) -> &SigningKeys {
        &self.keys
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub fn jwks(&self) -> Jwks {
        self.keys.jwks()
    }

    /// Discovery document for endpoints served below `root_url`.
    pub fn discovery(&self, root_url: &str) -> OidcConfiguration {
        OidcConfiguration::new(&self.config.issuer, root_url, self.config.signing_algorithm)
    }

    /// Log in a test user and return an access token for it.
    pub fn login(&self, info: LoginInfo) -> Result<String, OidcError> {
        self.login_at(info, now_millis()).map(|(_, token)| token)
    }

    /// Log in at `now_ms` (UNIX milliseconds).
    ///
    /// The session only changes once the token is signed.
    pub fn login_at(&self, info: LoginInfo, now_ms: u64) -> Result<(TestIdentity, String), OidcError> {
        let identity = self.sessions.prepare_login(info, &self.config, now_ms)?;
        let jti = self.sessions.next_jti();
        let token = self.tokens.issue_access_token(
            &identity,
            &self.config.client_id,
            DEFAULT_SCOPE,
            &jti,
            now_ms,
        )?;
        self.sessions.commit_login(identity.clone());
        Ok((identity, token))
    }

    pub fn reset(&self) {
        self.sessions.reset();
    }

    pub fn current_user(&self) -> Result<TestIdentity, OidcError> {
        self.current_user_at(now_millis())
    }

    pub fn current_user_at(&self, now_ms: u64) -> Result<TestIdentity, OidcError> {
        self.sessions.current(now_ms)
    }

    /// Issue an authorization code for the logged-in user.
    pub fn authorize(
        &self,
        client_id: &str,
        redirect_uri: &str,
        scope: &str,
        nonce: Option<String>,
    ) -> Result<String, OidcError> {
        self.sessions
            .issue_code(client_id, redirect_uri, scope, nonce, now_millis())
    }

    /// Redeem an authorization code for an ID token and an access token.
    pub fn exchange_code(
        &self,
        code: &str,
        redirect_uri: Option<&str>,
    ) -> Result<TokenResponse, OidcError> {
        let now_ms = now_millis();
        let (identity, grant) = self.sessions.redeem_code(code, redirect_uri, now_ms)?;
        let jti = self.sessions.next_jti();
        self.tokens.issue_tokens(
            &identity,
            &grant.client_id,
            &grant.scope,
            grant.nonce,
            &jti,
            now_ms,
        )
    }

    /// Issue tokens for the logged-in user without an authorization code.
    pub fn issue_tokens(&self, client_id: &str, scope: &str) -> Result<TokenResponse, OidcError> {
        self.issue_tokens_at(client_id, scope, None, now_millis())
    }

    pub fn issue_tokens_at(
        &self,
        client_id: &str,
        scope: &str,
        nonce: Option<String>,
        now_ms: u64,
    ) -> Result<TokenResponse, OidcError> {
        let identity = self.sessions.current(now_ms)?;
        let jti = self.sessions.next_jti();
        self.tokens
            .issue_tokens(&identity, client_id, scope, nonce, &jti, now_ms)
    }

    /// Claims of the user an access token was issued for.
    pub fn user_info(&self, token: &str) -> Result<UserInfo, OidcError> {
        self.tokens.verify_access_token(token)
    }

    pub fn user_info_at(&self, token: &str, now_ms: u64) -> Result<UserInfo, OidcError> {
        self.tokens.verify_access_token_at(token, now_ms)
    }
}
