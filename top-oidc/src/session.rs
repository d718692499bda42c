use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use garde::Validate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::OidcProviderConfig;
use crate::error::OidcError;

const TITLES: &[&str] = &["Dr.", "Prof."];

/// Login request for the test user.
#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct LoginInfo {
    /// Full name, optionally prefixed by an academic title.
    #[garde(length(min = 1))]
    pub name: String,
    #[serde(default)]
    #[garde(email)]
    pub email: Option<String>,
    /// Subject identifier; generated when absent.
    #[serde(default)]
    #[garde(skip)]
    pub sub: Option<String>,
    /// Session lifetime; fractions of a second are allowed.
    #[serde(default)]
    #[garde(custom(positive_seconds))]
    pub valid_seconds: Option<f64>,
}

impl LoginInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn sub(mut self, sub: impl Into<String>) -> Self {
        self.sub = Some(sub.into());
        self
    }

    pub fn valid_seconds(mut self, secs: f64) -> Self {
        self.valid_seconds = Some(secs);
        self
    }

    /// Empty optional strings count as absent.
    fn normalized(mut self) -> Self {
        self.name = strip_title(self.name.trim()).to_string();
        self.email = self
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        self.sub = self
            .sub
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self
    }
}

fn positive_seconds(value: &Option<f64>, _: &()) -> garde::Result {
    match value {
        Some(secs) if !secs.is_finite() || *secs <= 0.0 => {
            Err(garde::Error::new("must be a positive number of seconds"))
        }
        _ => Ok(()),
    }
}

fn strip_title(name: &str) -> &str {
    TITLES
        .iter()
        .find_map(|title| name.strip_prefix(title))
        .map_or(name, str::trim_start)
}

/// The single logged-in test user.
///
/// Times are UNIX milliseconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TestIdentity {
    pub sub: String,
    pub name: String,
    pub email: String,
    pub lifetime_ms: u64,
    pub issued_at_ms: u64,
    pub expires_at_ms: u64,
}

impl TestIdentity {
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at_ms
    }

    /// Lifetime in whole seconds, rounded up.
    pub fn valid_seconds(&self) -> u64 {
        self.lifetime_ms.div_ceil(1000)
    }
}

/// A pending authorization code issued by `/authorize`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizationGrant {
    pub sub: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
    pub nonce: Option<String>,
}

#[derive(Debug)]
struct SessionState {
    identity: Option<TestIdentity>,
    codes: HashMap<String, AuthorizationGrant>,
    serial: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            identity: None,
            codes: HashMap::new(),
            serial: 1,
        }
    }
}

/// Holds at most one test identity plus its pending authorization codes.
#[derive(Debug, Default)]
pub struct SessionStore {
    state: RwLock<SessionState>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Build a new identity from `info` without touching the session.
    pub fn prepare_login(
        &self,
        info: LoginInfo,
        config: &OidcProviderConfig,
        now_ms: u64,
    ) -> Result<TestIdentity, OidcError> {
        let info = info.normalized();
        info.validate()
            .map_err(|report| OidcError::InvalidLoginInput(report.to_string()))?;

        let lifetime_ms = match info.valid_seconds {
            // at least one millisecond; `as` saturates on overflow
            Some(secs) => ((secs * 1000.0).ceil() as u64).max(1),
            None => config.valid_seconds.saturating_mul(1000),
        };
        let email = info
            .email
            .unwrap_or_else(|| default_email(&info.name, &config.user_domain));
        let sub = info
            .sub
            .unwrap_or_else(|| generated_sub(&info.name, &config.op_domain()));

        Ok(TestIdentity {
            sub,
            name: info.name,
            email,
            lifetime_ms,
            issued_at_ms: now_ms,
            expires_at_ms: now_ms.saturating_add(lifetime_ms),
        })
    }

    /// Make `identity` the active one, dropping pending codes.
    pub fn commit_login(&self, identity: TestIdentity) {
        let mut state = self.write();
        state.codes.clear();
        info!(
            sub = %identity.sub,
            name = %identity.name,
            lifetime_ms = identity.lifetime_ms,
            "Test user logged in"
        );
        state.identity = Some(identity);
    }

    /// Replace the current identity with a new one built from `info`.
    ///
    /// Nothing is changed when the input is rejected.
    pub fn login(
        &self,
        info: LoginInfo,
        config: &OidcProviderConfig,
        now_ms: u64,
    ) -> Result<TestIdentity, OidcError> {
        let identity = self.prepare_login(info, config, now_ms)?;
        self.commit_login(identity.clone());
        Ok(identity)
    }

    /// Forget the identity and its codes and restart the serial counter.
    pub fn reset(&self) {
        *self.write() = SessionState::default();
        info!("Test session reset");
    }

    /// The active identity, if it has not expired.
    pub fn current(&self, now_ms: u64) -> Result<TestIdentity, OidcError> {
        self.read()
            .identity
            .as_ref()
            .filter(|identity| !identity.is_expired_at(now_ms))
            .cloned()
            .ok_or(OidcError::NoActiveSession)
    }

    /// Register an authorization code for the active identity.
    pub fn issue_code(
        &self,
        client_id: &str,
        redirect_uri: &str,
        scope: &str,
        nonce: Option<String>,
        now_ms: u64,
    ) -> Result<String, OidcError> {
        let mut state = self.write();
        let sub = match &state.identity {
            Some(identity) if !identity.is_expired_at(now_ms) => identity.sub.clone(),
            _ => return Err(OidcError::NoActiveSession),
        };
        let code = Uuid::new_v4().simple().to_string();
        state.codes.insert(
            code.clone(),
            AuthorizationGrant {
                sub,
                client_id: client_id.to_string(),
                redirect_uri: redirect_uri.to_string(),
                scope: scope.to_string(),
                nonce,
            },
        );
        debug!(client_id, redirect_uri, "Issued authorization code");
        Ok(code)
    }

    /// Consume an authorization code.
    ///
    /// The code is removed even when the redirect URI does not match.
    pub fn redeem_code(
        &self,
        code: &str,
        redirect_uri: Option<&str>,
        now_ms: u64,
    ) -> Result<(TestIdentity, AuthorizationGrant), OidcError> {
        let mut state = self.write();
        let grant = state.codes.remove(code).ok_or_else(|| {
            warn!("Unknown or already used authorization code");
            OidcError::InvalidGrant("unknown or already used authorization code".into())
        })?;
        if let Some(uri) = redirect_uri {
            if uri != grant.redirect_uri {
                warn!(redirect_uri = uri, "Redirect URI does not match the authorization request");
                return Err(OidcError::InvalidGrant("redirect_uri mismatch".into()));
            }
        }
        match &state.identity {
            Some(identity) if identity.sub == grant.sub && !identity.is_expired_at(now_ms) => {
                Ok((identity.clone(), grant))
            }
            _ => Err(OidcError::InvalidGrant(
                "authorization code belongs to an inactive session".into(),
            )),
        }
    }

    /// Next token serial id, `test-<n>`.
    pub fn next_jti(&self) -> String {
        let mut state = self.write();
        let jti = format!("test-{}", state.serial);
        state.serial += 1;
        jti
    }
}

fn default_email(name: &str, user_domain: &str) -> String {
    let local = name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(".")
        .to_lowercase();
    format!("{local}@{user_domain}")
}

fn generated_sub(name: &str, op_domain: &str) -> String {
    let slug = name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase();
    format!("id-of-{slug}-{}@{op_domain}", Uuid::new_v4().simple())
}
