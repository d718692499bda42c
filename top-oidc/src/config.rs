use top_core::{ConfigError, ConfigProperties, ServiceConfig};

use crate::keys::SigningAlgorithm;

/// Configuration for the test OIDC provider.
#[derive(Clone, Debug)]
pub struct OidcProviderConfig {
    /// Issuer identifier (`iss`), without trailing slash.
    pub issuer: String,
    /// Domain of the home organization of the test users, used for derived emails.
    pub user_domain: String,
    /// Client ID put into tokens minted by `/login`.
    pub client_id: String,
    /// Default validity of logins and tokens in seconds.
    pub valid_seconds: u64,
    /// JWS algorithm used for every token of this process.
    pub signing_algorithm: SigningAlgorithm,
    /// Key ID (`kid`) included in JWT headers and JWKS.
    pub key_id: String,
}

impl Default for OidcProviderConfig {
    fn default() -> Self {
        Self {
            issuer: "https://op.test".into(),
            user_domain: "home.org".into(),
            client_id: "test-client".into(),
            valid_seconds: 60 * 60,
            signing_algorithm: SigningAlgorithm::ES256,
            key_id: "test".into(),
        }
    }
}

impl OidcProviderConfig {
    /// Set the issuer.
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Set the user domain.
    pub fn user_domain(mut self, domain: impl Into<String>) -> Self {
        self.user_domain = domain.into();
        self
    }

    /// Set the client ID.
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Set the default validity in seconds.
    pub fn valid_seconds(mut self, secs: u64) -> Self {
        self.valid_seconds = secs;
        self
    }

    /// Set the signing algorithm.
    pub fn signing_algorithm(mut self, algorithm: SigningAlgorithm) -> Self {
        self.signing_algorithm = algorithm;
        self
    }

    /// Check the values and normalise the issuer.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        self.issuer = self.issuer.trim().trim_end_matches('/').to_string();
        if self.issuer.is_empty() || !self.issuer.contains("://") || !self.issuer.contains('.') {
            return Err(ConfigError::invalid(
                "issuer",
                format!("invalid issuer: {:?}", self.issuer),
            ));
        }
        let domain = self.user_domain.trim();
        if domain.is_empty() || domain.contains("://") || !domain.contains('.') {
            return Err(ConfigError::invalid(
                "user_domain",
                format!("invalid user domain: {:?}", self.user_domain),
            ));
        }
        self.user_domain = domain.to_string();
        if self.valid_seconds == 0 {
            return Err(ConfigError::invalid("valid_seconds", "must be positive"));
        }
        if self.client_id.is_empty() {
            return Err(ConfigError::invalid("client_id", "must not be empty"));
        }
        Ok(self)
    }

    /// The registrable domain of the issuer host: the last two labels.
    ///
    /// `https://proxy.aai.lifescience-ri.eu` -> `lifescience-ri.eu`
    pub fn op_domain(&self) -> String {
        let host = self
            .issuer
            .split_once("://")
            .map_or(self.issuer.as_str(), |(_, rest)| rest);
        let host = host.split('/').next().unwrap_or(host);
        let host = host.split(':').next().unwrap_or(host);
        let labels: Vec<&str> = host.rsplitn(3, '.').collect();
        match labels.as_slice() {
            [tld, name, ..] => format!("{name}.{tld}"),
            _ => host.to_string(),
        }
    }
}

impl ConfigProperties for OidcProviderConfig {
    fn from_config(config: &ServiceConfig) -> Result<Self, ConfigError> {
        let defaults = OidcProviderConfig::default();
        let signing_algorithm = match config.get::<String>("signing_algorithm") {
            Ok(alg) => alg
                .parse()
                .map_err(|e: crate::OidcError| ConfigError::invalid("signing_algorithm", e.to_string()))?,
            Err(ConfigError::NotFound(_)) => defaults.signing_algorithm,
            Err(e) => return Err(e),
        };
        OidcProviderConfig {
            issuer: config.get_or("issuer", defaults.issuer)?,
            user_domain: config.get_or("user_domain", defaults.user_domain)?,
            client_id: config.get_or("client_id", defaults.client_id)?,
            valid_seconds: config.get_or("valid_seconds", defaults.valid_seconds)?,
            signing_algorithm,
            key_id: config.get_or("key_id", defaults.key_id)?,
        }
        .validated()
    }
}
