use serde::{Deserialize, Serialize};

use crate::keys::SigningAlgorithm;

pub const DEFAULT_SCOPE: &str = "openid profile email";

const SERVICE_DOCUMENTATION: &str = "https://github.com/ghga-de/test-oidc-provider";

/// Claims returned by `/userinfo`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub sub: String,
    pub name: String,
    pub email: String,
}

/// Successful token endpoint response (RFC 6749 §5.1).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub id_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub scope: String,
}

/// OpenID Connect discovery document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OidcConfiguration {
    pub version: String,
    pub issuer: String,
    pub jwks_uri: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
    pub scopes_supported: Vec<String>,
    pub claims_supported: Vec<String>,
    pub response_types_supported: Vec<String>,
    pub grant_types_supported: Vec<String>,
    pub subject_types_supported: Vec<String>,
    pub id_token_signing_alg_values_supported: Vec<String>,
    pub request_object_signing_alg_values_supported: Vec<String>,
    pub userinfo_signing_alg_values_supported: Vec<String>,
    pub service_documentation: String,
}

impl OidcConfiguration {
    /// Build the document for endpoints mounted below `root_url`, which ends with `/`.
    pub fn new(issuer: &str, root_url: &str, algorithm: SigningAlgorithm) -> Self {
        let strings = |values: &[&str]| values.iter().map(|v| v.to_string()).collect::<Vec<_>>();
        let alg = strings(&[algorithm.as_str()]);
        Self {
            version: env!("CARGO_PKG_VERSION").into(),
            issuer: issuer.to_string(),
            jwks_uri: format!("{root_url}jwks"),
            authorization_endpoint: format!("{root_url}authorize"),
            token_endpoint: format!("{root_url}token"),
            userinfo_endpoint: format!("{root_url}userinfo"),
            scopes_supported: strings(&["openid", "profile", "email"]),
            claims_supported: strings(&["sub", "name", "email"]),
            response_types_supported: strings(&["code"]),
            grant_types_supported: strings(&["authorization_code"]),
            subject_types_supported: strings(&["public"]),
            id_token_signing_alg_values_supported: alg.clone(),
            request_object_signing_alg_values_supported: alg.clone(),
            userinfo_signing_alg_values_supported: alg,
            service_documentation: SERVICE_DOCUMENTATION.into(),
        }
    }
}

/// Query parameters of `/authorize`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AuthorizeRequest {
    #[serde(default)]
    pub response_type: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub nonce: Option<String>,
}

/// Form parameters of `/token`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TokenRequest {
    pub grant_type: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
}
