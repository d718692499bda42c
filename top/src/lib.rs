//! Test OpenID Connect provider server.
//!
//! Wires the provider from `top-oidc` into the HTTP plumbing of `top-core`.

use std::sync::Arc;

use axum::Router;
use top_core::health::health_routes;
use top_core::{
    catch_panic_layer, cors_layer, default_trace, mount, ConfigError, ConfigProperties,
    ServerConfig, ServiceConfig,
};
use top_oidc::{OidcProvider, OidcProviderConfig};

/// Service name; also the prefix of the environment variables (`TOP_*`).
pub const SERVICE: &str = "top";

/// Complete settings of the server.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub oidc: OidcProviderConfig,
}

impl ConfigProperties for AppConfig {
    fn from_config(config: &ServiceConfig) -> Result<Self, ConfigError> {
        Ok(AppConfig {
            server: ServerConfig::from_config(config)?,
            oidc: OidcProviderConfig::from_config(config)?,
        })
    }
}

/// Assemble the full application router below the configured root path.
pub fn app(provider: Arc<OidcProvider>, server: &ServerConfig) -> Result<Router, ConfigError> {
    let routes = top_oidc::router(provider, server.root_url()).merge(health_routes());
    Ok(mount(routes, server)
        .layer(cors_layer(&server.cors_allowed_origins)?)
        .layer(default_trace())
        .layer(catch_panic_layer()))
}
