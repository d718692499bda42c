use std::net::SocketAddr;

use axum::Router;
use tracing::info;

use crate::config::{ConfigError, ConfigProperties, ServiceConfig};
use crate::tracing_setup::LogFormat;

/// HTTP server settings shared by every service built on this crate.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Short name of the service, used in logs.
    pub service_name: String,
    /// External base URL of the service, used to build advertised endpoint URLs.
    pub service_url: String,
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Path prefix below which all routes are mounted (`/` for the root).
    pub api_root_path: String,
    /// Allowed CORS origins. Empty means any origin.
    pub cors_allowed_origins: Vec<String>,
    /// Default log level when `RUST_LOG` is not set.
    pub log_level: String,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            service_name: "top".into(),
            service_url: "https://op.test".into(),
            host: "127.0.0.1".into(),
            port: 8080,
            api_root_path: "/".into(),
            cors_allowed_origins: Vec::new(),
            log_level: "info".into(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl ConfigProperties for ServerConfig {
    fn from_config(config: &ServiceConfig) -> Result<Self, ConfigError> {
        let defaults = ServerConfig {
            service_name: config.service().to_string(),
            ..ServerConfig::default()
        };
        let log_format = match config.get::<Option<String>>("log_format") {
            Ok(Some(format)) => format.parse()?,
            Ok(None) | Err(ConfigError::NotFound(_)) => defaults.log_format,
            Err(e) => return Err(e),
        };
        let server = ServerConfig {
            service_name: config.get_or("service_name", defaults.service_name)?,
            service_url: config.get_or("service_url", defaults.service_url)?,
            host: config.get_or("host", defaults.host)?,
            port: config.get_or("port", defaults.port)?,
            api_root_path: config.get_or("api_root_path", defaults.api_root_path)?,
            cors_allowed_origins: config
                .get_or("cors_allowed_origins", defaults.cors_allowed_origins)?,
            log_level: config.get_or("log_level", defaults.log_level)?,
            log_format,
        };
        server.validate()?;
        Ok(server)
    }
}

impl ServerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.service_url.contains("://") {
            return Err(ConfigError::invalid(
                "service_url",
                format!("'{}' is not an absolute URL", self.service_url),
            ));
        }
        if !self.api_root_path.starts_with('/') {
            return Err(ConfigError::invalid(
                "api_root_path",
                format!("'{}' must start with '/'", self.api_root_path),
            ));
        }
        Ok(())
    }

    /// Socket address to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Route prefix for nesting, `None` when mounted at the root.
    pub fn nest_path(&self) -> Option<String> {
        let trimmed = self.api_root_path.trim_end_matches('/');
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// Public root URL of the API, always ending with `/`.
    ///
    /// `https://op.test` + `/api/` -> `https://op.test/api/`
    pub fn root_url(&self) -> String {
        let base = self.service_url.trim_end_matches('/');
        match self.nest_path() {
            Some(path) => format!("{base}{path}/"),
            None => format!("{base}/"),
        }
    }
}

/// Mount the router below the configured root path.
pub fn mount(router: Router, config: &ServerConfig) -> Router {
    match config.nest_path() {
        Some(path) => Router::new().nest(&path, router),
        None => router,
    }
}

/// Bind a listener and serve the router until Ctrl-C or SIGTERM.
pub async fn serve(router: Router, addr: &str) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "Server listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl-C or SIGTERM on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
