//! Service plumbing for the test OIDC provider.
//!
//! Configuration loading (YAML file, `.env`, environment variables), tracing
//! setup, common HTTP layers, the health endpoint and a graceful server loop.

pub mod config;
pub mod health;
pub mod layers;
pub mod server;
pub mod tracing_setup;

pub use config::{ConfigError, ConfigProperties, ConfigValue, FromConfigValue, ServiceConfig};
pub use layers::{catch_panic_layer, cors_layer, default_trace};
pub use server::{mount, serve, ServerConfig};
pub use tracing_setup::{init_tracing, LogFormat};
