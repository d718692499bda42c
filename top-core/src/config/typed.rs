use super::{ConfigError, ServiceConfig};

/// Trait for strongly-typed configuration sections.
///
/// A section reads its keys from the raw config, applies its own defaults
/// for missing keys and validates the result:
///
/// ```ignore
/// impl ConfigProperties for ServerConfig {
///     fn from_config(config: &ServiceConfig) -> Result<Self, ConfigError> {
///         Ok(Self {
///             host: config.get_or("host", "127.0.0.1".to_string())?,
///             port: config.get_or("port", 8080)?,
///         })
///     }
/// }
/// ```
pub trait ConfigProperties: Sized {
    /// Construct from a `ServiceConfig` instance.
    fn from_config(config: &ServiceConfig) -> Result<Self, ConfigError>;
}

