mod loader;
pub mod typed;
pub mod value;

use std::collections::HashMap;
use std::ops::Deref;
use std::path::{Path, PathBuf};

pub use typed::ConfigProperties;
pub use value::{ConfigValue, FromConfigValue};

/// Error type for configuration operations.
#[derive(Debug)]
pub enum ConfigError {
    /// The requested key was not found in the configuration.
    NotFound(String),
    /// The value could not be converted to the requested type.
    TypeMismatch { key: String, expected: &'static str },
    /// An I/O or YAML parsing error occurred while loading config files.
    Load(String),
    /// A value was read successfully but violates a constraint.
    Invalid { key: String, message: String },
}

impl ConfigError {
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: key.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(key) => write!(f, "Config key not found: {key}"),
            ConfigError::TypeMismatch { key, expected } => {
                write!(f, "Config type mismatch for '{key}': expected {expected}")
            }
            ConfigError::Load(msg) => write!(f, "Config load error: {msg}"),
            ConfigError::Invalid { key, message } => {
                write!(f, "Invalid config value for '{key}': {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Service configuration loaded from a YAML file, `.env` files, and environment variables.
///
/// `ServiceConfig` (= `ServiceConfig<()>`) provides raw key-value access only.
/// `ServiceConfig<T>` adds typed access to a validated config struct via `Deref<Target = T>`.
///
/// Resolution order (lowest to highest priority):
/// 1. Defaults supplied by the typed sections
/// 2. The YAML file: an explicit path, else `{SERVICE}_CONFIG_YAML`, else `{service}.yaml`
/// 3. `.env` file (loaded into process environment, never overwriting set variables)
/// 4. Environment variables (e.g., `TOP_USER_DOMAIN` overrides `user_domain`)
///
/// Keys are flat: `issuer`, `port`, `user_domain`.
#[derive(Debug, Clone)]
pub struct ServiceConfig<T = ()> {
    values: HashMap<String, ConfigValue>,
    service: String,
    typed: T,
}

// ── Constructors, only on ServiceConfig (= ServiceConfig<()>) ─────────

impl ServiceConfig {
    /// Load configuration for the given service, searching the default locations.
    pub fn load(service: &str) -> Result<Self, ConfigError> {
        Self::load_from(service, None)
    }

    /// Load configuration for the given service from an explicit YAML path.
    ///
    /// An explicit path must exist. The default locations are optional.
    pub fn load_from(service: &str, path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();

        // .env does NOT overwrite existing env vars, and may name the YAML file
        let _ = dotenvy::dotenv();

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::Load(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                loader::load_yaml_file(path, &mut values)?;
            }
            None => {
                let default_path = std::env::var(format!("{}_CONFIG_YAML", env_prefix(service)))
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from(format!("{service}.yaml")));
                loader::load_yaml_file(&default_path, &mut values)?;
            }
        }

        loader::overlay_env(&env_prefix(service), std::env::vars(), &mut values);

        Ok(ServiceConfig {
            values,
            service: service.to_string(),
            typed: (),
        })
    }

    /// Create a config from a YAML string (useful for testing).
    pub fn from_yaml_str(service: &str, yaml: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        loader::load_yaml_str(yaml, &mut values)?;
        Ok(ServiceConfig {
            values,
            service: service.to_string(),
            typed: (),
        })
    }

    /// Create an empty config (useful for testing).
    pub fn empty(service: &str) -> Self {
        ServiceConfig {
            values: HashMap::new(),
            service: service.to_string(),
            typed: (),
        }
    }

    /// Set a value programmatically.
    pub fn set(&mut self, key: &str, value: ConfigValue) {
        self.values.insert(key.to_string(), value);
    }

    /// Overlay `{SERVICE}_*` variables from the given iterator.
    pub fn overlay_env(mut self, vars: impl IntoIterator<Item = (String, String)>) -> Self {
        loader::overlay_env(&env_prefix(&self.service), vars, &mut self.values);
        self
    }

    /// Upgrade to a typed config by constructing `T` from the raw values.
    ///
    /// ```ignore
    /// let config = ServiceConfig::load("top")?.with_typed::<ServerConfig>()?;
    /// config.port  // typed field access via Deref
    /// config.get::<String>("host")  // raw access still works
    /// ```
    pub fn with_typed<C: ConfigProperties>(self) -> Result<ServiceConfig<C>, ConfigError> {
        let typed = C::from_config(&self)?;
        Ok(ServiceConfig {
            values: self.values,
            service: self.service,
            typed,
        })
    }
}

// ── Methods available on all ServiceConfig<T> ───────────────────────────

impl<T> ServiceConfig<T> {
    /// Get a typed value for the given key (raw access).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if the key does not exist, or
    /// `ConfigError::TypeMismatch` if the value cannot be converted.
    pub fn get<V: FromConfigValue>(&self, key: &str) -> Result<V, ConfigError> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| ConfigError::NotFound(key.to_string()))?;
        V::from_config_value(value, key)
    }

    /// Get a typed value, falling back to `default` only when the key is missing.
    ///
    /// Unlike a plain `unwrap_or`, a present value of the wrong type is an error.
    pub fn get_or<V: FromConfigValue>(&self, key: &str, default: V) -> Result<V, ConfigError> {
        match self.values.get(key) {
            Some(value) => V::from_config_value(value, key),
            None => Ok(default),
        }
    }

    /// Check whether a key exists in the config.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// The service name this config was loaded for.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Get a reference to the typed config layer.
    pub fn typed(&self) -> &T {
        &self.typed
    }

    /// Downgrade to a raw (untyped) config, discarding the typed layer.
    pub fn raw(&self) -> ServiceConfig {
        ServiceConfig {
            values: self.values.clone(),
            service: self.service.clone(),
            typed: (),
        }
    }
}

// ── Deref for ergonomic typed field access ──────────────────────────────

impl<T> Deref for ServiceConfig<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.typed
    }
}

/// Environment variable prefix for a service name: `top` -> `TOP`, `my-op` -> `MY_OP`.
pub fn env_prefix(service: &str) -> String {
    service.to_uppercase().replace('-', "_")
}
