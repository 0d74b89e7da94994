//! Configuration for the handle daemon

use handle_engine::{AdminPolicy, GeneratorRegistry, DEFAULT_GENERATION_ATTEMPTS};
use handle_types::admin::PERM_ALL;
use handle_types::AdminIdentity;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Administrative identity
    #[serde(default)]
    pub admin: AdminConfig,

    /// Name generation for batch creation
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Maximum request body size in bytes
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            max_body_size: default_max_body_size(),
        }
    }
}

/// The identity written into synthesized `HS_ADMIN` values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Handle holding the administrator's key, e.g. `0.NA/12345`
    #[serde(default = "default_admin_handle")]
    pub handle: String,

    /// Index of the key value within that handle
    #[serde(default = "default_key_index")]
    pub key_index: u32,

    /// Preferred index for a synthesized admin value
    #[serde(default = "default_admin_index")]
    pub default_index: u32,

    /// Permission mask of a synthesized admin value
    #[serde(default = "default_admin_permissions")]
    pub permissions: u16,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            handle: default_admin_handle(),
            key_index: default_key_index(),
            default_index: default_admin_index(),
            permissions: default_admin_permissions(),
        }
    }
}

impl AdminConfig {
    pub fn policy(&self) -> AdminPolicy {
        AdminPolicy::new(AdminIdentity::new(self.handle.as_str(), self.key_index))
            .with_default_index(self.default_index)
            .with_permissions(self.permissions)
    }
}

/// Name generator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Generator used when a request does not select one
    #[serde(default = "default_generator")]
    pub default: String,

    /// First value of the `counter` generator
    #[serde(default = "default_counter_start")]
    pub counter_start: u64,

    /// Names drawn before a generated creation gives up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            default: default_generator(),
            counter_start: default_counter_start(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl GeneratorConfig {
    pub fn registry(&self) -> GeneratorRegistry {
        GeneratorRegistry::with_builtins(self.counter_start, self.default.as_str())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_max_body_size() -> usize {
    1024 * 1024
}

fn default_admin_handle() -> String {
    "0.NA/12345".to_string()
}

fn default_key_index() -> u32 {
    300
}

fn default_admin_index() -> u32 {
    AdminPolicy::DEFAULT_INDEX
}

fn default_admin_permissions() -> u16 {
    PERM_ALL
}

fn default_generator() -> String {
    GeneratorRegistry::UUID.to_string()
}

fn default_counter_start() -> u64 {
    1
}

fn default_max_attempts() -> usize {
    DEFAULT_GENERATION_ATTEMPTS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `HANDLE_`-prefixed environment variables (`HANDLE_SERVER__LISTEN_ADDR`).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("HANDLE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.server.listen_addr.port(), 8080);
        assert_eq!(config.admin.default_index, 100);
        assert_eq!(config.generator.default, "uuid");
        assert_eq!(config.generator.max_attempts, 3);
    }

    #[test]
    fn test_admin_policy_from_config() {
        let admin = AdminConfig {
            handle: "0.NA/10876".to_string(),
            key_index: 200,
            default_index: 150,
            permissions: PERM_ALL,
        };
        let policy = admin.policy();
        assert_eq!(policy.identity.handle.as_str(), "0.NA/10876");
        assert_eq!(policy.identity.key_index, 200);
        assert_eq!(policy.admin_value(&[]).index, 150);
    }

    #[test]
    fn test_generator_registry_from_config() {
        let generator = GeneratorConfig {
            default: "counter".to_string(),
            counter_start: 7,
            max_attempts: 3,
        };
        let registry = generator.registry();
        let name = registry.resolve(None).unwrap().generate_name("10876");
        assert_eq!(name.as_str(), "10876/7");
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = DaemonConfig::load(None).unwrap();
        assert_eq!(config.admin.handle, "0.NA/12345");
        assert_eq!(config.server.max_body_size, 1024 * 1024);
    }
}
