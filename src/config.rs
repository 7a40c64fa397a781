//! Configuration management for HookGate.
//!
//! Configuration is layered:
//! 1. Built-in defaults from [`hookgate_core::defaults`]
//! 2. An optional TOML file (`hookgate.toml` by default)
//! 3. Environment variables, see [`crate::env_vars`]
//!
//! The resolved [`GatewayConfig`] is installed once at startup with
//! [`install`], which hands out a `&'static` reference for the lifetime of
//! the process.
//!
//! # Example
//!
//! ```
//! use hookgate::config::GatewayConfig;
//!
//! let config = GatewayConfig::from_toml_str("port = 9000\n[queue]\ncapacity = 64\n").unwrap();
//! assert_eq!(config.port, 9000);
//! assert_eq!(config.queue.capacity, 64);
//! ```

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Deserialize;
use tracing::warn;

use crate::env_vars;
use hookgate_core::defaults;
use hookgate_core::{
    ConnectionProvider, DeliveryConfig, DeliveryProvider, HookGateError, ProxyConfig,
    ProxyProvider, QueueConfig, QueueProvider, Result,
};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "hookgate.toml";

static CONFIG: OnceCell<GatewayConfig> = OnceCell::new();

// ============================================================================
// File format
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    port: Option<u16>,
    max_connections: Option<usize>,
    #[serde(default)]
    proxy: ProxySection,
    #[serde(default)]
    delivery: DeliverySection,
    #[serde(default)]
    queue: QueueSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProxySection {
    timeout_secs: Option<u64>,
    max_body_size_mb: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeliverySection {
    fallback_status_threshold: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct QueueSection {
    name: Option<String>,
    capacity: Option<usize>,
    max_attempts: Option<u32>,
    redelivery_delay_ms: Option<u64>,
}

// ============================================================================
// Resolved configuration
// ============================================================================

/// Fully resolved gateway configuration.
///
/// Implements every provider trait, so it can be handed to any core
/// component.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Listen port
    pub port: u16,
    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,
    /// Proxy behavior
    pub proxy: ProxyConfig,
    /// Delivery behavior
    pub delivery: DeliveryConfig,
    /// Queue behavior
    pub queue: QueueConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: defaults::LISTEN_PORT,
            max_connections: defaults::MAX_CONNECTIONS,
            proxy: ProxyConfig::default(),
            delivery: DeliveryConfig::default(),
            queue: QueueConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Loads the configuration file and applies environment overrides.
    ///
    /// With `path` set, the file must exist. Without it, `hookgate.toml` in
    /// the working directory is used when present.
    ///
    /// # Errors
    ///
    /// Returns [`HookGateError::ConfigError`] if the file cannot be read or
    /// parsed, or if the resulting values are invalid.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        config.with_env(|key| std::env::var(key)).validated()
    }

    /// Reads a TOML configuration file, without environment overrides.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            HookGateError::ConfigError(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| HookGateError::ConfigError(format!("{}: {e}", path.display())))
    }

    /// Parses TOML configuration text, without environment overrides.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: FileConfig =
            toml::from_str(content).map_err(|e| HookGateError::ConfigError(e.to_string()))?;
        Self::default().merge_file(file)
    }

    fn merge_file(mut self, file: FileConfig) -> Result<Self> {
        if let Some(port) = file.port {
            self.port = port;
        }
        if let Some(max) = file.max_connections {
            self.max_connections = max;
        }
        if let Some(secs) = file.proxy.timeout_secs {
            self.proxy.timeout = Duration::from_secs(secs);
        }
        if let Some(mb) = file.proxy.max_body_size_mb {
            self.proxy.max_body_size = ProxyConfig::mb_to_bytes(mb).ok_or_else(|| {
                HookGateError::ConfigError(format!("max_body_size_mb {mb} is too large"))
            })?;
        }
        if let Some(threshold) = file.delivery.fallback_status_threshold {
            self.delivery.fallback_status_threshold = threshold;
        }
        if let Some(name) = file.queue.name {
            self.queue.name = name;
        }
        if let Some(capacity) = file.queue.capacity {
            self.queue.capacity = capacity;
        }
        if let Some(attempts) = file.queue.max_attempts {
            self.queue.max_attempts = attempts;
        }
        if let Some(ms) = file.queue.redelivery_delay_ms {
            self.queue.redelivery_delay = Duration::from_millis(ms);
        }
        Ok(self)
    }

    /// Applies environment overrides read through `env_var`.
    ///
    /// Unparseable values are logged and ignored.
    pub fn with_env<F>(mut self, env_var: F) -> Self
    where
        F: Fn(&str) -> std::result::Result<String, std::env::VarError>,
    {
        self.port = parse_env_var_or_default(&env_var, env_vars::PORT, self.port);
        self.max_connections =
            parse_env_var_or_default(&env_var, env_vars::MAX_CONNECTIONS, self.max_connections);

        let timeout_secs = parse_env_var_or_default(
            &env_var,
            env_vars::PROXY_TIMEOUT_SECS,
            self.proxy.timeout.as_secs(),
        );
        self.proxy.timeout = Duration::from_secs(timeout_secs);

        if let Some(mb) = parse_env_var::<usize, F>(&env_var, env_vars::MAX_BODY_SIZE_MB) {
            match ProxyConfig::mb_to_bytes(mb) {
                Some(bytes) => self.proxy.max_body_size = bytes,
                None => warn!(
                    var = env_vars::MAX_BODY_SIZE_MB,
                    value = mb,
                    "Body size out of range, ignoring"
                ),
            }
        }

        self.delivery.fallback_status_threshold = parse_env_var_or_default(
            &env_var,
            env_vars::FALLBACK_STATUS_THRESHOLD,
            self.delivery.fallback_status_threshold,
        );

        self.queue.capacity =
            parse_env_var_or_default(&env_var, env_vars::QUEUE_CAPACITY, self.queue.capacity);
        self.queue.max_attempts = parse_env_var_or_default(
            &env_var,
            env_vars::QUEUE_MAX_ATTEMPTS,
            self.queue.max_attempts,
        );
        if let Some(ms) = parse_env_var::<u64, F>(&env_var, env_vars::QUEUE_REDELIVERY_DELAY_MS) {
            self.queue.redelivery_delay = Duration::from_millis(ms);
        }

        self
    }

    /// Checks every section.
    ///
    /// # Errors
    ///
    /// Returns [`HookGateError::ConfigError`] naming the first invalid
    /// section.
    pub fn validated(self) -> Result<Self> {
        if self.port == 0 {
            return Err(HookGateError::ConfigError(
                "port must be greater than 0".to_string(),
            ));
        }
        if !self.proxy.is_valid() {
            return Err(HookGateError::ConfigError(
                "proxy timeout must be greater than 0".to_string(),
            ));
        }
        if !self.delivery.is_valid() {
            return Err(HookGateError::ConfigError(format!(
                "fallback status threshold {} is not an HTTP status",
                self.delivery.fallback_status_threshold
            )));
        }
        if !self.queue.is_valid() {
            return Err(HookGateError::ConfigError(
                "queue capacity and max attempts must be greater than 0".to_string(),
            ));
        }
        Ok(self)
    }
}

impl ProxyProvider for GatewayConfig {
    fn proxy_config(&self) -> &ProxyConfig {
        &self.proxy
    }
}

impl DeliveryProvider for GatewayConfig {
    fn delivery_config(&self) -> &DeliveryConfig {
        &self.delivery
    }
}

impl QueueProvider for GatewayConfig {
    fn queue_config(&self) -> &QueueConfig {
        &self.queue
    }
}

impl ConnectionProvider for GatewayConfig {
    fn max_connections(&self) -> usize {
        self.max_connections
    }
}

// ============================================================================
// Process-wide configuration
// ============================================================================

/// Installs the process configuration.
///
/// The first call wins; later calls return the configuration already
/// installed.
pub fn install(config: GatewayConfig) -> &'static GatewayConfig {
    CONFIG.get_or_init(|| config)
}

// ============================================================================
// Internal Helpers
// ============================================================================

/// Parses an environment variable, logging a warning if the value exists
/// but cannot be parsed.
fn parse_env_var<T, F>(env_var: &F, var_name: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> std::result::Result<String, std::env::VarError>,
{
    let value = env_var(var_name).ok()?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(var = var_name, value = %value, "Invalid env var value, ignoring");
            None
        }
    }
}

/// Parses an environment variable with fallback to a default value.
fn parse_env_var_or_default<T, F>(env_var: &F, var_name: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> std::result::Result<String, std::env::VarError>,
{
    parse_env_var(env_var, var_name).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    // Helper function to create a mock environment function for testing
    fn create_mock_env(
        vars: HashMap<&str, &str>,
    ) -> impl Fn(&str) -> std::result::Result<String, std::env::VarError> {
        move |key: &str| {
            vars.get(key)
                .map(|v| v.to_string())
                .ok_or(std::env::VarError::NotPresent)
        }
    }

    // ===========================================
    // File tests
    // ===========================================

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = GatewayConfig::from_toml_str("").unwrap();
        assert_eq!(config.port, defaults::LISTEN_PORT);
        assert_eq!(config.proxy.timeout, defaults::PROXY_TIMEOUT);
        assert_eq!(
            config.delivery.fallback_status_threshold,
            defaults::FALLBACK_STATUS_THRESHOLD
        );
        assert_eq!(config.queue.name, defaults::QUEUE_NAME);
    }

    #[test]
    fn test_full_file() {
        let config = GatewayConfig::from_toml_str(
            r#"
            port = 9000
            max_connections = 50

            [proxy]
            timeout_secs = 12
            max_body_size_mb = 2

            [delivery]
            fallback_status_threshold = 502

            [queue]
            name = "hooks"
            capacity = 8
            max_attempts = 2
            redelivery_delay_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.max_connections, 50);
        assert_eq!(config.proxy.timeout, Duration::from_secs(12));
        assert_eq!(config.proxy.max_body_size, 2 * 1024 * 1024);
        assert_eq!(config.delivery.fallback_status_threshold, 502);
        assert_eq!(config.queue.name, "hooks");
        assert_eq!(config.queue.capacity, 8);
        assert_eq!(config.queue.max_attempts, 2);
        assert_eq!(config.queue.redelivery_delay, Duration::from_millis(250));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = GatewayConfig::from_toml_str("[proxy]\nstreaming = true\n").unwrap_err();
        assert!(matches!(err, HookGateError::ConfigError(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = 7070").unwrap();

        let config = GatewayConfig::from_file(file.path()).unwrap();
        assert_eq!(config.port, 7070);
    }

    #[test]
    fn test_bundled_config_file_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_CONFIG_FILE);
        let config = GatewayConfig::from_file(&path).unwrap().validated().unwrap();
        let defaults = GatewayConfig::default();

        assert_eq!(config.port, defaults.port);
        assert_eq!(config.proxy.timeout, defaults.proxy.timeout);
        assert_eq!(config.proxy.max_body_size, defaults.proxy.max_body_size);
        assert_eq!(config.queue.name, defaults.queue.name);
        assert_eq!(config.queue.redelivery_delay, defaults.queue.redelivery_delay);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let err = GatewayConfig::load(Some(Path::new("/nonexistent/hookgate.toml"))).unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }

    // ===========================================
    // Environment tests
    // ===========================================

    #[test]
    fn test_env_overrides_file() {
        let mut vars = HashMap::new();
        vars.insert(env_vars::PORT, "9100");
        vars.insert(env_vars::PROXY_TIMEOUT_SECS, "3");
        vars.insert(env_vars::FALLBACK_STATUS_THRESHOLD, "503");
        vars.insert(env_vars::QUEUE_REDELIVERY_DELAY_MS, "20");

        let config = GatewayConfig::from_toml_str("port = 9000\n")
            .unwrap()
            .with_env(create_mock_env(vars));

        assert_eq!(config.port, 9100);
        assert_eq!(config.proxy.timeout, Duration::from_secs(3));
        assert_eq!(config.delivery.fallback_status_threshold, 503);
        assert_eq!(config.queue.redelivery_delay, Duration::from_millis(20));
    }

    #[test]
    fn test_invalid_env_value_keeps_previous() {
        let mut vars = HashMap::new();
        vars.insert(env_vars::QUEUE_CAPACITY, "lots");
        vars.insert(env_vars::MAX_BODY_SIZE_MB, "-1");

        let config = GatewayConfig::from_toml_str("[queue]\ncapacity = 32\n")
            .unwrap()
            .with_env(create_mock_env(vars));

        assert_eq!(config.queue.capacity, 32);
        assert_eq!(config.proxy.max_body_size, defaults::MAX_BODY_SIZE);
    }

    #[test]
    fn test_oversized_body_limit_in_file_rejected() {
        let err = GatewayConfig::from_toml_str(&format!(
            "[proxy]\nmax_body_size_mb = {}\n",
            i64::MAX
        ))
        .unwrap_err();
        assert!(err.to_string().contains("max_body_size_mb"));
    }

    #[test]
    fn test_oversized_body_limit_in_env_ignored() {
        let huge = usize::MAX.to_string();
        let mut vars = HashMap::new();
        vars.insert(env_vars::MAX_BODY_SIZE_MB, huge.as_str());

        let config = GatewayConfig::from_toml_str("[proxy]\nmax_body_size_mb = 3\n")
            .unwrap()
            .with_env(create_mock_env(vars))
            .validated()
            .unwrap();
        assert_eq!(config.proxy.max_body_size, 3 * 1024 * 1024);
    }

    #[test]
    fn test_env_zero_body_size_means_unlimited() {
        let mut vars = HashMap::new();
        vars.insert(env_vars::MAX_BODY_SIZE_MB, "0");

        let config = GatewayConfig::default().with_env(create_mock_env(vars));
        assert_eq!(config.proxy.max_body_size, 0);
        assert_eq!(config.proxy.max_body_size_mb(), "unlimited");
    }

    // ===========================================
    // Validation tests
    // ===========================================

    #[test]
    fn test_validated_rejects_bad_values() {
        let mut config = GatewayConfig::default();
        config.delivery.fallback_status_threshold = 42;
        assert!(config.validated().is_err());

        let mut config = GatewayConfig::default();
        config.queue.max_attempts = 0;
        assert!(config.validated().is_err());

        let mut config = GatewayConfig::default();
        config.proxy.timeout = Duration::ZERO;
        assert!(config.validated().is_err());

        assert!(GatewayConfig::default().validated().is_ok());
    }

    // ===========================================
    // Process-wide configuration tests
    // ===========================================

    #[test]
    fn test_install_keeps_first_config() {
        let first = install(GatewayConfig {
            port: 9301,
            ..GatewayConfig::default()
        });
        let second = install(GatewayConfig {
            port: 9302,
            ..GatewayConfig::default()
        });

        assert!(std::ptr::eq(first, second));
        assert_eq!(second.port, first.port);
    }
}
