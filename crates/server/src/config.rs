//! Configuration loading and validation for the pwshare service.
//!
//! Values come from an optional YAML file named after `WEB_ENV` (default
//! `dev`, i.e. `./dev.yaml`), overlaid by `PSCONFIG_`-prefixed environment
//! variables such as `PSCONFIG_LINK_LENGTH`. The process exits with a clear
//! error message if a required value is missing or invalid.

use std::time::Duration;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use config::builder::DefaultState;
use config::ConfigBuilder;
use serde::Deserialize;

use crate::crypto::cipher::{IV_LEN, KEY_LENS};
use crate::storage::sql::Provider;
use crate::storage::StoreOptions;

/// Environment variable prefix for every setting.
pub const ENV_PREFIX: &str = "PSCONFIG";

const DEFAULT_WEB_ENV: &str = "dev";

/// Validated service configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Length of issued links.
    #[serde(default = "default_link_length")]
    pub link_length: usize,

    /// Port the HTTP server listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Prefix joined with the link to form the URL returned to callers.
    #[serde(default)]
    pub base_path: String,

    /// Storage backend: `pg`, `postgres` or `sqlite`. **Required.**
    pub db_provider: String,

    /// sqlx connection string for the backend. **Required.**
    pub db_connection_string: String,

    /// Upper bound on simultaneously open storage sessions.
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// How long a request waits for a storage session before failing.
    #[serde(default = "default_db_acquire_timeout")]
    pub db_acquire_timeout_secs: u64,

    /// Raw AES key: 16, 24 or 32 bytes. **Required.**
    pub encrypt_secret: String,

    /// Base64 of the 16-byte CFB IV. **Required.**
    pub encrypt_iv: String,

    /// Per-request wall-clock limit applied by the HTTP layer.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// OTLP collector endpoint. Unset disables trace and metric export.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,
}

fn default_link_length() -> usize {
    8
}
fn default_port() -> u16 {
    8080
}
fn default_db_max_connections() -> u32 {
    10
}
fn default_db_acquire_timeout() -> u64 {
    5
}
fn default_request_timeout() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".into()
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("link_length", &self.link_length)
            .field("port", &self.port)
            .field("base_path", &self.base_path)
            .field("db_provider", &self.db_provider)
            .field("db_max_connections", &self.db_max_connections)
            .field("encrypt_secret", &"[REDACTED]")
            .field("log_level", &self.log_level)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load and validate configuration from `<WEB_ENV>.yaml` and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if any required value is absent or cannot be parsed.
    pub fn load() -> Result<Self> {
        let web_env = std::env::var("WEB_ENV").unwrap_or_else(|_| DEFAULT_WEB_ENV.into());
        let builder = config::Config::builder()
            .add_source(config::File::with_name(&web_env).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX));
        Self::from_builder(builder)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let cfg = builder
            .build()
            .context("failed to build configuration")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// The decoded CFB initialisation vector.
    ///
    /// # Errors
    ///
    /// Returns an error if `encrypt_iv` is not valid base64.
    pub fn encrypt_iv_bytes(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(self.encrypt_iv.trim())
            .context("PSCONFIG_ENCRYPT_IV must be base64")
    }

    /// Pool settings for the storage gateway.
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            max_connections: self.db_max_connections,
            acquire_timeout: Duration::from_secs(self.db_acquire_timeout_secs),
        }
    }

    /// Per-request timeout for the HTTP layer.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        if self.link_length == 0 {
            anyhow::bail!("PSCONFIG_LINK_LENGTH must be > 0");
        }
        self.db_provider
            .parse::<Provider>()
            .map_err(|e| anyhow::anyhow!("PSCONFIG_DB_PROVIDER: {e}"))?;
        ensure_non_empty(&self.db_connection_string, "PSCONFIG_DB_CONNECTION_STRING")?;
        if self.db_max_connections == 0 {
            anyhow::bail!("PSCONFIG_DB_MAX_CONNECTIONS must be > 0");
        }
        if self.db_acquire_timeout_secs == 0 {
            anyhow::bail!("PSCONFIG_DB_ACQUIRE_TIMEOUT_SECS must be > 0");
        }
        if !KEY_LENS.contains(&self.encrypt_secret.len()) {
            anyhow::bail!(
                "PSCONFIG_ENCRYPT_SECRET must be 16, 24 or 32 bytes, got {}",
                self.encrypt_secret.len()
            );
        }
        let iv = self.encrypt_iv_bytes()?;
        if iv.len() != IV_LEN {
            anyhow::bail!(
                "PSCONFIG_ENCRYPT_IV must decode to {IV_LEN} bytes, got {}",
                iv.len()
            );
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("PSCONFIG_REQUEST_TIMEOUT_SECS must be > 0");
        }
        Ok(())
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{File, FileFormat};

    // base64 of bytes 1..=16
    const IV_B64: &str = "AQIDBAUGBwgJCgsMDQ4PEA==";

    fn valid() -> Config {
        Config {
            link_length: default_link_length(),
            port: default_port(),
            base_path: "https://share.example.com/pwd".into(),
            db_provider: "pg".into(),
            db_connection_string: "postgres://user:pw@localhost/pwshare".into(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_secs: default_db_acquire_timeout(),
            encrypt_secret: "123456789123456789012345".into(),
            encrypt_iv: IV_B64.into(),
            request_timeout_secs: default_request_timeout(),
            log_level: default_log_level(),
            otel_exporter_otlp_endpoint: None,
        }
    }

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_link_length(), 8);
        assert_eq!(default_port(), 8080);
        assert_eq!(default_db_max_connections(), 10);
        assert_eq!(default_db_acquire_timeout(), 5);
        assert_eq!(default_request_timeout(), 30);
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn validate_accepts_valid_config() {
        let cfg = valid();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.encrypt_iv_bytes().unwrap(), (1u8..=16).collect::<Vec<_>>());
    }

    #[test]
    fn validate_rejects_zero_link_length() {
        let cfg = Config {
            link_length: 0,
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_unknown_provider() {
        let cfg = Config {
            db_provider: "mssql".into(),
            ..valid()
        };
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("PSCONFIG_DB_PROVIDER"), "{err}");
    }

    #[test]
    fn validate_rejects_bad_key_length() {
        let cfg = Config {
            encrypt_secret: "short".into(),
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_iv() {
        let not_base64 = Config {
            encrypt_iv: "???".into(),
            ..valid()
        };
        assert!(not_base64.validate().is_err());

        let too_short = Config {
            encrypt_iv: "AQIDBA==".into(),
            ..valid()
        };
        assert!(too_short.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_connection_string() {
        let cfg = Config {
            db_connection_string: "  ".into(),
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn loads_yaml_with_defaults() {
        let yaml = format!(
            "db_provider: sqlite\n\
             db_connection_string: \"sqlite::memory:\"\n\
             encrypt_secret: \"0123456789abcdef\"\n\
             encrypt_iv: \"{IV_B64}\"\n\
             link_length: 12\n"
        );
        let builder = config::Config::builder().add_source(File::from_str(&yaml, FileFormat::Yaml));
        let cfg = Config::from_builder(builder).unwrap();
        assert_eq!(cfg.link_length, 12);
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.base_path, "");
        assert!(cfg.otel_exporter_otlp_endpoint.is_none());
        assert_eq!(cfg.store_options().acquire_timeout, Duration::from_secs(5));
    }

    #[test]
    fn missing_required_value_fails() {
        let builder = config::Config::builder()
            .add_source(File::from_str("db_provider: sqlite\n", FileFormat::Yaml));
        assert!(Config::from_builder(builder).is_err());
    }

    #[test]
    fn sectioned_layout_is_not_read() {
        let yaml = "database:\n  provider: sqlite\n  connectionstring: \"sqlite::memory:\"\n\
                    app:\n  linklength: 8\n\
                    encrypt:\n  secret: \"0123456789abcdef\"\n";
        let builder = config::Config::builder().add_source(File::from_str(yaml, FileFormat::Yaml));
        let err = format!("{:#}", Config::from_builder(builder).unwrap_err());
        assert!(err.contains("db_provider"), "{err}");
    }

    #[test]
    fn debug_redacts_secret() {
        let rendered = format!("{:?}", valid());
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains("123456789123456789012345"));
    }
}
