//! Configuration management for the portal server.
//!
//! Loaded once from environment variables at startup and never changed
//! afterwards. Everything except the Infrahub address has a default.

use franc_portal_forms::events::DEFAULT_TOPIC_PREFIX;
use franc_portal_inventory::DEFAULT_BRANCH;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while reading the configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set
    #[error("{0} must be set")]
    Missing(&'static str),

    /// A variable holds a value that cannot be parsed
    #[error("{var} has an invalid value: {value}")]
    Invalid {
        /// Variable name
        var: &'static str,
        /// Offending value
        value: String,
    },
}

/// Portal configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address
    pub server: ServerConfig,
    /// Inventory connection
    pub infrahub: InfrahubConfig,
    /// Event publishing
    pub kafka: KafkaConfig,
    /// Directory holding `{topic}.md` help files
    pub help_dir: PathBuf,
    /// Run the DC branch workflow before publishing
    pub dc_create_branch: bool,
    /// Task simulator pacing; `0` runs without pauses
    pub simulator_time_scale: f64,
}

/// Listen address.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
}

impl ServerConfig {
    /// `host:port`
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Infrahub connection.
#[derive(Clone)]
pub struct InfrahubConfig {
    /// Base URL
    pub address: String,
    /// Branch used for option lookups
    pub branch: String,
    /// Sent as `X-INFRAHUB-KEY`
    pub api_token: Option<String>,
    /// Option lookup timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for InfrahubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfrahubConfig")
            .field("address", &self.address)
            .field("branch", &self.branch)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Kafka publishing.
#[derive(Clone)]
pub struct KafkaConfig {
    /// Publish events at all
    pub enabled: bool,
    /// Comma-separated broker list
    pub bootstrap_servers: String,
    /// Prefix of every topic
    pub topic_prefix: String,
    /// `PLAINTEXT`, `SSL`, `SASL_PLAINTEXT` or `SASL_SSL`
    pub security_protocol: String,
    /// SASL mechanism, e.g. `SCRAM-SHA-512`
    pub sasl_mechanism: Option<String>,
    /// SASL username
    pub sasl_username: Option<String>,
    /// SASL password
    pub sasl_password: Option<String>,
    /// CA bundle path
    pub ssl_cafile: Option<String>,
    /// Client certificate path
    pub ssl_certfile: Option<String>,
    /// Client key path
    pub ssl_keyfile: Option<String>,
    /// Producer send timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for KafkaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaConfig")
            .field("enabled", &self.enabled)
            .field("bootstrap_servers", &self.bootstrap_servers)
            .field("topic_prefix", &self.topic_prefix)
            .field("security_protocol", &self.security_protocol)
            .field("sasl_mechanism", &self.sasl_mechanism)
            .field("sasl_username", &self.sasl_username)
            .field("sasl_password", &self.sasl_password.as_ref().map(|_| "<redacted>"))
            .field("ssl_cafile", &self.ssl_cafile)
            .field("ssl_certfile", &self.ssl_certfile)
            .field("ssl_keyfile", &self.ssl_keyfile)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if `INFRAHUB_ADDRESS` is unset and
    /// [`ConfigError::Invalid`] for values that do not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through `lookup` instead of the process environment.
    ///
    /// # Errors
    ///
    /// See [`Config::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(&lookup);
        Ok(Self {
            server: ServerConfig {
                host: vars.string("HOST", "0.0.0.0"),
                port: vars.parsed("PORT", 8501)?,
            },
            infrahub: InfrahubConfig {
                address: vars
                    .optional("INFRAHUB_ADDRESS")
                    .ok_or(ConfigError::Missing("INFRAHUB_ADDRESS"))?,
                branch: vars.string("INFRAHUB_BRANCH", DEFAULT_BRANCH),
                api_token: vars.optional("INFRAHUB_API_TOKEN"),
                timeout: Duration::from_secs(vars.parsed("INFRAHUB_TIMEOUT_SECS", 5)?),
            },
            kafka: KafkaConfig {
                enabled: vars.flag("KAFKA_ENABLED", false)?,
                bootstrap_servers: vars.string("KAFKA_BOOTSTRAP_SERVERS", "localhost:9092"),
                topic_prefix: vars.string("KAFKA_TOPIC_PREFIX", DEFAULT_TOPIC_PREFIX),
                security_protocol: vars.string("KAFKA_SECURITY_PROTOCOL", "PLAINTEXT"),
                sasl_mechanism: vars.optional("KAFKA_SASL_MECHANISM"),
                sasl_username: vars.optional("KAFKA_SASL_USERNAME"),
                sasl_password: vars.optional("KAFKA_SASL_PASSWORD"),
                ssl_cafile: vars.optional("KAFKA_SSL_CAFILE"),
                ssl_certfile: vars.optional("KAFKA_SSL_CERTFILE"),
                ssl_keyfile: vars.optional("KAFKA_SSL_KEYFILE"),
                timeout: Duration::from_secs(vars.parsed("KAFKA_TIMEOUT_SECS", 10)?),
            },
            help_dir: PathBuf::from(vars.string("HELP_DIR", "help")),
            dc_create_branch: vars.flag("DC_CREATE_BRANCH", true)?,
            simulator_time_scale: vars.parsed("SIMULATOR_TIME_SCALE", 0.0)?,
        })
    }
}

struct Vars<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Vars<'_> {
    /// Set and not blank.
    fn optional(&self, name: &str) -> Option<String> {
        (self.0)(name).filter(|value| !value.trim().is_empty())
    }

    fn string(&self, name: &str, default: &str) -> String {
        self.optional(name).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T: FromStr>(&self, name: &'static str, default: T) -> Result<T, ConfigError> {
        match self.optional(name) {
            None => Ok(default),
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { var: name, value }),
        }
    }

    fn flag(&self, name: &'static str, default: bool) -> Result<bool, ConfigError> {
        let Some(value) = self.optional(name) else {
            return Ok(default);
        };
        match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { var: name, value }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_the_address_is_set() {
        let config = load(&[("INFRAHUB_ADDRESS", "http://infrahub:8000")]).unwrap();

        assert_eq!(config.server.bind_address(), "0.0.0.0:8501");
        assert_eq!(config.infrahub.branch, "main");
        assert_eq!(config.infrahub.timeout, Duration::from_secs(5));
        assert!(config.infrahub.api_token.is_none());
        assert!(!config.kafka.enabled);
        assert_eq!(config.kafka.bootstrap_servers, "localhost:9092");
        assert_eq!(config.kafka.topic_prefix, "franc");
        assert_eq!(config.kafka.security_protocol, "PLAINTEXT");
        assert_eq!(config.kafka.timeout, Duration::from_secs(10));
        assert_eq!(config.help_dir, PathBuf::from("help"));
        assert!(config.dc_create_branch);
        assert!(config.simulator_time_scale.abs() < f64::EPSILON);
    }

    #[test]
    fn infrahub_address_is_required() {
        assert_eq!(load(&[]).unwrap_err(), ConfigError::Missing("INFRAHUB_ADDRESS"));
        assert_eq!(
            load(&[("INFRAHUB_ADDRESS", "  ")]).unwrap_err(),
            ConfigError::Missing("INFRAHUB_ADDRESS")
        );
    }

    #[test]
    fn flags_accept_common_spellings() {
        for value in ["true", "1", "YES", "On"] {
            let config = load(&[("INFRAHUB_ADDRESS", "x"), ("KAFKA_ENABLED", value)]).unwrap();
            assert!(config.kafka.enabled, "{value}");
        }
        let config = load(&[("INFRAHUB_ADDRESS", "x"), ("DC_CREATE_BRANCH", "off")]).unwrap();
        assert!(!config.dc_create_branch);
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = load(&[("INFRAHUB_ADDRESS", "x"), ("PORT", "eighty")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                var: "PORT",
                value: "eighty".to_string()
            }
        );
        assert!(load(&[("INFRAHUB_ADDRESS", "x"), ("KAFKA_ENABLED", "maybe")]).is_err());
    }

    #[test]
    fn secrets_are_redacted_in_debug_output() {
        let config = load(&[
            ("INFRAHUB_ADDRESS", "x"),
            ("INFRAHUB_API_TOKEN", "tok-123"),
            ("KAFKA_SASL_PASSWORD", "hunter2"),
        ])
        .unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("tok-123"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn overrides_are_read() {
        let config = load(&[
            ("INFRAHUB_ADDRESS", "http://infrahub"),
            ("INFRAHUB_BRANCH", "lab"),
            ("PORT", "9000"),
            ("KAFKA_TOPIC_PREFIX", "lab"),
            ("SIMULATOR_TIME_SCALE", "0.5"),
            ("HELP_DIR", "/srv/help"),
        ])
        .unwrap();
        assert_eq!(config.infrahub.branch, "lab");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.kafka.topic_prefix, "lab");
        assert!((config.simulator_time_scale - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.help_dir, PathBuf::from("/srv/help"));
    }
}
