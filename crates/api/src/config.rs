// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server configuration module
//!
//! This module provides configuration structures and logic for the resolver
//! service: where to listen, how the engine behaves, where each backend lives
//! and which credentials are available to the providers.

use std::{
    fmt,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::Path,
    time::Duration,
};

use anyhow::{Result, anyhow, ensure};
use config::{Config, ConfigError, Environment as ConfigEnv, File};
use provider_client::{Credential, StaticCredentials};
use providers::EndpointsConfig;
use resolution_engine::EngineConfig;
use serde::{Deserialize, Deserializer, Serialize, de};

use crate::error::{ServerError, ServerResult};

const ENV_PREFIX: &str = "RESOLVER";

/// A validated server port that ensures the value is appropriate for the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServerPort {
    port: u16,
    environment: Environment,
}

impl ServerPort {
    /// Create a new `ServerPort`, ensuring it's valid for the given environment
    ///
    /// # Errors
    ///
    /// Returns an error if the port is 0 in non-testing environments
    pub fn new(port: u16, environment: Environment) -> Result<Self> {
        if port == 0 && environment != Environment::Testing {
            return Err(anyhow!("port cannot be 0 in non-testing environments"));
        }
        Ok(Self { port, environment })
    }

    /// Create a safe default port for development
    pub const fn default_development() -> Self {
        Self {
            port: 3000,
            environment: Environment::Development,
        }
    }

    /// Create a safe testing port (port 0)
    pub const fn testing() -> Self {
        Self {
            port: 0,
            environment: Environment::Testing,
        }
    }

    /// Get the port value
    pub fn value(&self) -> u16 {
        self.port
    }
}

impl<'de> Deserialize<'de> for ServerPort {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let port = u16::deserialize(deserializer)?;
        // Re-validated in `ServerConfig::load_from` once the environment is known
        Ok(Self {
            port,
            environment: Environment::Development,
        })
    }
}

/// A validated request timeout in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeoutSeconds(Duration);

impl TimeoutSeconds {
    /// Create a new `TimeoutSeconds`, ensuring the value is within valid bounds
    ///
    /// # Errors
    ///
    /// Returns an error if timeout is 0 or greater than 300 seconds
    pub fn new(seconds: u64) -> Result<Self> {
        ensure!(seconds != 0, "timeout must be greater than 0");
        ensure!(seconds <= 300, "timeout cannot exceed 300");
        Ok(Self(Duration::from_secs(seconds)))
    }

    /// Default request timeout (90 seconds)
    ///
    /// Long enough for a resolution that walks several slow providers.
    pub const fn default_value() -> Self {
        Self(Duration::from_secs(90))
    }

    /// Create a safe testing timeout (5 seconds)
    pub const fn testing() -> Self {
        Self(Duration::from_secs(5))
    }

    /// Get the timeout value
    pub fn value(&self) -> Duration {
        self.0
    }
}

impl<'de> Deserialize<'de> for TimeoutSeconds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = u64::deserialize(deserializer)?;
        Self::new(seconds).map_err(|e| de::Error::custom(e.to_string()))
    }
}

impl Default for TimeoutSeconds {
    fn default() -> Self {
        Self::default_value()
    }
}

/// Environment types for configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Production environment
    Production,
    /// Development environment
    Development,
    /// Testing environment
    Testing,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Production => write!(f, "production"),
            Environment::Development => write!(f, "development"),
            Environment::Testing => write!(f, "testing"),
        }
    }
}

/// Provider credentials, all optional
///
/// A missing credential never fails startup; providers that need it are
/// skipped at resolution time instead.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Marketplace API key shared by the keyed data APIs
    pub rapidapi_key: Option<String>,
    /// OAuth access token for the official Marketing API
    pub oauth_token: Option<String>,
    /// `li_at` session cookie
    pub li_at: Option<String>,
    /// `JSESSIONID` session cookie, used for the CSRF token
    pub jsessionid: Option<String>,
}

impl CredentialsConfig {
    /// Build the credential store handed to the engine
    ///
    /// Blank values count as absent.
    pub fn store(&self) -> StaticCredentials {
        let jsessionid = present(self.jsessionid.as_deref()).map(str::to_string);
        StaticCredentials::default()
            .with_optional(present(self.rapidapi_key.as_deref()).map(Credential::api_key))
            .with_optional(present(self.oauth_token.as_deref()).map(Credential::oauth))
            .with_optional(
                present(self.li_at.as_deref()).map(|li_at| Credential::cookies(li_at, jsessionid)),
            )
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("CredentialsConfig")
            .field("rapidapi_key", &redact(&self.rapidapi_key))
            .field("oauth_token", &redact(&self.oauth_token))
            .field("li_at", &redact(&self.li_at))
            .field("jsessionid", &redact(&self.jsessionid))
            .finish()
    }
}

/// Server configuration for different environments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    pub host: IpAddr,
    /// Server port (validated for environment compatibility)
    pub port: ServerPort,
    /// Request timeout in seconds (validated range: 1-300)
    pub timeout_seconds: TimeoutSeconds,
    /// Environment type
    pub environment: Environment,
    /// Resolution engine tuning
    #[serde(default)]
    pub engine: EngineConfig,
    /// Backend locations and transport timeouts
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    /// Provider credentials
    #[serde(default, skip_serializing)]
    pub credentials: CredentialsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: ServerPort::default_development(),
            timeout_seconds: TimeoutSeconds::default(),
            environment: Environment::Development,
            engine: EngineConfig::default(),
            endpoints: EndpointsConfig::default(),
            credentials: CredentialsConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create configuration from environment variables and optional configuration files
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if configuration is invalid or cannot be loaded.
    pub fn from_env() -> ServerResult<Self> {
        Self::load().map_err(|e| ServerError::Config {
            message: format!("failed to load configuration: {e}"),
        })
    }

    /// Load configuration from the working directory
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new("."))
    }

    /// Load configuration with hierarchical sources rooted at `dir`
    ///
    /// Later sources override earlier ones:
    /// 1. Default values
    /// 2. `config.json`
    /// 3. `config.{env}.json`
    /// 4. Environment variables with the `RESOLVER_` prefix; nested keys use
    ///    `__`, e.g. `RESOLVER_ENGINE__FAILURE_THRESHOLD`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or is invalid.
    pub fn load_from(dir: &Path) -> Result<Self, ConfigError> {
        let env_var = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let base_file = dir.join("config.json");
        let env_file = dir.join(format!("config.{}.json", env_var.to_lowercase()));

        let mut config_builder = Config::builder()
            .set_default("host", "127.0.0.1")?
            .set_default("port", 3000)?
            .set_default("timeout_seconds", 90)?
            .set_default("environment", "development")?
            .add_source(File::from(base_file).required(false))
            .add_source(File::from(env_file).required(false))
            .add_source(
                ConfigEnv::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        if std::env::var("ENVIRONMENT").is_ok() {
            config_builder = config_builder.set_override("environment", env_var.to_lowercase())?;
        }

        let config = config_builder.build()?;
        let mut server_config: Self = config.try_deserialize()?;

        server_config.port = ServerPort::new(server_config.port.value(), server_config.environment)
            .map_err(|e| ConfigError::Message(format!("invalid port configuration: {e}")))?;
        server_config
            .engine
            .validate()
            .map_err(|e| ConfigError::Message(format!("invalid engine configuration: {e}")))?;

        Ok(server_config)
    }

    /// Create configuration optimized for testing
    ///
    /// Backends point at an unroutable local address and no credentials are
    /// configured, so nothing leaves the machine.
    pub fn for_testing() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: ServerPort::testing(),
            timeout_seconds: TimeoutSeconds::testing(),
            environment: Environment::Testing,
            engine: EngineConfig::default(),
            endpoints: EndpointsConfig {
                pnd_base_url: "http://127.0.0.1:9".to_string(),
                fresh_data_base_url: "http://127.0.0.1:9".to_string(),
                marketing_base_url: "http://127.0.0.1:9".to_string(),
                voyager_base_url: "http://127.0.0.1:9".to_string(),
                request_timeout_seconds: 1,
                ..EndpointsConfig::default()
            },
            credentials: CredentialsConfig::default(),
        }
    }

    /// Get socket address for binding
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port.value())
    }
}
