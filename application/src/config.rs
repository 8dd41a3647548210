//! [`Config`]-related definitions.

use std::time;

use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use derive_more::{Display, Error};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use service::domain::user::{session, Session};
use smart_default::SmartDefault;

use crate::transport::Transport;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    /// [`Environment`] the application runs in.
    #[serde(default)]
    pub environment: Environment,

    /// Server configuration.
    #[serde(default)]
    pub server: Server,

    /// Service configuration.
    #[serde(default)]
    pub service: Service,

    /// Postgres configuration.
    #[serde(default)]
    pub postgres: Postgres,

    /// Log configuration.
    #[serde(default)]
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }

    /// Builds the [`Transport`] of session tokens matching this [`Config`].
    #[must_use]
    pub fn transport(&self) -> Transport {
        let secure = !self.environment.is_development();
        Transport::new(secure, self.service.lifetime)
    }
}

/// Environment the application runs in.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Local development.
    ///
    /// Relaxes the requirements which cannot be met on a developer machine.
    Development,

    /// Any deployment reachable by real users.
    #[default]
    Production,
}

impl Environment {
    /// Indicates whether this is the [`Environment::Development`].
    #[must_use]
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Server {
    /// Host to bind the server to.
    #[default("0.0.0.0".to_owned())]
    pub host: String,

    /// Port to bind the server to.
    #[default(8080)]
    pub port: u16,

    /// [CORS] configuration.
    ///
    /// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
    pub cors: Cors,
}

/// [CORS] configuration.
///
/// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Cors {
    /// List of allowed origins.
    #[default(vec!["*".to_owned()])]
    pub origins: Vec<String>,
}

/// Service configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Service {
    /// [JWT] signing secret.
    ///
    /// Required in every [`Environment`] but the development one.
    ///
    /// [JWT]: https://wikipedia.org/wiki/JSON_Web_Token
    pub jwt_secret: Option<SecretString>,

    /// Validity window of issued session tokens.
    #[default(Session::LIFETIME)]
    #[serde(with = "humantime_serde")]
    pub lifetime: time::Duration,
}

impl Service {
    /// Secret used in the development [`Environment`] when none is configured.
    const DEVELOPMENT_SECRET: &'static str = "insecure-development-secret";

    /// Builds the [`service::Config`] out of this [`Service`] configuration.
    ///
    /// # Errors
    ///
    /// If no usable [JWT] secret is configured outside the development
    /// [`Environment`].
    ///
    /// [JWT]: https://wikipedia.org/wiki/JSON_Web_Token
    pub fn build(
        &self,
        env: Environment,
    ) -> Result<service::Config, MissingSecretError> {
        let secret = self
            .jwt_secret
            .as_ref()
            .map(ExposeSecret::expose_secret)
            .filter(|s| !s.is_empty());
        let secret = match secret {
            Some(s) => s,
            None if env.is_development() => {
                tracing::warn!(
                    "`service.jwt_secret` is not set, using an insecure \
                     development secret",
                );
                Self::DEVELOPMENT_SECRET
            }
            None => return Err(MissingSecretError),
        };

        Ok(service::Config {
            session_codec: session::Codec::new(
                secret.as_bytes(),
                self.lifetime,
            ),
        })
    }
}

/// Error of a [JWT] secret missing outside the development [`Environment`].
///
/// [JWT]: https://wikipedia.org/wiki/JSON_Web_Token
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("`service.jwt_secret` must be set outside of development")]
pub struct MissingSecretError;

/// Postgres configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Postgres {
    /// Host to connect to.
    #[default("127.0.0.1".to_owned())]
    pub host: String,

    /// Port to connect to.
    #[default(5432)]
    pub port: u16,

    /// User to connect as.
    #[default("postgres".to_owned())]
    pub user: String,

    /// Password to connect with.
    #[default("postgres".to_owned())]
    pub password: String,

    /// Database name to connect to.
    #[default("postgres".to_owned())]
    pub dbname: String,
}

impl From<Postgres> for service::infra::postgres::Config {
    fn from(value: Postgres) -> Self {
        let Postgres {
            host,
            port,
            user,
            password,
            dbname,
        } = value;

        Self {
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            dbname: Some(dbname),
            ..Self::default()
        }
    }
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}
