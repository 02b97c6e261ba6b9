//! Database connection parameter resolution.
//!
//! [`resolve`] merges four sources into one [`ConnectionConfig`], earliest
//! source first:
//!
//! 1. explicit configuration ([`ExplicitConnection`], usually from the options file)
//! 2. environment variables ([`EnvSnapshot`], several aliases per field)
//! 3. a connection URL (`DATABASE_URL` and friends, or an explicit override)
//! 4. driver defaults ([`DriverDefaults`])
//!
//! A field is only taken from a later source while it is still unset. Strings
//! are unset when absent or empty; the password is unset only when absent, and
//! a port of `0` counts as set. Resolution never fails.
//!
//! # Security
//! The password is held in a [`Secret`] and never rendered by `Debug`,
//! `Display` or [`ConnectionConfig::redacted_url`].

mod dsn;
mod env;


pub use dsn::{UrlParts, parse_connection_url};
pub use env::{
    DATABASE_VARS, EnvSnapshot, HOST_VARS, PASSWORD_VARS, PORT_VARS, SOCKET_VARS, URL_VARS,
    USER_VARS,
};

use crate::error::redact_database_url;
use crate::security::Secret;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Connect timeout used when no source sets one
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Connection fields given explicitly in configuration.
///
/// Accepts the common spellings seen in hand-written configs (`hostname`,
/// `username`, `pass`, `pw`, `dbname`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExplicitConnection {
    #[serde(alias = "hostname")]
    pub host: Option<String>,
    pub port: Option<u16>,
    pub socket: Option<PathBuf>,
    #[serde(alias = "username")]
    pub user: Option<String>,
    #[serde(alias = "pass", alias = "pw")]
    pub password: Option<Secret>,
    #[serde(alias = "dbname")]
    pub database: Option<String>,
    /// Connect timeout in seconds
    pub timeout: Option<u64>,
}

/// Values supplied by the driver when nothing else sets them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverDefaults {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub socket: Option<PathBuf>,
}

impl DriverDefaults {
    /// MySQL client defaults.
    pub fn mysql() -> Self {
        Self {
            host: Some("localhost".to_string()),
            port: Some(3306),
            socket: None,
        }
    }
}

/// The four inputs to [`resolve`].
#[derive(Debug, Clone, Default)]
pub struct ConnectionSources {
    pub explicit: ExplicitConnection,
    pub env: EnvSnapshot,
    /// Overrides the URL found in `env` when set
    pub url: Option<String>,
    pub defaults: DriverDefaults,
}

impl ConnectionSources {
    /// Sources for a MySQL connection using the current process environment.
    pub fn from_process(explicit: ExplicitConnection) -> Self {
        Self {
            explicit,
            env: EnvSnapshot::from_process(),
            url: None,
            defaults: DriverDefaults::mysql(),
        }
    }
}

/// Normalized connection descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub socket: Option<PathBuf>,
    pub user: Option<String>,
    pub password: Option<Secret>,
    pub database: Option<String>,
    pub timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            socket: None,
            user: None,
            password: None,
            database: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl std::fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.socket {
            Some(socket) => write!(f, "ConnectionConfig(unix:{}", socket.display())?,
            None => write!(
                f,
                "ConnectionConfig({}{}",
                self.host.as_deref().unwrap_or("localhost"),
                self.port.map_or_else(String::new, |p| format!(":{}", p))
            )?,
        }
        write!(
            f,
            "{})",
            self.database
                .as_ref()
                .map_or_else(String::new, |db| format!("/{}", db))
        )
        // Credentials are never part of the display form
    }
}

impl ConnectionConfig {
    /// Whether a live connection attempt is worth making: a user or a
    /// socket must be known.
    pub fn is_attemptable(&self) -> bool {
        self.user.is_some() || self.socket.is_some()
    }

    /// Loggable `mysql://` form of the descriptor with the password masked.
    pub fn redacted_url(&self) -> String {
        let host = self.host.as_deref().unwrap_or("localhost");
        let Ok(mut url) = url::Url::parse(&format!("mysql://{}", host)) else {
            return "<redacted>".to_string();
        };
        if let Some(port) = self.port {
            let _ = url.set_port(Some(port));
        }
        if let Some(user) = &self.user {
            let _ = url.set_username(user);
            if self.password.is_some() {
                let _ = url.set_password(Some("****"));
            }
        }
        if let Some(database) = &self.database {
            url.set_path(database);
        }
        if let Some(socket) = &self.socket {
            url.query_pairs_mut()
                .append_pair("socket", &socket.to_string_lossy());
        }
        redact_database_url(url.as_str())
    }

    /// Serializable view without the password.
    pub fn summary(&self) -> ConnectionSummary {
        ConnectionSummary {
            host: self.host.clone(),
            port: self.port,
            socket: self.socket.clone(),
            user: self.user.clone(),
            database: self.database.clone(),
            password_set: self.password.is_some(),
            timeout_secs: self.timeout.as_secs(),
            attemptable: self.is_attemptable(),
            url: self.redacted_url(),
        }
    }
}

/// Password-free view of a [`ConnectionConfig`] for reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionSummary {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub socket: Option<PathBuf>,
    pub user: Option<String>,
    pub database: Option<String>,
    pub password_set: bool,
    pub timeout_secs: u64,
    pub attemptable: bool,
    pub url: String,
}

/// Merges the sources into one descriptor. Never fails.
pub fn resolve(sources: &ConnectionSources) -> ConnectionConfig {
    let explicit = &sources.explicit;
    let env = &sources.env;

    let url = sources
        .url
        .as_deref()
        .or_else(|| env.connection_url())
        .and_then(|raw| {
            let parts = parse_connection_url(raw);
            if parts.is_none() {
                debug!(url = %redact_database_url(raw), "ignoring unparsable connection URL");
            }
            parts
        })
        .unwrap_or_default();

    let env_port = env.first(PORT_VARS).and_then(|raw| match raw.trim().parse::<u16>() {
        Ok(port) => Some(port),
        Err(_) => {
            debug!(value = raw, "ignoring unparsable port from environment");
            None
        }
    });

    let config = ConnectionConfig {
        host: first_string([
            explicit.host.as_deref(),
            env.first(HOST_VARS),
            url.host.as_deref(),
            sources.defaults.host.as_deref(),
        ]),
        port: explicit
            .port
            .or(env_port)
            .or(url.port)
            .or(sources.defaults.port),
        socket: explicit
            .socket
            .clone()
            .filter(|p| !p.as_os_str().is_empty())
            .or_else(|| env.first(SOCKET_VARS).map(PathBuf::from))
            .or_else(|| sources.defaults.socket.clone()),
        user: first_string([
            explicit.user.as_deref(),
            env.first(USER_VARS),
            url.user.as_deref(),
        ]),
        password: explicit
            .password
            .clone()
            .or_else(|| env.first(PASSWORD_VARS).map(Secret::from))
            .or_else(|| url.password.as_deref().map(Secret::from)),
        database: first_string([
            explicit.database.as_deref(),
            env.first(DATABASE_VARS),
            url.database.as_deref(),
        ]),
        timeout: explicit
            .timeout
            .filter(|secs| *secs > 0)
            .map_or(DEFAULT_TIMEOUT, Duration::from_secs),
    };

    debug!(connection = %config, attemptable = config.is_attemptable(), "resolved connection");
    config
}

fn first_string<const N: usize>(candidates: [Option<&str>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .find(|value| !value.is_empty())
        .map(str::to_string)
}
