//! MySQL server version over a live connection.

use super::ServerVersionSource;
use crate::connection::ConnectionConfig;
use crate::error::DevhomeError;
use crate::Result;
use async_trait::async_trait;
use sqlx::Connection;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use tracing::{debug, instrument};

/// Queries `SELECT VERSION()` over a single short-lived connection.
///
/// # Security
/// - The whole attempt (connect plus query) is bounded by the config timeout
/// - Error messages carry only the redacted connection URL
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlVersionSource;

impl MySqlVersionSource {
    fn options(config: &ConnectionConfig) -> MySqlConnectOptions {
        let mut options = MySqlConnectOptions::new();
        match &config.socket {
            Some(socket) => options = options.socket(socket),
            None => {
                if let Some(host) = &config.host {
                    options = options.host(host);
                }
                if let Some(port) = config.port {
                    options = options.port(port);
                }
            }
        }
        if let Some(user) = &config.user {
            options = options.username(user);
        }
        if let Some(password) = &config.password {
            options = options.password(password.expose());
        }
        if let Some(database) = &config.database {
            options = options.database(database);
        }
        options
    }
}

#[async_trait]
impl ServerVersionSource for MySqlVersionSource {
    #[instrument(skip_all, fields(connection = %config))]
    async fn server_version(&self, config: &ConnectionConfig) -> Result<String> {
        let options = Self::options(config);

        let attempt = async {
            let mut conn = MySqlConnection::connect_with(&options).await?;
            let version: String = sqlx::query_scalar("SELECT VERSION()")
                .fetch_one(&mut conn)
                .await?;
            if let Err(e) = conn.close().await {
                debug!(error = %e, "error closing probe connection");
            }
            Ok::<_, sqlx::Error>(version)
        };

        match tokio::time::timeout(config.timeout, attempt).await {
            Ok(Ok(version)) => Ok(version),
            Ok(Err(e)) => Err(DevhomeError::connection_failed(format!(
                "{}: {}",
                config.redacted_url(),
                e
            ))),
            Err(_) => Err(DevhomeError::connection_failed(format!(
                "{}: timed out after {:?}",
                config.redacted_url(),
                config.timeout
            ))),
        }
    }
}
