//! PostgreSQL driver on `tokio-postgres`.

use std::time::Duration;

use rq_container::BoxError;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, warn};

use crate::database::Database;

#[derive(Debug, Deserialize)]
pub struct PostgresConfig {
    pub host: String,
    #[serde(default = "default_pg_port")]
    pub port: u16,
    pub database: String,
    pub username: String,
    #[serde(default)]
    pub password: Option<SecretString>,
    /// Seconds to wait for the TCP connect + handshake.
    #[serde(rename = "connectionTimeout", default)]
    pub connection_timeout: Option<u64>,
}

fn default_pg_port() -> u16 { 5432 }

pub struct PostgresDatabase {
    config: PostgresConfig,
}

impl PostgresDatabase {
    pub fn new(config: PostgresConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PostgresConfig {
        &self.config
    }

    fn client_config(&self) -> tokio_postgres::Config {
        let mut pg = tokio_postgres::Config::new();
        pg.host(&self.config.host)
            .port(self.config.port)
            .dbname(&self.config.database)
            .user(&self.config.username);
        if let Some(password) = &self.config.password {
            pg.password(password.expose_secret());
        }
        if let Some(secs) = self.config.connection_timeout {
            pg.connect_timeout(Duration::from_secs(secs));
        }
        pg
    }
}

impl Database for PostgresDatabase {
    type Connection = Client;

    async fn new_connection(&self) -> Result<Client, BoxError> {
        // TODO: rustls-backed TLS; only plaintext connections are supported here.
        let (client, connection) = self.client_config().connect(NoTls).await?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!("Database connection error: {e}");
            }
        });

        debug!(
            "Connected to postgres://{}@{}:{}/{}",
            self.config.username, self.config.host, self.config.port, self.config.database
        );
        Ok(client)
    }

    fn is_reusable(&self, connection: &Client) -> bool {
        !connection.is_closed()
    }
}
