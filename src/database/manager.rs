use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use super::DatabaseError;
use crate::config::DatabaseConfig;

/// Opens connection pools and applies the bundled migrations
pub struct DatabaseManager;

impl DatabaseManager {
    /// Connect a pool using `DATABASE_URL` and the pool settings from config
    pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        let connection_string = Self::connection_string(config)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(&connection_string)
            .await?;

        info!(
            "Created database pool for: {}",
            Self::redacted(&connection_string).unwrap_or_else(|| "<unparseable url>".to_string())
        );
        Ok(pool)
    }

    pub async fn migrate(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations").run(pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    fn connection_string(config: &DatabaseConfig) -> Result<String, DatabaseError> {
        let url = config
            .url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;
        let parsed = url::Url::parse(url).map_err(|_| DatabaseError::ConfigMissing("a valid DATABASE_URL"))?;
        match parsed.scheme() {
            "postgres" | "postgresql" => Ok(parsed.into()),
            _ => Err(DatabaseError::ConfigMissing("a postgres:// DATABASE_URL")),
        }
    }

    /// Connection string with the password blanked, for logs
    fn redacted(connection_string: &str) -> Option<String> {
        let mut url = url::Url::parse(connection_string).ok()?;
        if url.password().is_some() {
            url.set_password(Some("***")).ok()?;
        }
        Some(url.into())
    }
}
