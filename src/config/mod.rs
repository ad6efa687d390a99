use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub mail: MailConfig,
    pub leases: LeaseConfig,
    pub bootstrap: BootstrapConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_request_size_bytes: usize,
}

/// Which repository implementation backs the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub cors_origins: Vec<String>,
    pub reset_token_ttl_minutes: i64,
    pub min_password_length: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MailTransport {
    /// Write outgoing mail to the log only
    Log,
    /// Keep outgoing mail in an in-process outbox
    Memory,
    /// POST outgoing mail as JSON to `endpoint`
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub transport: MailTransport,
    pub from: String,
    pub endpoint: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Base URL of the dashboard, used to build links in outgoing mail
    pub client_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseConfig {
    /// Days before `end_date` at which an active lease becomes "expiring soon"
    pub expiring_soon_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub admin_name: String,
    pub admin_email: Option<String>,
    #[serde(skip_serializing)]
    pub admin_password: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Some(v) = env::var("PROPMAN_API_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.server.max_request_size_bytes = v.parse().unwrap_or(self.server.max_request_size_bytes);
        }

        // Database overrides
        if let Ok(v) = env::var("STORE_BACKEND") {
            self.database.backend = match v.to_ascii_lowercase().as_str() {
                "memory" | "mem" => StoreBackend::Memory,
                "postgres" | "pg" => StoreBackend::Postgres,
                _ => self.database.backend,
            };
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = env::var("SECURITY_RESET_TOKEN_TTL_MINUTES") {
            self.security.reset_token_ttl_minutes = v.parse().unwrap_or(self.security.reset_token_ttl_minutes);
        }

        // Mail overrides
        if let Ok(v) = env::var("MAIL_TRANSPORT") {
            self.mail.transport = match v.to_ascii_lowercase().as_str() {
                "memory" => MailTransport::Memory,
                "http" => MailTransport::Http,
                "log" => MailTransport::Log,
                _ => self.mail.transport,
            };
        }
        if let Ok(v) = env::var("MAIL_FROM") {
            self.mail.from = v;
        }
        if let Ok(v) = env::var("MAIL_ENDPOINT") {
            self.mail.endpoint = Some(v);
        }
        if let Ok(v) = env::var("MAIL_API_KEY") {
            self.mail.api_key = Some(v);
        }
        if let Ok(v) = env::var("CLIENT_URL") {
            self.mail.client_url = v;
        }

        // Lease overrides
        if let Ok(v) = env::var("LEASE_EXPIRING_SOON_DAYS") {
            self.leases.expiring_soon_days = v.parse().unwrap_or(self.leases.expiring_soon_days);
        }

        // Bootstrap admin
        if let Ok(v) = env::var("ADMIN_NAME") {
            self.bootstrap.admin_name = v;
        }
        if let Ok(v) = env::var("ADMIN_EMAIL") {
            self.bootstrap.admin_email = Some(v);
        }
        if let Ok(v) = env::var("ADMIN_PASSWORD") {
            self.bootstrap.admin_password = Some(v);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            database: DatabaseConfig {
                backend: StoreBackend::Memory,
                url: None,
                max_connections: 10,
                connection_timeout: 30,
                run_migrations: true,
            },
            security: SecurityConfig {
                jwt_secret: "development-secret-change-me".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                cors_origins: vec![],
                reset_token_ttl_minutes: 60,
                min_password_length: 8,
            },
            mail: MailConfig {
                transport: MailTransport::Log,
                from: "no-reply@localhost".to_string(),
                endpoint: None,
                api_key: None,
                client_url: "http://localhost:5173".to_string(),
            },
            leases: LeaseConfig { expiring_soon_days: 30 },
            bootstrap: BootstrapConfig {
                admin_name: "Administrator".to_string(),
                admin_email: None,
                admin_password: None,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                url: None,
                max_connections: 20,
                connection_timeout: 10,
                run_migrations: true,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                cors_origins: vec!["https://staging.example.com".to_string()],
                reset_token_ttl_minutes: 60,
                min_password_length: 8,
            },
            mail: MailConfig {
                transport: MailTransport::Http,
                from: "no-reply@staging.example.com".to_string(),
                endpoint: None,
                api_key: None,
                client_url: "https://staging.example.com".to_string(),
            },
            leases: LeaseConfig { expiring_soon_days: 30 },
            bootstrap: BootstrapConfig {
                admin_name: "Administrator".to_string(),
                admin_email: None,
                admin_password: None,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                url: None,
                max_connections: 50,
                connection_timeout: 5,
                run_migrations: false,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
                cors_origins: vec!["https://app.example.com".to_string()],
                reset_token_ttl_minutes: 60,
                min_password_length: 10,
            },
            mail: MailConfig {
                transport: MailTransport::Http,
                from: "no-reply@example.com".to_string(),
                endpoint: None,
                api_key: None,
                client_url: "https://app.example.com".to_string(),
            },
            leases: LeaseConfig { expiring_soon_days: 30 },
            bootstrap: BootstrapConfig {
                admin_name: "Administrator".to_string(),
                admin_email: None,
                admin_password: None,
            },
        }
    }
}

// Global singleton config - initialized once at startup
impl AppConfig {
    /// Settings the HTTP server cannot answer requests without
    pub fn ensure_servable(&self) -> anyhow::Result<()> {
        if self.security.jwt_secret.trim().is_empty() {
            anyhow::bail!(
                "JWT_SECRET is not set for the {:?} environment; refusing to start",
                self.environment
            );
        }
        Ok(())
    }
}

pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.database.backend, StoreBackend::Memory);
        assert_eq!(config.mail.transport, MailTransport::Log);
        assert_eq!(config.security.reset_token_ttl_minutes, 60);
        assert!(!config.security.jwt_secret.is_empty());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert_eq!(config.database.backend, StoreBackend::Postgres);
        assert!(config.security.jwt_secret.is_empty());
        assert!(!config.database.run_migrations);
        assert_eq!(config.leases.expiring_soon_days, 30);
    }

    #[test]
    fn server_needs_a_jwt_secret() {
        assert!(AppConfig::development().ensure_servable().is_ok());
        assert!(AppConfig::staging().ensure_servable().is_err());

        let mut config = AppConfig::production();
        assert!(config.ensure_servable().is_err());
        config.security.jwt_secret = "  ".to_string();
        assert!(config.ensure_servable().is_err());
        config.security.jwt_secret = "a-real-secret".to_string();
        assert!(config.ensure_servable().is_ok());
    }

    #[test]
    fn secrets_are_not_serialized() {
        let mut config = AppConfig::development();
        config.mail.api_key = Some("key-123".to_string());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("development-secret-change-me"));
        assert!(!json.contains("key-123"));
    }
}
