use std::sync::Arc;

use sqlx::PgPool;

use crate::config::{AppConfig, StoreBackend};
use crate::database::{
    BookingRepository, DatabaseManager, HealthCheckRepository, LeaseRepository, ListingRepository, MemoryStore,
    PgStore, UserRepository,
};
use crate::mail::{build_mailer, Mailer};
use crate::services::{AuthService, BookingService, LeaseService, ListingService};

/// One handle per repository seam, all backed by the same store
#[derive(Clone)]
pub struct AppRegistry {
    health_check_repository: Arc<dyn HealthCheckRepository>,
    listing_repository: Arc<dyn ListingRepository>,
    booking_repository: Arc<dyn BookingRepository>,
    lease_repository: Arc<dyn LeaseRepository>,
    user_repository: Arc<dyn UserRepository>,
}

impl AppRegistry {
    pub fn memory() -> Self {
        Self::from_store(Arc::new(MemoryStore::new()))
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self::from_store(Arc::new(PgStore::new(pool)))
    }

    fn from_store<S>(store: Arc<S>) -> Self
    where
        S: HealthCheckRepository + ListingRepository + BookingRepository + LeaseRepository + UserRepository + 'static,
    {
        Self {
            health_check_repository: store.clone(),
            listing_repository: store.clone(),
            booking_repository: store.clone(),
            lease_repository: store.clone(),
            user_repository: store,
        }
    }

    pub fn health_check_repository(&self) -> Arc<dyn HealthCheckRepository> {
        self.health_check_repository.clone()
    }

    pub fn listing_repository(&self) -> Arc<dyn ListingRepository> {
        self.listing_repository.clone()
    }

    pub fn booking_repository(&self) -> Arc<dyn BookingRepository> {
        self.booking_repository.clone()
    }

    pub fn lease_repository(&self) -> Arc<dyn LeaseRepository> {
        self.lease_repository.clone()
    }

    pub fn user_repository(&self) -> Arc<dyn UserRepository> {
        self.user_repository.clone()
    }
}

/// Shared router state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub registry: AppRegistry,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(config: AppConfig, registry: AppRegistry, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            config: Arc::new(config),
            registry,
            mailer,
        }
    }

    /// Builds the store and mailer named by `config`, migrating Postgres when enabled
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let registry = match config.database.backend {
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory store; data is lost on restart");
                AppRegistry::memory()
            }
            StoreBackend::Postgres => {
                let pool = DatabaseManager::connect(&config.database).await?;
                if config.database.run_migrations {
                    DatabaseManager::migrate(&pool).await?;
                }
                AppRegistry::postgres(pool)
            }
        };
        let mailer = build_mailer(&config.mail)?;
        Ok(Self::new(config, registry, mailer))
    }

    pub fn listings(&self) -> ListingService {
        ListingService::new(self.registry.listing_repository())
    }

    pub fn bookings(&self) -> BookingService {
        BookingService::new(
            self.registry.booking_repository(),
            self.registry.listing_repository(),
            self.registry.lease_repository(),
            self.registry.user_repository(),
        )
    }

    pub fn leases(&self) -> LeaseService {
        LeaseService::new(
            self.registry.lease_repository(),
            self.registry.booking_repository(),
            self.config.leases.expiring_soon_days,
        )
    }

    pub fn auth(&self) -> AuthService {
        AuthService::new(
            self.registry.user_repository(),
            self.mailer.clone(),
            self.config.security.clone(),
            self.config.mail.clone(),
        )
    }
}
