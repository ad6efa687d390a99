//! Persistence seams. Each entity gets a repository trait; `PgStore` and
//! `MemoryStore` implement all of them.

pub mod manager;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Booking, BookingStatus, Lease, LeaseStatus, Listing, ListingStatus, PasswordReset, User,
};

pub use manager::DatabaseManager;
pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors from the persistence layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Corrupt row: {0}")]
    Decode(String),

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type DbResult<T> = Result<T, DatabaseError>;

#[derive(Debug, Default, Clone, Copy)]
pub struct BookingFilter {
    pub tenant_id: Option<Uuid>,
    pub listing_id: Option<Uuid>,
    pub status: Option<BookingStatus>,
}

impl BookingFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        self.tenant_id.map_or(true, |t| booking.tenant_id == t)
            && self.listing_id.map_or(true, |l| booking.listing_id == l)
            && self.status.map_or(true, |s| booking.status == s)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LeaseFilter {
    pub tenant_id: Option<Uuid>,
    pub listing_id: Option<Uuid>,
    pub status: Option<LeaseStatus>,
}

impl LeaseFilter {
    pub fn matches(&self, lease: &Lease) -> bool {
        self.tenant_id.map_or(true, |t| lease.tenant_id == t)
            && self.listing_id.map_or(true, |l| lease.listing_id == l)
            && self.status.map_or(true, |s| lease.status == s)
    }
}

#[async_trait]
pub trait HealthCheckRepository: Send + Sync {
    async fn ping(&self) -> DbResult<()>;

    fn backend(&self) -> &'static str;
}

#[async_trait]
pub trait ListingRepository: Send + Sync {
    async fn insert(&self, listing: &Listing) -> DbResult<()>;

    async fn find(&self, id: Uuid) -> DbResult<Option<Listing>>;

    async fn list(&self, status: Option<ListingStatus>) -> DbResult<Vec<Listing>>;

    /// Fails with `NotFound` when no listing has `listing.id`
    async fn update(&self, listing: &Listing) -> DbResult<()>;

    /// Fails with `Conflict` while bookings or leases still reference the listing
    async fn delete(&self, id: Uuid) -> DbResult<bool>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn insert(&self, booking: &Booking) -> DbResult<()>;

    async fn find(&self, id: Uuid) -> DbResult<Option<Booking>>;

    async fn list(&self, filter: BookingFilter) -> DbResult<Vec<Booking>>;

    async fn update(&self, booking: &Booking) -> DbResult<()>;

    /// Fails with `Conflict` while a lease references the booking
    async fn delete(&self, id: Uuid) -> DbResult<bool>;
}

#[async_trait]
pub trait LeaseRepository: Send + Sync {
    /// Stores a new lease and marks its booking approved, atomically.
    /// Fails with `NotFound` if the booking is gone and `Conflict` if it already backs a lease.
    async fn create_from_booking(&self, lease: &Lease) -> DbResult<()>;

    async fn find(&self, id: Uuid) -> DbResult<Option<Lease>>;

    async fn find_by_booking(&self, booking_id: Uuid) -> DbResult<Option<Lease>>;

    async fn list(&self, filter: LeaseFilter) -> DbResult<Vec<Lease>>;

    /// Compare-and-set write: stores `lease` only while the stored status is still
    /// `expected`. Returns `false` if the stored status has moved on.
    ///
    /// The listing follows in the same transaction (see [`Occupancy`](crate::models::Occupancy)). A lease
    /// starting to occupy its listing fails with `Conflict` when another lease
    /// already occupies it or the listing is Unavailable; a lease that stops
    /// occupying releases the listing only if no other lease still holds it.
    async fn save_if_status(&self, lease: &Lease, expected: LeaseStatus) -> DbResult<bool>;

    async fn delete(&self, id: Uuid) -> DbResult<bool>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the email is taken
    async fn insert(&self, user: &User) -> DbResult<()>;

    async fn find(&self, id: Uuid) -> DbResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> DbResult<Option<User>>;

    async fn update_password(&self, id: Uuid, password_hash: &str) -> DbResult<()>;

    async fn insert_password_reset(&self, reset: &PasswordReset) -> DbResult<()>;

    /// Marks the reset used and returns its user, if it exists and is still usable at `now`
    async fn consume_password_reset(&self, token_hash: &str, now: DateTime<Utc>) -> DbResult<Option<Uuid>>;
}
