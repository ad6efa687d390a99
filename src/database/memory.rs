//! In-process store for development and tests. One lock guards every table so
//! multi-table writes are as atomic as their Postgres counterparts.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    BookingFilter, BookingRepository, DatabaseError, DbResult, HealthCheckRepository, LeaseFilter,
    LeaseRepository, ListingRepository, UserRepository,
};
use crate::models::{
    Booking, BookingStatus, Lease, LeaseStatus, Listing, ListingStatus, Occupancy, PasswordReset, User,
};

#[derive(Default)]
struct Tables {
    listings: HashMap<Uuid, Listing>,
    bookings: HashMap<Uuid, Booking>,
    leases: HashMap<Uuid, Lease>,
    users: HashMap<Uuid, User>,
    resets: HashMap<String, PasswordReset>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl MemoryStore {
    /// Inserts a user with a unique email and no usable password
    pub(crate) async fn seed_user(&self, role: crate::models::Role) -> User {
        let id = Uuid::new_v4();
        let user = User {
            id,
            name: format!("{} {}", role, &id.simple().to_string()[..8]),
            email: format!("{}@example.com", id.simple()),
            password_hash: String::new(),
            role,
            created_at: Utc::now(),
        };
        UserRepository::insert(self, &user).await.unwrap();
        user
    }
}

/// Stable listing order: oldest first, ties broken by id
fn sorted<T: Clone>(items: impl Iterator<Item = T>, key: impl Fn(&T) -> (DateTime<Utc>, Uuid)) -> Vec<T> {
    let mut out: Vec<T> = items.collect();
    out.sort_by_key(|item| key(item));
    out
}

#[async_trait]
impl HealthCheckRepository for MemoryStore {
    async fn ping(&self) -> DbResult<()> {
        let _tables = self.tables.read().await;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl ListingRepository for MemoryStore {
    async fn insert(&self, listing: &Listing) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        if tables.listings.contains_key(&listing.id) {
            return Err(DatabaseError::Conflict(format!("listing {} already exists", listing.id)));
        }
        tables.listings.insert(listing.id, listing.clone());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> DbResult<Option<Listing>> {
        Ok(self.tables.read().await.listings.get(&id).cloned())
    }

    async fn list(&self, status: Option<ListingStatus>) -> DbResult<Vec<Listing>> {
        let tables = self.tables.read().await;
        let rows = tables
            .listings
            .values()
            .filter(|l| status.map_or(true, |s| l.status == s))
            .cloned();
        Ok(sorted(rows, |l| (l.created_at, l.id)))
    }

    async fn update(&self, listing: &Listing) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        match tables.listings.get_mut(&listing.id) {
            Some(stored) => {
                *stored = listing.clone();
                Ok(())
            }
            None => Err(DatabaseError::NotFound(format!("listing {}", listing.id))),
        }
    }

    async fn delete(&self, id: Uuid) -> DbResult<bool> {
        let mut tables = self.tables.write().await;
        let referenced = tables.bookings.values().any(|b| b.listing_id == id)
            || tables.leases.values().any(|l| l.listing_id == id);
        if referenced {
            return Err(DatabaseError::Conflict(format!(
                "listing {} is referenced by bookings or leases",
                id
            )));
        }
        Ok(tables.listings.remove(&id).is_some())
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn insert(&self, booking: &Booking) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.listings.contains_key(&booking.listing_id) {
            return Err(DatabaseError::NotFound(format!("listing {}", booking.listing_id)));
        }
        if !tables.users.contains_key(&booking.tenant_id) {
            return Err(DatabaseError::NotFound(format!("user {}", booking.tenant_id)));
        }
        tables.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> DbResult<Option<Booking>> {
        Ok(self.tables.read().await.bookings.get(&id).cloned())
    }

    async fn list(&self, filter: BookingFilter) -> DbResult<Vec<Booking>> {
        let tables = self.tables.read().await;
        let rows = tables.bookings.values().filter(|b| filter.matches(b)).cloned();
        Ok(sorted(rows, |b| (b.created_at, b.id)))
    }

    async fn update(&self, booking: &Booking) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        match tables.bookings.get_mut(&booking.id) {
            Some(stored) => {
                *stored = booking.clone();
                Ok(())
            }
            None => Err(DatabaseError::NotFound(format!("booking {}", booking.id))),
        }
    }

    async fn delete(&self, id: Uuid) -> DbResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.leases.values().any(|l| l.booking_id == id) {
            return Err(DatabaseError::Conflict(format!("booking {} backs a lease", id)));
        }
        Ok(tables.bookings.remove(&id).is_some())
    }
}

#[async_trait]
impl LeaseRepository for MemoryStore {
    async fn create_from_booking(&self, lease: &Lease) -> DbResult<()> {
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;
        if tables.leases.values().any(|l| l.booking_id == lease.booking_id) {
            return Err(DatabaseError::Conflict(format!(
                "booking {} already backs a lease",
                lease.booking_id
            )));
        }
        let booking = tables
            .bookings
            .get_mut(&lease.booking_id)
            .ok_or_else(|| DatabaseError::NotFound(format!("booking {}", lease.booking_id)))?;
        booking.status = BookingStatus::Approved;
        booking.updated_at = lease.created_at;
        tables.leases.insert(lease.id, lease.clone());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> DbResult<Option<Lease>> {
        Ok(self.tables.read().await.leases.get(&id).cloned())
    }

    async fn find_by_booking(&self, booking_id: Uuid) -> DbResult<Option<Lease>> {
        let tables = self.tables.read().await;
        Ok(tables.leases.values().find(|l| l.booking_id == booking_id).cloned())
    }

    async fn list(&self, filter: LeaseFilter) -> DbResult<Vec<Lease>> {
        let tables = self.tables.read().await;
        let rows = tables.leases.values().filter(|l| filter.matches(l)).cloned();
        Ok(sorted(rows, |l| (l.created_at, l.id)))
    }

    async fn save_if_status(&self, lease: &Lease, expected: LeaseStatus) -> DbResult<bool> {
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;
        let stored = tables
            .leases
            .get(&lease.id)
            .ok_or_else(|| DatabaseError::NotFound(format!("lease {}", lease.id)))?;
        if stored.status != expected {
            return Ok(false);
        }

        let occupancy = Occupancy::between(expected, lease.status);
        if occupancy != Occupancy::Unchanged {
            let other_occupying = tables
                .leases
                .values()
                .any(|l| l.id != lease.id && l.listing_id == lease.listing_id && l.status.is_occupying());
            let listing = tables
                .listings
                .get_mut(&lease.listing_id)
                .ok_or_else(|| DatabaseError::NotFound(format!("listing {}", lease.listing_id)))?;
            if occupancy == Occupancy::Begins {
                if other_occupying {
                    return Err(DatabaseError::Conflict(format!(
                        "listing {} is already leased",
                        lease.listing_id
                    )));
                }
                if listing.status == ListingStatus::Unavailable {
                    return Err(DatabaseError::Conflict(format!(
                        "listing {} is unavailable",
                        lease.listing_id
                    )));
                }
            }
            if let Some(status) = occupancy.listing_status(listing.status, other_occupying) {
                listing.status = status;
                listing.updated_at = lease.updated_at;
            }
        }

        tables.leases.insert(lease.id, lease.clone());
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> DbResult<bool> {
        Ok(self.tables.write().await.leases.remove(&id).is_some())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert(&self, user: &User) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(DatabaseError::Conflict(format!("email {} is already registered", user.email)));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> DbResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::NotFound(format!("user {}", id)))?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn insert_password_reset(&self, reset: &PasswordReset) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        tables.resets.insert(reset.token_hash.clone(), reset.clone());
        Ok(())
    }

    async fn consume_password_reset(&self, token_hash: &str, now: DateTime<Utc>) -> DbResult<Option<Uuid>> {
        let mut tables = self.tables.write().await;
        match tables.resets.get_mut(token_hash) {
            Some(reset) if reset.is_usable(now) => {
                reset.used_at = Some(now);
                Ok(Some(reset.user_id))
            }
            _ => Ok(None),
        }
    }
}
