use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::error::{ServiceError, ServiceResult};
use crate::auth::AuthUser;
use crate::database::{BookingFilter, BookingRepository, LeaseRepository, ListingRepository, UserRepository};
use crate::models::booking::{BookingChanges, NewBooking};
use crate::models::{Booking, BookingStatus, ListingStatus};

#[derive(Clone)]
pub struct BookingService {
    bookings: Arc<dyn BookingRepository>,
    listings: Arc<dyn ListingRepository>,
    leases: Arc<dyn LeaseRepository>,
    users: Arc<dyn UserRepository>,
}

impl BookingService {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        listings: Arc<dyn ListingRepository>,
        leases: Arc<dyn LeaseRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            bookings,
            listings,
            leases,
            users,
        }
    }

    pub async fn create(&self, actor: &AuthUser, form: NewBooking) -> ServiceResult<Booking> {
        let draft = form.validate()?;
        let tenant_id = match form.tenant_id {
            Some(id) if actor.is_admin() => id,
            _ => actor.id,
        };
        if self.users.find(tenant_id).await?.is_none() {
            return Err(ServiceError::not_found(format!("User {} not found", tenant_id)));
        }

        let listing = self
            .listings
            .find(draft.listing_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Listing {} not found", draft.listing_id)))?;
        if listing.status == ListingStatus::Unavailable {
            return Err(ServiceError::conflict("Listing is not available for booking"));
        }

        let booking = draft.into_booking(tenant_id, listing.price, Utc::now());
        self.bookings.insert(&booking).await?;
        tracing::info!(booking_id = %booking.id, listing_id = %listing.id, tenant_id = %tenant_id, "Booking created");
        Ok(booking)
    }

    /// Tenants only see their own bookings; anything else reads as missing
    pub async fn get(&self, actor: &AuthUser, id: Uuid) -> ServiceResult<Booking> {
        match self.bookings.find(id).await? {
            Some(b) if actor.can_access(b.tenant_id) => Ok(b),
            _ => Err(ServiceError::not_found(format!("Booking {} not found", id))),
        }
    }

    pub async fn list(&self, actor: &AuthUser, mut filter: BookingFilter) -> ServiceResult<Vec<Booking>> {
        if !actor.is_admin() {
            filter.tenant_id = Some(actor.id);
        }
        Ok(self.bookings.list(filter).await?)
    }

    pub async fn update(&self, actor: &AuthUser, id: Uuid, changes: BookingChanges) -> ServiceResult<Booking> {
        let mut booking = self.get(actor, id).await?;

        if self.leases.find_by_booking(id).await?.is_some() {
            return Err(ServiceError::conflict("Booking already backs a lease and cannot be changed"));
        }
        if let Some(next) = changes.status {
            if !actor.is_admin() && next != BookingStatus::Cancelled {
                return Err(ServiceError::forbidden("Tenants can only cancel their bookings"));
            }
            if booking.status.is_closed() && next != booking.status {
                return Err(ServiceError::conflict(format!("Booking is already {}", booking.status)));
            }
        }
        if changes.touches_terms() && booking.status != BookingStatus::Pending {
            return Err(ServiceError::conflict("Only pending bookings can change dates or rent"));
        }

        changes.apply(&mut booking, Utc::now())?;
        self.bookings.update(&booking).await?;
        tracing::info!(booking_id = %id, status = %booking.status, "Booking updated");
        Ok(booking)
    }

    pub async fn delete(&self, actor: &AuthUser, id: Uuid) -> ServiceResult<()> {
        self.get(actor, id).await?;
        match self.bookings.delete(id).await {
            Ok(true) => {
                tracing::info!(booking_id = %id, "Booking deleted");
                Ok(())
            }
            Ok(false) => Err(ServiceError::not_found(format!("Booking {} not found", id))),
            Err(crate::database::DatabaseError::Conflict(_)) => {
                Err(ServiceError::conflict("Booking backs a lease and cannot be deleted"))
            }
            Err(e) => Err(e.into()),
        }
    }
}
