use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::error::{ServiceError, ServiceResult};
use crate::auth::AuthUser;
use crate::database::ListingRepository;
use crate::models::listing::{ListingChanges, NewListing};
use crate::models::{Listing, ListingStatus};

#[derive(Clone)]
pub struct ListingService {
    listings: Arc<dyn ListingRepository>,
}

impl ListingService {
    pub fn new(listings: Arc<dyn ListingRepository>) -> Self {
        Self { listings }
    }

    pub async fn create(&self, actor: &AuthUser, form: NewListing) -> ServiceResult<Listing> {
        actor.require_admin()?;
        let listing = form.into_listing(actor.id, Utc::now())?;
        self.listings.insert(&listing).await?;
        tracing::info!(listing_id = %listing.id, owner_id = %actor.id, "Listing created");
        Ok(listing)
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<Listing> {
        self.listings
            .find(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Listing {} not found", id)))
    }

    pub async fn list(&self, status: Option<ListingStatus>) -> ServiceResult<Vec<Listing>> {
        Ok(self.listings.list(status).await?)
    }

    pub async fn update(&self, actor: &AuthUser, id: Uuid, changes: ListingChanges) -> ServiceResult<Listing> {
        actor.require_admin()?;
        let mut listing = self.get(id).await?;
        changes.apply(&mut listing, Utc::now())?;
        self.listings.update(&listing).await?;
        tracing::info!(listing_id = %id, status = %listing.status, "Listing updated");
        Ok(listing)
    }

    pub async fn delete(&self, actor: &AuthUser, id: Uuid) -> ServiceResult<()> {
        actor.require_admin()?;
        match self.listings.delete(id).await {
            Ok(true) => {
                tracing::info!(listing_id = %id, "Listing deleted");
                Ok(())
            }
            Ok(false) => Err(ServiceError::not_found(format!("Listing {} not found", id))),
            Err(crate::database::DatabaseError::Conflict(_)) => Err(ServiceError::conflict(
                "Listing still has bookings or leases and cannot be deleted",
            )),
            Err(e) => Err(e.into()),
        }
    }
}
