//! Lease lifecycle. Explicit actions go through `transition`; the calendar
//! is applied lazily on every read and in bulk by `refresh`.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::{ServiceError, ServiceResult};
use crate::auth::AuthUser;
use crate::database::{BookingRepository, LeaseFilter, LeaseRepository};
use crate::models::lease::{LeaseChanges, TransitionRequest};
use crate::models::{Lease, LeaseAction, LeaseStatus, Occupancy};

/// Outcome of a bulk calendar pass
#[derive(Debug, Default, Clone, Serialize)]
pub struct RefreshReport {
    pub checked: usize,
    pub expiring_soon: usize,
    pub expired: usize,
}

#[derive(Clone)]
pub struct LeaseService {
    leases: Arc<dyn LeaseRepository>,
    bookings: Arc<dyn BookingRepository>,
    window_days: i64,
}

impl LeaseService {
    pub fn new(leases: Arc<dyn LeaseRepository>, bookings: Arc<dyn BookingRepository>, window_days: i64) -> Self {
        Self {
            leases,
            bookings,
            window_days,
        }
    }

    /// Creates a pending lease from a booking and approves the booking
    pub async fn create(&self, actor: &AuthUser, booking_id: Uuid) -> ServiceResult<Lease> {
        actor.require_admin()?;
        let booking = self
            .bookings
            .find(booking_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Booking {} not found", booking_id)))?;
        if booking.status.is_closed() {
            return Err(ServiceError::conflict(format!(
                "Booking is {} and cannot become a lease",
                booking.status
            )));
        }
        if self.leases.find_by_booking(booking_id).await?.is_some() {
            return Err(ServiceError::conflict("Booking already has a lease"));
        }

        let lease = Lease::from_booking(&booking, Utc::now());
        self.leases.create_from_booking(&lease).await?;
        info!(lease_id = %lease.id, booking_id = %booking_id, "Lease created");
        Ok(lease)
    }

    pub async fn get(&self, actor: &AuthUser, id: Uuid, today: NaiveDate) -> ServiceResult<Lease> {
        let lease = match self.leases.find(id).await? {
            Some(l) if actor.can_access(l.tenant_id) => l,
            _ => return Err(ServiceError::not_found(format!("Lease {} not found", id))),
        };
        self.sync(lease, today).await
    }

    /// Lists leases visible to `actor`. The status filter applies to the
    /// calendar-adjusted status.
    pub async fn list(&self, actor: &AuthUser, filter: LeaseFilter, today: NaiveDate) -> ServiceResult<Vec<Lease>> {
        let mut query = LeaseFilter { status: None, ..filter };
        if !actor.is_admin() {
            query.tenant_id = Some(actor.id);
        }

        let mut leases = Vec::new();
        for lease in self.leases.list(query).await? {
            let lease = self.sync(lease, today).await?;
            if filter.status.map_or(true, |s| lease.status == s) {
                leases.push(lease);
            }
        }
        Ok(leases)
    }

    pub async fn transition(
        &self,
        actor: &AuthUser,
        id: Uuid,
        request: TransitionRequest,
        today: NaiveDate,
    ) -> ServiceResult<Lease> {
        actor.require_admin()?;
        let mut lease = self.get(actor, id, today).await?;
        let from = lease.status;
        let next = from.apply(request.action)?;

        match request.action {
            LeaseAction::Activate if today > lease.end_date => {
                return Err(ServiceError::conflict(format!(
                    "Lease ended on {} and cannot be activated",
                    lease.end_date
                )));
            }
            LeaseAction::Renew => {
                let (start, end) = lease.renewal_range(request.start_date, request.end_date, today)?;
                lease.start_date = start;
                lease.end_date = end;
            }
            _ => {}
        }
        // A lease activated or renewed close to its end is already expiring soon
        let next = next.evaluate(lease.end_date, today, self.window_days);
        if Occupancy::between(from, next) == Occupancy::Begins {
            // Leases the calendar has already ended must not block the listing
            let filter = LeaseFilter {
                listing_id: Some(lease.listing_id),
                ..Default::default()
            };
            for other in self.leases.list(filter).await? {
                if other.id != lease.id {
                    self.sync(other, today).await?;
                }
            }
        }
        lease.status = next;
        lease.updated_at = Utc::now();

        if !self.leases.save_if_status(&lease, from).await? {
            warn!(lease_id = %id, action = %request.action, "Lease changed during transition");
            return Err(ServiceError::conflict("Lease was modified concurrently, retry the request"));
        }
        info!(lease_id = %id, from = %from, to = %next, action = %request.action, "Lease transitioned");
        Ok(lease)
    }

    pub async fn update(&self, actor: &AuthUser, id: Uuid, changes: LeaseChanges, today: NaiveDate) -> ServiceResult<Lease> {
        actor.require_admin()?;
        let mut lease = self.get(actor, id, today).await?;
        if lease.status != LeaseStatus::Pending {
            return Err(ServiceError::conflict(format!(
                "Only pending leases can be edited; this lease is {}",
                lease.status
            )));
        }
        changes.apply(&mut lease, Utc::now())?;
        if !self.leases.save_if_status(&lease, LeaseStatus::Pending).await? {
            return Err(ServiceError::conflict("Lease was modified concurrently, retry the request"));
        }
        info!(lease_id = %id, "Lease updated");
        Ok(lease)
    }

    pub async fn delete(&self, actor: &AuthUser, id: Uuid, today: NaiveDate) -> ServiceResult<()> {
        actor.require_admin()?;
        let lease = self.get(actor, id, today).await?;
        if lease.status.is_occupying() {
            return Err(ServiceError::conflict("Cancel the lease before deleting it"));
        }
        if !self.leases.delete(id).await? {
            return Err(ServiceError::not_found(format!("Lease {} not found", id)));
        }
        info!(lease_id = %id, "Lease deleted");
        Ok(())
    }

    /// Applies the calendar to every lease
    pub async fn refresh(&self, today: NaiveDate) -> ServiceResult<RefreshReport> {
        let mut report = RefreshReport::default();
        for lease in self.leases.list(LeaseFilter::default()).await? {
            report.checked += 1;
            let before = lease.status;
            let after = self.sync(lease, today).await?.status;
            if after == before {
                continue;
            }
            match after {
                LeaseStatus::ExpiringSoon => report.expiring_soon += 1,
                LeaseStatus::Expired => report.expired += 1,
                _ => {}
            }
        }
        info!(
            checked = report.checked,
            expiring_soon = report.expiring_soon,
            expired = report.expired,
            "Lease refresh finished"
        );
        Ok(report)
    }

    /// Persists the calendar-implied status if it differs from the stored one.
    /// Losing the compare-and-set means another writer got there first, so the
    /// stored lease is re-read.
    async fn sync(&self, mut lease: Lease, today: NaiveDate) -> ServiceResult<Lease> {
        let current = lease.status;
        let next = current.evaluate(lease.end_date, today, self.window_days);
        if next == current {
            return Ok(lease);
        }

        lease.status = next;
        lease.updated_at = Utc::now();
        if self.leases.save_if_status(&lease, current).await? {
            debug!(lease_id = %lease.id, from = %current, to = %next, "Lease status advanced by date");
            return Ok(lease);
        }
        self.leases
            .find(lease.id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Lease {} not found", lease.id)))
    }
}
