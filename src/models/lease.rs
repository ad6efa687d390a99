//! Lease records and the lease lifecycle.
//!
//! ```text
//! Pending --Activate--> Active --(time)--> ExpiringSoon --(time)--> Expired
//!                         |                     |                      |
//!                       Cancel                  +------Renew-----------+--> Active
//!                         v
//!                     Cancelled
//! ```
//!
//! Explicit actions go through [`LeaseStatus::apply`]. Date-driven moves go
//! through [`LeaseStatus::evaluate`], which only ever moves forward.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{check_money, Booking, ListingStatus, UnknownStatus};
use crate::services::error::{FieldErrors, ServiceError, ServiceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaseStatus {
    Pending,
    Active,
    ExpiringSoon,
    Expired,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaseAction {
    Activate,
    Cancel,
    Renew,
}

impl LeaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaseStatus::Pending => "pending",
            LeaseStatus::Active => "active",
            LeaseStatus::ExpiringSoon => "expiring_soon",
            LeaseStatus::Expired => "expired",
            LeaseStatus::Cancelled => "cancelled",
        }
    }

    /// Human label as shown on the dashboard
    pub fn label(&self) -> &'static str {
        match self {
            LeaseStatus::Pending => "Pending",
            LeaseStatus::Active => "Active",
            LeaseStatus::ExpiringSoon => "Expiring Soon",
            LeaseStatus::Expired => "Expired",
            LeaseStatus::Cancelled => "Cancelled",
        }
    }

    /// Status reached by performing `action` from `self`, if the lifecycle allows it
    pub fn apply(self, action: LeaseAction) -> ServiceResult<LeaseStatus> {
        match (self, action) {
            (LeaseStatus::Pending, LeaseAction::Activate) => Ok(LeaseStatus::Active),
            (LeaseStatus::Active, LeaseAction::Cancel) => Ok(LeaseStatus::Cancelled),
            (LeaseStatus::ExpiringSoon | LeaseStatus::Expired, LeaseAction::Renew) => Ok(LeaseStatus::Active),
            (from, action) => Err(ServiceError::InvalidTransition { from, action }),
        }
    }

    /// Status implied by the calendar. A lease ends after its `end_date`, and
    /// is expiring soon once `end_date` is at most `window_days` away.
    pub fn evaluate(self, end_date: NaiveDate, today: NaiveDate, window_days: i64) -> LeaseStatus {
        match self {
            LeaseStatus::Active | LeaseStatus::ExpiringSoon if today > end_date => LeaseStatus::Expired,
            LeaseStatus::Active if (end_date - today).num_days() <= window_days => LeaseStatus::ExpiringSoon,
            other => other,
        }
    }

    /// Whether the tenant currently occupies the listing
    pub fn is_occupying(&self) -> bool {
        matches!(self, LeaseStatus::Active | LeaseStatus::ExpiringSoon)
    }

}

/// Effect a lease status change has on its listing. A listing is Rented while
/// exactly one of its leases occupies it and goes back to Available when the
/// last occupying lease ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupancy {
    Begins,
    Ends,
    Unchanged,
}

impl Occupancy {
    pub fn between(from: LeaseStatus, to: LeaseStatus) -> Self {
        match (from.is_occupying(), to.is_occupying()) {
            (false, true) => Occupancy::Begins,
            (true, false) => Occupancy::Ends,
            _ => Occupancy::Unchanged,
        }
    }

    /// Listing status after the change, given whether another lease still
    /// occupies the listing. `None` leaves the listing alone.
    pub fn listing_status(self, current: ListingStatus, other_occupying: bool) -> Option<ListingStatus> {
        match self {
            Occupancy::Begins => Some(ListingStatus::Rented),
            Occupancy::Ends if !other_occupying && current == ListingStatus::Rented => {
                Some(ListingStatus::Available)
            }
            Occupancy::Ends | Occupancy::Unchanged => None,
        }
    }
}

impl fmt::Display for LeaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LeaseStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(LeaseStatus::Pending),
            "active" => Ok(LeaseStatus::Active),
            "expiring_soon" => Ok(LeaseStatus::ExpiringSoon),
            "expired" => Ok(LeaseStatus::Expired),
            "cancelled" => Ok(LeaseStatus::Cancelled),
            other => Err(UnknownStatus {
                kind: "lease",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for LeaseAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LeaseAction::Activate => "activate",
            LeaseAction::Cancel => "cancel",
            LeaseAction::Renew => "renew",
        })
    }
}

/// Contract binding a tenant to a listing, derived from exactly one booking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lease {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub listing_id: Uuid,
    pub booking_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rent_amount: Decimal,
    pub status: LeaseStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lease {
    /// New pending lease carrying over the booking's terms
    pub fn from_booking(booking: &Booking, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: booking.tenant_id,
            listing_id: booking.listing_id,
            booking_id: booking.id,
            start_date: booking.start_date,
            end_date: booking.end_date,
            rent_amount: booking.rent_amount,
            status: LeaseStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Date range for a renewal. `start` defaults to the day after the current end.
    pub fn renewal_range(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
    ) -> ServiceResult<(NaiveDate, NaiveDate)> {
        let Some(end) = end else {
            return Err(ServiceError::field("end_date", "Renewal requires a new end_date"));
        };
        let start = start
            .or_else(|| self.end_date.checked_add_days(Days::new(1)))
            .unwrap_or(self.end_date);

        let mut errors = FieldErrors::new();
        if end <= self.end_date {
            errors.add("end_date", "Must be after the current end_date");
        }
        if end <= today {
            errors.add("end_date", "Must be in the future");
        }
        if end <= start {
            errors.add("end_date", "Must be after start_date");
        }
        errors.finish("Invalid renewal dates")?;
        Ok((start, end))
    }
}

/// Body of `POST /api/leases`
#[derive(Debug, Deserialize)]
pub struct NewLease {
    pub booking_id: Uuid,
}

/// Body of `POST /api/leases/:id/transition`
#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub action: LeaseAction,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// Body of `PATCH /api/leases/:id`; only pending leases accept changes
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LeaseChanges {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub rent_amount: Option<Decimal>,
}

impl LeaseChanges {
    pub fn apply(self, lease: &mut Lease, now: DateTime<Utc>) -> ServiceResult<()> {
        let start = self.start_date.unwrap_or(lease.start_date);
        let end = self.end_date.unwrap_or(lease.end_date);

        let mut errors = FieldErrors::new();
        if end <= start {
            errors.add("end_date", "Must be after start_date");
        }
        check_money("rent_amount", self.rent_amount, &mut errors);
        errors.finish("Invalid lease update")?;

        lease.start_date = start;
        lease.end_date = end;
        if let Some(r) = self.rent_amount {
            lease.rent_amount = r;
        }
        lease.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATUSES: [LeaseStatus; 5] = [
        LeaseStatus::Pending,
        LeaseStatus::Active,
        LeaseStatus::ExpiringSoon,
        LeaseStatus::Expired,
        LeaseStatus::Cancelled,
    ];
    const ALL_ACTIONS: [LeaseAction; 3] = [LeaseAction::Activate, LeaseAction::Cancel, LeaseAction::Renew];

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn lease(status: LeaseStatus, end: NaiveDate) -> Lease {
        Lease {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            listing_id: Uuid::new_v4(),
            booking_id: Uuid::new_v4(),
            start_date: date(2025, 1, 1),
            end_date: end,
            rent_amount: Decimal::new(950, 0),
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn only_table_entries_are_allowed() {
        let allowed = [
            (LeaseStatus::Pending, LeaseAction::Activate, LeaseStatus::Active),
            (LeaseStatus::Active, LeaseAction::Cancel, LeaseStatus::Cancelled),
            (LeaseStatus::ExpiringSoon, LeaseAction::Renew, LeaseStatus::Active),
            (LeaseStatus::Expired, LeaseAction::Renew, LeaseStatus::Active),
        ];
        for from in ALL_STATUSES {
            for action in ALL_ACTIONS {
                let expected = allowed
                    .iter()
                    .find(|(f, a, _)| *f == from && *a == action)
                    .map(|(_, _, to)| *to);
                match (from.apply(action), expected) {
                    (Ok(to), Some(want)) => assert_eq!(to, want),
                    (Err(ServiceError::InvalidTransition { from: f, action: a }), None) => {
                        assert_eq!((f, a), (from, action));
                    }
                    (got, want) => panic!("{:?} + {:?}: got {:?}, want {:?}", from, action, got, want),
                }
            }
        }
    }

    #[test]
    fn cancel_from_expired_is_rejected() {
        assert!(matches!(
            LeaseStatus::Expired.apply(LeaseAction::Cancel),
            Err(ServiceError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn evaluate_moves_forward_only() {
        let end = date(2026, 6, 30);
        // Far from the end: unchanged
        assert_eq!(LeaseStatus::Active.evaluate(end, date(2026, 1, 1), 30), LeaseStatus::Active);
        // Inside the window, end date inclusive
        assert_eq!(LeaseStatus::Active.evaluate(end, date(2026, 5, 31), 30), LeaseStatus::ExpiringSoon);
        assert_eq!(LeaseStatus::Active.evaluate(end, end, 30), LeaseStatus::ExpiringSoon);
        // Past the end
        assert_eq!(LeaseStatus::Active.evaluate(end, date(2026, 7, 1), 30), LeaseStatus::Expired);
        assert_eq!(LeaseStatus::ExpiringSoon.evaluate(end, date(2026, 7, 1), 30), LeaseStatus::Expired);
        // Never backwards, never touches pending or cancelled
        assert_eq!(LeaseStatus::ExpiringSoon.evaluate(end, date(2026, 1, 1), 30), LeaseStatus::ExpiringSoon);
        assert_eq!(LeaseStatus::Expired.evaluate(end, date(2026, 1, 1), 30), LeaseStatus::Expired);
        assert_eq!(LeaseStatus::Pending.evaluate(end, date(2027, 1, 1), 30), LeaseStatus::Pending);
        assert_eq!(LeaseStatus::Cancelled.evaluate(end, date(2027, 1, 1), 30), LeaseStatus::Cancelled);
    }

    #[test]
    fn renewal_defaults_start_to_day_after_end() {
        let l = lease(LeaseStatus::ExpiringSoon, date(2026, 6, 30));
        let (start, end) = l
            .renewal_range(None, Some(date(2027, 6, 30)), date(2026, 6, 15))
            .unwrap();
        assert_eq!(start, date(2026, 7, 1));
        assert_eq!(end, date(2027, 6, 30));
    }

    #[test]
    fn renewal_requires_later_end() {
        let l = lease(LeaseStatus::Expired, date(2026, 6, 30));
        assert!(l.renewal_range(None, None, date(2026, 7, 2)).is_err());
        assert!(l
            .renewal_range(None, Some(date(2026, 6, 1)), date(2026, 7, 2))
            .is_err());
        // Later than the old end but already in the past
        assert!(l
            .renewal_range(None, Some(date(2026, 7, 1)), date(2026, 7, 2))
            .is_err());
    }

    #[test]
    fn occupancy_follows_status_changes() {
        use LeaseStatus::*;
        assert_eq!(Occupancy::between(Pending, Active), Occupancy::Begins);
        assert_eq!(Occupancy::between(Expired, Active), Occupancy::Begins);
        assert_eq!(Occupancy::between(Active, Cancelled), Occupancy::Ends);
        assert_eq!(Occupancy::between(ExpiringSoon, Expired), Occupancy::Ends);
        assert_eq!(Occupancy::between(Active, ExpiringSoon), Occupancy::Unchanged);
        assert_eq!(Occupancy::between(ExpiringSoon, Active), Occupancy::Unchanged);
        assert_eq!(Occupancy::between(Pending, Pending), Occupancy::Unchanged);
    }

    #[test]
    fn listing_is_released_only_by_the_last_occupant() {
        let rented = ListingStatus::Rented;
        assert_eq!(Occupancy::Begins.listing_status(ListingStatus::Available, false), Some(rented));
        assert_eq!(Occupancy::Ends.listing_status(rented, false), Some(ListingStatus::Available));
        assert_eq!(Occupancy::Ends.listing_status(rented, true), None);
        // An admin's Unavailable outlives the lease
        assert_eq!(Occupancy::Ends.listing_status(ListingStatus::Unavailable, false), None);
        assert_eq!(Occupancy::Unchanged.listing_status(rented, false), None);
    }

    #[test]
    fn lease_rent_must_fit_the_money_column() {
        let mut l = lease(LeaseStatus::Pending, date(2026, 6, 30));
        let changes = LeaseChanges {
            rent_amount: Some(Decimal::new(950_005, 3)),
            ..Default::default()
        };
        assert!(changes.apply(&mut l, Utc::now()).is_err());
        assert_eq!(l.rent_amount, Decimal::new(950, 0));
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(serde_json::to_value(LeaseStatus::ExpiringSoon).unwrap(), "expiring_soon");
        assert_eq!(LeaseStatus::ExpiringSoon.to_string(), "Expiring Soon");
        let req: TransitionRequest =
            serde_json::from_str(r#"{"action":"renew","end_date":"2027-01-31"}"#).unwrap();
        assert_eq!(req.action, LeaseAction::Renew);
        assert_eq!(req.end_date, Some(date(2027, 1, 31)));
    }
}
