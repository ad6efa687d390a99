use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{check_money, UnknownStatus};
use crate::services::error::{FieldErrors, ServiceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Approved => "approved",
            BookingStatus::Rejected => "rejected",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// Rejected and cancelled bookings can never back a lease
    pub fn is_closed(&self) -> bool {
        matches!(self, BookingStatus::Rejected | BookingStatus::Cancelled)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "approved" => Ok(BookingStatus::Approved),
            "rejected" => Ok(BookingStatus::Rejected),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(UnknownStatus {
                kind: "booking",
                value: other.to_string(),
            }),
        }
    }
}

/// A tenant's reservation of a listing for a date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub listing_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rent_amount: Decimal,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/bookings`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewBooking {
    pub listing_id: Option<Uuid>,
    /// Only honoured for admins; tenants always book for themselves
    pub tenant_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub rent_amount: Option<Decimal>,
}

/// Field-checked booking form, before the listing lookup
#[derive(Debug, Clone)]
pub struct BookingDraft {
    pub listing_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rent_amount: Option<Decimal>,
}

impl NewBooking {
    pub fn validate(&self) -> ServiceResult<BookingDraft> {
        let mut errors = FieldErrors::new();
        if self.listing_id.is_none() {
            errors.add("listing_id", "This field is required");
        }
        if self.start_date.is_none() {
            errors.add("start_date", "This field is required");
        }
        if self.end_date.is_none() {
            errors.add("end_date", "This field is required");
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end <= start {
                errors.add("end_date", "Must be after start_date");
            }
        }
        check_money("rent_amount", self.rent_amount, &mut errors);
        errors.finish("Missing required fields")?;

        Ok(BookingDraft {
            listing_id: self.listing_id.unwrap_or_default(),
            start_date: self.start_date.unwrap_or_default(),
            end_date: self.end_date.unwrap_or_default(),
            rent_amount: self.rent_amount,
        })
    }
}

impl BookingDraft {
    pub fn into_booking(self, tenant_id: Uuid, listing_price: Decimal, now: DateTime<Utc>) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            tenant_id,
            listing_id: self.listing_id,
            start_date: self.start_date,
            end_date: self.end_date,
            rent_amount: self.rent_amount.unwrap_or(listing_price),
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Body of `PATCH /api/bookings/:id`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BookingChanges {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub rent_amount: Option<Decimal>,
    pub status: Option<BookingStatus>,
}

impl BookingChanges {
    pub fn touches_terms(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some() || self.rent_amount.is_some()
    }

    pub fn apply(self, booking: &mut Booking, now: DateTime<Utc>) -> ServiceResult<()> {
        let start = self.start_date.unwrap_or(booking.start_date);
        let end = self.end_date.unwrap_or(booking.end_date);

        let mut errors = FieldErrors::new();
        if end <= start {
            errors.add("end_date", "Must be after start_date");
        }
        check_money("rent_amount", self.rent_amount, &mut errors);
        errors.finish("Invalid booking update")?;

        booking.start_date = start;
        booking.end_date = end;
        if let Some(r) = self.rent_amount {
            booking.rent_amount = r;
        }
        if let Some(s) = self.status {
            booking.status = s;
        }
        booking.updated_at = now;
        Ok(())
    }
}
