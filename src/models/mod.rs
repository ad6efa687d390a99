//! Domain records shared by the services, the repositories and the HTTP layer.

pub mod booking;
pub mod lease;
pub mod listing;
pub mod user;

use rust_decimal::Decimal;

use crate::services::error::FieldErrors;

pub use booking::{Booking, BookingStatus};
pub use lease::{Lease, LeaseAction, LeaseStatus, Occupancy};
pub use listing::{Listing, ListingStatus};
pub use user::{PasswordReset, Role, User};

/// Error for status strings that do not name a known variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} status '{value}'")]
pub struct UnknownStatus {
    pub kind: &'static str,
    pub value: String,
}

/// Trims `value` and returns it if anything is left
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Money is stored as NUMERIC(12, 2)
const MONEY_SCALE: u32 = 2;
const MAX_MONEY_CENTS: i64 = 999_999_999_999;

/// Records a field error unless `value` fits a money column exactly
pub(crate) fn check_money(field: &str, value: Option<Decimal>, errors: &mut FieldErrors) {
    let Some(value) = value else { return };
    if value.is_sign_negative() {
        errors.add(field, "Must not be negative");
    } else if value.normalize().scale() > MONEY_SCALE {
        errors.add(field, format!("Must have at most {} decimal places", MONEY_SCALE));
    } else if value > Decimal::new(MAX_MONEY_CENTS, MONEY_SCALE) {
        errors.add(field, "Must be less than 10000000000");
    }
}
