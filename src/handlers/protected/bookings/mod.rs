// handlers/protected/bookings - /api/bookings and /api/bookings/:id
//
// Tenants work with their own bookings only; administrators see all of them.

pub mod collection;
pub mod record;

pub use collection::{bookings_get, bookings_post};
pub use record::{booking_delete, booking_get, booking_patch};
