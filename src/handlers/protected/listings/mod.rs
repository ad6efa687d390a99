// handlers/protected/listings - /api/listings and /api/listings/:id
//
// Any signed-in user may read listings; writes require an administrator.

pub mod collection;
pub mod record;

pub use collection::{listings_get, listings_post};
pub use record::{listing_delete, listing_get, listing_patch};
