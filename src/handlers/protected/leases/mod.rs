// handlers/protected/leases - lease records and their lifecycle
//
// Reads are open to the lease's tenant and to administrators. Everything
// that changes a lease is administrator-only.

pub mod collection;
pub mod lifecycle;
pub mod record;

pub use collection::{leases_get, leases_post};
pub use lifecycle::{lease_transition_post, leases_refresh_post};
pub use record::{lease_delete, lease_get, lease_patch};
