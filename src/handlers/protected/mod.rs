// handlers/protected/mod.rs - endpoints behind jwt_auth_middleware
//
// Route prefix: /api/*. Every handler receives `Extension<AuthUser>`.

pub mod auth;
pub mod bookings;
pub mod leases;
pub mod listings;
