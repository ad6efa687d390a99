pub mod auth_service;
pub mod booking_service;
pub mod error;
pub mod lease_service;
pub mod listing_service;

pub use auth_service::AuthService;
pub use booking_service::BookingService;
pub use error::{ServiceError, ServiceResult};
pub use lease_service::{LeaseService, RefreshReport};
pub use listing_service::ListingService;
