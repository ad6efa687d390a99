// handlers/mod.rs - two handler tiers
//
// Public (no auth) → Protected (JWT auth). Admin-only operations live in the
// protected tier and are checked per operation by the services.

pub mod protected;
pub mod public;

use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::error::ApiError;

/// Path id parsed into a `Uuid`; anything malformed cannot exist
pub(crate) fn parse_id(kind: &str, raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found(format!("{} {} not found", kind, raw)))
}

/// Optional query parameter parsed with `FromStr`
pub(crate) fn parse_param<T: FromStr>(name: &str, raw: Option<&str>) -> Result<Option<T>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => value.parse().map(Some).map_err(|_| {
            let mut field_errors = std::collections::HashMap::new();
            field_errors.insert(name.to_string(), format!("Unsupported value '{}'", value));
            ApiError::validation_error("Invalid query parameter", Some(field_errors))
        }),
    }
}

/// Calendar date used for lease evaluation
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}
