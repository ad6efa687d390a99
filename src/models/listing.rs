use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{check_money, non_blank, UnknownStatus};
use crate::services::error::{FieldErrors, ServiceResult};

const MAX_TITLE_LEN: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Available,
    Rented,
    Unavailable,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Available => "available",
            ListingStatus::Rented => "rented",
            ListingStatus::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(ListingStatus::Available),
            "rented" => Ok(ListingStatus::Rented),
            "unavailable" => Ok(ListingStatus::Unavailable),
            other => Err(UnknownStatus {
                kind: "listing",
                value: other.to_string(),
            }),
        }
    }
}

/// A rentable property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub address: String,
    pub description: String,
    pub price: Decimal,
    pub amenities: BTreeSet<String>,
    pub images: Vec<String>,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/listings`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewListing {
    pub title: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub amenities: Vec<String>,
    pub images: Vec<String>,
    pub status: Option<ListingStatus>,
}

impl NewListing {
    /// Validates the form and builds the listing owned by `owner_id`
    pub fn into_listing(self, owner_id: Uuid, now: DateTime<Utc>) -> ServiceResult<Listing> {
        let mut errors = FieldErrors::new();

        let title = non_blank(self.title);
        match &title {
            None => errors.add("title", "This field is required"),
            Some(t) if t.chars().count() > MAX_TITLE_LEN => {
                errors.add("title", format!("Must be at most {} characters", MAX_TITLE_LEN))
            }
            Some(_) => {}
        }
        let address = non_blank(self.address);
        if address.is_none() {
            errors.add("address", "This field is required");
        }
        if self.price.is_none() {
            errors.add("price", "This field is required");
        }
        check_money("price", self.price, &mut errors);
        check_images(&self.images, &mut errors);
        errors.finish("Missing required fields")?;

        Ok(Listing {
            id: Uuid::new_v4(),
            owner_id,
            title: title.unwrap_or_default(),
            address: address.unwrap_or_default(),
            description: self.description.map(|d| d.trim().to_string()).unwrap_or_default(),
            price: self.price.unwrap_or_default(),
            amenities: normalize_amenities(self.amenities),
            images: self.images.into_iter().map(|i| i.trim().to_string()).collect(),
            status: self.status.unwrap_or(ListingStatus::Available),
            created_at: now,
            updated_at: now,
        })
    }
}

/// Body of `PATCH /api/listings/:id`; absent fields are left untouched
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListingChanges {
    pub title: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub amenities: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    pub status: Option<ListingStatus>,
}

impl ListingChanges {
    pub fn apply(self, listing: &mut Listing, now: DateTime<Utc>) -> ServiceResult<()> {
        let mut errors = FieldErrors::new();

        let title = self.title.map(|t| t.trim().to_string());
        if let Some(t) = &title {
            if t.is_empty() {
                errors.add("title", "Must not be blank");
            } else if t.chars().count() > MAX_TITLE_LEN {
                errors.add("title", format!("Must be at most {} characters", MAX_TITLE_LEN));
            }
        }
        let address = self.address.map(|a| a.trim().to_string());
        if matches!(&address, Some(a) if a.is_empty()) {
            errors.add("address", "Must not be blank");
        }
        check_money("price", self.price, &mut errors);
        if let Some(images) = &self.images {
            check_images(images, &mut errors);
        }
        errors.finish("Invalid listing update")?;

        if let Some(t) = title {
            listing.title = t;
        }
        if let Some(a) = address {
            listing.address = a;
        }
        if let Some(d) = self.description {
            listing.description = d.trim().to_string();
        }
        if let Some(p) = self.price {
            listing.price = p;
        }
        if let Some(a) = self.amenities {
            listing.amenities = normalize_amenities(a);
        }
        if let Some(images) = self.images {
            listing.images = images.into_iter().map(|i| i.trim().to_string()).collect();
        }
        if let Some(s) = self.status {
            listing.status = s;
        }
        listing.updated_at = now;
        Ok(())
    }
}

fn normalize_amenities(amenities: Vec<String>) -> BTreeSet<String> {
    amenities
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect()
}

fn check_images(images: &[String], errors: &mut FieldErrors) {
    for image in images {
        match url::Url::parse(image.trim()) {
            Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {}
            _ => {
                errors.add("images", format!("Not an http(s) URL: {}", image));
                return;
            }
        }
    }
}
