use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{non_blank, UnknownStatus};
use crate::services::error::{FieldErrors, ServiceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Tenant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Tenant => "tenant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "tenant" => Ok(Role::Tenant),
            other => Err(UnknownStatus {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Stored half of a password-reset link. Only the sha256 of the token is kept.
#[derive(Debug, Clone, PartialEq)]
pub struct PasswordReset {
    pub token_hash: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
}

impl PasswordReset {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.used_at.is_none() && now < self.expires_at
    }
}

/// Body of `POST /auth/register`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Checked registration data
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(self, min_password_length: usize) -> ServiceResult<Registration> {
        let mut errors = FieldErrors::new();

        let name = non_blank(self.name);
        if name.is_none() {
            errors.add("name", "This field is required");
        }
        let email = non_blank(self.email).map(|e| normalize_email(&e));
        match &email {
            None => errors.add("email", "This field is required"),
            Some(e) => {
                if let Err(msg) = validate_email_format(e) {
                    errors.add("email", msg);
                }
            }
        }
        let password = self.password.unwrap_or_default();
        if let Err(msg) = validate_password(&password, min_password_length) {
            errors.add("password", msg);
        }
        errors.finish("Invalid registration")?;

        Ok(Registration {
            name: name.unwrap_or_default(),
            email: email.unwrap_or_default(),
            password,
        })
    }
}

/// Emails are unique case-insensitively
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

pub fn validate_email_format(email: &str) -> Result<(), &'static str> {
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err("Invalid email format");
    };
    if local.is_empty() || domain.is_empty() || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err("Invalid email format");
    }
    if email.chars().any(char::is_whitespace) {
        return Err("Invalid email format");
    }
    Ok(())
}

pub fn validate_password(password: &str, min_length: usize) -> Result<(), String> {
    if password.chars().count() < min_length {
        return Err(format!("Must be at least {} characters", min_length));
    }
    Ok(())
}
