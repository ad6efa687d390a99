pub mod password;
pub mod reset;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::models::{Role, User};
use crate::services::error::ServiceError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn for_user(user: &User, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            exp,
            iat: now.timestamp(),
        }
    }
}

/// Identity of the caller, taken from a validated session token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), ServiceError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ServiceError::forbidden("Administrator access required"))
        }
    }

    /// Admins may act on anything; tenants only on their own records
    pub fn can_access(&self, owner_id: Uuid) -> bool {
        self.is_admin() || self.id == owner_id
    }
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            role: user.role,
        }
    }
}

impl From<&Claims> for AuthUser {
    fn from(claims: &Claims) -> Self {
        Self {
            id: claims.sub,
            role: claims.role,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
    #[error("JWT secret not configured")]
    InvalidSecret,
}

pub fn generate_jwt(claims: &Claims, security: &SecurityConfig) -> Result<String, JwtError> {
    let secret = &security.jwt_secret;

    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

pub fn validate_jwt(token: &str, security: &SecurityConfig) -> Result<Claims, JwtError> {
    let secret = &security.jwt_secret;

    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let token_data = decode::<Claims>(token, &decoding_key, &Validation::default())
        .map_err(|e| JwtError::InvalidToken(e.to_string()))?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ana".into(),
            email: "ana@example.com".into(),
            password_hash: String::new(),
            role: Role::Admin,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn token_round_trip_keeps_identity() {
        let security = AppConfig::development().security;
        let u = user();
        let token = generate_jwt(&Claims::for_user(&u, 1), &security).unwrap();
        let claims = validate_jwt(&token, &security).unwrap();
        assert_eq!(claims.sub, u.id);
        assert_eq!(claims.role, Role::Admin);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let security = AppConfig::development().security;
        let token = generate_jwt(&Claims::for_user(&user(), 1), &security).unwrap();
        let mut other = security.clone();
        other.jwt_secret = "another-secret".into();
        assert!(matches!(validate_jwt(&token, &other), Err(JwtError::InvalidToken(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let security = AppConfig::development().security;
        let mut claims = Claims::for_user(&user(), 1);
        claims.exp = (Utc::now() - Duration::hours(2)).timestamp();
        let token = generate_jwt(&claims, &security).unwrap();
        assert!(validate_jwt(&token, &security).is_err());
    }

    #[test]
    fn tenants_only_access_their_own_records() {
        let tenant = AuthUser { id: Uuid::new_v4(), role: Role::Tenant };
        assert!(tenant.can_access(tenant.id));
        assert!(!tenant.can_access(Uuid::new_v4()));
        assert!(tenant.require_admin().is_err());

        let admin = AuthUser { id: Uuid::new_v4(), role: Role::Admin };
        assert!(admin.can_access(Uuid::new_v4()));
        assert!(admin.require_admin().is_ok());
    }

    #[test]
    fn empty_secret_refuses_to_sign() {
        let mut security = AppConfig::development().security;
        security.jwt_secret.clear();
        assert!(matches!(
            generate_jwt(&Claims::for_user(&user(), 1), &security),
            Err(JwtError::InvalidSecret)
        ));
    }
}
