//! Password-reset link tokens. The raw token only ever travels in the email;
//! storage keeps its sha256.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// 64 hex chars drawn from two v4 uuids
pub fn generate_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.trim().as_bytes());
    format!("{:x}", hasher.finalize())
}
