//! Opaque bearer token generation.
//!
//! A token is 16 bytes from the OS random source, encoded as an unpadded
//! RFC 4648 base-32 string (26 characters). Only the hex-encoded SHA-256
//! digest of that string is ever persisted.

use chrono::{DateTime, Duration, Utc};
use data_encoding::BASE32_NOPAD;
use rand::rngs::OsRng;
use rand::TryRngCore;
use serde::Serialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use super::AuthError;

/// Length of the plaintext token in characters.
pub const TOKEN_LENGTH: usize = 26;

const TOKEN_BYTES: usize = 16;

/// A freshly issued token. The plaintext leaves the process exactly once,
/// in the login response; the store only ever sees `hash`.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub user_id: i64,
    pub email: String,
    #[serde(rename = "token")]
    pub plaintext: String,
    #[serde(skip_serializing)]
    pub hash: String,
    pub expiry: DateTime<Utc>,
}

/// Generate a token for `user_id` valid for `ttl`.
///
/// Fails only when the OS random source is unavailable, which is an
/// environment error rather than something the caller can recover from.
pub fn generate(user_id: i64, email: &str, ttl: Duration) -> Result<IssuedToken, AuthError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|_| AuthError::RandomSource)?;

    let plaintext = BASE32_NOPAD.encode(&bytes);
    let hash = hash_token(&plaintext);

    Ok(IssuedToken {
        user_id,
        email: email.to_string(),
        plaintext,
        hash,
        expiry: Utc::now() + ttl,
    })
}

/// Storage digest of a plaintext token.
pub fn hash_token(plaintext: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plaintext.as_bytes());
    hex::encode(hasher.finalize())
}

/// Constant-time comparison of two token digests.
pub fn hashes_match(a: &str, b: &str) -> bool {
    a.len() == b.len() && a.as_bytes().ct_eq(b.as_bytes()).into()
}
