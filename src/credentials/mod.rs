//! Hashing and token primitives for the user credential lifecycle.

use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Work factor for stored password hashes. Deliberately expensive.
pub const BCRYPT_COST: u32 = 12;

/// How long an issued reset token stays valid.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 10;

/// Backdating applied to `password_changed_at` so a token minted just before
/// the write is not invalidated by the write's own timestamp.
pub const PASSWORD_CHANGE_BACKDATE_SECONDS: i64 = 1;

const RESET_TOKEN_BYTES: usize = 32;

/// Salted one-way hash of a submitted password.
pub fn hash_password(plaintext: &str) -> Result<String> {
    Ok(bcrypt::hash(plaintext.as_bytes(), BCRYPT_COST)?)
}

/// Compare a candidate password against a stored hash. An unparsable hash
/// verifies as false rather than erroring.
pub fn verify_password(candidate: &str, stored_hash: &str) -> bool {
    bcrypt::verify(candidate.as_bytes(), stored_hash).unwrap_or(false)
}

/// A fresh raw reset token: 32 random bytes, hex-rendered. The raw value goes
/// to the user out-of-band; only its digest is ever persisted.
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Deterministic digest of a raw reset token. The token already carries the
/// entropy; sha256 only keeps a store leak from exposing usable tokens.
pub fn hash_reset_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}
