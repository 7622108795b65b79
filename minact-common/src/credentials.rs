//! Password hashing and bearer token generation
//!
//! Passwords are stored as hex SHA-256 of salt + password with a random
//! per-user hex salt. Bearer tokens are opaque 256-bit random hex strings
//! looked up in the sessions table.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Generate a random per-user password salt (hex)
pub fn generate_salt() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hash a password with the given salt
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Constant-shape verification of a password against stored hash + salt
///
/// An empty stored hash never verifies; bootstrap rows such as the
/// `unassigned` user carry one so they cannot log in.
pub fn verify_password(password: &str, salt: &str, stored_hash: &str) -> bool {
    if stored_hash.is_empty() {
        return false;
    }
    hash_password(password, salt) == stored_hash
}

/// Generate an opaque bearer token (256 bits, hex)
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
