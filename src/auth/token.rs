use rand::RngCore;
use sha2::{Digest, Sha256};

const TOKEN_PREFIX: &str = "cf";
const SECRET_BYTES: usize = 16;

/// Generates a new access token with the format: cf_<32 hex chars>
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{TOKEN_PREFIX}_{}", hex::encode(bytes))
}

/// Hex-encoded SHA-256 digest of a raw token. Only the digest is persisted;
/// the raw token is shown once, at issue time.
#[must_use]
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
