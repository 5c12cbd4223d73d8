/// Single-use temporary tokens for email verification and password reset.
///
/// The clear token travels in the email link; only its SHA-256 digest is
/// stored. Redemption hashes the presented token and matches it against
/// the stored digest together with the expiry, so a database leak exposes
/// nothing redeemable.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

const TOKEN_BYTES: usize = 20;

#[derive(Debug)]
pub struct TemporaryToken {
    /// Sent to the user, never stored.
    pub clear: String,
    /// Stored in place of the clear token.
    pub hashed: String,
    pub expires_at: DateTime<Utc>,
}

impl TemporaryToken {
    /// Generates a fresh token valid for `validity` from now.
    pub fn issue(validity: Duration) -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let clear = hex_encode(&bytes);
        let hashed = hash_token(&clear);
        Self {
            clear,
            hashed,
            expires_at: Utc::now() + validity,
        }
    }
}

/// SHA-256 hex digest of a clear token, as stored and matched on
/// redemption.
pub fn hash_token(clear: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(clear.as_bytes());
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
