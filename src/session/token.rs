//! Request token derivation and verification
//!
//! A deterministic keyed digest over the (session, user, device) triple.
//! The token accompanies every content-access request; a captured session
//! identifier alone is insufficient because replaying it from another
//! device or session recomputes to a different token. Not a bearer
//! credential - it is valid only for the exact triple that produced it.

use sha2::{Digest, Sha256};

use crate::types::{ForbiddenReason, Result};

/// Mints and verifies request tokens
pub struct TokenIssuer {
    secret: String,
}

impl TokenIssuer {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Derive the token for a (session, user, device) triple
    pub fn token(&self, session_id: &str, user_id: &str, device_fingerprint: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(b"|");
        hasher.update(session_id.as_bytes());
        hasher.update(b"|");
        hasher.update(user_id.as_bytes());
        hasher.update(b"|");
        hasher.update(device_fingerprint.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Verify a presented token against the expected triple
    ///
    /// Hard failure on mismatch; callers must audit it as TOKEN_MISMATCH,
    /// never treat it as advisory.
    pub fn verify(
        &self,
        presented: &str,
        session_id: &str,
        user_id: &str,
        device_fingerprint: &str,
    ) -> Result<()> {
        let expected = self.token(session_id, user_id, device_fingerprint);
        if constant_time_eq(presented.as_bytes(), expected.as_bytes()) {
            Ok(())
        } else {
            Err(ForbiddenReason::TokenMismatch.into())
        }
    }
}

/// Byte comparison that does not short-circuit on the first difference
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
