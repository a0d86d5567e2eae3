//! Device fingerprint derivation
//!
//! A stable digest over client signals, used to bind a session to one
//! device. Determinism is the requirement, not just uniqueness: any client
//! presenting identical inputs must derive the identical fingerprint.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Client signals a fingerprint is derived from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FingerprintInput {
    pub user_agent: String,
    pub accept_language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_resolution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

/// Derive a device fingerprint from client signals
///
/// Sha256 over the pipe-joined signals, truncated to 32 hex chars.
/// Optional signals contribute an empty segment when absent so their
/// presence or absence changes the digest.
pub fn derive_fingerprint(input: &FingerprintInput) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.user_agent.as_bytes());
    hasher.update(b"|");
    hasher.update(input.accept_language.as_bytes());
    hasher.update(b"|");
    hasher.update(input.screen_resolution.as_deref().unwrap_or("").as_bytes());
    hasher.update(b"|");
    hasher.update(input.timezone.as_deref().unwrap_or("").as_bytes());
    let hash = hasher.finalize();
    hex::encode(&hash[..16]) // First 16 bytes = 32 hex chars
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> FingerprintInput {
        FingerprintInput {
            user_agent: "Mozilla/5.0".to_string(),
            accept_language: "en-US".to_string(),
            screen_resolution: Some("1920x1080".to_string()),
            timezone: Some("America/New_York".to_string()),
        }
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(derive_fingerprint(&input()), derive_fingerprint(&input()));
    }

    #[test]
    fn test_fixed_length_hex() {
        let fp = derive_fingerprint(&input());
        assert_eq!(fp.len(), 32);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_signal_changes_fingerprint() {
        let mut other = input();
        other.timezone = Some("Asia/Kolkata".to_string());
        assert_ne!(derive_fingerprint(&input()), derive_fingerprint(&other));

        let mut missing = input();
        missing.timezone = None;
        assert_ne!(derive_fingerprint(&input()), derive_fingerprint(&missing));
    }
}
