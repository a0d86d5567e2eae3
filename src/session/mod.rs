//! Session security
//!
//! Device-bound learning sessions with a per-user concurrency cap,
//! deterministic request tokens, and access-pattern anomaly detection.

pub mod anomaly;
pub mod fingerprint;
pub mod manager;
pub mod token;

pub use anomaly::{spawn_anomaly_sweeper, AnomalyDetector, AnomalyStats};
pub use fingerprint::{derive_fingerprint, FingerprintInput};
pub use manager::{spawn_session_sweeper, CreatedSession, Session, SessionManager, SessionStats};
pub use token::TokenIssuer;
