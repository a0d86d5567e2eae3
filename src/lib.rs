//! Proctor - learning-progression gating and session security core
//!
//! Proctor enforces that a learner advances through a course's ordered
//! learning steps only once type-specific completion criteria are met,
//! while protecting the content-delivery path against credential sharing,
//! session hijacking, and replayed access requests.
//!
//! ## Subsystems
//!
//! - **Progress**: sequenced step gating, pure completion evaluation,
//!   telemetry submission and course-assignment lifecycle
//! - **Session**: device-bound session registry with a per-user concurrency
//!   cap, deterministic request tokens, and rapid-access anomaly detection
//! - **Audit**: append-only security event sink consumed for forensics
//! - **Checkpoint**: the composed content-access authorization pipeline

pub mod audit;
pub mod checkpoint;
pub mod config;
pub mod model;
pub mod progress;
pub mod session;
pub mod types;

pub use checkpoint::{Checkpoint, ContentAccessRequest};
pub use config::ProctorConfig;
pub use types::{ForbiddenReason, ProctorError, Result};
