//! Shared error types for the proctor core
//!
//! Every failure in this core is a per-request outcome; nothing here is
//! process-fatal. All checks on the access path are fail-closed: ambiguity
//! (missing session, storage read failure) denies access.

use thiserror::Error;

/// Convenience result alias used throughout the crate
pub type Result<T> = std::result::Result<T, ProctorError>;

/// Structured reason for a Forbidden outcome
///
/// Each variant carries enough context for the caller to render an
/// actionable message (e.g. which step must be completed first).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForbiddenReason {
    /// No assignment record exists for this learner and course
    #[error("not enrolled in course {course_id}")]
    NotEnrolled { course_id: String },

    /// The course is not in a published state
    #[error("course {course_id} is not available")]
    CourseUnavailable { course_id: String },

    /// A prior mandatory step has not reached 100% completion
    #[error("step locked: complete step {blocking_step_id} (order {blocking_order}) first")]
    StepLocked {
        blocking_step_id: String,
        blocking_order: u32,
    },

    /// Session exists but belongs to a different user
    #[error("session does not belong to this user")]
    UserMismatch,

    /// Request presented a device fingerprint other than the one the
    /// session was bound to at creation
    #[error("device fingerprint does not match session")]
    DeviceMismatch,

    /// Request token does not match the (session, user, device) triple
    #[error("request token mismatch")]
    TokenMismatch,

    /// User is already at the concurrent-session cap
    #[error("concurrent session limit reached ({max} active)")]
    SessionLimit { max: usize },
}

/// Error taxonomy for the gating and session-security core
#[derive(Debug, Clone, Error)]
pub enum ProctorError {
    /// Unknown step/session/user - surfaced to the caller, never retried
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Sequencing violation, device/token mismatch, or session cap
    #[error("forbidden: {0}")]
    Forbidden(#[from] ForbiddenReason),

    /// Anomaly detector rapid-access trip - a retry-later signal
    #[error("rate limited: retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    /// Collaborator storage failure - denies access on the read path
    #[error("store error: {0}")]
    Store(String),
}

impl ProctorError {
    /// Shorthand for a NotFound error
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_reason_display() {
        let reason = ForbiddenReason::StepLocked {
            blocking_step_id: "step-2".to_string(),
            blocking_order: 2,
        };
        let msg = reason.to_string();
        assert!(msg.contains("step-2"));
        assert!(msg.contains("order 2"));
    }

    #[test]
    fn test_error_from_reason() {
        let err: ProctorError = ForbiddenReason::UserMismatch.into();
        assert!(matches!(err, ProctorError::Forbidden(_)));
    }
}
