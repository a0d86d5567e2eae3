//! Per-step progress and per-course assignment records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a student's enrollment in one course
///
/// Transitions are one-directional under normal progress
/// (ASSIGNED → IN_PROGRESS → COMPLETED). COMPLETED can be revisited if
/// criteria are re-satisfied; recomputation is idempotent either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentStatus {
    /// Enrolled, no step completed yet
    Assigned,
    /// At least one step completed
    InProgress,
    /// Every step of the course completed
    Completed,
}

/// One row per (student, step) pair
///
/// Created on first telemetry submission for the step. Completion percent
/// is replaced by the latest evaluation on every submission; time spent
/// accumulates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepProgress {
    pub user_id: String,
    pub step_id: String,

    /// Latest evaluated completion percent (0-100)
    ///
    /// Monotonically non-decreasing in practice, but a regression is
    /// possible if telemetry regresses; accepted rather than clamped.
    pub completion_percent: f64,

    /// Cumulative time spent across all submissions
    pub time_spent_seconds: u64,

    /// Timestamp of the most recent submission
    pub last_accessed: DateTime<Utc>,
}

impl StepProgress {
    /// A step counts as complete once its progress reaches 100%
    pub fn is_complete(&self) -> bool {
        self.completion_percent >= 100.0
    }
}

/// One row per (student, course) pair - the enrollment record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseAssignment {
    pub user_id: String,
    pub course_id: String,
    pub status: AssignmentStatus,

    /// When the student was enrolled
    pub assigned_at: DateTime<Utc>,

    /// Set once, on the first transition out of ASSIGNED
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// Set on transition into COMPLETED; cleared if the assignment later
    /// falls back below full completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl CourseAssignment {
    /// New enrollment in the ASSIGNED state
    pub fn new(user_id: impl Into<String>, course_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            course_id: course_id.into(),
            status: AssignmentStatus::Assigned,
            assigned_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&AssignmentStatus::InProgress).unwrap(),
            "\"IN_PROGRESS\""
        );
    }

    #[test]
    fn test_new_assignment() {
        let assignment = CourseAssignment::new("student-1", "course-1");
        assert_eq!(assignment.status, AssignmentStatus::Assigned);
        assert!(assignment.started_at.is_none());
        assert!(assignment.completed_at.is_none());
    }

    #[test]
    fn test_progress_complete_boundary() {
        let progress = StepProgress {
            user_id: "u".to_string(),
            step_id: "s".to_string(),
            completion_percent: 100.0,
            time_spent_seconds: 0,
            last_accessed: Utc::now(),
        };
        assert!(progress.is_complete());
    }
}
