//! Learning steps and their completion criteria
//!
//! A step is one ordered unit of a course's learning flow, bound to one
//! content item. Steps are immutable once a course is published; this core
//! only reads them.

use serde::{Deserialize, Serialize};

/// Content type of a learning step
///
/// Dispatch key for completion evaluation. Unrecognized types are carried
/// as `Other` and evaluate as trivially complete (no criteria configured).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StepType {
    /// Video content, gated on watch percentage
    Video,
    /// Reading material, gated on time spent reading
    Book,
    /// Interactive quiz-like content, gated on scroll/interaction percent
    Mcq,
    /// Any other content type
    #[serde(untagged)]
    Other(String),
}

/// Type-specific completion thresholds for a step
///
/// All fields optional; evaluation falls back to the configured platform
/// defaults when unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionCriteria {
    /// Minimum watch percent for VIDEO steps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_watch_percent: Option<f64>,

    /// Minimum read duration in seconds for BOOK steps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_read_seconds: Option<u64>,

    /// Minimum scroll/interaction percent for MCQ steps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_scroll_percent: Option<f64>,
}

/// One ordered unit of a course's learning flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningStep {
    /// Stable step identifier
    pub id: String,

    /// Owning course
    pub course_id: String,

    /// Ordinal position within the course
    ///
    /// Unique per course and defines traversal order. Not necessarily
    /// contiguous - authoring tools leave gaps for later insertion.
    pub step_order: u32,

    /// Content type, drives completion evaluation
    pub step_type: StepType,

    /// Whether this step must reach 100% before later steps unlock
    pub mandatory: bool,

    /// Type-specific completion thresholds
    #[serde(default)]
    pub criteria: CompletionCriteria,
}

/// Learner telemetry submitted with a completion attempt
///
/// All fields optional; absent fields fall back to the defaults the
/// evaluator documents per step type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Telemetry {
    /// Observed watch percent (VIDEO)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watch_percent: Option<f64>,

    /// Observed read duration in seconds (BOOK)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_duration_seconds: Option<u64>,

    /// Observed scroll/interaction percent (MCQ)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll_percent: Option<f64>,

    /// Wall-clock time spent on the step, accumulated into progress
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_spent_seconds: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_type_serialization() {
        assert_eq!(
            serde_json::to_string(&StepType::Video).unwrap(),
            "\"VIDEO\""
        );
        assert_eq!(serde_json::to_string(&StepType::Mcq).unwrap(), "\"MCQ\"");

        let other: StepType = serde_json::from_str("\"SCORM\"").unwrap();
        assert_eq!(other, StepType::Other("SCORM".to_string()));
    }

    #[test]
    fn test_criteria_defaults_empty() {
        let criteria = CompletionCriteria::default();
        assert!(criteria.min_watch_percent.is_none());
        assert!(criteria.min_read_seconds.is_none());
        assert!(criteria.min_scroll_percent.is_none());
    }
}
