//! Completion evaluation
//!
//! Pure function mapping a step's type, its configured criteria, and the
//! observed learner telemetry to a completion percentage and a pass/fail
//! verdict. Never touches storage, so it is unit-testable against a
//! criteria/telemetry matrix.

use crate::config::ProctorConfig;
use crate::model::{LearningStep, StepType, Telemetry};

/// Verdict of a completion evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub is_complete: bool,

    /// Completion percent (0-100) to record for this submission
    pub completion_percent: f64,

    /// Human-readable shortfall description when incomplete
    pub reason: Option<String>,
}

impl Evaluation {
    fn complete(percent: f64) -> Self {
        Self {
            is_complete: true,
            completion_percent: percent,
            reason: None,
        }
    }

    fn incomplete(percent: f64, reason: String) -> Self {
        Self {
            is_complete: false,
            completion_percent: percent,
            reason: Some(reason),
        }
    }
}

/// Evaluate a step's completion criteria against observed telemetry
///
/// Dispatch is by step type, each threshold falling back to the configured
/// platform default when the step leaves it unset:
///
/// - VIDEO: percent = observed watch percent; complete iff ≥ minimum
/// - BOOK: percent = `min(100, round(observed / required * 100))`;
///   complete iff observed seconds ≥ minimum
/// - MCQ: percent = observed scroll percent, defaulting to 100 when
///   telemetry is absent - absence does not block completion for this
///   type, an asymmetry callers must be aware of
/// - Other: no criteria configured, trivially complete at 100
pub fn evaluate(config: &ProctorConfig, step: &LearningStep, telemetry: &Telemetry) -> Evaluation {
    match step.step_type {
        StepType::Video => {
            let required = step
                .criteria
                .min_watch_percent
                .unwrap_or(config.video_min_watch_percent);
            let observed = telemetry.watch_percent.unwrap_or(0.0);

            if observed >= required {
                Evaluation::complete(observed.min(100.0))
            } else {
                Evaluation::incomplete(
                    observed.clamp(0.0, 100.0),
                    format!("Watched {observed:.0}% of the required {required:.0}%"),
                )
            }
        }
        StepType::Book => {
            let required = step
                .criteria
                .min_read_seconds
                .unwrap_or(config.book_min_read_seconds)
                .max(1);
            let observed = telemetry.read_duration_seconds.unwrap_or(0);
            let percent = ((observed as f64 / required as f64) * 100.0).round().min(100.0);

            if observed >= required {
                Evaluation::complete(percent)
            } else {
                Evaluation::incomplete(
                    percent,
                    format!("Read for {observed}s of the required {required}s"),
                )
            }
        }
        StepType::Mcq => {
            let required = step
                .criteria
                .min_scroll_percent
                .unwrap_or(config.mcq_min_scroll_percent);
            // Missing interaction telemetry counts as fully interacted.
            // Carried over from the original platform; see design notes.
            let observed = telemetry.scroll_percent.unwrap_or(100.0);

            if observed >= required {
                Evaluation::complete(observed.min(100.0))
            } else {
                Evaluation::incomplete(
                    observed.clamp(0.0, 100.0),
                    format!("Interacted with {observed:.0}% of the required {required:.0}%"),
                )
            }
        }
        // Unrecognized types carry no criteria and are trivially satisfied
        StepType::Other(_) => Evaluation::complete(100.0),
    }
}
