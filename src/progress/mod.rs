//! Learning-progression gating
//!
//! Walks a course's ordered step list and decides whether a requested step
//! is reachable, evaluates type-specific completion criteria against
//! learner telemetry, and maintains the per-course assignment lifecycle.

pub mod access;
pub mod evaluator;
pub mod store;
pub mod submission;

pub use access::{StepAccess, StepAccessController};
pub use evaluator::{evaluate, Evaluation};
pub use store::{CourseCatalog, InMemoryCatalog, InMemoryProgressStore, ProgressStore};
pub use submission::{CourseProgressSummary, ProgressTracker, SubmissionOutcome};
