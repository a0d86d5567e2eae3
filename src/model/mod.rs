//! Domain records for learning progression
//!
//! Steps and courses are authored externally and read-only to this core;
//! progress and assignment records are the durable state it maintains.

pub mod progress;
pub mod step;

pub use progress::{AssignmentStatus, CourseAssignment, StepProgress};
pub use step::{CompletionCriteria, LearningStep, StepType, Telemetry};
