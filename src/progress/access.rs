//! Step access control
//!
//! Walks the ordered step list of a course and decides whether a requested
//! step is reachable: every prior mandatory step must hold a progress
//! record at 100%. Evaluated fresh on every access request - there is no
//! cached "unlocked" flag, so the check stays correct even if an
//! administrator edits criteria after the fact. The scan is O(steps so
//! far), acceptable given per-course step counts are small.

use std::sync::Arc;

use tracing::debug;

use crate::audit::{AuditSink, SecurityEvent, SecurityEventType};
use crate::model::LearningStep;
use crate::progress::store::{CourseCatalog, ProgressStore};
use crate::types::{ForbiddenReason, ProctorError, Result};

/// Outcome of a step reachability check
#[derive(Debug, Clone)]
pub struct StepAccess {
    /// The requested step's metadata, returned on success
    pub step: LearningStep,
}

/// Decides whether a learner may open a given step
pub struct StepAccessController {
    catalog: Arc<dyn CourseCatalog>,
    progress: Arc<dyn ProgressStore>,
    audit: Arc<dyn AuditSink>,
}

impl StepAccessController {
    pub fn new(
        catalog: Arc<dyn CourseCatalog>,
        progress: Arc<dyn ProgressStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            catalog,
            progress,
            audit,
        }
    }

    /// Check whether `user_id` may access `step_id`
    ///
    /// Fails with NotFound for an unknown step, Forbidden(NotEnrolled) when
    /// no assignment exists, Forbidden(CourseUnavailable) for unpublished
    /// courses, and Forbidden(StepLocked) naming the first prior mandatory
    /// step still below 100%.
    pub async fn can_access_step(&self, user_id: &str, step_id: &str) -> Result<StepAccess> {
        let step = self
            .catalog
            .step(step_id)
            .await?
            .ok_or_else(|| ProctorError::not_found("step", step_id))?;

        // Enrollment first: the assignment record is the enrollment
        if self
            .progress
            .assignment(user_id, &step.course_id)
            .await?
            .is_none()
        {
            return Err(ForbiddenReason::NotEnrolled {
                course_id: step.course_id.clone(),
            }
            .into());
        }

        if !self.catalog.course_published(&step.course_id).await? {
            return Err(ForbiddenReason::CourseUnavailable {
                course_id: step.course_id.clone(),
            }
            .into());
        }

        // Scan prior mandatory steps in ascending order; the first one
        // lacking 100% progress blocks access.
        let steps = self.catalog.course_steps(&step.course_id).await?;
        for prior in steps
            .iter()
            .filter(|s| s.step_order < step.step_order && s.mandatory)
        {
            let complete = self
                .progress
                .step_progress(user_id, &prior.id)
                .await?
                .map(|p| p.is_complete())
                .unwrap_or(false);

            if !complete {
                debug!(
                    user_id,
                    step_id,
                    blocking_step = %prior.id,
                    "step access blocked by incomplete prior step"
                );
                self.audit
                    .append(
                        SecurityEvent::new(
                            SecurityEventType::StepAccessBlocked,
                            user_id,
                            "step",
                            step_id,
                        )
                        .with_metadata(serde_json::json!({
                            "blocking_step_id": prior.id,
                            "blocking_order": prior.step_order,
                        })),
                    )
                    .await;

                return Err(ForbiddenReason::StepLocked {
                    blocking_step_id: prior.id.clone(),
                    blocking_order: prior.step_order,
                }
                .into());
            }
        }

        Ok(StepAccess { step })
    }
}
