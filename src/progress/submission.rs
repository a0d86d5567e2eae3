//! Telemetry submission and assignment lifecycle
//!
//! Re-validates reachability, runs the completion evaluator, upserts the
//! progress record (percent replaced, time accumulated), then recomputes
//! the course assignment status from full step coverage. Recomputing from
//! coverage on every submission trades repeated work for strong
//! consistency; there is no incrementally maintained counter to drift.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::audit::{AuditSink, SecurityEvent, SecurityEventType};
use crate::config::ProctorConfig;
use crate::model::{AssignmentStatus, StepProgress, Telemetry};
use crate::progress::access::StepAccessController;
use crate::progress::evaluator;
use crate::progress::store::{CourseCatalog, ProgressStore};
use crate::types::{ProctorError, Result};

const LOCK_SHARDS: usize = 64;

/// Result of a completion submission
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    /// The upserted progress record
    pub progress: StepProgress,
    pub is_complete: bool,
    pub completion_percent: f64,

    /// Evaluator's shortfall description when incomplete, otherwise a
    /// generic success string
    pub message: String,
}

/// Per-step completion percentages for a course, plus the derived status
#[derive(Debug, Clone)]
pub struct CourseProgressSummary {
    pub course_id: String,
    pub status: AssignmentStatus,
    pub completed_steps: usize,
    pub total_steps: usize,

    /// (step id, completion percent) in step order; 0 for unvisited steps
    pub steps: Vec<(String, f64)>,
}

/// Applies telemetry submissions and maintains assignment status
pub struct ProgressTracker {
    config: ProctorConfig,
    catalog: Arc<dyn CourseCatalog>,
    progress: Arc<dyn ProgressStore>,
    audit: Arc<dyn AuditSink>,
    access: StepAccessController,

    /// Sharded key locks: taken per (student, step) around the progress
    /// read-modify-write, then per (student, course) around the
    /// assignment recompute. Never both at once.
    submission_locks: Vec<Mutex<()>>,
}

impl ProgressTracker {
    pub fn new(
        config: ProctorConfig,
        catalog: Arc<dyn CourseCatalog>,
        progress: Arc<dyn ProgressStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let access =
            StepAccessController::new(catalog.clone(), progress.clone(), audit.clone());
        Self {
            config,
            catalog,
            progress,
            audit,
            access,
            submission_locks: (0..LOCK_SHARDS).map(|_| Mutex::new(())).collect(),
        }
    }

    /// The access controller this tracker re-validates against
    pub fn access_controller(&self) -> &StepAccessController {
        &self.access
    }

    fn lock_for(&self, user_id: &str, step_id: &str) -> &Mutex<()> {
        let mut hasher = DefaultHasher::new();
        user_id.hash(&mut hasher);
        step_id.hash(&mut hasher);
        &self.submission_locks[hasher.finish() as usize % LOCK_SHARDS]
    }

    /// Submit telemetry for a step
    ///
    /// Fails closed with the block reason if the step is not currently
    /// reachable - a learner must not be able to submit progress for a
    /// step they could not have legitimately opened.
    pub async fn submit_completion(
        &self,
        user_id: &str,
        step_id: &str,
        telemetry: &Telemetry,
    ) -> Result<SubmissionOutcome> {
        let access = self.access.can_access_step(user_id, step_id).await?;
        let step = access.step;

        let evaluation = evaluator::evaluate(&self.config, &step, telemetry);

        let step_guard = self.lock_for(user_id, step_id).lock().await;

        let previous = self.progress.step_progress(user_id, step_id).await?;
        let accumulated_time = previous.as_ref().map(|p| p.time_spent_seconds).unwrap_or(0)
            + telemetry.time_spent_seconds.unwrap_or(0);

        // Percent is overwritten with the latest evaluation; a regression
        // is possible if telemetry regresses and is accepted as-is. A
        // passing verdict records 100 so the sequencing gate (which checks
        // >= 100) recognizes the step as done even when the raw observed
        // percent sits between the threshold and 100.
        let stored_percent = if evaluation.is_complete {
            100.0
        } else {
            evaluation.completion_percent
        };
        let record = StepProgress {
            user_id: user_id.to_string(),
            step_id: step_id.to_string(),
            completion_percent: stored_percent,
            time_spent_seconds: accumulated_time,
            last_accessed: Utc::now(),
        };
        self.progress.upsert_step_progress(&record).await?;
        drop(step_guard);

        debug!(
            user_id,
            step_id,
            percent = evaluation.completion_percent,
            complete = evaluation.is_complete,
            "recorded step progress"
        );

        // Serialize the coverage recompute per (student, course): two
        // concurrent submissions for different steps of the same course
        // must not let a stale coverage snapshot win the assignment write.
        // The step guard is dropped first, so a shard collision between
        // the two keys cannot deadlock.
        {
            let _course_guard = self.lock_for(user_id, &step.course_id).lock().await;
            self.recompute_assignment(user_id, &step.course_id).await?;
        }

        if evaluation.is_complete {
            // Audit failure must not block the committed progress update
            self.audit
                .append(
                    SecurityEvent::new(
                        SecurityEventType::StepCompleted,
                        user_id,
                        "step",
                        step_id,
                    )
                    .with_metadata(serde_json::json!({
                        "course_id": step.course_id,
                        "completion_percent": evaluation.completion_percent,
                    })),
                )
                .await;
        }

        let message = match &evaluation.reason {
            Some(reason) => reason.clone(),
            None => "Step completed successfully".to_string(),
        };

        Ok(SubmissionOutcome {
            progress: record,
            is_complete: evaluation.is_complete,
            completion_percent: evaluation.completion_percent,
            message,
        })
    }

    /// Recompute the assignment status from full step coverage
    ///
    /// ASSIGNED → IN_PROGRESS on the first completed step, → COMPLETED
    /// when every step of the course is complete. `started_at` is set
    /// once; `completed_at` is set on completion and cleared if the
    /// assignment later falls back below full completion.
    async fn recompute_assignment(&self, user_id: &str, course_id: &str) -> Result<()> {
        let mut assignment = self
            .progress
            .assignment(user_id, course_id)
            .await?
            .ok_or_else(|| ProctorError::not_found("assignment", course_id))?;

        let steps = self.catalog.course_steps(course_id).await?;
        let total = steps.len();
        let mut completed = 0;
        for step in &steps {
            let done = self
                .progress
                .step_progress(user_id, &step.id)
                .await?
                .map(|p| p.is_complete())
                .unwrap_or(false);
            if done {
                completed += 1;
            }
        }

        let new_status = if total > 0 && completed == total {
            AssignmentStatus::Completed
        } else if completed > 0 {
            AssignmentStatus::InProgress
        } else {
            AssignmentStatus::Assigned
        };

        if assignment.status != new_status {
            info!(
                user_id,
                course_id,
                previous = ?assignment.status,
                current = ?new_status,
                "assignment status changed"
            );
        }

        match new_status {
            AssignmentStatus::Assigned => {}
            AssignmentStatus::InProgress => {
                if assignment.started_at.is_none() {
                    assignment.started_at = Some(Utc::now());
                }
                if assignment.completed_at.is_some() {
                    warn!(user_id, course_id, "assignment fell back below full completion");
                    assignment.completed_at = None;
                }
            }
            AssignmentStatus::Completed => {
                if assignment.started_at.is_none() {
                    assignment.started_at = Some(Utc::now());
                }
                if assignment.completed_at.is_none() {
                    assignment.completed_at = Some(Utc::now());
                }
            }
        }

        assignment.status = new_status;
        self.progress.upsert_assignment(&assignment).await?;
        Ok(())
    }

    /// Read-only progress summary for one (student, course) pair
    pub async fn course_progress(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<CourseProgressSummary> {
        let assignment = self
            .progress
            .assignment(user_id, course_id)
            .await?
            .ok_or_else(|| ProctorError::not_found("assignment", course_id))?;

        let steps = self.catalog.course_steps(course_id).await?;
        let mut per_step = Vec::with_capacity(steps.len());
        let mut completed = 0;
        for step in &steps {
            let percent = self
                .progress
                .step_progress(user_id, &step.id)
                .await?
                .map(|p| p.completion_percent)
                .unwrap_or(0.0);
            if percent >= 100.0 {
                completed += 1;
            }
            per_step.push((step.id.clone(), percent));
        }

        Ok(CourseProgressSummary {
            course_id: course_id.to_string(),
            status: assignment.status,
            completed_steps: completed,
            total_steps: steps.len(),
            steps: per_step,
        })
    }
}
