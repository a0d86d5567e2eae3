//! Storage seams for course content and learner progress
//!
//! The platform's persistence layer owns the durable records; this core
//! talks to it through these traits. In-memory implementations back tests
//! and single-process deployments.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::model::{CourseAssignment, LearningStep, StepProgress};
use crate::types::Result;

/// Read-only view of authored course content
#[async_trait]
pub trait CourseCatalog: Send + Sync {
    /// Look up a single step by id
    async fn step(&self, step_id: &str) -> Result<Option<LearningStep>>;

    /// All steps of a course, in ascending `step_order`
    async fn course_steps(&self, course_id: &str) -> Result<Vec<LearningStep>>;

    /// Whether the course is in a published state
    async fn course_published(&self, course_id: &str) -> Result<bool>;
}

/// Durable record of per-step progress and per-course assignment status
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Progress for one (student, step) pair, if any submission happened
    async fn step_progress(&self, user_id: &str, step_id: &str) -> Result<Option<StepProgress>>;

    /// Insert or replace a progress record
    async fn upsert_step_progress(&self, progress: &StepProgress) -> Result<()>;

    /// Assignment (enrollment) record for one (student, course) pair
    async fn assignment(&self, user_id: &str, course_id: &str)
        -> Result<Option<CourseAssignment>>;

    /// Insert or replace an assignment record
    async fn upsert_assignment(&self, assignment: &CourseAssignment) -> Result<()>;
}

/// In-memory course catalog
#[derive(Default)]
pub struct InMemoryCatalog {
    steps: DashMap<String, LearningStep>,
    published: DashMap<String, bool>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a step with its course
    pub fn add_step(&self, step: LearningStep) {
        self.published.entry(step.course_id.clone()).or_insert(true);
        self.steps.insert(step.id.clone(), step);
    }

    /// Mark a course published or unpublished
    pub fn set_published(&self, course_id: &str, published: bool) {
        self.published.insert(course_id.to_string(), published);
    }
}

#[async_trait]
impl CourseCatalog for InMemoryCatalog {
    async fn step(&self, step_id: &str) -> Result<Option<LearningStep>> {
        Ok(self.steps.get(step_id).map(|s| s.clone()))
    }

    async fn course_steps(&self, course_id: &str) -> Result<Vec<LearningStep>> {
        let mut steps: Vec<LearningStep> = self
            .steps
            .iter()
            .filter(|s| s.course_id == course_id)
            .map(|s| s.clone())
            .collect();
        steps.sort_by_key(|s| s.step_order);
        Ok(steps)
    }

    async fn course_published(&self, course_id: &str) -> Result<bool> {
        Ok(self
            .published
            .get(course_id)
            .map(|p| *p)
            .unwrap_or(false))
    }
}

/// In-memory progress store keyed by (user, entity) pairs
#[derive(Default)]
pub struct InMemoryProgressStore {
    progress: DashMap<(String, String), StepProgress>,
    assignments: DashMap<(String, String), CourseAssignment>,
}

impl InMemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enroll a student (test/seeding convenience)
    pub fn enroll(&self, user_id: &str, course_id: &str) {
        let assignment = CourseAssignment::new(user_id, course_id);
        self.assignments
            .insert((user_id.to_string(), course_id.to_string()), assignment);
    }
}

#[async_trait]
impl ProgressStore for InMemoryProgressStore {
    async fn step_progress(&self, user_id: &str, step_id: &str) -> Result<Option<StepProgress>> {
        Ok(self
            .progress
            .get(&(user_id.to_string(), step_id.to_string()))
            .map(|p| p.clone()))
    }

    async fn upsert_step_progress(&self, progress: &StepProgress) -> Result<()> {
        self.progress.insert(
            (progress.user_id.clone(), progress.step_id.clone()),
            progress.clone(),
        );
        Ok(())
    }

    async fn assignment(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<Option<CourseAssignment>> {
        Ok(self
            .assignments
            .get(&(user_id.to_string(), course_id.to_string()))
            .map(|a| a.clone()))
    }

    async fn upsert_assignment(&self, assignment: &CourseAssignment) -> Result<()> {
        self.assignments.insert(
            (assignment.user_id.clone(), assignment.course_id.clone()),
            assignment.clone(),
        );
        Ok(())
    }
}
