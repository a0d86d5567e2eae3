//! Content-access checkpoint
//!
//! The composed authorization pipeline a content request passes before the
//! delivery layer may serve it: session/device validation, request-token
//! verification, anomaly check, then the sequencing gate. Every stage is
//! fail-closed; order matters, since each stage assumes the previous one
//! vouched for the request.

use std::sync::Arc;

use tracing::debug;

use crate::audit::{AuditSink, SecurityEvent, SecurityEventType};
use crate::config::ProctorConfig;
use crate::model::{LearningStep, Telemetry};
use crate::progress::store::{CourseCatalog, ProgressStore};
use crate::progress::submission::{CourseProgressSummary, ProgressTracker, SubmissionOutcome};
use crate::session::anomaly::AnomalyDetector;
use crate::session::manager::SessionManager;
use crate::types::Result;

/// A content-access request as presented by the request-handling layer
#[derive(Debug, Clone)]
pub struct ContentAccessRequest {
    pub session_id: String,
    pub user_id: String,
    pub device_fingerprint: String,
    pub ip: String,

    /// Request token minted at session creation
    pub token: String,

    /// The step whose content is being requested
    pub step_id: String,
}

/// Entry point composing session security and progression gating
pub struct Checkpoint {
    sessions: Arc<SessionManager>,
    anomaly: Arc<AnomalyDetector>,
    tracker: ProgressTracker,
    audit: Arc<dyn AuditSink>,
}

impl Checkpoint {
    pub fn new(
        config: ProctorConfig,
        catalog: Arc<dyn CourseCatalog>,
        progress: Arc<dyn ProgressStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let sessions = Arc::new(SessionManager::new(&config, audit.clone()));
        let anomaly = Arc::new(AnomalyDetector::new(&config, audit.clone()));
        let tracker = ProgressTracker::new(config, catalog, progress, audit.clone());
        Self {
            sessions,
            anomaly,
            tracker,
            audit,
        }
    }

    /// The session registry behind this checkpoint
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// The progress tracker behind this checkpoint
    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    /// The anomaly detector behind this checkpoint
    ///
    /// Exposed so the embedding binary can hand it to
    /// `spawn_anomaly_sweeper`; without a periodic sweep the access
    /// history keeps one entry per distinct user indefinitely.
    pub fn anomaly(&self) -> &Arc<AnomalyDetector> {
        &self.anomaly
    }

    /// Authorize a content-access request end to end
    ///
    /// On success the caller may fetch the step's content from the
    /// delivery layer; the returned metadata identifies it.
    pub async fn authorize_content_access(
        &self,
        request: &ContentAccessRequest,
    ) -> Result<LearningStep> {
        // 1. Session exists, belongs to this user, same device
        let session = self
            .sessions
            .validate_session(
                &request.session_id,
                &request.user_id,
                &request.device_fingerprint,
                &request.ip,
            )
            .await?;

        // 2. Token must recompute from the validated triple
        if let Err(err) = self.sessions.token_issuer().verify(
            &request.token,
            &session.session_id,
            &session.user_id,
            &session.device_fingerprint,
        ) {
            self.audit
                .append(
                    SecurityEvent::new(
                        SecurityEventType::TokenMismatch,
                        &request.user_id,
                        "session",
                        &request.session_id,
                    )
                    .with_ip(&request.ip),
                )
                .await;
            return Err(err);
        }

        // 3. Rate/pattern check
        self.anomaly
            .check_suspicious(&request.user_id, &request.step_id, &request.ip)
            .await?;

        // 4. Sequencing gate
        let access = self
            .tracker
            .access_controller()
            .can_access_step(&request.user_id, &request.step_id)
            .await?;

        debug!(
            user_id = %request.user_id,
            step_id = %request.step_id,
            "content access authorized"
        );
        Ok(access.step)
    }

    /// Submit completion telemetry for a step
    pub async fn submit_completion(
        &self,
        user_id: &str,
        step_id: &str,
        telemetry: &Telemetry,
    ) -> Result<SubmissionOutcome> {
        self.tracker
            .submit_completion(user_id, step_id, telemetry)
            .await
    }

    /// Read-only course progress summary
    pub async fn course_progress(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<CourseProgressSummary> {
        self.tracker.course_progress(user_id, course_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use crate::model::{CompletionCriteria, StepType};
    use crate::progress::store::{InMemoryCatalog, InMemoryProgressStore};
    use crate::types::{ForbiddenReason, ProctorError};

    fn step(id: &str, order: u32) -> LearningStep {
        LearningStep {
            id: id.to_string(),
            course_id: "course-1".to_string(),
            step_order: order,
            step_type: StepType::Video,
            mandatory: true,
            criteria: CompletionCriteria::default(),
        }
    }

    struct Fixture {
        checkpoint: Checkpoint,
        audit: Arc<MemoryAuditSink>,
    }

    fn fixture_with(config: ProctorConfig) -> Fixture {
        let catalog = Arc::new(InMemoryCatalog::new());
        catalog.add_step(step("s1", 1));
        catalog.add_step(step("s2", 2));

        let progress = Arc::new(InMemoryProgressStore::new());
        progress.enroll("u1", "course-1");

        let audit = Arc::new(MemoryAuditSink::new());
        let checkpoint = Checkpoint::new(config, catalog, progress, audit.clone());
        Fixture { checkpoint, audit }
    }

    fn fixture() -> Fixture {
        fixture_with(ProctorConfig::default())
    }

    async fn login(f: &Fixture, fp: &str, ip: &str) -> crate::session::CreatedSession {
        f.checkpoint
            .sessions()
            .create_session("u1", fp, ip, "ua")
            .await
            .unwrap()
    }

    fn request(created: &crate::session::CreatedSession, fp: &str, step_id: &str) -> ContentAccessRequest {
        ContentAccessRequest {
            session_id: created.session_id.clone(),
            user_id: "u1".to_string(),
            device_fingerprint: fp.to_string(),
            ip: "10.0.0.1".to_string(),
            token: created.token.clone(),
            step_id: step_id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_full_pipeline_grants_first_step() {
        let f = fixture();
        let created = login(&f, "fp-1", "10.0.0.1").await;

        let step = f
            .checkpoint
            .authorize_content_access(&request(&created, "fp-1", "s1"))
            .await
            .unwrap();
        assert_eq!(step.id, "s1");
    }

    #[tokio::test]
    async fn test_replay_from_second_device_rejected_as_device_mismatch() {
        let f = fixture();
        let created = login(&f, "fp-1", "10.0.0.1").await;

        // Valid session id and token replayed from another device: the
        // fingerprint check rejects it before the token is even examined
        let err = f
            .checkpoint
            .authorize_content_access(&request(&created, "fp-other", "s1"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProctorError::Forbidden(ForbiddenReason::DeviceMismatch)
        ));
        assert_eq!(f.audit.count(SecurityEventType::DeviceMismatch).await, 1);
        assert_eq!(f.audit.count(SecurityEventType::TokenMismatch).await, 0);
    }

    #[tokio::test]
    async fn test_forged_token_rejected_on_same_device() {
        let f = fixture();
        let created = login(&f, "fp-1", "10.0.0.1").await;

        let mut req = request(&created, "fp-1", "s1");
        req.token = "deadbeef".to_string();

        let err = f.checkpoint.authorize_content_access(&req).await.unwrap_err();
        assert!(matches!(
            err,
            ProctorError::Forbidden(ForbiddenReason::TokenMismatch)
        ));
        assert_eq!(f.audit.count(SecurityEventType::TokenMismatch).await, 1);
    }

    #[tokio::test]
    async fn test_token_from_other_session_rejected() {
        let f = fixture();
        let first = login(&f, "fp-1", "10.0.0.1").await;
        let second = login(&f, "fp-1", "10.0.0.1").await;

        // Session id from the first session, token from the second
        let mut req = request(&first, "fp-1", "s1");
        req.token = second.token.clone();

        let err = f.checkpoint.authorize_content_access(&req).await.unwrap_err();
        assert!(matches!(
            err,
            ProctorError::Forbidden(ForbiddenReason::TokenMismatch)
        ));
    }

    #[tokio::test]
    async fn test_gated_step_blocked_through_pipeline() {
        let f = fixture();
        let created = login(&f, "fp-1", "10.0.0.1").await;

        let err = f
            .checkpoint
            .authorize_content_access(&request(&created, "fp-1", "s2"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProctorError::Forbidden(ForbiddenReason::StepLocked { .. })
        ));
    }

    #[tokio::test]
    async fn test_rapid_access_rate_limited() {
        let f = fixture();
        let created = login(&f, "fp-1", "10.0.0.1").await;
        let req = request(&created, "fp-1", "s1");

        for _ in 0..10 {
            f.checkpoint.authorize_content_access(&req).await.unwrap();
        }
        let err = f.checkpoint.authorize_content_access(&req).await.unwrap_err();
        assert!(matches!(err, ProctorError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn test_anomaly_history_reclaimed_through_checkpoint() {
        // Zero-length window: every recorded access ages out immediately,
        // so one sweep must reclaim the user's history entry
        let mut config = ProctorConfig::default();
        config.anomaly_window = std::time::Duration::from_secs(0);
        let f = fixture_with(config);

        let created = login(&f, "fp-1", "10.0.0.1").await;
        f.checkpoint
            .authorize_content_access(&request(&created, "fp-1", "s1"))
            .await
            .unwrap();
        assert_eq!(f.checkpoint.anomaly().stats().tracked_users, 1);

        assert_eq!(f.checkpoint.anomaly().cleanup(), 1);
        let stats = f.checkpoint.anomaly().stats();
        assert_eq!(stats.tracked_users, 0);
        assert_eq!(stats.recorded_accesses, 0);
    }

    #[tokio::test]
    async fn test_submission_then_unlock_through_pipeline() {
        let f = fixture();
        let created = login(&f, "fp-1", "10.0.0.1").await;

        f.checkpoint
            .submit_completion(
                "u1",
                "s1",
                &Telemetry {
                    watch_percent: Some(95.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let step = f
            .checkpoint
            .authorize_content_access(&request(&created, "fp-1", "s2"))
            .await
            .unwrap();
        assert_eq!(step.id, "s2");
    }
}
