//! Session registry
//!
//! In-memory registry of active learning sessions. Enforces the per-user
//! concurrency cap (the primary defense against shared credentials) and
//! binds every session to the device fingerprint presented at creation.
//!
//! The per-user session list doubles as the mutual-exclusion point for
//! concurrent logins from the same user: cap check and insert happen under
//! one entry lock, so simultaneous creation attempts cannot both pass the
//! cap.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::audit::{AuditSink, SecurityEvent, SecurityEventType};
use crate::config::ProctorConfig;
use crate::session::token::TokenIssuer;
use crate::types::{ForbiddenReason, ProctorError, Result};

/// An active, device-bound learning session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub user_id: String,

    /// Fixed at creation; every later request must present the same one
    pub device_fingerprint: String,

    pub ip_address: String,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

/// Result of a successful session creation
#[derive(Debug, Clone)]
pub struct CreatedSession {
    pub session_id: String,

    /// Request token bound to (session, user, device)
    pub token: String,
}

/// Snapshot of registry occupancy
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub active_sessions: usize,
    pub users_with_sessions: usize,
}

/// Registry of active sessions with concurrency cap and device binding
pub struct SessionManager {
    max_concurrent: usize,
    idle_timeout: Duration,
    tokens: TokenIssuer,
    audit: Arc<dyn AuditSink>,

    /// Active sessions by session id
    sessions: DashMap<String, Session>,

    /// Session ids per user; its entry lock serializes cap checks
    by_user: DashMap<String, Vec<String>>,
}

impl SessionManager {
    pub fn new(config: &ProctorConfig, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            max_concurrent: config.max_concurrent_sessions,
            idle_timeout: config.session_idle_timeout,
            tokens: TokenIssuer::new(config.token_secret.clone()),
            audit,
            sessions: DashMap::new(),
            by_user: DashMap::new(),
        }
    }

    /// The issuer minting this registry's request tokens
    pub fn token_issuer(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Create a session for a user on a given device
    ///
    /// Refused with a hard Forbidden(SessionLimit) once the user holds the
    /// configured number of live sessions. No silent eviction of the
    /// oldest session - capacity is reclaimed only by explicit logout or
    /// the idle sweep.
    pub async fn create_session(
        &self,
        user_id: &str,
        device_fingerprint: &str,
        ip: &str,
        user_agent: &str,
    ) -> Result<CreatedSession> {
        let session_id = format!("sess_{}", uuid::Uuid::new_v4());
        let now = Utc::now();

        let at_cap = {
            let mut ids = self.by_user.entry(user_id.to_string()).or_default();
            if ids.len() >= self.max_concurrent {
                true
            } else {
                let session = Session {
                    session_id: session_id.clone(),
                    user_id: user_id.to_string(),
                    device_fingerprint: device_fingerprint.to_string(),
                    ip_address: ip.to_string(),
                    user_agent: user_agent.to_string(),
                    created_at: now,
                    last_activity: now,
                };
                self.sessions.insert(session_id.clone(), session);
                ids.push(session_id.clone());
                false
            }
        };

        if at_cap {
            warn!(user_id, max = self.max_concurrent, "concurrent session limit reached");
            self.audit
                .append(
                    SecurityEvent::new(
                        SecurityEventType::ConcurrentSessionLimit,
                        user_id,
                        "session",
                        "-",
                    )
                    .with_ip(ip)
                    .with_metadata(serde_json::json!({ "max": self.max_concurrent })),
                )
                .await;
            return Err(ForbiddenReason::SessionLimit {
                max: self.max_concurrent,
            }
            .into());
        }

        let token = self.tokens.token(&session_id, user_id, device_fingerprint);

        info!(user_id, session_id = %session_id, "session created");
        self.audit
            .append(
                SecurityEvent::new(
                    SecurityEventType::SessionCreated,
                    user_id,
                    "session",
                    &session_id,
                )
                .with_ip(ip),
            )
            .await;

        Ok(CreatedSession { session_id, token })
    }

    /// Validate a session against the requesting user and device
    ///
    /// Checks existence, then identity, then device fingerprint, in that
    /// order; each mismatch raises a distinctly typed security event so
    /// operators can tell attack classes apart. Refreshes `last_activity`
    /// on success and returns the session record.
    pub async fn validate_session(
        &self,
        session_id: &str,
        user_id: &str,
        device_fingerprint: &str,
        ip: &str,
    ) -> Result<Session> {
        // A session removed mid-validation is simply "not found"
        let (snapshot, failure) = match self.sessions.get_mut(session_id) {
            None => {
                return Err(ProctorError::not_found("session", session_id));
            }
            Some(mut session) => {
                if session.user_id != user_id {
                    (
                        None,
                        Some((SecurityEventType::SessionHijackAttempt, ForbiddenReason::UserMismatch)),
                    )
                } else if session.device_fingerprint != device_fingerprint {
                    (
                        None,
                        Some((SecurityEventType::DeviceMismatch, ForbiddenReason::DeviceMismatch)),
                    )
                } else {
                    session.last_activity = Utc::now();
                    (Some(session.clone()), None)
                }
            }
        };

        if let Some((event_type, reason)) = failure {
            warn!(session_id, user_id, ?event_type, "session validation failed");
            self.audit
                .append(
                    SecurityEvent::new(event_type, user_id, "session", session_id).with_ip(ip),
                )
                .await;
            return Err(reason.into());
        }

        // Success path: snapshot is always present here
        let session = snapshot.ok_or_else(|| ProctorError::not_found("session", session_id))?;
        debug!(session_id, user_id, "session validated");
        Ok(session)
    }

    /// Invalidate one session (logout)
    pub async fn invalidate_session(&self, session_id: &str, user_id: &str) -> Result<()> {
        {
            let session = self
                .sessions
                .get(session_id)
                .ok_or_else(|| ProctorError::not_found("session", session_id))?;
            if session.user_id != user_id {
                return Err(ForbiddenReason::UserMismatch.into());
            }
        }

        self.remove(session_id);

        self.audit
            .append(SecurityEvent::new(
                SecurityEventType::SessionInvalidated,
                user_id,
                "session",
                session_id,
            ))
            .await;
        Ok(())
    }

    /// Invalidate every session a user holds, returning the count
    pub async fn invalidate_all_sessions(&self, user_id: &str) -> usize {
        let ids = self
            .by_user
            .get(user_id)
            .map(|ids| ids.clone())
            .unwrap_or_default();

        for session_id in &ids {
            self.remove(session_id);
        }

        if !ids.is_empty() {
            info!(user_id, count = ids.len(), "invalidated all sessions");
            self.audit
                .append(
                    SecurityEvent::new(
                        SecurityEventType::SessionInvalidated,
                        user_id,
                        "session",
                        "*",
                    )
                    .with_metadata(serde_json::json!({ "count": ids.len() })),
                )
                .await;
        }

        ids.len()
    }

    /// Remove sessions idle longer than `max_age_minutes`
    ///
    /// The only path that reclaims capacity from sessions that were never
    /// explicitly logged out. Returns the number removed.
    pub fn cleanup_expired_sessions(&self, max_age_minutes: u64) -> usize {
        let cutoff = Utc::now() - chrono::Duration::minutes(max_age_minutes as i64);

        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|s| s.last_activity < cutoff)
            .map(|s| s.session_id.clone())
            .collect();

        let count = expired.len();
        for session_id in expired {
            self.remove(&session_id);
        }

        if count > 0 {
            info!(count, "cleaned up idle sessions");
        }
        count
    }

    /// Registry occupancy snapshot
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            active_sessions: self.sessions.len(),
            users_with_sessions: self.by_user.len(),
        }
    }

    /// Live session count for one user
    pub fn session_count(&self, user_id: &str) -> usize {
        self.by_user.get(user_id).map(|ids| ids.len()).unwrap_or(0)
    }

    fn remove(&self, session_id: &str) {
        if let Some((_, session)) = self.sessions.remove(session_id) {
            if let Some(mut ids) = self.by_user.get_mut(&session.user_id) {
                ids.retain(|id| id != session_id);
            }
            self.by_user
                .remove_if(&session.user_id, |_, ids| ids.is_empty());
            debug!(session_id, "session removed");
        }
    }
}

/// Spawn a background task that periodically sweeps idle sessions
pub fn spawn_session_sweeper(manager: Arc<SessionManager>, every: Duration) {
    let max_age_minutes = manager.idle_timeout.as_secs() / 60;
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(every).await;
            let removed = manager.cleanup_expired_sessions(max_age_minutes);
            if removed > 0 {
                debug!(removed, "session sweep removed idle sessions");
            }
        }
    });
    info!("session sweeper started");
}
