//! Access-pattern anomaly detection
//!
//! Tracks each user's content-access requests over a trailing window.
//! Request volume past the ceiling is treated as automation and hard-fails
//! the call; distinct-IP spread past its own (higher) ceiling is logged
//! only - legitimate VPN/proxy rotation produces the same pattern, and a
//! false positive there must never block access.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::audit::{AuditSink, SecurityEvent, SecurityEventType};
use crate::config::ProctorConfig;
use crate::types::{ProctorError, Result};

/// One recorded access
#[derive(Debug, Clone)]
struct AccessRecord {
    timestamp_secs: u64,
    ip: String,
}

/// Snapshot of detector occupancy
#[derive(Debug, Clone, Serialize)]
pub struct AnomalyStats {
    /// Users with at least one access on record
    pub tracked_users: usize,
    /// Total accesses currently retained across all users
    pub recorded_accesses: usize,
}

/// Inspects recent access history for automation and credential sharing
pub struct AnomalyDetector {
    window: Duration,
    rapid_access_ceiling: usize,
    multi_ip_ceiling: usize,
    audit: Arc<dyn AuditSink>,

    /// Recent accesses per user, pruned to the trailing window
    history: DashMap<String, Vec<AccessRecord>>,
}

impl AnomalyDetector {
    pub fn new(config: &ProctorConfig, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            window: config.anomaly_window,
            rapid_access_ceiling: config.rapid_access_ceiling,
            multi_ip_ceiling: config.multi_ip_ceiling,
            audit,
            history: DashMap::new(),
        }
    }

    fn now_secs() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }

    /// Record this access and check the user's trailing window
    ///
    /// Hard-fails with RateLimited when request volume exceeds the rapid
    /// access ceiling (and audits RAPID_ACCESS_DETECTED). Multi-IP spread
    /// only logs MULTIPLE_IP_ADDRESSES - a deliberate soft signal.
    pub async fn check_suspicious(&self, user_id: &str, step_id: &str, ip: &str) -> Result<()> {
        let now = Self::now_secs();
        let cutoff = now.saturating_sub(self.window.as_secs());

        let (request_count, distinct_ips) = {
            let mut records = self.history.entry(user_id.to_string()).or_default();
            records.retain(|r| r.timestamp_secs > cutoff);
            records.push(AccessRecord {
                timestamp_secs: now,
                ip: ip.to_string(),
            });

            let distinct: HashSet<&str> = records.iter().map(|r| r.ip.as_str()).collect();
            (records.len(), distinct.len())
        };

        if request_count > self.rapid_access_ceiling {
            warn!(
                user_id,
                step_id,
                count = request_count,
                "rapid access detected, throttling"
            );
            self.audit
                .append(
                    SecurityEvent::new(
                        SecurityEventType::RapidAccessDetected,
                        user_id,
                        "step",
                        step_id,
                    )
                    .with_ip(ip)
                    .with_metadata(serde_json::json!({
                        "requests_in_window": request_count,
                        "window_seconds": self.window.as_secs(),
                    })),
                )
                .await;
            return Err(ProctorError::RateLimited {
                retry_after_seconds: self.window.as_secs(),
            });
        }

        if distinct_ips > self.multi_ip_ceiling {
            warn!(user_id, distinct_ips, "multiple IPs in window");
            self.audit
                .append(
                    SecurityEvent::new(
                        SecurityEventType::MultipleIpAddresses,
                        user_id,
                        "step",
                        step_id,
                    )
                    .with_ip(ip)
                    .with_metadata(serde_json::json!({ "distinct_ips": distinct_ips })),
                )
                .await;
        }

        Ok(())
    }

    /// Prune aged-out records and drop users whose history is empty
    ///
    /// `check_suspicious` only prunes the calling user's own vector, so
    /// without this sweep the history map grows by one entry per distinct
    /// user for the life of the process. Returns the number of users
    /// dropped.
    pub fn cleanup(&self) -> usize {
        let cutoff = Self::now_secs().saturating_sub(self.window.as_secs());
        let before = self.history.len();
        self.history.retain(|_, records| {
            records.retain(|r| r.timestamp_secs > cutoff);
            !records.is_empty()
        });
        before - self.history.len()
    }

    /// Detector occupancy snapshot
    pub fn stats(&self) -> AnomalyStats {
        AnomalyStats {
            tracked_users: self.history.len(),
            recorded_accesses: self.history.iter().map(|r| r.len()).sum(),
        }
    }
}

/// Spawn a background task that periodically prunes aged-out history
pub fn spawn_anomaly_sweeper(detector: Arc<AnomalyDetector>, every: Duration) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(every).await;
            let dropped = detector.cleanup();
            if dropped > 0 {
                debug!(dropped, "anomaly sweep dropped idle users");
            }
        }
    });
    info!("anomaly sweeper started");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;

    fn detector() -> (AnomalyDetector, Arc<MemoryAuditSink>) {
        let audit = Arc::new(MemoryAuditSink::new());
        let detector = AnomalyDetector::new(&ProctorConfig::default(), audit.clone());
        (detector, audit)
    }

    #[tokio::test]
    async fn test_under_ceiling_allowed() {
        let (detector, _) = detector();
        for _ in 0..10 {
            detector
                .check_suspicious("u1", "s1", "10.0.0.1")
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_rapid_access_hard_fails() {
        let (detector, audit) = detector();
        for _ in 0..10 {
            detector
                .check_suspicious("u1", "s1", "10.0.0.1")
                .await
                .unwrap();
        }

        let err = detector
            .check_suspicious("u1", "s1", "10.0.0.1")
            .await
            .unwrap_err();
        assert!(matches!(err, ProctorError::RateLimited { .. }));
        assert_eq!(
            audit.count(SecurityEventType::RapidAccessDetected).await,
            1
        );
    }

    #[tokio::test]
    async fn test_rapid_access_is_per_user() {
        let (detector, _) = detector();
        for _ in 0..10 {
            detector
                .check_suspicious("u1", "s1", "10.0.0.1")
                .await
                .unwrap();
        }
        // Another user is unaffected
        detector
            .check_suspicious("u2", "s1", "10.0.0.1")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_multi_ip_is_soft() {
        let (detector, audit) = detector();
        for i in 0..4 {
            detector
                .check_suspicious("u1", "s1", &format!("10.0.0.{i}"))
                .await
                .unwrap();
        }

        // Fourth distinct IP crosses the ceiling of 3: logged, not blocked
        assert_eq!(
            audit.count(SecurityEventType::MultipleIpAddresses).await,
            1
        );
    }

    #[tokio::test]
    async fn test_cleanup_drops_empty_histories() {
        let (detector, _) = detector();
        detector
            .check_suspicious("u1", "s1", "10.0.0.1")
            .await
            .unwrap();
        detector
            .check_suspicious("u2", "s1", "10.0.0.2")
            .await
            .unwrap();
        assert_eq!(detector.stats().tracked_users, 2);

        // Age one user's record out by hand
        detector.history.get_mut("u1").unwrap()[0].timestamp_secs = 0;
        assert_eq!(detector.cleanup(), 1);

        let stats = detector.stats();
        assert_eq!(stats.tracked_users, 1);
        assert_eq!(stats.recorded_accesses, 1);
        assert!(detector.history.get("u1").is_none());
    }
}
