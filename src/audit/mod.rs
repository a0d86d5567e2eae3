//! Security event audit trail
//!
//! Append-only event log consumed for compliance and forensics. Writes are
//! fire-and-forget from the core's perspective: a failed audit write must
//! never block the primary operation, so sinks swallow their own errors
//! and report them on a fallback channel (tracing).

pub mod jsonl;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use jsonl::JsonlAuditSink;

/// Security event types
///
/// Distinct tags per attack class so operators can tell a hijack attempt
/// from a device mismatch from a replayed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityEventType {
    SessionCreated,
    SessionInvalidated,
    ConcurrentSessionLimit,
    SessionHijackAttempt,
    DeviceMismatch,
    TokenMismatch,
    RapidAccessDetected,
    MultipleIpAddresses,
    StepAccessBlocked,
    StepCompleted,
}

/// A tagged security event with contextual metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: SecurityEventType,
    pub user_id: String,

    /// Kind of entity the event concerns ("session", "step", ...)
    pub entity_type: String,

    /// Identifier of that entity
    pub entity_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl SecurityEvent {
    /// Create a new event
    pub fn new(
        event_type: SecurityEventType,
        user_id: impl Into<String>,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            user_id: user_id.into(),
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            ip_address: None,
            metadata: None,
        }
    }

    /// Set the source IP
    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    /// Attach structured metadata
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Convert to a JSONL line
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Write contract for the external audit log
///
/// Implementations must not propagate failures to callers.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append an event to the log
    async fn append(&self, event: SecurityEvent);
}

/// In-memory sink retaining events for inspection
///
/// Used in tests and single-process deployments without a compliance
/// export requirement.
#[derive(Default)]
pub struct MemoryAuditSink {
    events: tokio::sync::Mutex<Vec<SecurityEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events
    pub async fn events(&self) -> Vec<SecurityEvent> {
        self.events.lock().await.clone()
    }

    /// Count events of a given type
    pub async fn count(&self, event_type: SecurityEventType) -> usize {
        self.events
            .lock()
            .await
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn append(&self, event: SecurityEvent) {
        self.events.lock().await.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = SecurityEvent::new(
            SecurityEventType::DeviceMismatch,
            "user-123",
            "session",
            "sess-abc",
        )
        .with_ip("10.0.0.1")
        .with_metadata(serde_json::json!({ "expected": "fp1", "got": "fp2" }));

        let jsonl = event.to_jsonl().unwrap();
        assert!(jsonl.contains("DEVICE_MISMATCH"));
        assert!(jsonl.contains("user-123"));
        assert!(jsonl.contains("10.0.0.1"));
    }

    #[tokio::test]
    async fn test_memory_sink_append() {
        let sink = MemoryAuditSink::new();
        sink.append(SecurityEvent::new(
            SecurityEventType::SessionCreated,
            "u1",
            "session",
            "s1",
        ))
        .await;
        sink.append(SecurityEvent::new(
            SecurityEventType::TokenMismatch,
            "u1",
            "session",
            "s1",
        ))
        .await;

        assert_eq!(sink.events().await.len(), 2);
        assert_eq!(sink.count(SecurityEventType::TokenMismatch).await, 1);
    }
}
