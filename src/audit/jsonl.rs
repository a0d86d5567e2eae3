//! JSONL file sink for compliance export
//!
//! Appends security events as JSON lines to a local file. Write failures
//! are logged and swallowed - losing an audit line must never fail the
//! operation that produced it.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{error, info};

use super::{AuditSink, SecurityEvent};

/// Audit sink that writes events to a JSONL file
pub struct JsonlAuditSink {
    inner: Mutex<Option<BufWriter<File>>>,
    path: PathBuf,
}

impl JsonlAuditSink {
    /// Open (or create) the log file in append mode
    pub fn open(path: PathBuf) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        info!("Audit logging initialized to {}", path.display());

        Ok(Self {
            inner: Mutex::new(Some(BufWriter::new(file))),
            path,
        })
    }

    /// Path of the log file
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl AuditSink for JsonlAuditSink {
    async fn append(&self, event: SecurityEvent) {
        let jsonl = match event.to_jsonl() {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to serialize security event: {}", e);
                return;
            }
        };

        let mut inner = self.inner.lock().await;

        if let Some(ref mut writer) = *inner {
            if let Err(e) = writeln!(writer, "{}", jsonl) {
                error!("Failed to write security event: {}", e);
            }
            // Flush per event for durability; volume is low
            if let Err(e) = writer.flush() {
                error!("Failed to flush audit log: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::SecurityEventType;

    #[tokio::test]
    async fn test_jsonl_sink_writes_lines() {
        let path = std::env::temp_dir().join(format!("proctor-audit-{}.jsonl", uuid::Uuid::new_v4()));
        let sink = JsonlAuditSink::open(path.clone()).unwrap();

        sink.append(SecurityEvent::new(
            SecurityEventType::SessionCreated,
            "u1",
            "session",
            "s1",
        ))
        .await;
        sink.append(SecurityEvent::new(
            SecurityEventType::RapidAccessDetected,
            "u1",
            "step",
            "step-1",
        ))
        .await;

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("SESSION_CREATED"));
        assert!(lines[1].contains("RAPID_ACCESS_DETECTED"));

        std::fs::remove_file(&path).ok();
    }
}
