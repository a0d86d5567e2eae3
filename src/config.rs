//! Configuration for the proctor core
//!
//! Read-only to the rest of the crate. Defaults mirror the platform's
//! production settings; `from_env` allows operator overrides without a
//! config file.

use std::time::Duration;

/// Configuration surface for gating and session security
#[derive(Debug, Clone)]
pub struct ProctorConfig {
    /// Maximum concurrent sessions per user (default: 2)
    ///
    /// This cap is the primary defense against shared credentials.
    /// Creation attempts at or above the cap fail closed.
    pub max_concurrent_sessions: usize,

    /// Idle-session timeout (default: 30 minutes)
    pub session_idle_timeout: Duration,

    /// Secret key for request-token derivation
    ///
    /// Tokens are keyed digests; without this secret a captured session id
    /// is not enough to forge a valid request.
    pub token_secret: String,

    /// Trailing window inspected by the anomaly detector (default: 60s)
    pub anomaly_window: Duration,

    /// Requests per window before access is hard-failed as automation
    /// (default: 10)
    pub rapid_access_ceiling: usize,

    /// Distinct IPs per window before a soft multi-IP warning is logged
    /// (default: 3). Never blocks - VPN rotation looks identical.
    pub multi_ip_ceiling: usize,

    /// Minimum watch percent for VIDEO steps (default: 80)
    pub video_min_watch_percent: f64,

    /// Minimum read duration for BOOK steps (default: 300s / 5 minutes)
    pub book_min_read_seconds: u64,

    /// Minimum scroll/interaction percent for MCQ steps (default: 90)
    pub mcq_min_scroll_percent: f64,
}

impl Default for ProctorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sessions: 2,
            session_idle_timeout: Duration::from_secs(30 * 60),
            token_secret: "dev-only-insecure-secret".to_string(),
            anomaly_window: Duration::from_secs(60),
            rapid_access_ceiling: 10,
            multi_ip_ceiling: 3,
            video_min_watch_percent: 80.0,
            book_min_read_seconds: 300,
            mcq_min_scroll_percent: 90.0,
        }
    }
}

impl ProctorConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("PROCTOR_MAX_SESSIONS") {
            if let Ok(n) = val.parse::<usize>() {
                config.max_concurrent_sessions = n;
            }
        }

        if let Ok(val) = std::env::var("PROCTOR_IDLE_TIMEOUT_MINUTES") {
            if let Ok(mins) = val.parse::<u64>() {
                config.session_idle_timeout = Duration::from_secs(mins * 60);
            }
        }

        if let Ok(val) = std::env::var("PROCTOR_TOKEN_SECRET") {
            config.token_secret = val;
        }

        if let Ok(val) = std::env::var("PROCTOR_ANOMALY_WINDOW_SECONDS") {
            if let Ok(secs) = val.parse::<u64>() {
                config.anomaly_window = Duration::from_secs(secs);
            }
        }

        if let Ok(val) = std::env::var("PROCTOR_RAPID_ACCESS_CEILING") {
            if let Ok(n) = val.parse::<usize>() {
                config.rapid_access_ceiling = n;
            }
        }

        if let Ok(val) = std::env::var("PROCTOR_MULTI_IP_CEILING") {
            if let Ok(n) = val.parse::<usize>() {
                config.multi_ip_ceiling = n;
            }
        }

        if let Ok(val) = std::env::var("PROCTOR_VIDEO_MIN_WATCH_PERCENT") {
            if let Ok(p) = val.parse::<f64>() {
                config.video_min_watch_percent = p;
            }
        }

        if let Ok(val) = std::env::var("PROCTOR_BOOK_MIN_READ_SECONDS") {
            if let Ok(s) = val.parse::<u64>() {
                config.book_min_read_seconds = s;
            }
        }

        if let Ok(val) = std::env::var("PROCTOR_MCQ_MIN_SCROLL_PERCENT") {
            if let Ok(p) = val.parse::<f64>() {
                config.mcq_min_scroll_percent = p;
            }
        }

        config
    }

    /// Idle timeout expressed in whole minutes (for the sweep contract)
    pub fn idle_timeout_minutes(&self) -> u64 {
        self.session_idle_timeout.as_secs() / 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProctorConfig::default();
        assert_eq!(config.max_concurrent_sessions, 2);
        assert_eq!(config.rapid_access_ceiling, 10);
        assert_eq!(config.multi_ip_ceiling, 3);
        assert_eq!(config.video_min_watch_percent, 80.0);
        assert_eq!(config.book_min_read_seconds, 300);
        assert_eq!(config.mcq_min_scroll_percent, 90.0);
        assert_eq!(config.idle_timeout_minutes(), 30);
    }

    #[test]
    fn test_from_env_overrides() {
        std::env::set_var("PROCTOR_MAX_SESSIONS", "5");
        std::env::set_var("PROCTOR_ANOMALY_WINDOW_SECONDS", "120");
        std::env::set_var("PROCTOR_BOOK_MIN_READ_SECONDS", "not-a-number");

        let config = ProctorConfig::from_env();
        assert_eq!(config.max_concurrent_sessions, 5);
        assert_eq!(config.anomaly_window, Duration::from_secs(120));
        // Unparseable values keep the default
        assert_eq!(config.book_min_read_seconds, 300);
        // Untouched settings keep theirs
        assert_eq!(config.rapid_access_ceiling, 10);

        std::env::remove_var("PROCTOR_MAX_SESSIONS");
        std::env::remove_var("PROCTOR_ANOMALY_WINDOW_SECONDS");
        std::env::remove_var("PROCTOR_BOOK_MIN_READ_SECONDS");
    }
}
