//! Desktop agent device sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Liveness state of a monitored device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceState {
    /// Input observed within the idle threshold.
    Active,
    /// No input within the idle threshold.
    Idle,
    /// Active, but the activity pattern looks automated.
    Suspicious,
}

/// Running state of one enrolled device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSession {
    /// Device identity.
    pub device_id: String,
    /// The employee the device is enrolled to.
    pub emp_code: String,
    /// Last heartbeat instant.
    pub last_seen_at: Option<DateTime<Utc>>,
    /// Last derived state.
    pub last_state: Option<DeviceState>,
    /// Last reported activity score (0-100).
    pub last_activity_score: Option<u8>,
    /// Consecutive suspicious heartbeats.
    pub consecutive_suspicious: u32,
    /// Sticky HR review flag.
    pub flagged: bool,
}

impl DeviceSession {
    /// Creates an unseen session for a device.
    pub fn new(device_id: impl Into<String>, emp_code: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            emp_code: emp_code.into(),
            last_seen_at: None,
            last_state: None,
            last_activity_score: None,
            consecutive_suspicious: 0,
            flagged: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_wire_format() {
        assert_eq!(
            serde_json::to_string(&DeviceState::Suspicious).unwrap(),
            "\"SUSPICIOUS\""
        );
        let state: DeviceState = serde_json::from_str("\"IDLE\"").unwrap();
        assert_eq!(state, DeviceState::Idle);
    }

    #[test]
    fn test_new_session_is_clean() {
        let session = DeviceSession::new("dev-1", "E-001");
        assert_eq!(session.consecutive_suspicious, 0);
        assert!(!session.flagged);
        assert!(session.last_state.is_none());
    }
}
