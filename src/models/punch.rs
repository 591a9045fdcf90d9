//! Raw punch events from the badge-reader feed and the desktop agent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of a raw access event.
///
/// Only [`EventKind::ValidAccess`] contributes to attendance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A successful badge swipe or agent sign-in.
    ValidAccess,
    /// A rejected swipe (unknown card, wrong door, ...).
    Denied,
    /// Any other reader diagnostic.
    Other,
}

/// An immutable, append-only punch event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PunchEvent {
    /// The employee code the event was attributed to.
    pub emp_code: String,
    /// The absolute instant of the event.
    pub event_time: DateTime<Utc>,
    /// The event kind.
    pub kind: EventKind,
}

impl PunchEvent {
    /// Creates a valid-access punch.
    pub fn valid(emp_code: impl Into<String>, event_time: DateTime<Utc>) -> Self {
        Self {
            emp_code: emp_code.into(),
            event_time,
            kind: EventKind::ValidAccess,
        }
    }

    /// Returns true if this event counts towards attendance.
    pub fn is_valid_access(&self) -> bool {
        self.kind == EventKind::ValidAccess
    }
}
