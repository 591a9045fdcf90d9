//! Desktop agent heartbeat processing.

use chrono::{DateTime, Utc};

use crate::config::HeartbeatPolicy;
use crate::error::{EngineError, EngineResult};
use crate::models::{DeviceSession, DeviceState};

/// Checks an activity score is within 0-100.
pub fn validate_activity_score(score: Option<i64>) -> EngineResult<Option<u8>> {
    match score {
        None => Ok(None),
        Some(score) => u8::try_from(score)
            .ok()
            .filter(|score| *score <= 100)
            .map(Some)
            .ok_or_else(|| {
                EngineError::validation(
                    "activity_score",
                    format!("{} is outside the range 0-100", score),
                )
            }),
    }
}

/// Derives the server-side state for a reported heartbeat.
///
/// An `ACTIVE` report whose activity score is below the threshold is
/// treated as `SUSPICIOUS`.
pub fn derive_state(reported: DeviceState, score: Option<u8>, policy: &HeartbeatPolicy) -> DeviceState {
    match (reported, score) {
        (DeviceState::Active, Some(score)) if score < policy.suspicious_score_below => {
            DeviceState::Suspicious
        }
        (state, _) => state,
    }
}

/// Applies one heartbeat to a device session and returns the derived state.
///
/// A suspicious heartbeat increments the consecutive counter, a genuine
/// active one resets it and an idle one leaves it alone. The session is
/// flagged once the counter reaches the threshold and stays flagged.
pub fn apply_heartbeat(
    session: &mut DeviceSession,
    reported: DeviceState,
    score: Option<u8>,
    at: DateTime<Utc>,
    policy: &HeartbeatPolicy,
) -> DeviceState {
    let state = derive_state(reported, score, policy);
    match state {
        DeviceState::Suspicious => {
            session.consecutive_suspicious += 1;
            if session.consecutive_suspicious >= policy.flag_after_consecutive {
                session.flagged = true;
            }
        }
        DeviceState::Active => session.consecutive_suspicious = 0,
        DeviceState::Idle => {}
    }

    session.last_seen_at = Some(at);
    session.last_state = Some(state);
    if score.is_some() {
        session.last_activity_score = score;
    }
    state
}
