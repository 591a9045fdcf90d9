//! Checkout candidate validation.
//!
//! A checkout candidate that fails validation is not an error. The
//! reconciler discards it and falls back to its next source.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::config::CheckoutValidationPolicy;
use crate::models::ShiftDefinition;

use super::local_time::LocalOffset;

/// Why a checkout candidate was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutRejection {
    /// The candidate is at or before the check-in.
    NotAfterCheckIn,
    /// The gap from check-in exceeds the maximum span.
    SpanTooLong,
    /// The check-in itself belongs to neither the business date nor the next day.
    CheckInOutsideOccurrence,
    /// Crossing shift: the candidate is dated after the next day.
    BeyondNextDay,
    /// Crossing shift: the candidate is later than the shift end plus tolerance.
    TooLateAfterEnd,
    /// The candidate is later than the current time.
    InFuture,
}

impl std::fmt::Display for CheckoutRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            CheckoutRejection::NotAfterCheckIn => "checkout is not after check-in",
            CheckoutRejection::SpanTooLong => "checkout span exceeds the maximum",
            CheckoutRejection::CheckInOutsideOccurrence => "check-in is outside the occurrence",
            CheckoutRejection::BeyondNextDay => "checkout is dated after the next day",
            CheckoutRejection::TooLateAfterEnd => "checkout is too late after shift end",
            CheckoutRejection::InFuture => "checkout is in the future",
        };
        write!(f, "{}", reason)
    }
}

/// Everything a checkout candidate is judged against.
#[derive(Debug, Clone, Copy)]
pub struct CheckoutContext<'a> {
    /// The employee's shift, when one is known.
    pub shift: Option<&'a ShiftDefinition>,
    /// The business date being reconciled.
    pub business_date: NaiveDate,
    /// The resolved check-in.
    pub check_in: DateTime<Utc>,
    /// The current instant.
    pub now: DateTime<Utc>,
    /// The configured local offset.
    pub offset: LocalOffset,
    /// Span and tolerance limits.
    pub policy: &'a CheckoutValidationPolicy,
}

impl CheckoutContext<'_> {
    fn next_date(&self) -> NaiveDate {
        self.business_date + Duration::days(1)
    }
}

/// Returns the reason a checkout candidate must be discarded, if any.
pub fn checkout_rejection(
    candidate: DateTime<Utc>,
    ctx: &CheckoutContext<'_>,
) -> Option<CheckoutRejection> {
    if candidate <= ctx.check_in {
        return Some(CheckoutRejection::NotAfterCheckIn);
    }
    if candidate - ctx.check_in > Duration::hours(ctx.policy.max_span_hours) {
        return Some(CheckoutRejection::SpanTooLong);
    }

    let next_date = ctx.next_date();
    let check_in_date = ctx.offset.local_date(ctx.check_in);
    if check_in_date != ctx.business_date && check_in_date != next_date {
        return Some(CheckoutRejection::CheckInOutsideOccurrence);
    }

    if let Some(shift) = ctx.shift.filter(|s| s.crosses_midnight) {
        let checkout_date = ctx.offset.local_date(candidate);
        if checkout_date > next_date {
            return Some(CheckoutRejection::BeyondNextDay);
        }
        let latest = shift.end_clock_minute() + ctx.policy.end_tolerance_minutes;
        if checkout_date == next_date && ctx.offset.minute_of_day(candidate) > latest {
            return Some(CheckoutRejection::TooLateAfterEnd);
        }
    }

    if candidate > ctx.now {
        return Some(CheckoutRejection::InFuture);
    }
    None
}

/// Pure predicate form of [`checkout_rejection`].
pub fn is_valid_checkout(candidate: DateTime<Utc>, ctx: &CheckoutContext<'_>) -> bool {
    checkout_rejection(candidate, ctx).is_none()
}
