//! Attendance reconciliation.
//!
//! This module merges raw punches, previously stored records and the
//! following day's spillover into one check-in / check-out pair per
//! employee per business date.
//!
//! Both endpoints are resolved from an explicit, ordered list of candidate
//! sources. The first candidate that exists (and, for checkouts, passes
//! [`checkout_rejection`]) wins. Rejected checkout candidates are logged
//! and skipped, never raised as errors.
//!
//! Reconciliation is idempotent: every input that shaped a result is still
//! present when the same business date is reconciled again. The only write
//! to the next day is [`record_writes`] taking back endpoints a misfiled
//! next-day record held for this occurrence, and a re-run finds them on
//! the business date's own record instead.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::debug;

use crate::config::EngineConfig;
use crate::models::{AttendanceRecord, Employee, PunchEvent, RecordWrite, ShiftDefinition};

use super::checkout_validation::{CheckoutContext, checkout_rejection};
use super::event_classifier::infer_shift;
use super::local_time::LocalOffset;
use super::shift_window::employee_shift;
use super::violations::{detect_record_violations, detect_violations};

/// Shift code stored when neither an assignment nor the punches identify a shift.
pub const UNKNOWN_SHIFT: &str = "Unknown";

/// Where a resolved check-in or checkout came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateSource {
    /// A punch on the business date.
    BusinessDateEvent,
    /// The record already stored for the business date.
    StoredRecord,
    /// The record stored for the following date.
    NextDayRecord,
    /// A punch on the following date.
    NextDayEvent,
}

impl std::fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CandidateSource::BusinessDateEvent => "business_date_event",
            CandidateSource::StoredRecord => "stored_record",
            CandidateSource::NextDayRecord => "next_day_record",
            CandidateSource::NextDayEvent => "next_day_event",
        };
        write!(f, "{}", name)
    }
}

/// Everything one employee's reconciliation reads.
#[derive(Debug, Clone, Copy)]
pub struct EmployeeInputs<'a> {
    /// The business date.
    pub business_date: NaiveDate,
    /// The employee code.
    pub emp_code: &'a str,
    /// The employee's assigned shift, if it resolved.
    pub assigned_shift: Option<&'a ShiftDefinition>,
    /// The employee's window punches dated on the business date, ascending.
    pub business_date_events: &'a [DateTime<Utc>],
    /// The employee's punches on the following date, ascending. Only
    /// loaded for crossing shifts.
    pub next_day_events: &'a [DateTime<Utc>],
    /// The record stored for the business date.
    pub existing: Option<&'a AttendanceRecord>,
    /// The record stored for the following date.
    pub next_existing: Option<&'a AttendanceRecord>,
}

/// The outcome of reconciling one employee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// The reconciled record.
    pub record: AttendanceRecord,
    /// Source of the check-in, if any.
    pub check_in_source: Option<CandidateSource>,
    /// Source of the checkout, if any.
    pub check_out_source: Option<CandidateSource>,
    /// The stored record's check-in was the previous occurrence's checkout,
    /// so its endpoints and punch count were dropped.
    pub released_stored: bool,
}

impl Reconciliation {
    /// Only employees with a resolved check-in or punch are persisted.
    /// Absence is the reading of a missing record.
    pub fn should_persist(&self) -> bool {
        self.record.has_punches()
    }

    /// True when an endpoint was taken from the following date's record.
    pub fn claims_next_day_record(&self) -> bool {
        self.check_in_source == Some(CandidateSource::NextDayRecord)
            || self.check_out_source == Some(CandidateSource::NextDayRecord)
    }
}

/// True when `instant`, seen from the occurrence of a crossing `shift`
/// filed under `business_date`, falls in the previous occurrence's
/// checkout tail: on the business date, no later than the end clock plus
/// the checkout tolerance.
fn in_previous_tail(
    instant: DateTime<Utc>,
    business_date: NaiveDate,
    shift: &ShiftDefinition,
    end_tolerance_minutes: i64,
    offset: LocalOffset,
) -> bool {
    offset.local_date(instant) == business_date
        && offset.minute_of_day(instant) <= shift.end_clock_minute() + end_tolerance_minutes
}

/// Instants bounding the punches gathered for a business date.
///
/// Runs from the widened window start on the business date to the widened
/// window end on the following date.
pub fn operational_window(business_date: NaiveDate, config: &EngineConfig) -> (DateTime<Utc>, DateTime<Utc>) {
    let minutes = config.window_minutes();
    let offset = config.offset();
    (
        offset.instant_at_minute(business_date, minutes.start),
        offset.instant_at_minute(business_date + Duration::days(1), minutes.end),
    )
}

/// Instants bounding the whole local calendar day `date`.
pub fn local_day_bounds(date: NaiveDate, offset: LocalOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        offset.instant_at_minute(date, 0),
        offset.instant_at_minute(date + Duration::days(1), 0),
    )
}

fn first_valid<I>(candidates: I) -> Option<(CandidateSource, DateTime<Utc>)>
where
    I: IntoIterator<Item = (CandidateSource, Option<DateTime<Utc>>)>,
{
    candidates
        .into_iter()
        .find_map(|(source, instant)| instant.map(|instant| (source, instant)))
}

/// Reconciles one employee for one business date.
///
/// # Check-in priority
///
/// 1. Earliest qualifying punch on the business date
/// 2. The stored record's check-in, unless it sits in the previous
///    occurrence's checkout tail (then the whole stored record is ignored)
/// 3. Crossing shifts only: the next day's stored check-in, when its local
///    time is before the shift end (a late check-in)
/// 4. Crossing shifts only: the earliest next-day punch before the shift end
///
/// For a crossing shift, business-date punches before the previous
/// occurrence's checkout tolerance ends do not qualify: they are that
/// occurrence's checkout.
///
/// # Checkout priority
///
/// Non-crossing: the latest business-date punch (two or more punches
/// only), then the stored checkout. Crossing: the next day's stored
/// checkout, then the last valid next-day punch after check-in, then the
/// stored checkout. Every candidate must pass checkout validation.
pub fn reconcile_employee(
    inputs: &EmployeeInputs<'_>,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> Reconciliation {
    let offset = config.offset();
    let policy = &config.policy().checkout_validation;
    let business_date = inputs.business_date;
    let next_date = business_date + Duration::days(1);

    let shift = inputs.assigned_shift.or_else(|| {
        let punches = inputs
            .business_date_events
            .iter()
            .chain(inputs.next_day_events)
            .copied();
        infer_shift(punches, business_date, config.catalog(), offset)
    });
    let crossing = shift.filter(|s| s.crosses_midnight);

    let previous_tail = |instant: DateTime<Utc>| match crossing {
        Some(shift) => in_previous_tail(instant, business_date, shift, policy.end_tolerance_minutes, offset),
        None => false,
    };
    let qualifying: Vec<DateTime<Utc>> = inputs
        .business_date_events
        .iter()
        .copied()
        .filter(|e| !previous_tail(*e))
        .collect();

    // A stored check-in in the previous occurrence's tail means the record
    // was filed under the wrong date; none of its endpoints are ours.
    let stored = inputs
        .existing
        .filter(|r| !r.check_in.is_some_and(|check_in| previous_tail(check_in)));
    let released_stored = inputs.existing.is_some() && stored.is_none();
    if released_stored {
        debug!(
            emp_code = %inputs.emp_code,
            business_date = %business_date,
            "Dropped stored endpoints belonging to the previous occurrence"
        );
    }

    let before_end = |instant: &DateTime<Utc>| match crossing {
        Some(shift) => {
            offset.local_date(*instant) == next_date
                && offset.minute_of_day(*instant) < shift.end_clock_minute()
        }
        None => false,
    };

    let check_in = first_valid([
        (CandidateSource::BusinessDateEvent, qualifying.first().copied()),
        (CandidateSource::StoredRecord, stored.and_then(|r| r.check_in)),
        (
            CandidateSource::NextDayRecord,
            inputs.next_existing.and_then(|r| r.check_in).filter(before_end),
        ),
        (
            CandidateSource::NextDayEvent,
            inputs.next_day_events.iter().copied().find(before_end),
        ),
    ]);

    let check_out = check_in.and_then(|(_, check_in)| {
        let ctx = CheckoutContext {
            shift,
            business_date,
            check_in,
            now,
            offset,
            policy,
        };
        let accept = |source: CandidateSource, candidate: DateTime<Utc>| {
            match checkout_rejection(candidate, &ctx) {
                None => true,
                Some(reason) => {
                    debug!(
                        emp_code = %inputs.emp_code,
                        business_date = %business_date,
                        source = %source,
                        candidate = %candidate,
                        reason = %reason,
                        "Discarded checkout candidate"
                    );
                    false
                }
            }
        };

        let stored = stored.and_then(|r| r.check_out);
        let candidates: Vec<(CandidateSource, Option<DateTime<Utc>>)> = if crossing.is_some() {
            let next_day_event = inputs
                .next_day_events
                .iter()
                .rev()
                .copied()
                .filter(|e| *e > check_in && offset.local_date(*e) == next_date)
                .find(|e| accept(CandidateSource::NextDayEvent, *e));
            vec![
                (CandidateSource::NextDayRecord, inputs.next_existing.and_then(|r| r.check_out)),
                (CandidateSource::NextDayEvent, next_day_event),
                (CandidateSource::StoredRecord, stored),
            ]
        } else {
            let last_event = if qualifying.len() >= 2 { qualifying.last().copied() } else { None };
            vec![
                (CandidateSource::BusinessDateEvent, last_event),
                (CandidateSource::StoredRecord, stored),
            ]
        };

        candidates.into_iter().find_map(|(source, candidate)| {
            candidate
                .filter(|c| source == CandidateSource::NextDayEvent || accept(source, *c))
                .map(|c| (source, c))
        })
    });

    let check_in_instant = check_in.map(|(_, instant)| instant);
    let check_out_instant = check_out.map(|(_, instant)| instant);

    let mut punch_count = qualifying.len();
    if let (Some(_), Some(start)) = (crossing, check_in_instant) {
        let end = check_out_instant.unwrap_or(start);
        punch_count += inputs
            .next_day_events
            .iter()
            .filter(|e| **e >= start && **e <= end)
            .count();
    }
    let punch_count = u32::try_from(punch_count).unwrap_or(u32::MAX);

    let shift_code = shift.map_or_else(|| UNKNOWN_SHIFT.to_string(), |s| s.code.clone());
    let mut record = AttendanceRecord::new(business_date, inputs.emp_code, shift_code);
    record.check_in = check_in_instant;
    record.check_out = check_out_instant;
    record.punch_count = punch_count.max(stored.map_or(0, |r| r.punch_count));

    if let Some(existing) = inputs.existing {
        record.status_override = existing.status_override;
        record.excused = existing.excused;
        record.reason = existing.reason.clone();
    }
    if let Some(shift) = shift {
        detect_violations(shift, record.check_in, record.check_out, offset).apply_to(&mut record);
    }

    Reconciliation {
        record,
        check_in_source: check_in.map(|(source, _)| source),
        check_out_source: check_out.map(|(source, _)| source),
        released_stored,
    }
}

/// Strips from the following date's record the endpoints that belong to
/// the occurrence `claimed` resolved: whatever it took over, plus a
/// check-in sitting in that occurrence's checkout tail. A record that
/// loses its check-in loses its checkout and punch count with it.
fn release_next_day_record(
    next: &AttendanceRecord,
    claimed: &Reconciliation,
    config: &EngineConfig,
) -> AttendanceRecord {
    let offset = config.offset();
    let tolerance = config.policy().checkout_validation.end_tolerance_minutes;
    let tail_check_in = match config.catalog().by_code(&next.shift_code) {
        Some(shift) if shift.crosses_midnight => next
            .check_in
            .is_some_and(|check_in| in_previous_tail(check_in, next.business_date, shift, tolerance, offset)),
        _ => false,
    };

    let mut released = next.clone();
    if tail_check_in || claimed.check_in_source == Some(CandidateSource::NextDayRecord) {
        released.check_in = None;
    }
    if released.check_in.is_none() || claimed.check_out_source == Some(CandidateSource::NextDayRecord) {
        released.check_out = None;
    }
    if released.check_in.is_none() {
        released.punch_count = 0;
    }
    detect_record_violations(&released, config.catalog(), offset).apply_to(&mut released);
    released
}

/// The store writes one employee's reconciliation calls for.
///
/// A present record replaces whatever is stored for the date. A stored
/// record whose endpoints were dropped is rewritten, or deleted when
/// nothing but emptiness is left. When endpoints came from the following
/// date's record, that record is rewritten without them in the same batch
/// of writes.
pub fn record_writes(
    result: &Reconciliation,
    next_existing: Option<&AttendanceRecord>,
    config: &EngineConfig,
) -> Vec<RecordWrite> {
    let mut writes = Vec::new();
    if result.should_persist() {
        writes.push(RecordWrite::Replace(result.record.clone()));
    } else if result.released_stored {
        writes.push(RecordWrite::settle(result.record.clone()));
    }

    if let Some(next) = next_existing.filter(|_| result.claims_next_day_record()) {
        let released = release_next_day_record(next, result, config);
        if released != *next {
            writes.push(RecordWrite::settle(released));
        }
    }
    writes
}

/// Data gathered once for a whole business-date batch.
#[derive(Debug, Clone, Default)]
pub struct BatchInputs {
    /// Punches inside the operational window.
    pub window_punches: Vec<PunchEvent>,
    /// Punches on the following local calendar day.
    pub next_day_punches: Vec<PunchEvent>,
    /// Records stored for the business date.
    pub existing: Vec<AttendanceRecord>,
    /// Records stored for the following date.
    pub next_existing: Vec<AttendanceRecord>,
}

fn group_punches<'a>(
    punches: &'a [PunchEvent],
    keep: impl Fn(&PunchEvent) -> bool,
) -> HashMap<&'a str, Vec<DateTime<Utc>>> {
    let mut grouped: HashMap<&str, Vec<DateTime<Utc>>> = HashMap::new();
    for punch in punches.iter().filter(|p| p.is_valid_access() && keep(p)) {
        grouped
            .entry(punch.emp_code.as_str())
            .or_default()
            .push(punch.event_time);
    }
    for events in grouped.values_mut() {
        events.sort();
        events.dedup();
    }
    grouped
}

fn index_records(records: &[AttendanceRecord]) -> HashMap<&str, &AttendanceRecord> {
    let mut indexed = HashMap::new();
    for record in records {
        indexed.entry(record.emp_code.as_str()).or_insert(record);
    }
    indexed
}

/// Reconciles every employee for one business date.
///
/// Inputs are gathered once for the batch; each employee is then resolved
/// independently, so no employee's result depends on another's record.
/// Results come back in roster order.
pub fn reconcile_batch(
    business_date: NaiveDate,
    employees: &[Employee],
    inputs: &BatchInputs,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> Vec<Reconciliation> {
    let offset = config.offset();
    let next_date = business_date + Duration::days(1);

    let window_events = group_punches(&inputs.window_punches, |p| {
        offset.local_date(p.event_time) == business_date
    });
    let next_day_events = group_punches(&inputs.next_day_punches, |p| {
        offset.local_date(p.event_time) == next_date
    });
    let existing = index_records(&inputs.existing);
    let next_existing = index_records(&inputs.next_existing);

    employees
        .iter()
        .map(|employee| {
            let emp_code = employee.emp_code.as_str();
            let assigned_shift = employee_shift(employee, config.catalog()).ok();
            let crossing = assigned_shift.is_some_and(|s| s.crosses_midnight);

            let employee_inputs = EmployeeInputs {
                business_date,
                emp_code,
                assigned_shift,
                business_date_events: window_events
                    .get(emp_code)
                    .map(Vec::as_slice)
                    .unwrap_or_default(),
                next_day_events: if crossing {
                    next_day_events
                        .get(emp_code)
                        .map(Vec::as_slice)
                        .unwrap_or_default()
                } else {
                    &[]
                },
                existing: existing.get(emp_code).copied(),
                next_existing: if crossing {
                    next_existing.get(emp_code).copied()
                } else {
                    None
                },
            };
            reconcile_employee(&employee_inputs, config, now)
        })
        .collect()
}
