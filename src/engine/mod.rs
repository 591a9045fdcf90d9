//! The attendance engine facade.
//!
//! [`AttendanceEngine`] ties the configuration, the persistence seams and a
//! clock to the calculation rules, and exposes the operations the HTTP
//! layer and other collaborators call.

mod breaks;
mod clock;

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::calculation::{
    BatchInputs, ShiftWindow, UNKNOWN_SHIFT, ViolationFlags, apply_heartbeat, calculate_deduction,
    detect_record_violations, employee_shift, local_day_bounds, month_day_flags, net_salary,
    operational_window, reconcile_batch, record_writes, resolve_shift_window, validate_activity_score,
    window_for_date,
};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AttendanceRecord, DeviceSession, DeviceState, Employee, MonthlyDeduction, PunchEvent, YearMonth,
};
use crate::store::{
    AttendanceStore, DeviceStore, EmployeeDirectory, PunchLog, Repository,
};

pub use breaks::BreakOpened;
pub use clock::{FixedTimeSource, SystemTimeSource, TimeSource};

/// One employee whose reconciled record could not be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileFailure {
    /// The employee code.
    pub emp_code: String,
    /// The storage error message.
    pub message: String,
}

/// The outcome of reconciling a business date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// The business date.
    pub business_date: NaiveDate,
    /// One record per employee in roster order, absent ones included.
    pub records: Vec<AttendanceRecord>,
    /// Employees whose writes landed.
    pub written: usize,
    /// Writes that failed. Siblings were still written.
    pub failures: Vec<ReconcileFailure>,
}

/// The outcome of one heartbeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeartbeatOutcome {
    /// The device session after the heartbeat.
    pub session: DeviceSession,
    /// The derived state.
    pub state: DeviceState,
    /// The shift occurrence owning the heartbeat; `None` when the
    /// employee has no usable shift.
    pub shift_window: Option<ShiftWindow>,
}

/// The attendance engine.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use attendance_engine::config::EngineConfig;
/// use attendance_engine::engine::{AttendanceEngine, SystemTimeSource};
/// use attendance_engine::store::MemoryStore;
///
/// let engine = AttendanceEngine::new(
///     EngineConfig::default(),
///     Arc::new(MemoryStore::new()),
///     Arc::new(SystemTimeSource),
/// );
/// assert_eq!(engine.config().catalog().len(), 3);
/// ```
pub struct AttendanceEngine {
    config: EngineConfig,
    repo: Arc<dyn Repository>,
    clock: Arc<dyn TimeSource>,
}

impl AttendanceEngine {
    /// Creates an engine.
    pub fn new(config: EngineConfig, repo: Arc<dyn Repository>, clock: Arc<dyn TimeSource>) -> Self {
        Self { config, repo, clock }
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The current instant.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// The local calendar date of the current instant.
    pub fn today(&self) -> NaiveDate {
        self.config.offset().local_date(self.now())
    }

    fn employee(&self, emp_code: &str) -> EngineResult<Employee> {
        self.repo
            .employee(emp_code)?
            .ok_or_else(|| EngineError::EmployeeNotFound {
                emp_code: emp_code.to_string(),
            })
    }

    /// Resolves the shift occurrence owning `instant` for an employee.
    ///
    /// # Errors
    ///
    /// `EmployeeNotFound`, `NoShiftConfigured` or `ShiftNotFound`. All are
    /// terminal for the request.
    pub fn resolve_shift_window(&self, emp_code: &str, instant: DateTime<Utc>) -> EngineResult<ShiftWindow> {
        let employee = self.employee(emp_code)?;
        let shift = employee_shift(&employee, self.config.catalog())?;
        Ok(resolve_shift_window(shift, instant, self.config.offset()))
    }

    /// Reconciles every employee for a business date and persists the
    /// present ones.
    ///
    /// Stale records filed under another shift code are replaced. A next-day
    /// record found holding this occurrence's endpoints is rewritten without
    /// them in the same write. A failed write is logged and reported without
    /// stopping the other writes; re-running the date repairs it.
    ///
    /// # Errors
    ///
    /// `Validation` for a business date after today; `Storage` when the
    /// inputs cannot be read.
    pub fn reconcile_business_date(&self, business_date: NaiveDate) -> EngineResult<ReconcileReport> {
        let now = self.now();
        let offset = self.config.offset();
        if business_date > offset.local_date(now) {
            return Err(EngineError::validation(
                "date",
                format!("{} is in the future", business_date),
            ));
        }

        let employees = self.repo.employees()?;
        let next_date = business_date + Duration::days(1);
        let (window_start, window_end) = operational_window(business_date, &self.config);

        let any_crossing = employees.iter().any(|e| {
            employee_shift(e, self.config.catalog()).is_ok_and(|s| s.crosses_midnight)
        });
        let next_day_punches = if any_crossing {
            let (from, to) = local_day_bounds(next_date, offset);
            self.repo.punches_between(from, to)?
        } else {
            Vec::new()
        };

        let inputs = BatchInputs {
            window_punches: self.repo.punches_between(window_start, window_end)?,
            next_day_punches,
            existing: self.repo.records_on(business_date)?,
            next_existing: self.repo.records_on(next_date)?,
        };
        let results = reconcile_batch(business_date, &employees, &inputs, &self.config, now);

        let mut written = 0;
        let mut failures = Vec::new();
        for result in &results {
            let emp_code = result.record.emp_code.as_str();
            let next_existing = inputs.next_existing.iter().find(|r| r.emp_code == emp_code);
            let writes = record_writes(result, next_existing, &self.config);
            if writes.is_empty() {
                continue;
            }
            match self.repo.apply_writes(writes) {
                Ok(()) => written += 1,
                Err(err) => {
                    warn!(
                        emp_code = %emp_code,
                        business_date = %business_date,
                        error = %err,
                        "Failed to persist attendance record"
                    );
                    failures.push(ReconcileFailure {
                        emp_code: emp_code.to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }

        info!(
            business_date = %business_date,
            employees = employees.len(),
            punches = inputs.window_punches.len(),
            written,
            failed = failures.len(),
            "Reconciled business date"
        );

        Ok(ReconcileReport {
            business_date,
            records: results.into_iter().map(|r| r.record).collect(),
            written,
            failures,
        })
    }

    /// Late and early-leave flags for a record, computed against its shift.
    pub fn detect_violations(&self, record: &AttendanceRecord) -> ViolationFlags {
        detect_record_violations(record, self.config.catalog(), self.config.offset())
    }

    /// The stored record for an employee and date, or an empty (absent)
    /// record when nothing is stored.
    pub fn attendance_record(&self, business_date: NaiveDate, emp_code: &str) -> EngineResult<AttendanceRecord> {
        let employee = self.employee(emp_code)?;
        if let Some(record) = self.repo.record(business_date, emp_code)? {
            return Ok(record);
        }
        let shift_code = employee_shift(&employee, self.config.catalog())
            .map_or_else(|_| UNKNOWN_SHIFT.to_string(), |s| s.code.clone());
        Ok(AttendanceRecord::new(business_date, emp_code, shift_code))
    }

    /// Computes an employee's deduction for a `YYYY-MM` month.
    ///
    /// Days up to and including yesterday are considered, and only those
    /// whose shift occurrence has ended (shift end plus the checkout
    /// tolerance). A month in progress is billed only for completed days and
    /// a future month bills nothing.
    ///
    /// # Errors
    ///
    /// `Validation` for a malformed month, `EmployeeNotFound` for an
    /// unknown employee.
    pub fn compute_monthly_deduction(&self, emp_code: &str, month: &str) -> EngineResult<MonthlyDeduction> {
        let month = YearMonth::parse(month)?;
        let employee = self.employee(emp_code)?;
        let policy = self.config.policy();

        let yesterday = self.today() - Duration::days(1);
        let through = self.last_closed_date(&employee, month.last_day().min(yesterday));
        let records = self
            .repo
            .records_between(emp_code, month.first_day(), month.last_day())?;
        let days = month_day_flags(month, through, &records, &policy.calendar);
        let result = calculate_deduction(&days, &policy.deduction);
        let net = net_salary(employee.monthly_salary, result.salary_deduct_days, &policy.deduction);

        debug!(
            emp_code = %emp_code,
            month = %month,
            days = days.len(),
            salary_deduct_days = %result.salary_deduct_days,
            "Computed monthly deduction"
        );

        Ok(MonthlyDeduction {
            emp_code: employee.emp_code,
            month,
            salary_deduct_days: result.salary_deduct_days,
            monthly_salary: employee.monthly_salary,
            net_salary: net,
            breakdown: result.breakdown,
        })
    }

    /// Steps back from `through` past business dates whose shift occurrence
    /// is still running, such as last night's shift before its checkout.
    fn last_closed_date(&self, employee: &Employee, through: NaiveDate) -> NaiveDate {
        let Ok(shift) = employee_shift(employee, self.config.catalog()) else {
            return through;
        };
        let tolerance = Duration::minutes(self.config.policy().checkout_validation.end_tolerance_minutes);
        let now = self.now();
        let mut date = through;
        while window_for_date(shift, date, self.config.offset()).shift_end + tolerance > now {
            date -= Duration::days(1);
        }
        date
    }

    /// Appends a valid-access punch for a known employee.
    pub fn record_punch(&self, emp_code: &str, event_time: DateTime<Utc>) -> EngineResult<PunchEvent> {
        self.employee(emp_code)?;
        let event = PunchEvent::valid(emp_code, event_time);
        self.repo.append_punch(event.clone())?;
        Ok(event)
    }

    /// Applies a desktop agent heartbeat.
    ///
    /// Updates for one device are serialized by the store. An employee
    /// without a usable shift still has the heartbeat recorded; the
    /// outcome just carries no shift window.
    ///
    /// # Errors
    ///
    /// `Validation` for a score outside 0-100, `EmployeeNotFound` for an
    /// unknown employee.
    pub fn record_heartbeat(
        &self,
        device_id: &str,
        emp_code: &str,
        reported: DeviceState,
        activity_score: Option<i64>,
        at: Option<DateTime<Utc>>,
    ) -> EngineResult<HeartbeatOutcome> {
        if device_id.trim().is_empty() {
            return Err(EngineError::validation("device_id", "must not be empty"));
        }
        let score = validate_activity_score(activity_score)?;
        let employee = self.employee(emp_code)?;
        let at = at.unwrap_or_else(|| self.now());
        let policy = &self.config.policy().heartbeat;

        let mut state = reported;
        let session = self.repo.update_device(device_id, emp_code, &mut |session: &mut DeviceSession| {
            state = apply_heartbeat(session, reported, score, at, policy);
        })?;

        let shift_window = match employee_shift(&employee, self.config.catalog()) {
            Ok(shift) => Some(resolve_shift_window(shift, at, self.config.offset())),
            Err(err) => {
                debug!(emp_code = %emp_code, error = %err, "Heartbeat accepted without a shift");
                None
            }
        };

        if session.flagged && state == DeviceState::Suspicious {
            warn!(
                device_id = %device_id,
                emp_code = %emp_code,
                consecutive = session.consecutive_suspicious,
                "Device flagged for suspicious activity"
            );
        }

        Ok(HeartbeatOutcome {
            session,
            state,
            shift_window,
        })
    }
}
