//! Break lifecycle operations.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::calculation::{
    BreakSummary, ShiftWindow, UNKNOWN_SHIFT, close_interval, employee_shift, resolve_shift_window,
    summarize_breaks, window_for_date,
};
use crate::error::{EngineError, EngineResult};
use crate::models::{BreakCategory, BreakInterval};
use crate::store::BreakStore;

use super::AttendanceEngine;

const OPEN_BREAK_ATTEMPTS: usize = 3;

/// The outcome of opening a break.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakOpened {
    /// The newly opened break.
    pub opened: BreakInterval,
    /// The previously open break, closed at the new break's start.
    pub force_closed: Option<BreakInterval>,
}

impl AttendanceEngine {
    /// The shift occurrence a stored break belongs to.
    fn break_window(&self, interval: &BreakInterval) -> Option<ShiftWindow> {
        self.config
            .catalog()
            .by_code(&interval.shift_code)
            .map(|shift| window_for_date(shift, interval.business_date, self.config.offset()))
    }

    fn close_at(&self, interval: &mut BreakInterval, ended_at: DateTime<Utc>) {
        let window = self.break_window(interval);
        close_interval(interval, ended_at, window.as_ref(), &self.config.policy().breaks);
    }

    fn finish(&self, interval: &mut BreakInterval, ended_at: DateTime<Utc>) -> EngineResult<()> {
        self.close_at(interval, ended_at);
        self.repo.update_break(interval.clone())
    }

    /// Opens a break, force-closing any break the employee left open.
    ///
    /// The force-close and the new break are stored in one step, so a
    /// failed open leaves the previous break as it was and two concurrent
    /// opens never leave two breaks open.
    ///
    /// The category defaults to `Pending`. The break is filed under the
    /// shift occurrence owning `at`; an employee without a usable shift
    /// gets an unclipped break on the local date.
    pub fn open_break(
        &self,
        emp_code: &str,
        at: Option<DateTime<Utc>>,
        category: Option<&str>,
        reason: Option<String>,
    ) -> EngineResult<BreakOpened> {
        let category = match category {
            Some(raw) => BreakCategory::normalize(raw)?,
            None => BreakCategory::Pending,
        };
        let employee = self.employee(emp_code)?;
        let at = at.unwrap_or_else(|| self.now());
        let offset = self.config.offset();

        let (business_date, shift_code) = match employee_shift(&employee, self.config.catalog()) {
            Ok(shift) => {
                let window = resolve_shift_window(shift, at, offset);
                (window.attendance_date, window.shift_code)
            }
            Err(err) => {
                debug!(emp_code = %emp_code, error = %err, "Opening break without a shift");
                (offset.local_date(at), UNKNOWN_SHIFT.to_string())
            }
        };

        let opened = BreakInterval {
            id: Uuid::new_v4(),
            emp_code: emp_code.to_string(),
            business_date,
            shift_code,
            category,
            reason,
            started_at: at,
            ended_at: None,
            duration_minutes: None,
            allowed_minutes: None,
            exceeded_minutes: 0,
        };

        for _ in 0..OPEN_BREAK_ATTEMPTS {
            let force_closed = self.repo.open_break(emp_code)?.map(|mut stale| {
                self.close_at(&mut stale, at);
                stale
            });
            if !self.repo.replace_open(force_closed.clone(), opened.clone())? {
                debug!(emp_code = %emp_code, "Open break changed while opening, retrying");
                continue;
            }
            if let Some(stale) = &force_closed {
                info!(
                    emp_code = %emp_code,
                    break_id = %stale.id,
                    duration_minutes = stale.duration_minutes.unwrap_or_default(),
                    "Force-closed open break"
                );
            }
            return Ok(BreakOpened {
                opened,
                force_closed,
            });
        }

        Err(EngineError::Storage {
            message: format!("open break for employee {} kept changing", emp_code),
        })
    }

    /// Sets the category of the employee's open break.
    ///
    /// # Errors
    ///
    /// `InvalidBreakCategory` for unknown text or `Pending`; `NoOpenBreak`
    /// when nothing is open.
    pub fn update_break_category(
        &self,
        emp_code: &str,
        category: &str,
        reason: Option<String>,
    ) -> EngineResult<BreakInterval> {
        let normalized = BreakCategory::normalize(category)?;
        if normalized == BreakCategory::Pending {
            return Err(EngineError::InvalidBreakCategory {
                category: category.to_string(),
            });
        }
        self.employee(emp_code)?;
        let mut interval = self
            .repo
            .open_break(emp_code)?
            .ok_or_else(|| EngineError::NoOpenBreak {
                emp_code: emp_code.to_string(),
            })?;
        interval.category = normalized;
        if reason.is_some() {
            interval.reason = reason;
        }
        self.repo.update_break(interval.clone())?;
        Ok(interval)
    }

    /// Closes the employee's open break. Returns `None` when nothing was open.
    pub fn close_break(&self, emp_code: &str, at: Option<DateTime<Utc>>) -> EngineResult<Option<BreakInterval>> {
        self.employee(emp_code)?;
        let Some(mut interval) = self.repo.open_break(emp_code)? else {
            return Ok(None);
        };
        self.finish(&mut interval, at.unwrap_or_else(|| self.now()))?;
        Ok(Some(interval))
    }

    /// Break productivity for one employee and business date.
    pub fn break_summary(&self, emp_code: &str, business_date: NaiveDate) -> EngineResult<BreakSummary> {
        self.employee(emp_code)?;
        let breaks = self.repo.breaks_for(emp_code, business_date)?;
        Ok(summarize_breaks(emp_code, business_date, &breaks))
    }

    /// Closes every open break whose shift occurrence, grace included, has
    /// ended. Each is closed at the grace end. Breaks without a known shift
    /// are left open.
    pub fn close_stale_breaks(&self) -> EngineResult<Vec<BreakInterval>> {
        let now = self.now();
        let mut closed = Vec::new();
        for mut interval in self.repo.open_breaks()? {
            let Some(window) = self.break_window(&interval) else {
                continue;
            };
            if now <= window.grace_end() {
                continue;
            }
            self.finish(&mut interval, window.grace_end())?;
            closed.push(interval);
        }
        info!(closed = closed.len(), "Swept stale breaks");
        Ok(closed)
    }
}
