//! Persistence seams for the Attendance Engine.
//!
//! The engine reads employees and punches and reads and writes attendance
//! records, break intervals and device sessions through these traits. They
//! are synchronous and object-safe so the engine can hold an
//! `Arc<dyn Repository>`. [`MemoryStore`] is the in-process implementation
//! used by the server binary and the tests.

mod memory;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::EngineResult;
use crate::models::{
    AttendanceRecord, BreakInterval, DeviceSession, Employee, PunchEvent, RecordWrite,
};

pub use memory::MemoryStore;

/// Read access to the employee directory.
pub trait EmployeeDirectory: Send + Sync {
    /// Looks up one employee by code.
    fn employee(&self, emp_code: &str) -> EngineResult<Option<Employee>>;

    /// Every employee, in a stable order.
    fn employees(&self) -> EngineResult<Vec<Employee>>;
}

/// The append-only punch feed.
pub trait PunchLog: Send + Sync {
    /// Valid-access punches with `from <= event_time < to`, ascending.
    fn punches_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> EngineResult<Vec<PunchEvent>>;

    /// Appends one event to the feed.
    fn append_punch(&self, event: PunchEvent) -> EngineResult<()>;
}

/// Keyed storage of attendance records.
pub trait AttendanceStore: Send + Sync {
    /// The record for an employee on a date, whatever its shift code.
    fn record(&self, date: NaiveDate, emp_code: &str) -> EngineResult<Option<AttendanceRecord>>;

    /// Every record filed under a date.
    fn records_on(&self, date: NaiveDate) -> EngineResult<Vec<AttendanceRecord>>;

    /// An employee's records with `from <= business_date <= to`, ascending.
    fn records_between(
        &self,
        emp_code: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> EngineResult<Vec<AttendanceRecord>>;

    /// Inserts or replaces the record with the same key.
    fn upsert(&self, record: AttendanceRecord) -> EngineResult<()>;

    /// Deletes the employee's records on `date` filed under any shift code
    /// other than `keep_shift_code`. Returns how many were deleted.
    fn delete_other_shifts(
        &self,
        date: NaiveDate,
        emp_code: &str,
        keep_shift_code: &str,
    ) -> EngineResult<usize>;

    /// Replaces whatever is stored for the record's date and employee with
    /// `record`. Implementations should apply both steps atomically.
    fn replace(&self, record: AttendanceRecord) -> EngineResult<()> {
        self.delete_other_shifts(record.business_date, &record.emp_code, &record.shift_code)?;
        self.upsert(record)
    }

    /// Deletes every record for an employee on a date. Returns how many
    /// were deleted.
    fn delete_records(&self, date: NaiveDate, emp_code: &str) -> EngineResult<usize>;

    /// Applies `writes` in order. Implementations should apply them
    /// atomically: all land or none do.
    fn apply_writes(&self, writes: Vec<RecordWrite>) -> EngineResult<()> {
        for write in writes {
            match write {
                RecordWrite::Replace(record) => self.replace(record)?,
                RecordWrite::Delete {
                    business_date,
                    emp_code,
                } => {
                    self.delete_records(business_date, &emp_code)?;
                }
            }
        }
        Ok(())
    }
}

/// Storage of break intervals.
pub trait BreakStore: Send + Sync {
    /// The employee's open break, if any.
    fn open_break(&self, emp_code: &str) -> EngineResult<Option<BreakInterval>>;

    /// Every open break.
    fn open_breaks(&self) -> EngineResult<Vec<BreakInterval>>;

    /// Stores a new break.
    fn insert_break(&self, interval: BreakInterval) -> EngineResult<()>;

    /// Replaces a stored break with the same id.
    fn update_break(&self, interval: BreakInterval) -> EngineResult<()>;

    /// The employee's breaks filed under a business date, by start time.
    fn breaks_for(&self, emp_code: &str, date: NaiveDate) -> EngineResult<Vec<BreakInterval>>;

    /// Stores `closed` over the employee's open break and inserts `opened`,
    /// provided the open break is still the one `closed` replaces (or there
    /// is none when `closed` is `None`). Returns `false` and writes nothing
    /// when another writer got there first. Implementations should apply
    /// both steps atomically.
    fn replace_open(&self, closed: Option<BreakInterval>, opened: BreakInterval) -> EngineResult<bool> {
        let current = self.open_break(&opened.emp_code)?;
        if current.map(|b| b.id) != closed.as_ref().map(|b| b.id) {
            return Ok(false);
        }
        if let Some(closed) = closed {
            self.update_break(closed)?;
        }
        self.insert_break(opened)?;
        Ok(true)
    }
}

/// Storage of desktop agent device sessions.
pub trait DeviceStore: Send + Sync {
    /// Applies `mutate` to the device's session, creating it first if
    /// needed. Updates to one device are serialized; different devices do
    /// not contend. Returns the session as left by `mutate`.
    fn update_device(
        &self,
        device_id: &str,
        emp_code: &str,
        mutate: &mut dyn FnMut(&mut DeviceSession),
    ) -> EngineResult<DeviceSession>;

    /// The device's session, if it has ever reported.
    fn device(&self, device_id: &str) -> EngineResult<Option<DeviceSession>>;
}

/// Everything the engine persists through.
pub trait Repository: EmployeeDirectory + PunchLog + AttendanceStore + BreakStore + DeviceStore {}

impl<T> Repository for T where
    T: EmployeeDirectory + PunchLog + AttendanceStore + BreakStore + DeviceStore
{
}
