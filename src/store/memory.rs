//! In-memory implementation of every persistence seam.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{EngineError, EngineResult};
use crate::models::{
    AttendanceRecord, BreakInterval, DeviceSession, Employee, PunchEvent, RecordKey, RecordWrite,
};

use super::{AttendanceStore, BreakStore, DeviceStore, EmployeeDirectory, PunchLog};

fn poisoned<T>(_: PoisonError<T>) -> EngineError {
    EngineError::Storage {
        message: "store lock poisoned".to_string(),
    }
}

/// A lock-backed in-memory store.
///
/// Each collection sits behind its own lock. Device sessions additionally
/// get one mutex per device so heartbeats for a device are applied one at
/// a time.
///
/// [`MemoryStore::fail_writes_for`] makes attendance and break writes for
/// chosen employees fail, to exercise partial failures.
#[derive(Debug, Default)]
pub struct MemoryStore {
    employees: RwLock<BTreeMap<String, Employee>>,
    punches: RwLock<Vec<PunchEvent>>,
    records: RwLock<BTreeMap<RecordKey, AttendanceRecord>>,
    breaks: RwLock<Vec<BreakInterval>>,
    devices: Mutex<HashMap<String, Arc<Mutex<DeviceSession>>>>,
    failing_writes: RwLock<HashSet<String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with a roster.
    pub fn with_employees(employees: impl IntoIterator<Item = Employee>) -> Self {
        let store = Self::new();
        for employee in employees {
            // A fresh lock cannot be poisoned.
            let _ = store.put_employee(employee);
        }
        store
    }

    /// Inserts or replaces an employee.
    pub fn put_employee(&self, employee: Employee) -> EngineResult<()> {
        self.employees
            .write()
            .map_err(poisoned)?
            .insert(employee.emp_code.clone(), employee);
        Ok(())
    }

    /// Makes every attendance and break write for `emp_code` fail with a
    /// storage error.
    pub fn fail_writes_for(&self, emp_code: &str) -> EngineResult<()> {
        self.failing_writes
            .write()
            .map_err(poisoned)?
            .insert(emp_code.to_string());
        Ok(())
    }

    /// Number of stored attendance records.
    pub fn record_count(&self) -> EngineResult<usize> {
        Ok(self.records.read().map_err(poisoned)?.len())
    }

    fn check_writable(&self, emp_code: &str) -> EngineResult<()> {
        if self.failing_writes.read().map_err(poisoned)?.contains(emp_code) {
            return Err(EngineError::Storage {
                message: format!("write rejected for employee {}", emp_code),
            });
        }
        Ok(())
    }
}

fn remove_records(records: &mut BTreeMap<RecordKey, AttendanceRecord>, date: NaiveDate, emp_code: &str) -> usize {
    let before = records.len();
    records.retain(|key, _| key.business_date != date || key.emp_code != emp_code);
    before - records.len()
}

fn remove_other_shifts(
    records: &mut BTreeMap<RecordKey, AttendanceRecord>,
    date: NaiveDate,
    emp_code: &str,
    keep_shift_code: &str,
) -> usize {
    let before = records.len();
    records.retain(|key, _| {
        key.business_date != date || key.emp_code != emp_code || key.shift_code == keep_shift_code
    });
    before - records.len()
}

impl EmployeeDirectory for MemoryStore {
    fn employee(&self, emp_code: &str) -> EngineResult<Option<Employee>> {
        Ok(self.employees.read().map_err(poisoned)?.get(emp_code).cloned())
    }

    fn employees(&self) -> EngineResult<Vec<Employee>> {
        Ok(self.employees.read().map_err(poisoned)?.values().cloned().collect())
    }
}

impl PunchLog for MemoryStore {
    fn punches_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> EngineResult<Vec<PunchEvent>> {
        let mut punches: Vec<PunchEvent> = self
            .punches
            .read()
            .map_err(poisoned)?
            .iter()
            .filter(|p| p.is_valid_access() && p.event_time >= from && p.event_time < to)
            .cloned()
            .collect();
        punches.sort_by(|a, b| a.event_time.cmp(&b.event_time));
        Ok(punches)
    }

    fn append_punch(&self, event: PunchEvent) -> EngineResult<()> {
        self.punches.write().map_err(poisoned)?.push(event);
        Ok(())
    }
}

impl AttendanceStore for MemoryStore {
    fn record(&self, date: NaiveDate, emp_code: &str) -> EngineResult<Option<AttendanceRecord>> {
        Ok(self
            .records
            .read()
            .map_err(poisoned)?
            .values()
            .find(|r| r.business_date == date && r.emp_code == emp_code)
            .cloned())
    }

    fn records_on(&self, date: NaiveDate) -> EngineResult<Vec<AttendanceRecord>> {
        Ok(self
            .records
            .read()
            .map_err(poisoned)?
            .values()
            .filter(|r| r.business_date == date)
            .cloned()
            .collect())
    }

    fn records_between(
        &self,
        emp_code: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> EngineResult<Vec<AttendanceRecord>> {
        Ok(self
            .records
            .read()
            .map_err(poisoned)?
            .values()
            .filter(|r| r.emp_code == emp_code && r.business_date >= from && r.business_date <= to)
            .cloned()
            .collect())
    }

    fn upsert(&self, record: AttendanceRecord) -> EngineResult<()> {
        self.check_writable(&record.emp_code)?;
        self.records
            .write()
            .map_err(poisoned)?
            .insert(record.key(), record);
        Ok(())
    }

    fn delete_other_shifts(
        &self,
        date: NaiveDate,
        emp_code: &str,
        keep_shift_code: &str,
    ) -> EngineResult<usize> {
        let mut records = self.records.write().map_err(poisoned)?;
        Ok(remove_other_shifts(&mut records, date, emp_code, keep_shift_code))
    }

    fn replace(&self, record: AttendanceRecord) -> EngineResult<()> {
        self.check_writable(&record.emp_code)?;
        let mut records = self.records.write().map_err(poisoned)?;
        remove_other_shifts(&mut records, record.business_date, &record.emp_code, &record.shift_code);
        records.insert(record.key(), record);
        Ok(())
    }

    fn delete_records(&self, date: NaiveDate, emp_code: &str) -> EngineResult<usize> {
        self.check_writable(emp_code)?;
        let mut records = self.records.write().map_err(poisoned)?;
        Ok(remove_records(&mut records, date, emp_code))
    }

    fn apply_writes(&self, writes: Vec<RecordWrite>) -> EngineResult<()> {
        for write in &writes {
            self.check_writable(write.emp_code())?;
        }
        let mut records = self.records.write().map_err(poisoned)?;
        for write in writes {
            match write {
                RecordWrite::Replace(record) => {
                    remove_other_shifts(&mut records, record.business_date, &record.emp_code, &record.shift_code);
                    records.insert(record.key(), record);
                }
                RecordWrite::Delete {
                    business_date,
                    emp_code,
                } => {
                    remove_records(&mut records, business_date, &emp_code);
                }
            }
        }
        Ok(())
    }
}

fn find_break<'a>(breaks: &'a mut [BreakInterval], interval: &BreakInterval) -> EngineResult<&'a mut BreakInterval> {
    breaks
        .iter_mut()
        .find(|b| b.id == interval.id)
        .ok_or_else(|| EngineError::Storage {
            message: format!("break {} does not exist", interval.id),
        })
}

impl BreakStore for MemoryStore {
    fn open_break(&self, emp_code: &str) -> EngineResult<Option<BreakInterval>> {
        Ok(self
            .breaks
            .read()
            .map_err(poisoned)?
            .iter()
            .find(|b| b.emp_code == emp_code && b.is_open())
            .cloned())
    }

    fn open_breaks(&self) -> EngineResult<Vec<BreakInterval>> {
        Ok(self
            .breaks
            .read()
            .map_err(poisoned)?
            .iter()
            .filter(|b| b.is_open())
            .cloned()
            .collect())
    }

    fn insert_break(&self, interval: BreakInterval) -> EngineResult<()> {
        self.check_writable(&interval.emp_code)?;
        self.breaks.write().map_err(poisoned)?.push(interval);
        Ok(())
    }

    fn update_break(&self, interval: BreakInterval) -> EngineResult<()> {
        self.check_writable(&interval.emp_code)?;
        let mut breaks = self.breaks.write().map_err(poisoned)?;
        let slot = find_break(&mut breaks, &interval)?;
        *slot = interval;
        Ok(())
    }

    fn replace_open(&self, closed: Option<BreakInterval>, opened: BreakInterval) -> EngineResult<bool> {
        self.check_writable(&opened.emp_code)?;
        let mut breaks = self.breaks.write().map_err(poisoned)?;
        let current = breaks
            .iter()
            .find(|b| b.emp_code == opened.emp_code && b.is_open())
            .map(|b| b.id);
        if current != closed.as_ref().map(|b| b.id) {
            return Ok(false);
        }
        if let Some(closed) = closed {
            let slot = find_break(&mut breaks, &closed)?;
            *slot = closed;
        }
        breaks.push(opened);
        Ok(true)
    }

    fn breaks_for(&self, emp_code: &str, date: NaiveDate) -> EngineResult<Vec<BreakInterval>> {
        let mut breaks: Vec<BreakInterval> = self
            .breaks
            .read()
            .map_err(poisoned)?
            .iter()
            .filter(|b| b.emp_code == emp_code && b.business_date == date)
            .cloned()
            .collect();
        breaks.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        Ok(breaks)
    }
}

impl DeviceStore for MemoryStore {
    fn update_device(
        &self,
        device_id: &str,
        emp_code: &str,
        mutate: &mut dyn FnMut(&mut DeviceSession),
    ) -> EngineResult<DeviceSession> {
        let slot = {
            let mut devices = self.devices.lock().map_err(poisoned)?;
            Arc::clone(
                devices
                    .entry(device_id.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(DeviceSession::new(device_id, emp_code)))),
            )
        };

        let mut session = slot.lock().map_err(poisoned)?;
        session.emp_code = emp_code.to_string();
        mutate(&mut *session);
        Ok(session.clone())
    }

    fn device(&self, device_id: &str) -> EngineResult<Option<DeviceSession>> {
        let slot = self.devices.lock().map_err(poisoned)?.get(device_id).cloned();
        match slot {
            Some(slot) => Ok(Some(slot.lock().map_err(poisoned)?.clone())),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BreakCategory;
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn make_date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    fn make_instant(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, day, hour, 0, 0).unwrap()
    }

    fn make_employee(code: &str) -> Employee {
        Employee {
            emp_code: code.to_string(),
            name: code.to_string(),
            department: "Ops".to_string(),
            designation: "Agent".to_string(),
            monthly_salary: Decimal::new(50000, 0),
            shift_id: None,
            shift_code: Some("MORNING".to_string()),
        }
    }

    #[test]
    fn test_employee_lookup() {
        let store = MemoryStore::with_employees([make_employee("E-002"), make_employee("E-001")]);
        assert!(store.employee("E-001").unwrap().is_some());
        assert!(store.employee("E-404").unwrap().is_none());
        let codes: Vec<String> = store.employees().unwrap().into_iter().map(|e| e.emp_code).collect();
        assert_eq!(codes, vec!["E-001", "E-002"]);
    }

    #[test]
    fn test_punches_between_is_half_open_and_valid_only() {
        let store = MemoryStore::new();
        store.append_punch(PunchEvent::valid("E-001", make_instant(15, 9))).unwrap();
        store.append_punch(PunchEvent::valid("E-001", make_instant(15, 4))).unwrap();
        store.append_punch(PunchEvent::valid("E-001", make_instant(15, 12))).unwrap();
        let mut denied = PunchEvent::valid("E-001", make_instant(15, 5));
        denied.kind = crate::models::EventKind::Denied;
        store.append_punch(denied).unwrap();

        let punches = store.punches_between(make_instant(15, 4), make_instant(15, 12)).unwrap();
        let hours: Vec<DateTime<Utc>> = punches.iter().map(|p| p.event_time).collect();
        assert_eq!(hours, vec![make_instant(15, 4), make_instant(15, 9)]);
    }

    #[test]
    fn test_replace_removes_stale_shift() {
        let store = MemoryStore::new();
        store.upsert(AttendanceRecord::new(make_date(15), "E-001", "EVENING")).unwrap();
        store.upsert(AttendanceRecord::new(make_date(16), "E-001", "EVENING")).unwrap();
        store.replace(AttendanceRecord::new(make_date(15), "E-001", "MORNING")).unwrap();

        assert_eq!(store.record_count().unwrap(), 2);
        assert_eq!(store.record(make_date(15), "E-001").unwrap().unwrap().shift_code, "MORNING");
    }

    #[test]
    fn test_failure_injection_leaves_state_untouched() {
        let store = MemoryStore::new();
        store.upsert(AttendanceRecord::new(make_date(15), "E-001", "EVENING")).unwrap();
        store.fail_writes_for("E-001").unwrap();

        let result = store.replace(AttendanceRecord::new(make_date(15), "E-001", "MORNING"));
        assert!(matches!(result, Err(EngineError::Storage { .. })));
        assert_eq!(store.record(make_date(15), "E-001").unwrap().unwrap().shift_code, "EVENING");
    }

    #[test]
    fn test_records_between_filters_employee_and_range() {
        let store = MemoryStore::new();
        for day in [1, 10, 20] {
            store.upsert(AttendanceRecord::new(make_date(day), "E-001", "MORNING")).unwrap();
        }
        store.upsert(AttendanceRecord::new(make_date(10), "E-002", "MORNING")).unwrap();

        let records = store.records_between("E-001", make_date(1), make_date(10)).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(store.records_on(make_date(10)).unwrap().len(), 2);
    }

    #[test]
    fn test_break_lifecycle() {
        let store = MemoryStore::new();
        let mut interval = BreakInterval {
            id: Uuid::new_v4(),
            emp_code: "E-001".to_string(),
            business_date: make_date(15),
            shift_code: "MORNING".to_string(),
            category: BreakCategory::Pending,
            reason: None,
            started_at: make_instant(15, 7),
            ended_at: None,
            duration_minutes: None,
            allowed_minutes: None,
            exceeded_minutes: 0,
        };
        store.insert_break(interval.clone()).unwrap();
        assert!(store.open_break("E-001").unwrap().is_some());

        interval.ended_at = Some(make_instant(15, 8));
        store.update_break(interval.clone()).unwrap();
        assert!(store.open_break("E-001").unwrap().is_none());
        assert!(store.open_breaks().unwrap().is_empty());
        assert_eq!(store.breaks_for("E-001", make_date(15)).unwrap().len(), 1);

        interval.id = Uuid::new_v4();
        assert!(store.update_break(interval).is_err());
    }

    #[test]
    fn test_device_updates_are_serialized() {
        let store = Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        store
                            .update_device("dev-1", "E-001", &mut |s: &mut DeviceSession| s.consecutive_suspicious += 1)
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let session = store.device("dev-1").unwrap().unwrap();
        assert_eq!(session.consecutive_suspicious, 800);
    }

    fn make_break(emp_code: &str, hour: u32) -> BreakInterval {
        BreakInterval {
            id: Uuid::new_v4(),
            emp_code: emp_code.to_string(),
            business_date: make_date(15),
            shift_code: "MORNING".to_string(),
            category: BreakCategory::Pending,
            reason: None,
            started_at: make_instant(15, hour),
            ended_at: None,
            duration_minutes: None,
            allowed_minutes: None,
            exceeded_minutes: 0,
        }
    }

    #[test]
    fn test_apply_writes_replaces_and_deletes_together() {
        let store = MemoryStore::new();
        store.upsert(AttendanceRecord::new(make_date(16), "E-001", "NIGHT")).unwrap();

        store
            .apply_writes(vec![
                RecordWrite::Replace(AttendanceRecord::new(make_date(15), "E-001", "NIGHT")),
                RecordWrite::Delete {
                    business_date: make_date(16),
                    emp_code: "E-001".to_string(),
                },
            ])
            .unwrap();

        assert!(store.record(make_date(15), "E-001").unwrap().is_some());
        assert!(store.record(make_date(16), "E-001").unwrap().is_none());
    }

    #[test]
    fn test_apply_writes_failure_writes_nothing() {
        let store = MemoryStore::new();
        store.upsert(AttendanceRecord::new(make_date(16), "E-001", "NIGHT")).unwrap();
        store.fail_writes_for("E-001").unwrap();

        let result = store.apply_writes(vec![
            RecordWrite::Replace(AttendanceRecord::new(make_date(15), "E-001", "NIGHT")),
            RecordWrite::Delete {
                business_date: make_date(16),
                emp_code: "E-001".to_string(),
            },
        ]);
        assert!(matches!(result, Err(EngineError::Storage { .. })));
        assert_eq!(store.record_count().unwrap(), 1);
    }

    #[test]
    fn test_replace_open_swaps_open_break() {
        let store = MemoryStore::new();
        let first = make_break("E-001", 7);
        assert!(store.replace_open(None, first.clone()).unwrap());

        let mut closed = first.clone();
        closed.ended_at = Some(make_instant(15, 8));
        let second = make_break("E-001", 8);
        assert!(store.replace_open(Some(closed), second.clone()).unwrap());

        let open = store.open_break("E-001").unwrap().unwrap();
        assert_eq!(open.id, second.id);
        assert_eq!(store.breaks_for("E-001", make_date(15)).unwrap().len(), 2);
    }

    #[test]
    fn test_replace_open_refuses_stale_view() {
        let store = MemoryStore::new();
        store.insert_break(make_break("E-001", 7)).unwrap();

        // The caller believed nothing was open
        assert!(!store.replace_open(None, make_break("E-001", 8)).unwrap());
        assert_eq!(store.open_breaks().unwrap().len(), 1);
    }

    #[test]
    fn test_replace_open_failure_leaves_open_break() {
        let store = MemoryStore::new();
        let first = make_break("E-001", 7);
        store.insert_break(first.clone()).unwrap();
        store.fail_writes_for("E-001").unwrap();

        let mut closed = first.clone();
        closed.ended_at = Some(make_instant(15, 8));
        assert!(store.replace_open(Some(closed), make_break("E-001", 8)).is_err());
        assert_eq!(store.open_break("E-001").unwrap(), Some(first));
    }
}
