//! Employee model.
//!
//! Employees are owned by HR management; the engine only reads them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::shift::ShiftRef;

/// An employee as seen by the attendance engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    /// Unique employee code (badge / payroll code).
    pub emp_code: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Department name.
    #[serde(default)]
    pub department: String,
    /// Designation / job title.
    #[serde(default)]
    pub designation: String,
    /// Monthly gross salary.
    #[serde(default)]
    pub monthly_salary: Decimal,
    /// Direct reference to the assigned shift's catalog id.
    #[serde(default)]
    pub shift_id: Option<String>,
    /// Denormalized shift code, possibly decorated for display.
    #[serde(default)]
    pub shift_code: Option<String>,
}

impl Employee {
    /// Returns the employee's normalized shift references, most direct
    /// first: the catalog id, then the denormalized code. The code still
    /// counts when the id points at a shift the catalog no longer has.
    ///
    /// # Examples
    ///
    /// ```
    /// use attendance_engine::models::{Employee, ShiftRef};
    /// use rust_decimal::Decimal;
    ///
    /// let employee = Employee {
    ///     emp_code: "E-001".to_string(),
    ///     name: "Ayesha".to_string(),
    ///     department: "Support".to_string(),
    ///     designation: "Agent".to_string(),
    ///     monthly_salary: Decimal::new(60000, 0),
    ///     shift_id: Some("3".to_string()),
    ///     shift_code: Some("NIGHT".to_string()),
    /// };
    /// assert_eq!(
    ///     employee.shift_refs(),
    ///     vec![ShiftRef::Id("3".to_string()), ShiftRef::Code("NIGHT".to_string())]
    /// );
    /// ```
    pub fn shift_refs(&self) -> Vec<ShiftRef> {
        let direct = self
            .shift_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| ShiftRef::Id(id.to_string()));
        let code = self.shift_code.as_deref().and_then(ShiftRef::from_code_text);
        direct.into_iter().chain(code).collect()
    }
}
