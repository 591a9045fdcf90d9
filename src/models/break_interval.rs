//! Break (idle) intervals reported by the desktop agent.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

/// The closed set of break categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BreakCategory {
    /// Opened by the agent, reason not yet submitted.
    Pending,
    /// Work-related absence from the desk; counted as productive.
    Official,
    /// Personal break.
    General,
    /// Prayer break.
    Namaz,
}

impl BreakCategory {
    /// Maps free text, including legacy reasons, onto the closed set.
    ///
    /// # Examples
    ///
    /// ```
    /// use attendance_engine::models::BreakCategory;
    ///
    /// assert_eq!(BreakCategory::normalize("Personal Break").unwrap(), BreakCategory::General);
    /// assert_eq!(BreakCategory::normalize(" namaz ").unwrap(), BreakCategory::Namaz);
    /// assert!(BreakCategory::normalize("nap").is_err());
    /// ```
    pub fn normalize(raw: &str) -> EngineResult<Self> {
        let folded = raw.trim().to_ascii_lowercase();
        let category = match folded.as_str() {
            "pending" => BreakCategory::Pending,
            "official" | "official work" | "meeting" => BreakCategory::Official,
            "general" | "personal break" | "personal" | "others" | "other" | "break"
            | "short break" => BreakCategory::General,
            "namaz" | "namaz break" | "prayer" | "salah" => BreakCategory::Namaz,
            _ => {
                return Err(EngineError::InvalidBreakCategory {
                    category: raw.to_string(),
                });
            }
        };
        Ok(category)
    }

    /// Returns true if time in this category counts as productive.
    pub fn is_productive(&self) -> bool {
        *self == BreakCategory::Official
    }
}

impl std::fmt::Display for BreakCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            BreakCategory::Pending => "Pending",
            BreakCategory::Official => "Official",
            BreakCategory::General => "General",
            BreakCategory::Namaz => "Namaz",
        };
        write!(f, "{}", label)
    }
}

/// A single break interval. `ended_at == None` means the break is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakInterval {
    /// Unique identifier.
    pub id: Uuid,
    /// The employee code.
    pub emp_code: String,
    /// The business date of the owning shift occurrence.
    pub business_date: NaiveDate,
    /// The owning shift code, or "Unknown".
    pub shift_code: String,
    /// Break category.
    pub category: BreakCategory,
    /// Free-text reason typed by the employee.
    #[serde(default)]
    pub reason: Option<String>,
    /// Start of the break.
    pub started_at: DateTime<Utc>,
    /// End of the break, if closed.
    pub ended_at: Option<DateTime<Utc>>,
    /// Rounded whole minutes, set on close.
    pub duration_minutes: Option<i64>,
    /// Category allowance; `None` means unbounded.
    pub allowed_minutes: Option<i64>,
    /// Minutes beyond the allowance.
    #[serde(default)]
    pub exceeded_minutes: i64,
}

impl BreakInterval {
    /// Returns true while the break has not been closed.
    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_legacy_aliases() {
        assert_eq!(
            BreakCategory::normalize("Others").unwrap(),
            BreakCategory::General
        );
        assert_eq!(
            BreakCategory::normalize("OFFICIAL").unwrap(),
            BreakCategory::Official
        );
        assert_eq!(
            BreakCategory::normalize("Prayer").unwrap(),
            BreakCategory::Namaz
        );
        assert_eq!(
            BreakCategory::normalize("Pending").unwrap(),
            BreakCategory::Pending
        );
    }

    #[test]
    fn test_normalize_rejects_unknown_category() {
        match BreakCategory::normalize("smoke") {
            Err(EngineError::InvalidBreakCategory { category }) => assert_eq!(category, "smoke"),
            other => panic!("Expected InvalidBreakCategory, got {:?}", other),
        }
        assert!(BreakCategory::normalize("").is_err());
    }

    #[test]
    fn test_only_official_is_productive() {
        assert!(BreakCategory::Official.is_productive());
        assert!(!BreakCategory::General.is_productive());
        assert!(!BreakCategory::Namaz.is_productive());
        assert!(!BreakCategory::Pending.is_productive());
    }
}
