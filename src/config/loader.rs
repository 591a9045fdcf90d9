//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading the engine
//! configuration from YAML files.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::models::{Employee, ShiftCatalog, ShiftDefinition};

use super::types::{EngineConfig, Policy, RosterConfig, ShiftsConfig};

/// Loads and provides access to the engine configuration.
///
/// # Directory Structure
///
/// ```text
/// config/default/
/// ├── policy.yaml      # Offset, windows, deduction and break policy
/// ├── shifts.yaml      # Shift catalog, in tie-break order
/// └── employees.yaml   # Optional roster for the in-memory directory
/// ```
///
/// # Example
///
/// ```no_run
/// use attendance_engine::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/default")?;
/// let night = loader.get_shift("NIGHT")?;
/// println!("Night shift starts at {}", night.start_time);
/// # Ok::<(), attendance_engine::error::EngineError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: EngineConfig,
    roster: Vec<Employee>,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// Returns an error if a required file is missing, contains invalid
    /// YAML, or holds values that fail validation.
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let policy_path = path.join("policy.yaml");
        let policy = Self::load_yaml::<Policy>(&policy_path)?;
        policy
            .validate()
            .map_err(|message| EngineError::ConfigParseError {
                path: policy_path.display().to_string(),
                message,
            })?;

        let shifts_path = path.join("shifts.yaml");
        let shifts = Self::load_yaml::<ShiftsConfig>(&shifts_path)?;
        let catalog =
            ShiftCatalog::new(shifts.shifts).map_err(|message| EngineError::ConfigParseError {
                path: shifts_path.display().to_string(),
                message,
            })?;

        let roster_path = path.join("employees.yaml");
        let roster = if roster_path.exists() {
            Self::load_yaml::<RosterConfig>(&roster_path)?.employees
        } else {
            Vec::new()
        };

        debug!(
            shifts = catalog.len(),
            employees = roster.len(),
            offset = %policy.utc_offset,
            "Loaded engine configuration"
        );

        Ok(Self {
            config: EngineConfig::new(policy, catalog),
            roster,
        })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Returns the underlying engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the roster loaded from `employees.yaml`, if any.
    pub fn roster(&self) -> &[Employee] {
        &self.roster
    }

    /// Splits the loader into configuration and roster.
    pub fn into_parts(self) -> (EngineConfig, Vec<Employee>) {
        (self.config, self.roster)
    }

    /// Gets a shift by its code.
    pub fn get_shift(&self, code: &str) -> EngineResult<&ShiftDefinition> {
        self.config
            .catalog()
            .by_code(code)
            .ok_or_else(|| EngineError::ShiftNotFound {
                shift: code.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn config_path() -> &'static str {
        "./config/default"
    }

    fn write_dir(name: &str, files: &[(&str, &str)]) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "attendance-engine-{}-{}",
            name,
            uuid::Uuid::new_v4()
        ));
        fs::create_dir_all(&dir).unwrap();
        for (file, content) in files {
            fs::write(dir.join(file), content).unwrap();
        }
        dir
    }

    const POLICY: &str = "utc_offset: \"+05:00\"\n";
    const SHIFTS: &str = r#"
shifts:
  - code: MORNING
    start_time: "09:00"
    end_time: "18:00"
"#;

    #[test]
    fn test_load_valid_configuration() {
        let result = ConfigLoader::load(config_path());
        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());

        let loader = result.unwrap();
        assert_eq!(loader.config().offset().to_string(), "+05:00");
        assert_eq!(loader.config().catalog().len(), 3);
        assert!(!loader.roster().is_empty());
    }

    #[test]
    fn test_get_shift() {
        let loader = ConfigLoader::load(config_path()).unwrap();

        let night = loader.get_shift("NIGHT").unwrap();
        assert!(night.crosses_midnight);
        assert_eq!(night.grace_period_minutes, 20);
    }

    #[test]
    fn test_get_shift_unknown_returns_error() {
        let loader = ConfigLoader::load(config_path()).unwrap();

        match loader.get_shift("GRAVEYARD") {
            Err(EngineError::ShiftNotFound { shift }) => assert_eq!(shift, "GRAVEYARD"),
            other => panic!("Expected ShiftNotFound error, got {:?}", other),
        }
    }

    #[test]
    fn test_policy_constants_loaded() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let deduction = &loader.config().policy().deduction;

        assert_eq!(deduction.milestone_every, 3);
        assert_eq!(deduction.per_minute_rate, Decimal::new(7, 3));
    }

    #[test]
    fn test_load_missing_directory_returns_error() {
        let result = ConfigLoader::load("/nonexistent/path");

        match result {
            Err(EngineError::ConfigNotFound { path }) => {
                assert!(path.contains("policy.yaml"));
            }
            _ => panic!("Expected ConfigNotFound error"),
        }
    }

    #[test]
    fn test_roster_is_optional() {
        let dir = write_dir("no-roster", &[("policy.yaml", POLICY), ("shifts.yaml", SHIFTS)]);
        let loader = ConfigLoader::load(&dir).unwrap();
        assert!(loader.roster().is_empty());
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_inconsistent_crossing_flag_is_rejected() {
        let shifts = r#"
shifts:
  - code: NIGHT
    start_time: "22:00"
    end_time: "06:00"
"#;
        let dir = write_dir("bad-shift", &[("policy.yaml", POLICY), ("shifts.yaml", shifts)]);

        match ConfigLoader::load(&dir) {
            Err(EngineError::ConfigParseError { path, message }) => {
                assert!(path.ends_with("shifts.yaml"));
                assert!(message.contains("crossing midnight"));
            }
            other => panic!("Expected ConfigParseError, got {:?}", other),
        }
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_bad_offset_is_rejected() {
        let dir = write_dir(
            "bad-offset",
            &[("policy.yaml", "utc_offset: \"PKT\"\n"), ("shifts.yaml", SHIFTS)],
        );
        assert!(matches!(
            ConfigLoader::load(&dir),
            Err(EngineError::ConfigParseError { .. })
        ));
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_out_of_range_policy_is_rejected() {
        let policy = "utc_offset: \"+05:00\"\ndeduction:\n  milestone_every: 0\n";
        let dir = write_dir("bad-policy", &[("policy.yaml", policy), ("shifts.yaml", SHIFTS)]);
        match ConfigLoader::load(&dir) {
            Err(EngineError::ConfigParseError { message, .. }) => {
                assert!(message.contains("milestone_every"));
            }
            other => panic!("Expected ConfigParseError, got {:?}", other),
        }
        fs::remove_dir_all(dir).ok();
    }
}
