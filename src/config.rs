use crate::calendar::WorkCalendar;
use crate::duration_validation::{MAX_OFFSET_DAYS, OffsetLimits};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound for a configured `max_offset_days`: a century.
pub const MAX_CONFIGURABLE_OFFSET_DAYS: i64 = 36_500;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("max_offset_days must be between 0 and {max}, got {found}")]
    OffsetLimitOutOfRange { found: i64, max: i64 },
}

/// How a validated day count is turned into a date.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DayCounting {
    /// Plain calendar-day addition; weekends and holidays are not skipped.
    #[default]
    Calendar,
    /// Only days the calendar marks available are counted.
    WorkingDays { calendar: WorkCalendar },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpansionConfig {
    #[serde(default = "default_max_offset_days")]
    pub max_offset_days: i64,
    #[serde(default)]
    pub day_counting: DayCounting,
}

fn default_max_offset_days() -> i64 {
    MAX_OFFSET_DAYS
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            max_offset_days: default_max_offset_days(),
            day_counting: DayCounting::default(),
        }
    }
}

impl ExpansionConfig {
    pub fn working_days(calendar: WorkCalendar) -> Self {
        Self {
            day_counting: DayCounting::WorkingDays { calendar },
            ..Self::default()
        }
    }

    /// Configs read from outside the program are checked before use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0..=MAX_CONFIGURABLE_OFFSET_DAYS).contains(&self.max_offset_days) {
            return Err(ConfigError::OffsetLimitOutOfRange {
                found: self.max_offset_days,
                max: MAX_CONFIGURABLE_OFFSET_DAYS,
            });
        }
        Ok(())
    }

    pub fn limits(&self) -> OffsetLimits {
        OffsetLimits {
            max_days: self.max_offset_days,
        }
    }
}
