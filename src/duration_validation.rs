use crate::duration::{self, Duration, ParseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ten years. Anything larger is treated as a typo, not a plan.
pub const MAX_OFFSET_DAYS: i64 = 3650;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetLimits {
    pub max_days: i64,
}

impl Default for OffsetLimits {
    fn default() -> Self {
        Self {
            max_days: MAX_OFFSET_DAYS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("offset of {days} days moves backwards from its anchor")]
    Negative { days: i64 },
    #[error("offset of {days} days exceeds the {max}-day limit")]
    Unrealistic { days: i64, max: i64 },
}

/// Either half of offset ingestion can fail; callers usually only care which field.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(untagged)]
pub enum OffsetError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub fn validate(duration: Duration) -> Result<Duration, ValidationError> {
    validate_with(duration, OffsetLimits::default())
}

pub fn validate_with(duration: Duration, limits: OffsetLimits) -> Result<Duration, ValidationError> {
    let days = duration.days();
    if days < 0 {
        return Err(ValidationError::Negative { days });
    }
    if days > limits.max_days {
        return Err(ValidationError::Unrealistic {
            days,
            max: limits.max_days,
        });
    }
    Ok(duration)
}

/// Entry point for every offset coming out of a template editor.
pub fn parse_and_validate(text: &str) -> Result<Duration, OffsetError> {
    parse_and_validate_with(text, OffsetLimits::default())
}

pub fn parse_and_validate_with(text: &str, limits: OffsetLimits) -> Result<Duration, OffsetError> {
    let parsed = duration::parse(text)?;
    Ok(validate_with(parsed, limits)?)
}
