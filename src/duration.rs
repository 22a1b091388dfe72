use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A parsed relative offset, measured in whole calendar days.
///
/// Values only come out of [`parse`]; the template keeps the raw text and
/// re-parses it on every expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Duration(i64);

impl Duration {
    pub const SAME_DAY: Duration = Duration(0);

    pub fn days(self) -> i64 {
        self.0
    }

    /// Canonical human form, e.g. `same day`, `2 weeks`, `10 days`.
    pub fn describe(self) -> String {
        match self.0 {
            0 => "same day".to_string(),
            1 => "next day".to_string(),
            days if days > 0 && days % 365 == 0 => plural(days / 365, "year"),
            days if days > 0 && days % 30 == 0 => plural(days / 30, "month"),
            days if days > 0 && days % 7 == 0 => plural(days / 7, "week"),
            days => plural(days, "day"),
        }
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 || count == -1 {
        format!("{count} {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

/// Raw offset text exactly as the user typed it into the template editor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelativeOffset(String);

impl RelativeOffset {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn parse(&self) -> Result<Duration, ParseError> {
        parse(&self.0)
    }
}

impl From<&str> for RelativeOffset {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RelativeOffset {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for RelativeOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseError {
    #[error("offset is empty")]
    Empty,
    #[error("unrecognized offset '{input}' (expected e.g. 'same day', 'next day', '3 days', '2 weeks')")]
    Unrecognized { input: String },
}

/// Unit multipliers, in days. A month is a fixed 30 days.
const UNITS: [(&str, i64); 8] = [
    ("day", 1),
    ("days", 1),
    ("week", 7),
    ("weeks", 7),
    ("month", 30),
    ("months", 30),
    ("year", 365),
    ("years", 365),
];

/// Parse a relative offset expression into a day count.
///
/// Accepted forms, tried in order:
/// 1. the keywords `same day` (0) and `next day` (1), case-insensitive;
/// 2. `<integer> <unit>` where unit is day(s), week(s), month(s) or year(s);
/// 3. a bare integer, read as days.
///
/// Signs are accepted so negative input reaches the validator. Numbers too
/// large for `i64` saturate and are left for the validator to reject.
pub fn parse(text: &str) -> Result<Duration, ParseError> {
    let normalized = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase();

    if normalized.is_empty() {
        return Err(ParseError::Empty);
    }

    match normalized.as_str() {
        "same day" => return Ok(Duration::SAME_DAY),
        "next day" => return Ok(Duration(1)),
        _ => {}
    }

    let unrecognized = || ParseError::Unrecognized {
        input: text.trim().to_string(),
    };

    let mut tokens = normalized.split(' ');
    let amount = tokens.next().and_then(parse_integer).ok_or_else(unrecognized)?;
    let multiplier = match (tokens.next(), tokens.next()) {
        (None, _) => 1,
        (Some(unit), None) => UNITS
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, days)| *days)
            .ok_or_else(unrecognized)?,
        (Some(_), Some(_)) => return Err(unrecognized()),
    };

    Ok(Duration(amount.saturating_mul(multiplier)))
}

fn parse_integer(token: &str) -> Option<i64> {
    let (negative, digits) = match token.as_bytes().first()? {
        b'-' => (true, &token[1..]),
        b'+' => (false, &token[1..]),
        _ => (false, token),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let magnitude = digits.parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}
