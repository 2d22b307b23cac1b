//! Year-month dates as written in the spreadsheet
//!
//! Dates are only ever produced by parsing the `YYYY-M` cell format; there is
//! no other way to construct one.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// Errors produced when a date cell does not match `YYYY-M`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    /// Text is not four digits, a dash, and one or two digits
    #[error("expected YYYY-M, got {0:?}")]
    Format(String),

    /// Month is outside 1..=12
    #[error("month out of range in {0:?}")]
    MonthOutOfRange(String),
}

/// A calendar month, e.g. March 2024
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Date {
    year: i32,
    month: u32,
}

impl Date {
    /// Four-digit year
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Month number, 1 through 12
    pub fn month(&self) -> u32 {
        self.month
    }
}

impl FromStr for Date {
    type Err = DateError;

    /// Parses `YYYY-M` or `YYYY-MM`, e.g. `"2024-3"` or `"2024-03"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let format_err = || DateError::Format(s.to_string());

        let (year, month) = s.split_once('-').ok_or_else(format_err)?;
        if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format_err());
        }
        if month.is_empty() || month.len() > 2 || !month.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format_err());
        }

        let year: i32 = year.parse().map_err(|_| format_err())?;
        let month: u32 = month.parse().map_err(|_| format_err())?;
        if !(1..=12).contains(&month) {
            return Err(DateError::MonthOutOfRange(s.to_string()));
        }

        Ok(Date { year, month })
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{}", self.year, self.month)
    }
}
