//! Row parser for the `events` and `eras` sheets
//!
//! Turns one untyped spreadsheet row into an [`Event`] or [`Era`]. The
//! source omits trailing empty cells, so rows are often shorter than the
//! range they came from; a short row only ever means "these optional
//! columns are empty", never "this row is malformed".

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use super::{Date, DateError, Era, Event, Text};

/// Columns of the timeline sheets, in source order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Start,
    End,
    Title,
    Description,
    Group,
}

impl Column {
    /// Zero-based position of the column within a row
    pub fn index(self) -> usize {
        match self {
            Column::Start => 0,
            Column::End => 1,
            Column::Title => 2,
            Column::Description => 3,
            Column::Group => 4,
        }
    }

    /// Field name used in error messages
    pub fn as_str(self) -> &'static str {
        match self {
            Column::Start => "start",
            Column::End => "end",
            Column::Title => "title",
            Column::Description => "description",
            Column::Group => "group",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a field was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCause {
    /// Required cell is absent or empty
    #[error("missing")]
    Missing,

    /// Cell holds a number, boolean or other non-text value
    #[error("expected text, got {0}")]
    NotText(String),

    /// Date cell does not match `YYYY-M`
    #[error(transparent)]
    Date(#[from] DateError),
}

/// A rejected row, identified by its 1-based line in the sheet
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {field}: {cause}")]
pub struct ParseError {
    /// Sheet line of the offending row (the header is line 1)
    pub line: usize,
    /// Column that failed
    pub field: Column,
    /// What was wrong with it
    pub cause: ParseCause,
}

/// How a single column of a row looks before any field rules apply
#[derive(Debug, Clone, Copy, PartialEq)]
enum Cell<'a> {
    /// Row ends before this column
    Missing,
    /// Column is present but holds an empty string or null
    Blank,
    /// Column holds non-empty text
    Text(&'a str),
    /// Column holds something other than text
    Invalid(&'a Value),
}

impl<'a> Cell<'a> {
    fn at(cells: &'a [Value], column: Column) -> Self {
        match cells.get(column.index()) {
            None => Cell::Missing,
            Some(Value::Null) => Cell::Blank,
            Some(Value::String(s)) if s.is_empty() => Cell::Blank,
            Some(Value::String(s)) => Cell::Text(s),
            Some(other) => Cell::Invalid(other),
        }
    }
}

/// Field-level reader bound to one row and its line number
struct RowReader<'a> {
    cells: &'a [Value],
    line: usize,
}

impl<'a> RowReader<'a> {
    fn error(&self, field: Column, cause: ParseCause) -> ParseError {
        ParseError {
            line: self.line,
            field,
            cause,
        }
    }

    /// Text of a column that must be text when present
    fn strict_text(&self, column: Column) -> Result<Option<&'a str>, ParseError> {
        match Cell::at(self.cells, column) {
            Cell::Missing | Cell::Blank => Ok(None),
            Cell::Text(s) => Ok(Some(s)),
            Cell::Invalid(v) => Err(self.error(column, ParseCause::NotText(v.to_string()))),
        }
    }

    /// Text of a free-form optional column; anything but non-empty text is `None`
    fn optional_text(&self, column: Column) -> Option<&'a str> {
        match Cell::at(self.cells, column) {
            Cell::Text(s) => Some(s),
            Cell::Missing | Cell::Blank | Cell::Invalid(_) => None,
        }
    }

    fn required_text(&self, column: Column) -> Result<&'a str, ParseError> {
        self.strict_text(column)?
            .ok_or_else(|| self.error(column, ParseCause::Missing))
    }

    fn optional_date(&self, column: Column) -> Result<Option<Date>, ParseError> {
        self.strict_text(column)?
            .map(|s| s.parse().map_err(|e: DateError| self.error(column, e.into())))
            .transpose()
    }

    fn required_date(&self, column: Column) -> Result<Date, ParseError> {
        self.optional_date(column)?
            .ok_or_else(|| self.error(column, ParseCause::Missing))
    }
}

/// Parses one row of the `events` sheet.
///
/// # Arguments
/// * `cells` - Cell values of the row, possibly shorter than five columns
/// * `line` - 1-based sheet line of the row, used in errors
///
/// # Returns
/// * `Ok(Event)` when start and title are present and the date cells are well-formed
/// * `Err(ParseError)` naming the first offending column otherwise
pub fn parse_event_row(cells: &[Value], line: usize) -> Result<Event, ParseError> {
    let row = RowReader { cells, line };

    let start = row.required_date(Column::Start)?;
    let end = row.optional_date(Column::End)?;
    let title = row.required_text(Column::Title)?;
    let description = row.optional_text(Column::Description);
    let group = row.optional_text(Column::Group);

    Ok(Event {
        start,
        end,
        text: Text {
            title: title.to_string(),
            description: description.map(str::to_string),
        },
        group: group.map(str::to_string),
    })
}

/// Parses one row of the `eras` sheet.
///
/// Same as [`parse_event_row`] for start and title, but the end date is
/// required and anything past the title column is ignored.
pub fn parse_era_row(cells: &[Value], line: usize) -> Result<Era, ParseError> {
    let row = RowReader { cells, line };

    let start = row.required_date(Column::Start)?;
    let end = row.required_date(Column::End)?;
    let title = row.required_text(Column::Title)?;

    Ok(Era {
        start,
        end,
        text: Text {
            title: title.to_string(),
            description: None,
        },
    })
}
