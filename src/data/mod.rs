//! Core data models for the timeline service
//!
//! This module contains the domain types served to the page (`Timeline`,
//! `Event`, `Era`), the row parser that builds them from spreadsheet rows,
//! the fetcher that assembles complete snapshots, and the Google Sheets
//! client the fetcher reads from.

pub mod auth;
pub mod date;
pub mod fetch;
pub mod rows;
pub mod sheets;

pub use date::{Date, DateError};
pub use fetch::{Connector, FetchConfig, FetchError, FetchErrorKind, Fetcher, Row, SheetSource};
pub use rows::{parse_era_row, parse_event_row, Column, ParseCause, ParseError};
pub use sheets::GoogleSheets;

use serde::Serialize;

/// Title and optional body of a timeline entry
///
/// Both strings may contain HTML markup; the page renders them as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Text {
    /// Headline shown for the entry
    #[serde(rename = "headline")]
    pub title: String,
    /// Longer description, omitted from the payload when absent
    #[serde(rename = "text", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A point-in-time or interval occurrence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    /// When the event starts
    #[serde(rename = "start_date")]
    pub start: Date,
    /// When the event ends, if it spans an interval
    #[serde(rename = "end_date", skip_serializing_if = "Option::is_none")]
    pub end: Option<Date>,
    /// Headline and description
    pub text: Text,
    /// Group label used to stack related events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// A span with a mandatory start and end
///
/// Eras never carry a description or group; `text.description` is always `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Era {
    /// When the era starts
    #[serde(rename = "start_date")]
    pub start: Date,
    /// When the era ends
    #[serde(rename = "end_date")]
    pub end: Date,
    /// Headline of the era
    pub text: Text,
}

/// The complete set of events and eras from one fetch
///
/// Both lists keep the order of the source rows, which is the display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Timeline {
    pub events: Vec<Event>,
    pub eras: Vec<Era>,
}
