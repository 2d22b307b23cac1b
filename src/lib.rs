//! Sheetline library
//!
//! A small HTTP service that reads a timeline from a Google spreadsheet,
//! keeps the latest good copy in memory and renders it into a page.

pub mod cache;
pub mod cli;
pub mod data;
pub mod shutdown;
pub mod web;
