//! Command-line interface parsing for the timeline service
//!
//! Every flag can also be set through the environment. The credentials blob
//! is taken from the environment only and never from argv. Credentials and
//! spreadsheet id are read here but only demanded by the fetcher, so a
//! missing value surfaces as a configuration error naming the variable.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::data::fetch::{FetchConfig, DEFAULT_FETCH_TIMEOUT, SPREADSHEET_ID_ENV};

/// Port the service listens on unless told otherwise
pub const DEFAULT_PORT: u16 = 1999;

/// Seconds allowed for one fetch unless told otherwise
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = DEFAULT_FETCH_TIMEOUT.as_secs();

/// Time a request may run beyond the fetch timeout before it is cut off
pub const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_secs(5);

/// Seconds in-flight requests get to finish after a shutdown signal
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 5;

/// Error types for CLI argument validation
#[derive(Debug, Error)]
pub enum CliError {
    /// A timeout flag was set to zero
    #[error("--{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

/// Sheetline - serve a timeline kept in a Google spreadsheet
#[derive(Parser, Debug)]
#[command(name = "sheetline")]
#[command(about = "Serve a timeline page backed by a Google spreadsheet")]
#[command(version)]
#[command(after_help = "Environment:\n  GOOGLE_JSON_CREDENTIALS  Service-account credentials (JSON key file contents)")]
pub struct Cli {
    /// Address to bind
    #[arg(long, env = "SHEETLINE_BIND", default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Port to listen on
    #[arg(short, long, env = "SHEETLINE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Identifier of the spreadsheet holding the `events` and `eras` sheets
    #[arg(long, env = SPREADSHEET_ID_ENV)]
    pub spreadsheet_id: Option<String>,

    /// Seconds allowed for fetching both sheets
    #[arg(long, env = "SHEETLINE_FETCH_TIMEOUT_SECS", default_value_t = DEFAULT_FETCH_TIMEOUT_SECS)]
    pub fetch_timeout_secs: u64,

    /// Seconds in-flight requests get to finish on shutdown
    #[arg(long, env = "SHEETLINE_SHUTDOWN_TIMEOUT_SECS", default_value_t = DEFAULT_SHUTDOWN_TIMEOUT_SECS)]
    pub shutdown_timeout_secs: u64,
}

/// Runtime settings derived from CLI arguments
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Socket address to listen on
    pub addr: SocketAddr,
    /// Settings handed to the fetcher
    pub fetch: FetchConfig,
    /// Upper bound on handling one request, refreshes included
    pub request_timeout: Duration,
    /// Drain deadline after a termination signal
    pub shutdown_timeout: Duration,
}

impl ServiceConfig {
    /// Creates a ServiceConfig from parsed CLI arguments.
    ///
    /// # Arguments
    /// * `cli` - The parsed CLI struct
    /// * `credentials` - Credentials blob read from the environment, if set
    ///
    /// # Returns
    /// * `Ok(ServiceConfig)` with the listen address and timeouts resolved
    /// * `Err(CliError)` if a timeout is zero
    pub fn from_cli(cli: &Cli, credentials: Option<String>) -> Result<Self, CliError> {
        if cli.fetch_timeout_secs == 0 {
            return Err(CliError::ZeroTimeout("fetch-timeout-secs"));
        }
        if cli.shutdown_timeout_secs == 0 {
            return Err(CliError::ZeroTimeout("shutdown-timeout-secs"));
        }

        let fetch_timeout = Duration::from_secs(cli.fetch_timeout_secs);
        Ok(ServiceConfig {
            addr: SocketAddr::new(cli.bind, cli.port),
            fetch: FetchConfig {
                credentials,
                spreadsheet_id: cli.spreadsheet_id.clone(),
                timeout: fetch_timeout,
            },
            request_timeout: fetch_timeout + REQUEST_TIMEOUT_MARGIN,
            shutdown_timeout: Duration::from_secs(cli.shutdown_timeout_secs),
        })
    }
}
