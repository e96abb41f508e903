//! Reconcile a `brew.sh` manifest (formulae, casks and App Store apps) with
//! what Homebrew and `mas` report as installed.

pub mod audit;
pub mod classify;
pub mod cleanup;
pub mod collector;
pub mod config;
pub mod error;
pub mod gaps;
pub mod logging;
pub mod manifest;
pub mod mutate;
pub mod output;
pub mod preflight;
pub mod report;
pub mod review;
pub mod scan;

pub use error::{AuditError, QueryError};
