//! Shared library for Minact (meeting minutes to action items)
//!
//! Holds the pieces every Minact service needs: the common error type,
//! configuration resolution, database initialization, persisted models and
//! the closed task-status / effort-tag vocabularies.

pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod time;
pub mod types;

pub use error::{Error, Result};
