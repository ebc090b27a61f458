//! Common types and utilities shared across Insight crates.
//!
//! This crate defines the extraction data model, the operation log, export
//! helpers, the busy guard used to serialise user-triggered runs, and the
//! shared error type. It stays dependency-light so every other crate in the
//! workspace can depend on it.
//!
//! # Overview
//!
//! - [`model`]: `ExtractionBatch`, `ExtractionResult`, `Profile` and friends
//! - [`activity`]: append-only operation log with JSON export
//! - [`export`]: timestamped, pretty-printed JSON export files
//! - [`busy`]: re-entrancy guard for extraction/analysis runs
//! - [`observability`]: centralised tracing/logging initialisation
//! - [`InsightError`] and [`Result`]: shared error handling
//!
//! # Examples
//!
//! ```rust
//! use insight_common::activity::{ActivityLog, LogLevel};
//!
//! let mut log = ActivityLog::new();
//! log.info("extraction started");
//! log.error("invalid URL format: nope");
//! assert_eq!(log.len(), 2);
//! assert_eq!(log.entries().next().unwrap().level, LogLevel::Error);
//! ```
pub mod activity;
pub mod busy;
pub mod export;
pub mod model;
pub mod observability;

/// Error types shared by the Insight crates.
#[derive(thiserror::Error, Debug)]
pub enum InsightError {
    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The key-value store could not be read or written.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A run of the given kind is already in progress.
    #[error("{0} already in progress")]
    Busy(&'static str),

    /// Writing or reading an export file failed.
    #[error("Export I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenient alias for results that use [`InsightError`].
pub type Result<T> = std::result::Result<T, InsightError>;
