//! Error types for icsview.

use thiserror::Error;

/// Errors that can occur while loading a feed or resolving its events.
///
/// Cloneable so that a failed fetch can be handed to every caller that was
/// waiting on it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IcsViewError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to fetch calendar feed: {0}")]
    Fetch(String),

    #[error("ICS parse error: {0}")]
    IcsParse(String),

    #[error("Invalid recurrence rule: {0}")]
    InvalidRule(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

/// Result type alias for icsview operations.
pub type IcsViewResult<T> = Result<T, IcsViewError>;
