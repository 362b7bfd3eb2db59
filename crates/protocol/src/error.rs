//! Protocol error types.

use thiserror::Error;

/// Errors that can occur during protocol parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Unexpected end of data")]
    UnexpectedEof,

    #[error(
        "Malformed snapshot: {section} section declares {declared} entries ({needed} bytes) but only {available} bytes remain"
    )]
    MalformedSnapshot {
        section: &'static str,
        declared: u16,
        needed: usize,
        available: usize,
    },

    #[error("Too many entries: {section} section has {count}, at most 65535 fit")]
    TooManyEntries { section: &'static str, count: usize },

    #[error("Invalid map data: {0}")]
    InvalidMap(String),
}
