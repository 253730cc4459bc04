// src/error.rs
//! Error taxonomy surfaced to the user. None of these are fatal: every variant
//! leaves the in-memory document in a defined state.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CvError {
    #[error("Invalid import: {0}")]
    InvalidImport(String),

    #[error("Unknown template: {0}. Use elegance, bold, minimal, creative or executive")]
    UnknownTemplate(String),

    #[error("Unknown field '{field}' for {section}")]
    UnknownField { section: String, field: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Sign in required: {0}")]
    Unauthenticated(&'static str),

    #[error("CV is not public, toggle visibility first")]
    NotPublic,

    #[error("Fill in at least a first or last name before printing")]
    MissingName,

    #[error("Not saved: {0}")]
    Persistence(String),

    #[error("Remote API error: {0}")]
    Remote(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("Print error: {0}")]
    Print(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CvError {
    /// Wrap an adapter error, keeping its context chain in the message
    pub fn persistence(err: anyhow::Error) -> Self {
        Self::Persistence(format!("{:#}", err))
    }

    pub fn remote(err: anyhow::Error) -> Self {
        Self::Remote(format!("{:#}", err))
    }
}
