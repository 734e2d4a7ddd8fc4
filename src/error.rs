//! Error taxonomy for the marketplace data layer.

use std::fmt;
use thiserror::Error;

/// Unified error type for backend operations and domain services.
#[derive(Error, Debug)]
pub enum Error {
    /// Network or HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// A mutation was attempted without an active session
    #[error("authentication required")]
    AuthenticationRequired,

    /// A uniqueness constraint was violated (SQLSTATE 23505)
    #[error("conflict: {0}")]
    Conflict(String),

    /// A rental status change that the state machine forbids
    #[error("invalid rental transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// A listing draft that cannot be submitted (missing photo or title)
    #[error("invalid listing: {0}")]
    InvalidListing(String),

    /// Authentication service errors
    #[error("auth error: {0}")]
    Auth(String),

    /// Database query errors
    #[error("database error: {0}")]
    Database(String),

    /// Storage errors
    #[error("storage error: {0}")]
    Storage(String),

    /// Change feed errors
    #[error("realtime error: {0}")]
    Realtime(String),
}

impl Error {
    /// Create a new authentication error
    pub fn auth<T: fmt::Display>(msg: T) -> Self {
        Error::Auth(msg.to_string())
    }

    /// Create a new database error
    pub fn database<T: fmt::Display>(msg: T) -> Self {
        Error::Database(msg.to_string())
    }

    /// Create a new storage error
    pub fn storage<T: fmt::Display>(msg: T) -> Self {
        Error::Storage(msg.to_string())
    }

    /// Create a new realtime error
    pub fn realtime<T: fmt::Display>(msg: T) -> Self {
        Error::Realtime(msg.to_string())
    }

    /// Whether this is the duplicate-row conflict surfaced to users as a
    /// friendly notice (e.g. a wishlist keyword that already exists).
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }
}
