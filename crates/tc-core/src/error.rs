//! Unified error type for trailcam.
//!
//! All crates funnel their failures into [`Error`], which carries enough context
//! for API handlers to derive an HTTP status code via [`Error::http_status`].

use std::fmt;

/// Unified error type covering all failure modes in trailcam.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested video key is not part of the catalog.
    #[error("Video not indexed: {0}")]
    NotIndexed(String),

    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "file").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// A byte range could not be satisfied for a resource of `size` bytes.
    #[error("Range not satisfiable (resource is {size} bytes)")]
    RangeNotSatisfiable {
        /// Total size of the resource.
        size: u64,
    },

    /// The caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The taxonomy document could not be read or parsed.
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotIndexed(_) => 404,
            Error::NotFound { .. } => 404,
            Error::RangeNotSatisfiable { .. } => 416,
            Error::Unauthorized(_) => 401,
            Error::Validation(_) => 400,
            Error::Catalog(_) => 500,
            Error::Io { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Catalog`].
    pub fn catalog(message: impl fmt::Display) -> Self {
        Error::Catalog(message.to_string())
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
