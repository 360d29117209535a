//! Error types for the persistence, export and session boundaries.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a persistence backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No annotation data stored for the mask
    #[error("No annotation data for image '{image_id}', mask '{mask_id}'")]
    NotFound {
        image_id: String,
        mask_id: String,
    },

    /// Image metadata missing or unreadable
    #[error("Image info not found: {path:?}")]
    MissingImageInfo { path: PathBuf },

    /// Backend refused or failed the request
    #[error("Backend unavailable: {message}")]
    Unavailable { message: String },
}

impl BackendError {
    pub fn not_found(image_id: impl Into<String>, mask_id: impl Into<String>) -> Self {
        Self::NotFound {
            image_id: image_id.into(),
            mask_id: mask_id.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// Errors raised while building export artifacts.
#[derive(Error, Debug)]
pub enum ExportError {
    /// API URL could not be parsed or extended
    #[error("Invalid API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Base URL cannot carry path segments (e.g. `data:` URLs)
    #[error("API URL cannot be a base: {url}")]
    CannotBeBase { url: String },

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error while writing the document
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced to the user by the annotation session.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Fetch, save or reset failed; in-memory state is unchanged
    #[error("Persistence failed: {0}")]
    Backend(#[from] BackendError),

    /// Export artifact could not be produced
    #[error("Export failed: {0}")]
    Export(#[from] ExportError),

    /// Export attempted with unsaved changes
    #[error("{}", crate::constants::EXPORT_BLOCKED_MESSAGE)]
    UnsavedChanges,

    /// Reset was not confirmed by the user
    #[error("Reset cancelled")]
    ResetNotConfirmed,
}

/// Convenience type alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
