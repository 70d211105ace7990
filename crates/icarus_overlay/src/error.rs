//! Error types for overlay operations.
//!
//! All fallible functions in this crate return [`Result<T>`], which uses [`Error`]
//! as the error type. External error types (`std::io::Error`, `serde_json::Error`,
//! zip and msgpack errors) are automatically converted via `From` impls.
//!
//! JSON-Patch operation failures are not represented here: they are expected while
//! integrating mods and are only counted and logged by the integrators.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while aggregating mods or building the overlay.
#[derive(Error, Debug)]
pub enum Error {
    /// Filesystem I/O failed (reading game files, writing overlay archives, etc.).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse or serialize JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading or writing a zip-backed archive failed.
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Encoding a structural document with msgpack failed.
    #[error("Asset encode error: {0}")]
    AssetEncode(#[from] rmp_serde::encode::Error),

    /// Decoding a structural document with msgpack failed.
    #[error("Asset decode error: {0}")]
    AssetDecode(#[from] rmp_serde::decode::Error),

    /// A patch document, mod metadata file, or baseline text is malformed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A structural document is missing a required anchor or cross-reference.
    #[error("Format error: {0}")]
    Format(String),

    /// An integrator was called with input it cannot act on.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Neither an override nor the game data provides bytes for a patched path.
    #[error("No baseline available for {0}")]
    MissingBaseline(String),

    /// Catch-all for errors from external collaborators.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error must abort the whole install.
    ///
    /// Storage errors propagate to the caller; everything else is scoped to the
    /// path being processed when it was raised.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Zip(_))
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}
