use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading a mod package.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Overlay(#[from] icarus_overlay::Error),

    /// The file is neither a `.zip` package nor a raw `.pak`.
    #[error("Unsupported mod file '{file_name}'. Mods must be .zip or .pak files")]
    UnsupportedPackage { file_name: String },

    #[error("Mod file path has no file name: {0}")]
    InvalidPath(String),
}
