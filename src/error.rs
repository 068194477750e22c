// src/error.rs
// =============================================================================
// Error kinds for the mirroring core.
//
// Which errors are fatal depends on where they happen:
// - asset resolution / download errors only skip that asset's rewrite
// - page fetch / parse / write errors end that page, never the batch
// - Cancelled means the caller's deadline or cancel flag fired
//
// Rust concepts:
// - thiserror: derives Display and Error from the #[error] attributes
// - #[source]: keeps the underlying io::Error in the error chain
// - Type alias: Result<T> saves repeating the error type everywhere
// =============================================================================

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MirrorError {
    /// Input could not be turned into an absolute http(s) URL
    #[error("invalid URL '{input}': {reason}")]
    InvalidUrl { input: String, reason: String },

    /// Transport failure or non-2xx response for a page request
    #[error("failed to fetch {url}: {reason}")]
    Fetch {
        url: String,
        /// HTTP status code, when the server answered at all
        status: Option<u16>,
        reason: String,
    },

    /// Response could not be treated as an HTML document
    #[error("failed to parse {url}: {reason}")]
    Parse { url: String, reason: String },

    /// An asset could not be downloaded to disk
    #[error("failed to download {url}: {reason}")]
    Download { url: String, reason: String },

    /// Filesystem failure writing the mirrored page
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("mirroring {url} was cancelled")]
    Cancelled { url: String },
}

impl MirrorError {
    pub fn invalid_url(input: &str, reason: impl ToString) -> Self {
        MirrorError::InvalidUrl {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        MirrorError::Write {
            path: path.into(),
            source,
        }
    }

    /// Status code carried by a fetch error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            MirrorError::Fetch { status, .. } => *status,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, MirrorError>;
