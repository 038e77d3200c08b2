//! Error types for the extraction pipeline.

use std::path::PathBuf;

use thiserror::Error;

use crate::fetch::BatchError;

/// Errors that abort a pipeline run.
///
/// Individual fetch failures never show up here; they become empty records.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The listing payload has no `results` array.
    #[error("malformed listing from {url}: {reason}")]
    MalformedListing {
        /// Listing URL.
        url: String,
        /// What was missing.
        reason: String,
    },

    /// The detail fetcher could not be configured.
    #[error("invalid fetcher configuration: {0}")]
    Fetcher(#[from] BatchError),

    /// Writing an output table failed.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A row could not be encoded as CSV.
    #[error("CSV error writing to {path}: {source}")]
    Csv {
        /// The table being written.
        path: PathBuf,
        /// The underlying encoder error.
        #[source]
        source: csv::Error,
    },
}

impl PipelineError {
    /// Creates a malformed listing error.
    pub fn malformed_listing(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedListing {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a CSV encoding error.
    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}
