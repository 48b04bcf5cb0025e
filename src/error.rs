//! Error types for genotype parsing and reference loading

use std::io;
use thiserror::Error;

/// Result type alias for dna-insights operations
pub type Result<T> = std::result::Result<T, InsightsError>;

#[derive(Debug, Error)]
pub enum InsightsError {
    /// I/O error outside of the genotype stream (opening files, reading archives)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The genotype byte source failed mid-parse. Matches gathered so far are discarded.
    #[error("Genotype stream failed after {bytes_read} bytes: {source}")]
    Stream {
        bytes_read: u64,
        #[source]
        source: io::Error,
    },

    /// Reference table could not be decoded
    #[error("Invalid reference JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Reference archive could not be opened
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Reference archive holds no JSON payload
    #[error("No JSON entry found in reference archive {0}")]
    MissingArchiveEntry(String),
}
