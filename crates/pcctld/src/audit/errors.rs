//! Errors surfaced by the audit log.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to write the in-memory history to a file.
#[derive(Debug, Error)]
pub enum DumpError {
    /// The dump target could not be opened for appending.
    #[error("failed to open dump target {path}: {source}")]
    Open {
        /// Target path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// A record could not be written or the file could not be flushed.
    #[error("failed to write dump target {path} after {written} records: {source}")]
    Write {
        /// Target path.
        path: PathBuf,
        /// Records written before the failure.
        written: usize,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}
