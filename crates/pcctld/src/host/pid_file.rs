//! Best-effort persistence of the managed process identifier.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;
use thiserror::Error;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Errors raised while touching the PID file.
#[derive(Debug, Error)]
pub enum PidFileError {
    /// The identifier could not be written.
    #[error("failed to write process ID file {path}: {source}")]
    Write {
        /// PID file path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The file exists but could not be read.
    #[error("failed to read process ID file {path}: {source}")]
    Read {
        /// PID file path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The file does not hold a positive decimal integer.
    #[error("process ID file {path} holds '{contents}', not a process ID")]
    Malformed {
        /// PID file path.
        path: Utf8PathBuf,
        /// Trimmed file contents.
        contents: String,
    },
    /// The file could not be removed.
    #[error("failed to remove process ID file {path}: {source}")]
    Remove {
        /// PID file path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// File holding the decimal PID of the last launched program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PidFile {
    path: Utf8PathBuf,
}

impl PidFile {
    /// Points at `path` without touching the filesystem.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Replaces the file contents with `pid`.
    ///
    /// # Errors
    ///
    /// Returns [`PidFileError::Write`] when the file cannot be written.
    pub fn write(&self, pid: u32) -> Result<(), PidFileError> {
        atomic_write(self.path.as_std_path(), pid.to_string().as_bytes()).map_err(|source| {
            PidFileError::Write {
                path: self.path.clone(),
                source,
            }
        })
    }

    /// Reads the persisted identifier; a missing file yields `None`.
    ///
    /// # Errors
    ///
    /// Returns [`PidFileError::Read`] for I/O failures other than a missing
    /// file and [`PidFileError::Malformed`] when the contents do not parse.
    pub fn read(&self) -> Result<Option<u32>, PidFileError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PidFileError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let trimmed = contents.trim();
        match trimmed.parse::<u32>() {
            Ok(pid) if pid > 0 => Ok(Some(pid)),
            _ => Err(PidFileError::Malformed {
                path: self.path.clone(),
                contents: trimmed.to_owned(),
            }),
        }
    }

    /// Deletes the file, returning whether it existed.
    ///
    /// # Errors
    ///
    /// Returns [`PidFileError::Remove`] for failures other than a missing file.
    pub fn remove(&self) -> Result<bool, PidFileError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(PidFileError::Remove {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// Writes `contents` to a sibling temporary file and renames it over `path`.
fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut builder = Builder::new();
    builder.prefix(
        path.file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("pcctld"),
    );
    #[cfg(unix)]
    builder.permissions(fs::Permissions::from_mode(0o644));

    let mut file = builder.tempfile_in(directory)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}
