//! Error types for ACL loading and audit logging.
//!
//! Neither error ever reaches a caller: the store and the gate log them and
//! fall back to deny-all and best-effort auditing respectively.

use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Failures encountered while loading the permission table.
#[derive(Debug, Error)]
pub enum AclLoadError {
    /// The backing source could not be read.
    #[error("failed to read access control list '{path}': {source}")]
    Read {
        /// Location that was read.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// The document is not valid JSON.
    #[error("malformed access control list: {0}")]
    Parse(#[from] serde_json::Error),

    /// The document parsed but its top level is not an object.
    #[error("access control list must be a JSON object")]
    NotAnObject,
}

impl AclLoadError {
    /// Creates a read error for `path`.
    pub fn read(path: impl Into<Utf8PathBuf>, source: io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }
}

/// Failures encountered while appending an audit record.
#[derive(Debug, Error)]
#[error("failed to append audit record to '{path}': {source}")]
pub struct AuditError {
    path: Utf8PathBuf,
    #[source]
    source: io::Error,
}

impl AuditError {
    /// Creates an audit error for the log at `path`.
    pub fn new(path: impl Into<Utf8PathBuf>, source: io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }

    /// Location of the audit log that rejected the write.
    #[must_use]
    pub fn path(&self) -> &Utf8PathBuf {
        &self.path
    }
}
