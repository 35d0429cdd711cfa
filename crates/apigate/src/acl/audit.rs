//! Append-only record of authorization attempts.
//!
//! Each attempt occupies exactly one `fingerprint|action` line. Field values
//! are escaped so that a line break, a carriage return or a separator inside
//! a fingerprint cannot split or forge records.

use std::borrow::Cow;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::{Mutex, PoisonError};

use crate::context::Context;

use super::errors::AuditError;

/// One authorization attempt, rendered as `fingerprint|action`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    fingerprint: String,
    action: String,
}

impl AuditRecord {
    /// Builds a record for `fingerprint` attempting `action`.
    #[must_use]
    pub fn new(fingerprint: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            action: action.into(),
        }
    }

    /// Caller fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        self.fingerprint.as_str()
    }

    /// Attempted action.
    #[must_use]
    pub fn action(&self) -> &str {
        self.action.as_str()
    }

    /// Record rendered as a newline-terminated log line.
    #[must_use]
    pub fn to_line(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for AuditRecord {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{}|{}",
            escape_field(&self.fingerprint),
            escape_field(&self.action)
        )
    }
}

/// Field separator within a record line.
const SEPARATOR: char = '|';

/// Backslash-escapes characters that would break the one-line record shape.
fn escape_field(value: &str) -> Cow<'_, str> {
    if !value.contains(['\\', '\n', '\r', SEPARATOR]) {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 4);
    for character in value.chars() {
        match character {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            SEPARATOR => escaped.push_str("\\|"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}

/// Destination for audit records.
pub trait AuditSink: Send + Sync {
    /// Appends `record` to the log located through `context`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] when the record could not be persisted.
    fn append(&self, context: &Context, record: &AuditRecord) -> Result<(), AuditError>;
}

/// Appends records to `<root>/sec/acl.log`.
///
/// Appends are serialized so concurrent dispatches never interleave lines.
/// The log and its directory are owned by the worker; a missing directory is
/// reported as an error rather than created.
#[derive(Debug, Default)]
pub struct FileAuditLog {
    writer: Mutex<()>,
}

impl FileAuditLog {
    /// Builds a file-backed audit log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditSink for FileAuditLog {
    fn append(&self, context: &Context, record: &AuditRecord) -> Result<(), AuditError> {
        let path = context.audit_path();
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| AuditError::new(path.clone(), source))?;
        file.write_all(record.to_line().as_bytes())
            .map_err(|source| AuditError::new(path, source))
    }
}
