//! Access control for secure actions.
//!
//! The permission table is loaded lazily from `<root>/sec/acl.json` by the
//! [`AccessControlStore`] and consulted by the [`AuthorizationGate`], which
//! also appends one [`AuditRecord`] per attempt through an [`AuditSink`].
//! Every failure along the way degrades to "deny" for permissions and to
//! "log and continue" for auditing.

mod audit;
mod errors;
mod gate;
mod list;
mod store;

use serde::Deserialize;

pub use self::audit::{AuditRecord, AuditSink, FileAuditLog};
pub use self::errors::{AclLoadError, AuditError};
pub use self::gate::AuthorizationGate;
pub(crate) use self::list::is_truthy;
pub use self::list::{AccessControlList, PermissionSet, WILDCARD};
pub use self::store::{AccessControlStore, AclSource, AclState, FileAclSource};

/// Tracing target for access control events.
pub(crate) const ACL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::acl");

/// Caller identity presented with a secure message.
///
/// The fingerprint was authenticated upstream; this layer only authorizes it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthToken {
    fingerprint: String,
}

impl AuthToken {
    /// Builds a token for the supplied fingerprint.
    #[must_use]
    pub fn new(fingerprint: impl Into<String>) -> Self {
        Self {
            fingerprint: fingerprint.into(),
        }
    }

    /// Caller fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        self.fingerprint.as_str()
    }
}
