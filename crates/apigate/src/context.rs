//! Worker context consumed by the dispatcher.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};

/// Directory under the storage root holding the security artefacts.
const SECURITY_DIR: &str = "sec";
const ACL_FILE: &str = "acl.json";
const AUDIT_FILE: &str = "acl.log";

/// Process-wide handle supplied by the owning worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    root_path: Utf8PathBuf,
}

impl Context {
    /// Builds a context rooted at the supplied storage path.
    #[must_use]
    pub fn new(root_path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
        }
    }

    /// Storage root.
    #[must_use]
    pub fn root_path(&self) -> &Utf8Path {
        self.root_path.as_path()
    }

    /// Directory containing the ACL and the audit log.
    #[must_use]
    pub fn security_dir(&self) -> Utf8PathBuf {
        self.root_path.join(SECURITY_DIR)
    }

    /// Location of the permission table.
    #[must_use]
    pub fn acl_path(&self) -> Utf8PathBuf {
        self.security_dir().join(ACL_FILE)
    }

    /// Location of the append-only authorization log.
    #[must_use]
    pub fn audit_path(&self) -> Utf8PathBuf {
        self.security_dir().join(AUDIT_FILE)
    }
}

/// Source of the worker context.
///
/// Returning `None` signals that the owning worker is not ready yet; the
/// dispatcher rejects traffic with `ERR_API_READY` until a context appears.
pub trait ContextProvider: Send + Sync {
    /// Returns the current context, if the worker is ready.
    fn context(&self) -> Option<Arc<Context>>;
}

impl<T> ContextProvider for Arc<T>
where
    T: ContextProvider,
{
    fn context(&self) -> Option<Arc<Context>> {
        (**self).context()
    }
}

/// Provider returning a fixed context, for embedders without a worker.
#[derive(Debug, Clone, Default)]
pub struct StaticContextProvider {
    context: Option<Arc<Context>>,
}

impl StaticContextProvider {
    /// Provider that is always ready with `context`.
    #[must_use]
    pub fn new(context: Context) -> Self {
        Self {
            context: Some(Arc::new(context)),
        }
    }

    /// Provider that never becomes ready.
    #[must_use]
    pub fn unavailable() -> Self {
        Self { context: None }
    }
}

impl ContextProvider for StaticContextProvider {
    fn context(&self) -> Option<Arc<Context>> {
        self.context.clone()
    }
}
