//! Authorization decisions for secure messages.

use std::fmt;

use serde_json::Value;
use tracing::{debug, warn};

use crate::context::Context;

use super::ACL_TARGET;
use super::AuthToken;
use super::audit::{AuditRecord, AuditSink, FileAuditLog};
use super::store::AccessControlStore;

/// Combines the permission cache with the audit log.
///
/// Every attempt that presents a token is audited before its result is
/// returned, whether it is granted or denied. Attempts without a token are
/// denied outright and leave no record, since there is no fingerprint to
/// write.
pub struct AuthorizationGate {
    store: AccessControlStore,
    audit: Box<dyn AuditSink>,
}

impl fmt::Debug for AuthorizationGate {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthorizationGate")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl Default for AuthorizationGate {
    fn default() -> Self {
        Self::new(AccessControlStore::default(), FileAuditLog::new())
    }
}

impl AuthorizationGate {
    /// Builds a gate over the supplied store and audit sink.
    #[must_use]
    pub fn new(store: AccessControlStore, audit: impl AuditSink + 'static) -> Self {
        Self {
            store,
            audit: Box::new(audit),
        }
    }

    /// Permission cache consulted by the gate.
    #[must_use]
    pub fn store(&self) -> &AccessControlStore {
        &self.store
    }

    /// Decides whether the caller identified by `token` may run `action`.
    ///
    /// Audit failures are logged and never change the decision.
    pub fn authorize(
        &self,
        context: &Context,
        token: Option<&AuthToken>,
        action: &str,
        args: &[Value],
    ) -> bool {
        let Some(token) = token else {
            debug!(target: ACL_TARGET, action, "secure call without auth token denied");
            return false;
        };

        self.store.ensure_loaded(context);
        let permitted = self.store.is_permitted(token.fingerprint(), action);

        let record = AuditRecord::new(token.fingerprint(), action);
        if let Err(error) = self.audit.append(context, &record) {
            warn!(target: ACL_TARGET, %error, "audit record dropped");
        }

        debug!(
            target: ACL_TARGET,
            fingerprint = token.fingerprint(),
            action,
            arg_count = args.len(),
            permitted,
            "authorization decided"
        );
        permitted
    }
}
