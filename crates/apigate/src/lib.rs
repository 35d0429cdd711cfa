//! Request dispatch and authorization for API workers.
//!
//! The crate sits between an inbound RPC transport and a set of registered
//! action handlers. For every inbound message the [`Dispatcher`]:
//!
//! 1. acquires the worker [`Context`] lazily from its [`ContextProvider`],
//! 2. resolves the action name against an explicit [`ActionRegistry`],
//! 3. authorizes secure messages through the [`AuthorizationGate`], which
//!    records every attempt in the append-only audit log,
//! 4. invokes the handler inside a failure boundary, and
//! 5. delivers exactly one outcome to the caller, however the handler behaves.
//!
//! ## Security artefacts
//!
//! Permissions live in `<root>/sec/acl.json`:
//!
//! ```json
//! {
//!   "3F2A...": { "getStatus": true, "listOrders": true },
//!   "9B71...": "*",
//!   "C0DE...": { "*": true }
//! }
//! ```
//!
//! A top-level `"*"` key grants every caller every action. Each authorization
//! attempt is appended to `<root>/sec/acl.log` as `fingerprint|action`. A
//! missing or malformed ACL denies every secure action.

pub mod acl;
mod context;
pub mod dispatch;
pub mod telemetry;
pub mod worker;

pub use acl::{
    AccessControlList, AccessControlStore, AclLoadError, AclSource, AclState, AuditError,
    AuditRecord, AuditSink, AuthToken, AuthorizationGate, FileAclSource, FileAuditLog,
};
pub use context::{Context, ContextProvider, StaticContextProvider};
pub use dispatch::{
    ActionHandler, ActionKind, ActionRegistry, ActionResult, ApiError, Completion, Dispatcher,
    GuardedCompletion, Message, RegistryError, RequestStream, ResolvedAction, ResponseStream,
    Space, StreamCall, StreamCompletion, StreamMeta, UnaryCall,
};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use worker::{ApiConf, ApiWorker, GrcConf};
