//! Action dispatch for API workers.
//!
//! The [`Dispatcher`] is the only entry point transports call. It owns an
//! [`ActionRegistry`] built at startup and an [`AuthorizationGate`] consulted
//! for secure messages. Two entry points exist:
//!
//! - [`Dispatcher::handle`] for unary actions. The handler receives a
//!   [`GuardedCompletion`] and the caller is guaranteed exactly one outcome.
//! - [`Dispatcher::handle_stream`] for actions whose names end in `Stream`.
//!   The handler receives the raw [`StreamCompletion`] and owns the stream's
//!   lifecycle.
//!
//! Every failure reaches the caller as an [`ApiError`] through the same
//! completion channel as success.
//!
//! [`AuthorizationGate`]: crate::acl::AuthorizationGate

mod completion;
mod dispatcher;
mod errors;
mod registry;
mod request;
mod space;


pub use self::completion::{ActionResult, Completion, GuardedCompletion, StreamCompletion};
pub use self::dispatcher::Dispatcher;
pub use self::errors::ApiError;
pub use self::registry::{
    ActionHandler, ActionKind, ActionRegistry, PRIVATE_PREFIX, RegistryError, RequestStream,
    ResolvedAction, ResponseStream, STREAM_SUFFIX, StreamCall, StreamHandler, UnaryCall,
    UnaryHandler,
};
pub use self::request::{Message, StreamMeta};
pub use self::space::{SERVICE_SEPARATOR, Space};

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
