//! Top-level orchestration of unary and streaming dispatch.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, warn};

use crate::acl::AuthorizationGate;
use crate::context::{Context, ContextProvider};

use super::DISPATCH_TARGET;
use super::completion::{Completion, GuardedCompletion, StreamCompletion};
use super::errors::ApiError;
use super::registry::{ActionRegistry, RequestStream, ResponseStream, StreamCall, UnaryCall};
use super::request::{Message, StreamMeta};
use super::space::Space;

/// Routes inbound messages to registered handlers.
///
/// The dispatcher pulls its [`Context`] from the provider the first time a
/// message arrives and keeps it until [`Dispatcher::clear_context`] is
/// called. Until a context is available every call fails with
/// [`ApiError::NotReady`] and has no other effect.
pub struct Dispatcher<P> {
    provider: P,
    context: Mutex<Option<Arc<Context>>>,
    registry: ActionRegistry,
    gate: AuthorizationGate,
}

impl<P> fmt::Debug for Dispatcher<P> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

impl<P> Dispatcher<P>
where
    P: ContextProvider,
{
    /// Builds a dispatcher backed by the file-based ACL and audit log.
    #[must_use]
    pub fn new(provider: P, registry: ActionRegistry) -> Self {
        Self::with_gate(provider, registry, AuthorizationGate::default())
    }

    /// Builds a dispatcher with a custom authorization gate.
    #[must_use]
    pub fn with_gate(provider: P, registry: ActionRegistry, gate: AuthorizationGate) -> Self {
        Self {
            provider,
            context: Mutex::new(None),
            registry,
            gate,
        }
    }

    /// Registered actions.
    #[must_use]
    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Authorization gate used for secure messages.
    #[must_use]
    pub fn gate(&self) -> &AuthorizationGate {
        &self.gate
    }

    /// Returns `true` when a context is cached.
    #[must_use]
    pub fn is_context_ready(&self) -> bool {
        self.context_slot().is_some()
    }

    /// Drops the cached context so the next call pulls it again.
    pub fn clear_context(&self) {
        *self.context_slot() = None;
        debug!(target: DISPATCH_TARGET, "dispatch context cleared");
    }

    /// Dispatches a unary message.
    ///
    /// `complete` receives exactly one outcome. Handler failures, panics, and
    /// repeated completions are absorbed here and never reach the caller as
    /// anything but an [`ApiError`].
    pub fn handle<C>(&self, service: &str, message: Message, complete: C)
    where
        C: Completion,
    {
        let complete: Box<dyn Completion> = Box::new(complete);
        let Some(context) = self.acquire_context() else {
            return reject(complete, &message.action, ApiError::NotReady);
        };

        let Message {
            action,
            args,
            secure,
            auth,
        } = message;

        let Some(handler) = self.registry.resolve_unary(&action) else {
            return reject(complete, &action, ApiError::ActionNotFound);
        };

        if !complete.is_invokable() {
            error!(target: DISPATCH_TARGET, %action, "completion target is not invokable");
            return complete.complete(Err(ApiError::InvalidCompletionTarget));
        }

        if secure && !self.gate.authorize(&context, auth.as_ref(), &action, &args) {
            return reject(complete, &action, ApiError::Unauthorized);
        }

        debug!(
            target: DISPATCH_TARGET,
            service,
            %action,
            arg_count = args.len(),
            "dispatching action"
        );

        let done = GuardedCompletion::new(action.as_str(), complete);
        let call = UnaryCall {
            space: Space::new(service),
            args,
            context,
        };
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(call, done.clone())));
        if let Some(message) = failure_message(outcome) {
            error!(target: DISPATCH_TARGET, %action, error = %message, "action failed");
            done.fail(ApiError::action_failure(message));
        }
    }

    /// Dispatches a streaming action.
    ///
    /// Only actions registered as streaming resolve here. The handler owns
    /// `complete` and may invoke it repeatedly; the dispatcher adds no guard.
    pub fn handle_stream(
        &self,
        service: &str,
        action: &str,
        request: RequestStream,
        response: ResponseStream,
        meta: StreamMeta,
        complete: StreamCompletion,
    ) {
        let Some(context) = self.acquire_context() else {
            return reject_stream(&complete, action, ApiError::NotReady);
        };

        let Some(handler) = self.registry.resolve_stream(action) else {
            return reject_stream(&complete, action, ApiError::ActionNotFound);
        };

        if meta.secure && !self.gate.authorize(&context, meta.auth.as_ref(), action, &meta.args) {
            return reject_stream(&complete, action, ApiError::Unauthorized);
        }

        debug!(target: DISPATCH_TARGET, service, action, "dispatching stream");

        let call = StreamCall {
            space: Space::new(service),
            request,
            response,
            meta,
            context,
        };
        let fallback = Arc::clone(&complete);
        let outcome = panic::catch_unwind(AssertUnwindSafe(move || handler(call, complete)));
        if let Some(message) = failure_message(outcome) {
            error!(target: DISPATCH_TARGET, action, error = %message, "stream action failed");
            fallback(Err(ApiError::action_failure(message)));
        }
    }

    fn acquire_context(&self) -> Option<Arc<Context>> {
        let mut slot = self.context_slot();
        if slot.is_none() {
            *slot = self.provider.context();
        }
        slot.clone()
    }
}

impl<P> Dispatcher<P> {
    fn context_slot(&self) -> MutexGuard<'_, Option<Arc<Context>>> {
        self.context.lock().unwrap_or_else(|poisoned| {
            warn!(target: DISPATCH_TARGET, "context lock poisoned; recovering");
            PoisonError::into_inner(poisoned)
        })
    }
}

fn reject(complete: Box<dyn Completion>, action: &str, error: ApiError) {
    debug!(target: DISPATCH_TARGET, action, %error, "dispatch rejected");
    complete.complete(Err(error));
}

fn reject_stream(complete: &StreamCompletion, action: &str, error: ApiError) {
    debug!(target: DISPATCH_TARGET, action, %error, "stream dispatch rejected");
    complete(Err(error));
}

/// Extracts the failure text from a handler invocation, if it failed.
fn failure_message(
    outcome: Result<anyhow::Result<()>, Box<dyn Any + Send + 'static>>,
) -> Option<String> {
    match outcome {
        Ok(Ok(())) => None,
        Ok(Err(error)) => Some(error.to_string()),
        Err(payload) => Some(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("handler panicked")
    }
}
