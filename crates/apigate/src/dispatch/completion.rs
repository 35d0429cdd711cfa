//! Completion targets and the single-delivery guard.
//!
//! Callers hand the dispatcher a [`Completion`] that receives exactly one
//! [`ActionResult`]. Handlers never see that target directly: they receive a
//! [`GuardedCompletion`], which forwards the first outcome and discards (and
//! reports) every later one, no matter how many clones exist or which thread
//! calls them.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tracing::{error, warn};

use super::DISPATCH_TARGET;
use super::errors::ApiError;

/// Outcome delivered to a caller.
pub type ActionResult = Result<Value, ApiError>;

/// Completion callback for streaming actions.
///
/// Streaming handlers own their termination semantics and may call this any
/// number of times.
pub type StreamCompletion = Arc<dyn Fn(ActionResult) + Send + Sync>;

/// Caller-side receiver of a unary dispatch outcome.
///
/// Any `FnOnce(ActionResult)` closure is a completion. Transports with reply
/// handles that can be torn down implement the trait directly and report
/// [`Completion::is_invokable`] accordingly.
pub trait Completion: Send + 'static {
    /// Consumes the target, delivering `outcome`.
    fn complete(self: Box<Self>, outcome: ActionResult);

    /// Returns `false` when the target can no longer receive an outcome.
    fn is_invokable(&self) -> bool {
        true
    }
}

impl<F> Completion for F
where
    F: FnOnce(ActionResult) + Send + 'static,
{
    fn complete(self: Box<Self>, outcome: ActionResult) {
        (*self)(outcome);
    }
}

/// Handler-side completion enforcing a single delivery.
#[derive(Clone)]
pub struct GuardedCompletion {
    inner: Arc<Guard>,
}

struct Guard {
    action: String,
    fired: AtomicBool,
    target: Mutex<Option<Box<dyn Completion>>>,
}

impl fmt::Debug for GuardedCompletion {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("GuardedCompletion")
            .field("action", &self.inner.action)
            .field("fired", &self.is_fired())
            .finish()
    }
}

impl GuardedCompletion {
    pub(crate) fn new(action: impl Into<String>, target: Box<dyn Completion>) -> Self {
        Self {
            inner: Arc::new(Guard {
                action: action.into(),
                fired: AtomicBool::new(false),
                target: Mutex::new(Some(target)),
            }),
        }
    }

    /// Completes with a handler outcome.
    ///
    /// Errors are normalized into [`ApiError::Handler`]. Only the first call
    /// across all clones reaches the caller; it returns `true` when this call
    /// was the one delivered.
    pub fn complete(&self, result: anyhow::Result<Value>) -> bool {
        self.deliver(result.map_err(ApiError::from))
    }

    /// Completes successfully with `value`.
    pub fn success(&self, value: Value) -> bool {
        self.deliver(Ok(value))
    }

    /// Completes with a domain error.
    pub fn failure(&self, error: anyhow::Error) -> bool {
        self.deliver(Err(ApiError::from(error)))
    }

    /// Returns `true` once an outcome has been delivered.
    #[must_use]
    pub fn is_fired(&self) -> bool {
        self.inner.fired.load(Ordering::Acquire)
    }

    /// Reports a failure raised by the handler itself.
    ///
    /// A failure arriving after the handler already completed is discarded
    /// and logged as a late failure rather than as a repeated completion.
    pub(crate) fn fail(&self, error: ApiError) -> bool {
        if self.is_fired() {
            warn!(
                target: DISPATCH_TARGET,
                action = %self.inner.action,
                %error,
                "action failed after completing; failure discarded"
            );
            return false;
        }
        self.deliver(Err(error))
    }

    pub(crate) fn deliver(&self, outcome: ActionResult) -> bool {
        if self.inner.fired.swap(true, Ordering::AcqRel) {
            error!(
                target: DISPATCH_TARGET,
                action = %self.inner.action,
                dropped = ?outcome,
                "[CRITICAL] callback called twice"
            );
            return false;
        }

        let target = self
            .inner
            .target
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(target) = target {
            target.complete(outcome);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use serde_json::json;

    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<ActionResult>>>, Box<dyn Completion>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let target: Box<dyn Completion> = Box::new(move |outcome: ActionResult| {
            sink.lock().expect("recorder lock").push(outcome);
        });
        (seen, target)
    }

    #[test]
    fn forwards_only_the_first_outcome() {
        let (seen, target) = recorder();
        let guard = GuardedCompletion::new("getStatus", target);

        assert!(guard.success(json!("ok")));
        assert!(!guard.success(json!("again")));
        assert!(!guard.failure(anyhow::anyhow!("late")));

        assert_eq!(*seen.lock().expect("recorder lock"), vec![Ok(json!("ok"))]);
        assert!(guard.is_fired());
    }

    #[test]
    fn late_failure_is_discarded() {
        let (seen, target) = recorder();
        let guard = GuardedCompletion::new("getStatus", target);

        assert!(guard.success(json!("ok")));
        assert!(!guard.fail(ApiError::action_failure("late")));

        assert_eq!(*seen.lock().expect("recorder lock"), vec![Ok(json!("ok"))]);
    }

    #[test]
    fn failure_before_completion_is_delivered() {
        let (seen, target) = recorder();
        let guard = GuardedCompletion::new("getStatus", target);

        assert!(guard.fail(ApiError::action_failure("boom")));

        assert_eq!(
            *seen.lock().expect("recorder lock"),
            vec![Err(ApiError::action_failure("boom"))]
        );
    }

    #[test]
    fn normalizes_handler_errors() {
        let (seen, target) = recorder();
        let guard = GuardedCompletion::new("getStatus", target);

        guard.complete(Err(anyhow::anyhow!("ERR_ORDER_MISSING")));

        assert_eq!(
            *seen.lock().expect("recorder lock"),
            vec![Err(ApiError::handler("ERR_ORDER_MISSING"))]
        );
    }

    #[test]
    fn clones_share_one_delivery_across_threads() {
        let (seen, target) = recorder();
        let guard = GuardedCompletion::new("getStatus", target);

        let racers: Vec<_> = (0..8)
            .map(|index| {
                let guard = guard.clone();
                thread::spawn(move || guard.success(json!(index)))
            })
            .collect();
        let delivered = racers
            .into_iter()
            .map(|racer| racer.join().expect("racer join"))
            .filter(|delivered| *delivered)
            .count();

        assert_eq!(delivered, 1);
        assert_eq!(seen.lock().expect("recorder lock").len(), 1);
    }
}
