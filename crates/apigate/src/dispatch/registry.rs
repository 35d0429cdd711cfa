//! Explicit action table and name resolution.
//!
//! Handlers are registered once, up front, under their action names. Names
//! ending in [`STREAM_SUFFIX`] must be streaming handlers and every other name
//! must be unary, so the kind recorded at registration always agrees with the
//! name. Names starting with [`PRIVATE_PREFIX`] may be registered as internal
//! members but are never resolvable from outside.

use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::context::Context;

use super::DISPATCH_TARGET;
use super::completion::{GuardedCompletion, StreamCompletion};
use super::request::StreamMeta;
use super::space::Space;

/// Leading character marking an action as internal.
pub const PRIVATE_PREFIX: char = '_';

/// Trailing marker identifying streaming actions.
pub const STREAM_SUFFIX: &str = "Stream";

/// Inbound byte stream handed to streaming handlers.
pub type RequestStream = Box<dyn Read + Send>;

/// Outbound byte stream handed to streaming handlers.
pub type ResponseStream = Box<dyn Write + Send>;

/// Arguments of a unary invocation.
#[derive(Debug)]
pub struct UnaryCall {
    /// Service that addressed the action.
    pub space: Space,
    /// Positional arguments from the message.
    pub args: Vec<Value>,
    /// Worker context.
    pub context: Arc<Context>,
}

/// Arguments of a streaming invocation.
pub struct StreamCall {
    /// Service that addressed the action.
    pub space: Space,
    /// Request body stream.
    pub request: RequestStream,
    /// Response body stream.
    pub response: ResponseStream,
    /// Metadata supplied with the stream.
    pub meta: StreamMeta,
    /// Worker context.
    pub context: Arc<Context>,
}

impl fmt::Debug for StreamCall {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("StreamCall")
            .field("space", &self.space)
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

/// Unary handler: completes through the guarded completion.
pub type UnaryHandler =
    Arc<dyn Fn(UnaryCall, GuardedCompletion) -> anyhow::Result<()> + Send + Sync>;

/// Streaming handler: owns its completion semantics.
pub type StreamHandler =
    Arc<dyn Fn(StreamCall, StreamCompletion) -> anyhow::Result<()> + Send + Sync>;

/// Invocation shape of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Single request, single completion.
    Unary,
    /// Request and response streams.
    Streaming,
}

impl ActionKind {
    /// Classifies an action name by its suffix.
    #[must_use]
    pub fn classify(name: &str) -> Self {
        if name.ends_with(STREAM_SUFFIX) {
            Self::Streaming
        } else {
            Self::Unary
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Unary => "unary",
            Self::Streaming => "streaming",
        })
    }
}

/// Registered handler.
#[derive(Clone)]
pub enum ActionHandler {
    /// Unary handler.
    Unary(UnaryHandler),
    /// Streaming handler.
    Streaming(StreamHandler),
}

impl ActionHandler {
    /// Invocation shape of this handler.
    #[must_use]
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Unary(_) => ActionKind::Unary,
            Self::Streaming(_) => ActionKind::Streaming,
        }
    }
}

impl fmt::Debug for ActionHandler {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "ActionHandler::{}", self.kind())
    }
}

/// Successful resolution of an action name.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedAction<'a> {
    name: &'a str,
    handler: &'a ActionHandler,
}

impl<'a> ResolvedAction<'a> {
    /// Resolved action name.
    #[must_use]
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Invocation shape.
    #[must_use]
    pub fn kind(&self) -> ActionKind {
        self.handler.kind()
    }

    /// Registered handler.
    #[must_use]
    pub fn handler(&self) -> &'a ActionHandler {
        self.handler
    }
}

/// Errors raised while registering handlers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Action names may not be empty.
    #[error("action name must not be empty")]
    EmptyName,

    /// The name is already registered.
    #[error("action '{name}' is already registered")]
    Duplicate {
        /// Offending action name.
        name: String,
    },

    /// The handler kind disagrees with the name's suffix.
    #[error("action '{name}' is classified {expected} but was registered as {actual}")]
    KindMismatch {
        /// Offending action name.
        name: String,
        /// Kind implied by the name.
        expected: ActionKind,
        /// Kind of the supplied handler.
        actual: ActionKind,
    },
}

/// Mapping from action name to handler.
#[derive(Debug, Default, Clone)]
pub struct ActionRegistry {
    actions: HashMap<String, ActionHandler>,
}

impl ActionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a unary handler under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] for empty or duplicate names and for names
    /// carrying the streaming suffix.
    pub fn register_unary<F>(
        &mut self,
        name: impl Into<String>,
        handler: F,
    ) -> Result<&mut Self, RegistryError>
    where
        F: Fn(UnaryCall, GuardedCompletion) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(name.into(), ActionHandler::Unary(Arc::new(handler)))
    }

    /// Registers a streaming handler under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] for empty or duplicate names and for names
    /// lacking the streaming suffix.
    pub fn register_stream<F>(
        &mut self,
        name: impl Into<String>,
        handler: F,
    ) -> Result<&mut Self, RegistryError>
    where
        F: Fn(StreamCall, StreamCompletion) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(name.into(), ActionHandler::Streaming(Arc::new(handler)))
    }

    fn register(
        &mut self,
        name: String,
        handler: ActionHandler,
    ) -> Result<&mut Self, RegistryError> {
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        let expected = ActionKind::classify(&name);
        if handler.kind() != expected {
            return Err(RegistryError::KindMismatch {
                name,
                expected,
                actual: handler.kind(),
            });
        }
        if self.actions.contains_key(&name) {
            return Err(RegistryError::Duplicate { name });
        }

        debug!(
            target: DISPATCH_TARGET,
            action = %name,
            kind = %expected,
            internal = name.starts_with(PRIVATE_PREFIX),
            "registered action"
        );
        self.actions.insert(name, handler);
        Ok(self)
    }

    /// Resolves an externally invokable action.
    ///
    /// Empty names, names with the private prefix, and unregistered names do
    /// not resolve.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<ResolvedAction<'_>> {
        if name.is_empty() || name.starts_with(PRIVATE_PREFIX) {
            return None;
        }
        self.actions
            .get_key_value(name)
            .map(|(name, handler)| ResolvedAction { name, handler })
    }

    /// Resolves `name` as a unary action.
    #[must_use]
    pub fn resolve_unary(&self, name: &str) -> Option<&UnaryHandler> {
        match self.resolve(name)?.handler() {
            ActionHandler::Unary(handler) => Some(handler),
            ActionHandler::Streaming(_) => None,
        }
    }

    /// Resolves `name` as a streaming action.
    #[must_use]
    pub fn resolve_stream(&self, name: &str) -> Option<&StreamHandler> {
        match self.resolve(name)?.handler() {
            ActionHandler::Streaming(handler) => Some(handler),
            ActionHandler::Unary(_) => None,
        }
    }

    /// Number of registered actions, internal ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    fn unary(_call: UnaryCall, done: GuardedCompletion) -> anyhow::Result<()> {
        done.success(Value::Null);
        Ok(())
    }

    fn streaming(_call: StreamCall, _done: StreamCompletion) -> anyhow::Result<()> {
        Ok(())
    }

    #[fixture]
    fn registry() -> ActionRegistry {
        let mut registry = ActionRegistry::new();
        registry
            .register_unary("getStatus", unary)
            .and_then(|registry| registry.register_unary("_rotateKeys", unary))
            .and_then(|registry| registry.register_stream("tradesStream", streaming))
            .expect("register fixtures");
        registry
    }

    #[rstest]
    #[case::unary("getStatus", ActionKind::Unary)]
    #[case::streaming("tradesStream", ActionKind::Streaming)]
    fn resolves_registered_actions(
        registry: ActionRegistry,
        #[case] name: &str,
        #[case] kind: ActionKind,
    ) {
        let resolved = registry.resolve(name).expect("action resolves");
        assert_eq!(resolved.name(), name);
        assert_eq!(resolved.kind(), kind);
    }

    #[rstest]
    #[case::empty("")]
    #[case::private("_rotateKeys")]
    #[case::unknown("dropTables")]
    fn rejects_unresolvable_names(registry: ActionRegistry, #[case] name: &str) {
        assert!(registry.resolve(name).is_none());
    }

    #[rstest]
    fn kind_specific_resolution_filters_by_shape(registry: ActionRegistry) {
        assert!(registry.resolve_unary("getStatus").is_some());
        assert!(registry.resolve_unary("tradesStream").is_none());
        assert!(registry.resolve_stream("tradesStream").is_some());
        assert!(registry.resolve_stream("getStatus").is_none());
    }

    #[test]
    fn rejects_unary_handler_with_stream_suffix() {
        let mut registry = ActionRegistry::new();
        let error = registry
            .register_unary("pricesStream", unary)
            .map(|_| ())
            .expect_err("kind mismatch");
        assert_eq!(
            error,
            RegistryError::KindMismatch {
                name: String::from("pricesStream"),
                expected: ActionKind::Streaming,
                actual: ActionKind::Unary,
            }
        );
    }

    #[test]
    fn rejects_streaming_handler_without_suffix() {
        let mut registry = ActionRegistry::new();
        let result = registry.register_stream("prices", streaming).map(|_| ());
        assert!(matches!(result, Err(RegistryError::KindMismatch { .. })));
    }

    #[rstest]
    fn rejects_duplicates(mut registry: ActionRegistry) {
        let result = registry.register_unary("getStatus", unary).map(|_| ());
        assert_eq!(
            result,
            Err(RegistryError::Duplicate {
                name: String::from("getStatus")
            })
        );
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn rejects_empty_names() {
        let mut registry = ActionRegistry::new();
        let result = registry.register_unary("", unary).map(|_| ());
        assert_eq!(result, Err(RegistryError::EmptyName));
        assert!(registry.is_empty());
    }
}
