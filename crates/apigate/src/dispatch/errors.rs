//! Error types surfaced to dispatch callers.
//!
//! Every failure a caller can observe is an [`ApiError`] delivered through the
//! completion channel; nothing is raised past the dispatcher. Display strings
//! are the stable wire codes transports forward verbatim.

use thiserror::Error;

/// Fallback message for handler errors that carry no text.
pub(crate) const BASE_ERROR: &str = "ERR_API_BASE";

/// Uniform error delivered to dispatch callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The owning worker has not supplied a context yet.
    #[error("ERR_API_READY")]
    NotReady,

    /// The action is missing, private, or not registered for this entry point.
    #[error("ERR_API_ACTION_NOTFOUND")]
    ActionNotFound,

    /// The caller's completion target cannot be invoked.
    #[error("ERR_API_CB_INVALID")]
    InvalidCompletionTarget,

    /// The secure message failed authorization.
    #[error("ERR_API_AUTH")]
    Unauthorized,

    /// The handler failed before completing.
    #[error("ERR_API_ACTION: {message}")]
    ActionFailure {
        /// Text of the original failure.
        message: String,
    },

    /// The handler completed with a domain error.
    #[error("{message}")]
    Handler {
        /// Message reported by the handler.
        message: String,
    },
}

impl ApiError {
    /// Returns the stable code for this error, without any detail.
    ///
    /// Domain errors reported by handlers carry no code of their own.
    #[must_use]
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::NotReady => Some("ERR_API_READY"),
            Self::ActionNotFound => Some("ERR_API_ACTION_NOTFOUND"),
            Self::InvalidCompletionTarget => Some("ERR_API_CB_INVALID"),
            Self::Unauthorized => Some("ERR_API_AUTH"),
            Self::ActionFailure { .. } => Some("ERR_API_ACTION"),
            Self::Handler { .. } => None,
        }
    }

    /// Creates an action failure error.
    pub fn action_failure(message: impl Into<String>) -> Self {
        Self::ActionFailure {
            message: message.into(),
        }
    }

    /// Creates a handler error, substituting `ERR_API_BASE` for empty text.
    pub fn handler(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::Handler {
            message: if message.is_empty() {
                BASE_ERROR.to_owned()
            } else {
                message
            },
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        Self::handler(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::ready(ApiError::NotReady, "ERR_API_READY")]
    #[case::not_found(ApiError::ActionNotFound, "ERR_API_ACTION_NOTFOUND")]
    #[case::callback(ApiError::InvalidCompletionTarget, "ERR_API_CB_INVALID")]
    #[case::auth(ApiError::Unauthorized, "ERR_API_AUTH")]
    #[case::action(ApiError::action_failure("boom"), "ERR_API_ACTION: boom")]
    #[case::handler(ApiError::handler("insufficient funds"), "insufficient funds")]
    fn renders_wire_codes(#[case] error: ApiError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[test]
    fn empty_handler_message_falls_back_to_base_code() {
        assert_eq!(ApiError::handler("").to_string(), BASE_ERROR);
    }

    #[test]
    fn converts_anyhow_errors_to_handler_errors() {
        let error = ApiError::from(anyhow::anyhow!("ERR_ORDER_MISSING"));
        assert_eq!(error, ApiError::handler("ERR_ORDER_MISSING"));
        assert_eq!(error.code(), None);
    }

    #[test]
    fn action_failure_code_omits_detail() {
        assert_eq!(ApiError::action_failure("boom").code(), Some("ERR_API_ACTION"));
    }
}
