//! Inbound message shapes.
//!
//! Transports hand the dispatcher already-decoded values. The `Deserialize`
//! implementations accept the field names used on the wire (`_isSecure`,
//! `_auth`) and tolerate loosely typed payloads: a non-array `args` becomes an
//! empty list, a non-string `action` becomes empty (and therefore unresolvable),
//! `_isSecure` follows JSON truthiness, and a malformed `_auth` is treated as
//! absent so that a secure call is still denied rather than dropped.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::acl::{AuthToken, is_truthy};

/// Unary request addressed to a named action.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Message {
    /// Target action name.
    #[serde(default, deserialize_with = "action_name")]
    pub action: String,
    /// Positional arguments forwarded to the handler.
    #[serde(default, deserialize_with = "argument_list")]
    pub args: Vec<Value>,
    /// Whether the caller must pass authorization.
    #[serde(default, rename = "_isSecure", deserialize_with = "truthy_flag")]
    pub secure: bool,
    /// Caller identity, required when `secure` is set.
    #[serde(default, rename = "_auth", deserialize_with = "auth_token")]
    pub auth: Option<AuthToken>,
}

impl Message {
    /// Builds an unsecured message for `action` without arguments.
    #[must_use]
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Self::default()
        }
    }

    /// Replaces the positional arguments.
    #[must_use]
    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    /// Marks the message secure, presenting `auth` when supplied.
    #[must_use]
    pub fn secured(mut self, auth: Option<AuthToken>) -> Self {
        self.secure = true;
        self.auth = auth;
        self
    }
}

/// Metadata accompanying a streaming request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StreamMeta {
    /// Arguments used for authorization and by the handler.
    #[serde(default, deserialize_with = "argument_list")]
    pub args: Vec<Value>,
    /// Whether the caller must pass authorization.
    #[serde(default, rename = "_isSecure", deserialize_with = "truthy_flag")]
    pub secure: bool,
    /// Caller identity, required when `secure` is set.
    #[serde(default, rename = "_auth", deserialize_with = "auth_token")]
    pub auth: Option<AuthToken>,
}

impl StreamMeta {
    /// Marks the stream secure, presenting `auth` when supplied.
    #[must_use]
    pub fn secured(mut self, auth: Option<AuthToken>) -> Self {
        self.secure = true;
        self.auth = auth;
        self
    }
}

fn action_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(name) => name,
        _ => String::new(),
    })
}

fn argument_list<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(args) => args,
        _ => Vec::new(),
    })
}

fn auth_token<'de, D>(deserializer: D) -> Result<Option<AuthToken>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(AuthToken::deserialize(value).ok())
}

fn truthy_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(|value| is_truthy(&value))
}
