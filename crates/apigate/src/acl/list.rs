//! Typed permission table.
//!
//! The on-disk document maps each caller fingerprint to a permission set:
//! either the wildcard marker `"*"`, an object containing a truthy `"*"` key,
//! or an object mapping action names to truthy markers. A truthy top-level
//! `"*"` key grants everything to everyone. Truthiness follows the document's
//! native rules: `false`, `null`, `0`, and `""` are falsy.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use super::errors::AclLoadError;

/// Key (or marker) granting every action.
pub const WILDCARD: &str = "*";

/// Permissions held by a single fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionSet {
    /// Every action is permitted.
    All,
    /// Only the listed actions are permitted.
    Actions(HashSet<String>),
    /// The entry was present but not a usable permission set.
    Invalid,
}

impl PermissionSet {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::String(marker) if marker == WILDCARD => Self::All,
            Value::Object(entries) if entries.get(WILDCARD).is_some_and(is_truthy) => Self::All,
            Value::Object(entries) => Self::Actions(
                entries
                    .iter()
                    .filter(|(_, marker)| is_truthy(marker))
                    .map(|(action, _)| action.clone())
                    .collect(),
            ),
            _ => Self::Invalid,
        }
    }

    fn permits(&self, action: &str) -> bool {
        match self {
            Self::All => true,
            Self::Actions(actions) => actions.contains(action),
            Self::Invalid => false,
        }
    }
}

/// Immutable permission table keyed by caller fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessControlList {
    allow_all: bool,
    entries: HashMap<String, PermissionSet>,
}

impl AccessControlList {
    /// Parses the JSON document backing the table.
    ///
    /// # Errors
    ///
    /// Returns [`AclLoadError::Parse`] for invalid JSON and
    /// [`AclLoadError::NotAnObject`] when the top level is not an object.
    pub fn from_json(bytes: &[u8]) -> Result<Self, AclLoadError> {
        let document: Value = serde_json::from_slice(bytes)?;
        Self::from_value(&document)
    }

    /// Builds the table from an already parsed document.
    ///
    /// # Errors
    ///
    /// Returns [`AclLoadError::NotAnObject`] when the top level is not an
    /// object.
    pub fn from_value(document: &Value) -> Result<Self, AclLoadError> {
        let Value::Object(table) = document else {
            return Err(AclLoadError::NotAnObject);
        };
        Ok(Self::from_map(table))
    }

    fn from_map(table: &Map<String, Value>) -> Self {
        let allow_all = table.get(WILDCARD).is_some_and(is_truthy);
        let entries = table
            .iter()
            .filter(|(fingerprint, value)| fingerprint.as_str() != WILDCARD && is_truthy(value))
            .map(|(fingerprint, value)| (fingerprint.clone(), PermissionSet::from_value(value)))
            .collect();
        Self { allow_all, entries }
    }

    /// Returns `true` when `fingerprint` may run `action`.
    ///
    /// Evaluation short-circuits: a global wildcard allows everything, an
    /// unknown or invalid fingerprint entry denies, a per-fingerprint
    /// wildcard allows, and otherwise the action must be listed explicitly.
    #[must_use]
    pub fn is_permitted(&self, fingerprint: &str, action: &str) -> bool {
        if self.allow_all {
            return true;
        }
        self.entries
            .get(fingerprint)
            .is_some_and(|permissions| permissions.permits(action))
    }

    /// Returns `true` when the table carries the global wildcard.
    #[must_use]
    pub fn allows_all(&self) -> bool {
        self.allow_all
    }

    /// Permission set recorded for `fingerprint`.
    #[must_use]
    pub fn permissions(&self, fingerprint: &str) -> Option<&PermissionSet> {
        self.entries.get(fingerprint)
    }
}

/// Truthiness of a JSON marker.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
