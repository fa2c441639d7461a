//! Manual override tables for values the header text does not encode.
//!
//! Reset values are keyed by `Type:Register`, enumerated value sets by
//! `Type:Register:Field`, where `Type` is the field prefix of the structure
//! type and `Register` is the member name as declared.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use svdgen_core::EnumeratedValue;

use crate::error::ProfileError;

/// Key of a per-register override.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegisterKey {
    pub type_name: String,
    pub register: String,
}

impl RegisterKey {
    pub fn new(type_name: impl Into<String>, register: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            register: register.into(),
        }
    }
}

impl fmt::Display for RegisterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.type_name, self.register)
    }
}

impl TryFrom<String> for RegisterKey {
    type Error = ProfileError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match split_key(&value)?.as_slice() {
            [type_name, register] => Ok(Self::new(*type_name, *register)),
            _ => Err(invalid_key(&value, "expected `Type:Register`")),
        }
    }
}

impl From<RegisterKey> for String {
    fn from(key: RegisterKey) -> Self {
        key.to_string()
    }
}

/// Key of a per-field override.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldKey {
    pub type_name: String,
    pub register: String,
    pub field: String,
}

impl FieldKey {
    pub fn new(
        type_name: impl Into<String>,
        register: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            register: register.into(),
            field: field.into(),
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.type_name, self.register, self.field)
    }
}

impl TryFrom<String> for FieldKey {
    type Error = ProfileError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match split_key(&value)?.as_slice() {
            [type_name, register, field] => Ok(Self::new(*type_name, *register, *field)),
            _ => Err(invalid_key(&value, "expected `Type:Register:Field`")),
        }
    }
}

impl From<FieldKey> for String {
    fn from(key: FieldKey) -> Self {
        key.to_string()
    }
}

fn invalid_key(key: &str, detail: &str) -> ProfileError {
    ProfileError::InvalidKey {
        key: key.to_owned(),
        detail: detail.to_owned(),
    }
}

fn split_key(value: &str) -> Result<Vec<&str>, ProfileError> {
    let parts: Vec<&str> = value.split(':').map(str::trim).collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(invalid_key(value, "empty component"));
    }
    Ok(parts)
}

/// Immutable override data for one device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideTables {
    reset_values: BTreeMap<RegisterKey, String>,
    enumerated_values: BTreeMap<FieldKey, Vec<EnumeratedValue>>,
}

impl OverrideTables {
    pub fn new(
        reset_values: BTreeMap<RegisterKey, String>,
        enumerated_values: BTreeMap<FieldKey, Vec<EnumeratedValue>>,
    ) -> Self {
        Self {
            reset_values,
            enumerated_values,
        }
    }

    pub fn reset_value(&self, key: &RegisterKey) -> Option<&str> {
        self.reset_values.get(key).map(String::as_str)
    }

    pub fn enumerated_values(&self, key: &FieldKey) -> Option<&[EnumeratedValue]> {
        self.enumerated_values.get(key).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.reset_values.len() + self.enumerated_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Records which override keys a run looked up successfully.
#[derive(Debug, Default)]
pub struct OverrideUsage {
    reset_values: BTreeSet<RegisterKey>,
    enumerated_values: BTreeSet<FieldKey>,
}

impl OverrideUsage {
    /// Look up a reset value and record the hit.
    pub fn reset_value<'t>(&mut self, tables: &'t OverrideTables, key: RegisterKey) -> Option<&'t str> {
        let value = tables.reset_value(&key)?;
        self.reset_values.insert(key);
        Some(value)
    }

    /// Look up an enumerated value set and record the hit.
    pub fn enumerated_values<'t>(
        &mut self,
        tables: &'t OverrideTables,
        key: FieldKey,
    ) -> Option<&'t [EnumeratedValue]> {
        let values = tables.enumerated_values(&key)?;
        self.enumerated_values.insert(key);
        Some(values)
    }

    /// Keys of `tables` that were never hit, in key order.
    pub fn unused(&self, tables: &OverrideTables) -> Vec<String> {
        let resets = tables
            .reset_values
            .keys()
            .filter(|k| !self.reset_values.contains(*k))
            .map(ToString::to_string);
        let enums = tables
            .enumerated_values
            .keys()
            .filter(|k| !self.enumerated_values.contains(*k))
            .map(ToString::to_string);
        resets.chain(enums).collect()
    }
}
