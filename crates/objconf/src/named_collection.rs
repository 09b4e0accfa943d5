// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Named parameter collections
//!
//! A collection maps parameter names to values. Keys are unique and
//! normalized to lowercase; iteration order is the sorted key order, so
//! two collections with the same entries behave identically no matter
//! how they were built.

use crate::{EngineKind, Error, Result};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedCollection {
    entries: BTreeMap<String, String>,
}

impl NamedCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `key`, returning the previous value
    pub fn insert<K: AsRef<str>, V: Into<String>>(&mut self, key: K, value: V) -> Option<String> {
        self.entries
            .insert(key.as_ref().to_ascii_lowercase(), value.into())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// First present key out of `keys`, for parameters with aliases
    #[must_use]
    pub fn get_any(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| self.get(k))
    }

    #[must_use]
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// The value of a mandatory parameter
    pub fn require(&self, key: &str, engine: EngineKind) -> Result<&str> {
        self.get(key).ok_or_else(|| {
            Error::configuration(engine, format!("missing required parameter '{}'", key))
        })
    }

    /// Boolean parameter (`1`/`0`, `true`/`false`, `yes`/`no`)
    pub fn get_bool(&self, key: &str, engine: EngineKind) -> Result<Option<bool>> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(Some(true)),
            "0" | "false" | "no" => Ok(Some(false)),
            _ => Err(Error::configuration(
                engine,
                format!("parameter '{}' expects a boolean, got '{}'", key, value),
            )),
        }
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Check that every `required` key is present and no key falls
    /// outside `required` and `optional`
    pub fn validate_keys(
        &self,
        engine: EngineKind,
        required: &[&str],
        optional: &[&str],
    ) -> Result<()> {
        for key in required {
            _ = self.require(key, engine)?;
        }
        let unknown: Vec<&str> = self
            .entries
            .keys()
            .map(String::as_str)
            .filter(|k| !required.contains(k) && !optional.contains(k))
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(Error::configuration(
                engine,
                format!("unexpected parameters: {}", unknown.join(", ")),
            ))
        }
    }

    /// A copy of this collection with `overrides` applied on top
    #[must_use]
    pub fn with_overrides<'a, I>(&self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut merged = self.clone();
        for (key, value) in overrides {
            _ = merged.insert(key, value);
        }
        merged
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for NamedCollection {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut collection = Self::new();
        for (key, value) in iter {
            _ = collection.insert(key, value);
        }
        collection
    }
}
