// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Session context handed to initialization, validation and planning
//!
//! The context is built once per session and then only read. Cloning it
//! is cheap: settings and the collection registry sit behind `Arc`.

use crate::{NamedCollection, Settings};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct Context {
    settings: Arc<Settings>,
    named_collections: Arc<BTreeMap<String, NamedCollection>>,
    user_files_path: Option<PathBuf>,
}

impl Context {
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Arc::new(settings),
            ..Self::default()
        }
    }

    /// Register a named collection under `name`
    #[must_use]
    pub fn with_named_collection<S: Into<String>>(
        mut self,
        name: S,
        collection: NamedCollection,
    ) -> Self {
        _ = Arc::make_mut(&mut self.named_collections).insert(name.into(), collection);
        self
    }

    /// Root directory for relative local paths
    #[must_use]
    pub fn with_user_files_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.user_files_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn named_collection(&self, name: &str) -> Option<&NamedCollection> {
        self.named_collections.get(name)
    }

    #[must_use]
    pub fn user_files_path(&self) -> Option<&Path> {
        self.user_files_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup_is_exact() {
        let creds: NamedCollection = [("url", "s3://bucket/key")].into_iter().collect();
        let ctx = Context::default().with_named_collection("creds", creds.clone());
        assert_eq!(ctx.named_collection("creds"), Some(&creds));
        assert!(ctx.named_collection("CREDS").is_none());
        assert!(ctx.user_files_path().is_none());
    }

    #[test]
    fn test_clones_share_settings() {
        let ctx = Context::new(Settings::default()).with_user_files_path("/srv/files");
        let copy = ctx.clone();
        assert!(Arc::ptr_eq(&ctx.settings, &copy.settings));
        assert_eq!(copy.user_files_path(), Some(Path::new("/srv/files")));
    }
}
