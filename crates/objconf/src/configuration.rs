// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! The table configuration entity
//!
//! A [`Configuration`] starts empty, is initialized exactly once (see
//! [`Configuration::initialize`]) and is read-only afterwards apart from
//! its own setters. Location accessors fail with a usage error until
//! initialization has succeeded. Concurrent consumers each take their own
//! copy with [`Configuration::fan_out`] or `clone()`; no state is shared
//! between copies.

use crate::backends::{EngineKind, StorageBackend, TableDescriptor};
use crate::format::{DeferredField, FormatSpec, AUTO};
use crate::handle::{BackendAdapterFactory, StorageHandle};
use crate::{glob, Context, Error, QuerySettings, Result};
use diagnostics::*;

/// Placeholder substituted with a partition id when writing
pub const PARTITION_ID_WILDCARD: &str = "{_partition_id}";

/// Lifecycle of a configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    Uninitialized,
    Initializing,
    Initialized,
    /// Terminal; the instance must be discarded
    Failed,
}

#[derive(Debug, Clone)]
pub struct Configuration {
    pub(crate) descriptor: TableDescriptor,
    pub(crate) deferred: Vec<DeferredField>,
    pub(crate) state: InitState,
    pub(crate) backend: Box<dyn StorageBackend>,
}

impl Configuration {
    /// An empty, uninitialized configuration for `kind`
    #[must_use]
    pub fn new(kind: EngineKind) -> Self {
        Self::with_backend(kind.new_backend())
    }

    /// An empty configuration around a caller-provided backend
    #[must_use]
    pub fn with_backend(backend: Box<dyn StorageBackend>) -> Self {
        Self {
            descriptor: TableDescriptor::default(),
            deferred: Vec::new(),
            state: InitState::Uninitialized,
            backend,
        }
    }

    #[must_use]
    pub fn engine_kind(&self) -> EngineKind {
        self.backend.kind()
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.engine_kind().type_name()
    }

    #[must_use]
    pub fn engine_name(&self) -> &'static str {
        self.engine_kind().engine_name()
    }

    #[must_use]
    pub fn state(&self) -> InitState {
        self.state
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state == InitState::Initialized
    }

    pub(crate) fn assert_initialized(&self) -> Result<()> {
        match self.state {
            InitState::Initialized => Ok(()),
            InitState::Failed => Err(Error::usage(format!(
                "{} configuration failed to initialize and cannot be used",
                self.engine_name()
            ))),
            _ => Err(Error::usage(format!(
                "{} configuration is not initialized",
                self.engine_name()
            ))),
        }
    }

    // Format metadata

    #[must_use]
    pub fn format(&self) -> &str {
        &self.descriptor.format.format
    }

    #[must_use]
    pub fn compression_method(&self) -> &str {
        &self.descriptor.format.compression_method
    }

    #[must_use]
    pub fn structure(&self) -> &str {
        &self.descriptor.format.structure
    }

    #[must_use]
    pub fn format_spec(&self) -> &FormatSpec {
        &self.descriptor.format
    }

    /// Fields still `"auto"`, left to format and schema inference
    #[must_use]
    pub fn deferred(&self) -> &[DeferredField] {
        &self.deferred
    }

    pub fn set_format<S: Into<String>>(&mut self, format: S) {
        self.descriptor.format.format = format.into();
        self.refresh_deferred();
    }

    pub fn set_compression_method<S: Into<String>>(&mut self, method: S) -> Result<()> {
        let mut spec = self.descriptor.format.clone();
        spec.compression_method = method.into();
        spec.normalize_compression(self.engine_kind())?;
        self.descriptor.format = spec;
        self.refresh_deferred();
        Ok(())
    }

    pub fn set_structure<S: Into<String>>(&mut self, structure: S) {
        self.descriptor.format.structure = structure.into();
        self.refresh_deferred();
    }

    fn refresh_deferred(&mut self) {
        if self.is_initialized() {
            self.deferred = self.descriptor.format.deferred();
        }
    }

    // Location

    /// The first path
    pub fn path(&self) -> Result<&str> {
        self.assert_initialized()?;
        self.descriptor
            .paths
            .first()
            .map(String::as_str)
            .ok_or_else(|| Error::usage("configuration has no paths"))
    }

    pub fn paths(&self) -> Result<&[String]> {
        self.assert_initialized()?;
        Ok(&self.descriptor.paths)
    }

    /// Replace all paths with `path`
    pub fn set_path<S: Into<String>>(&mut self, path: S) -> Result<()> {
        self.set_paths(vec![path.into()])
    }

    /// Replace all paths; on an initialized instance the new list must be
    /// non-empty and every pattern well formed
    ///
    /// Paths are stored the way the backend stores parsed ones, so a
    /// relative local path lands under the user files directory.
    pub fn set_paths(&mut self, paths: Vec<String>) -> Result<()> {
        if !self.is_initialized() {
            self.descriptor.paths = paths;
            return Ok(());
        }
        if paths.is_empty() {
            return Err(Error::usage("a configuration needs at least one path"));
        }
        let engine = self.engine_kind();
        let resolved = paths
            .iter()
            .map(|path| {
                let path = self.backend.resolve_path(path);
                glob::validate(&path).map_err(|e| e.in_engine(engine))?;
                Ok(path)
            })
            .collect::<Result<Vec<_>>>()?;
        self.descriptor.paths = resolved;
        Ok(())
    }

    /// Bucket, container, namenode or local root
    pub fn namespace(&self) -> Result<&str> {
        self.assert_initialized()?;
        Ok(&self.descriptor.namespace)
    }

    pub fn data_source_description(&self) -> Result<String> {
        self.assert_initialized()?;
        Ok(self.backend.data_source_description(&self.descriptor))
    }

    pub fn query_settings(&self, context: &Context) -> Result<QuerySettings> {
        self.assert_initialized()?;
        Ok(QuerySettings::for_engine(
            self.engine_kind(),
            context.settings(),
        ))
    }

    // Glob queries; false before initialization

    #[must_use]
    pub fn is_path_with_globs(&self) -> bool {
        self.descriptor.paths.iter().any(|p| glob::has_wildcard(p))
    }

    #[must_use]
    pub fn is_namespace_with_globs(&self) -> bool {
        glob::has_wildcard(&self.descriptor.namespace)
    }

    #[must_use]
    pub fn with_globs(&self) -> bool {
        self.is_path_with_globs() || self.is_namespace_with_globs()
    }

    /// Literal listing prefix of the first path
    pub fn path_without_glob(&self) -> Result<String> {
        Ok(self.prefix_of(self.path()?))
    }

    pub(crate) fn prefix_of(&self, path: &str) -> String {
        self.backend.path_without_glob(path)
    }

    pub(crate) fn object_key(&self, path: &str) -> String {
        self.backend.object_key(path)
    }

    // Partitioned writes

    #[must_use]
    pub fn with_partition_wildcard(&self) -> bool {
        self.descriptor.namespace.contains(PARTITION_ID_WILDCARD)
            || self
                .descriptor
                .paths
                .iter()
                .any(|p| p.contains(PARTITION_ID_WILDCARD))
    }

    /// The first path with the partition placeholder replaced by `id`
    pub fn partition_path(&self, id: &str) -> Result<String> {
        let path = self.path()?;
        if id.is_empty() {
            return Err(Error::validation(
                self.engine_kind(),
                "partition id must not be empty",
            ));
        }
        if let Some(bad) = id.chars().find(|c| *c == '/' || c.is_control()) {
            return Err(Error::validation(
                self.engine_kind(),
                format!("partition id '{}' contains illegal character {:?}", id.escape_debug(), bad),
            ));
        }
        Ok(path.replace(PARTITION_ID_WILDCARD, id))
    }

    // Validation and handles

    /// Backend structural checks plus namespace naming rules
    ///
    /// Side-effect free; calling it repeatedly gives the same answer.
    pub fn check(&self, context: &Context) -> Result<()> {
        self.assert_initialized()?;
        self.backend.check(&self.descriptor, context)?;
        if !self.is_namespace_with_globs() {
            self.validate_namespace(&self.descriptor.namespace)?;
        }
        Ok(())
    }

    pub fn validate_namespace(&self, name: &str) -> Result<()> {
        self.backend.validate_namespace(name)
    }

    /// Hand the finalized target to `factory`
    ///
    /// Each call yields an independent handle and leaves the
    /// configuration unchanged.
    pub fn create_backend_handle(
        &self,
        factory: &dyn BackendAdapterFactory,
        context: &Context,
        is_readonly: bool,
    ) -> Result<StorageHandle> {
        self.assert_initialized()?;
        let target = self.backend.target(&self.descriptor);
        info!(
            "Creating {engine} storage handle, readonly: {readonly}",
            engine: self.engine_name(),
            readonly: is_readonly
        );
        let store = factory.create(&target, context, is_readonly)?;
        Ok(StorageHandle::new(store, self.engine_kind(), is_readonly))
    }

    #[must_use]
    pub fn is_static_configuration(&self) -> bool {
        self.backend.is_static_configuration()
    }

    /// `n` independent copies for parallel consumers
    #[must_use]
    pub fn fan_out(&self, n: usize) -> Vec<Configuration> {
        (0..n).map(|_| self.clone()).collect()
    }

    /// `true` when no format field is left to inference
    #[must_use]
    pub fn is_fully_specified(&self) -> bool {
        [self.format(), self.compression_method(), self.structure()]
            .iter()
            .all(|v| !v.eq_ignore_ascii_case(AUTO))
    }
}
