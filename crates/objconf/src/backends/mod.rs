// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Backend variants of the table configuration
//!
//! Each backend kind implements [`StorageBackend`]. The trait is flat:
//! shared state (format metadata, namespace, paths) lives in
//! [`TableDescriptor`], and a backend only supplies argument parsing,
//! validation and the connection target handed to the adapter factory.

mod azure;
mod hdfs;
mod local;
mod s3;

pub use azure::{AzureBackend, AzureConnection, AzureTarget};
pub use hdfs::{HdfsBackend, HdfsTarget};
pub use local::{LocalBackend, LocalTarget};
pub use s3::{S3Backend, S3Credentials, S3Target};

use crate::format::{is_auto, FormatSpec};
use crate::handle::BackendTarget;
use crate::{glob, Context, Error, NamedCollection, Result};
use std::fmt;
use std::str::FromStr;

/// Backend kinds a configuration can describe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EngineKind {
    S3,
    Azure,
    Hdfs,
    Local,
}

impl EngineKind {
    pub const ALL: [EngineKind; 4] = [
        EngineKind::S3,
        EngineKind::Azure,
        EngineKind::Hdfs,
        EngineKind::Local,
    ];

    /// Short lowercase name used in settings sections and logs
    #[must_use]
    pub fn type_name(self) -> &'static str {
        match self {
            EngineKind::S3 => "s3",
            EngineKind::Azure => "azure",
            EngineKind::Hdfs => "hdfs",
            EngineKind::Local => "local",
        }
    }

    /// Table engine name as written in table definitions
    #[must_use]
    pub fn engine_name(self) -> &'static str {
        match self {
            EngineKind::S3 => "S3",
            EngineKind::Azure => "AzureBlobStorage",
            EngineKind::Hdfs => "HDFS",
            EngineKind::Local => "File",
        }
    }

    /// An empty backend of this kind
    #[must_use]
    pub fn new_backend(self) -> Box<dyn StorageBackend> {
        match self {
            EngineKind::S3 => Box::new(S3Backend::default()),
            EngineKind::Azure => Box::new(AzureBackend::default()),
            EngineKind::Hdfs => Box::new(HdfsBackend::default()),
            EngineKind::Local => Box::new(LocalBackend::default()),
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.engine_name())
    }
}

impl FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        EngineKind::ALL
            .into_iter()
            .find(|kind| {
                kind.type_name().eq_ignore_ascii_case(s) || kind.engine_name().eq_ignore_ascii_case(s)
            })
            .ok_or_else(|| format!("Unknown storage engine: {}", s))
    }
}

/// Location and format state shared by every backend kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableDescriptor {
    pub format: FormatSpec,
    /// Bucket, container, namenode or local root
    pub namespace: String,
    /// Ordered; the order feeds downstream partition ordering
    pub paths: Vec<String>,
}

/// The backend-specific half of a configuration
pub trait StorageBackend: fmt::Debug + Send + Sync {
    fn kind(&self) -> EngineKind;

    /// Fill `descriptor` and backend state from a named collection
    fn from_named_collection(
        &mut self,
        collection: &NamedCollection,
        descriptor: &mut TableDescriptor,
        context: &Context,
    ) -> Result<()>;

    /// Fill `descriptor` and backend state from positional arguments
    ///
    /// `with_structure` reserves the slot after the format for a schema.
    fn from_args(
        &mut self,
        args: &[String],
        descriptor: &mut TableDescriptor,
        context: &Context,
        with_structure: bool,
    ) -> Result<()>;

    /// Canonical positional form including format and structure slots
    fn to_args(&self, descriptor: &TableDescriptor) -> Vec<String>;

    fn data_source_description(&self, descriptor: &TableDescriptor) -> String;

    /// Connection description for the adapter factory
    fn target(&self, descriptor: &TableDescriptor) -> BackendTarget;

    /// Stored form of a path set after initialization
    fn resolve_path(&self, path: &str) -> String {
        path.to_string()
    }

    /// Literal part of `path` usable as a listing prefix
    fn path_without_glob(&self, path: &str) -> String {
        glob::literal_prefix(path).to_string()
    }

    /// Key handed to `object_store` for a stored path
    ///
    /// Store keys never start with `/`.
    fn object_key(&self, path: &str) -> String {
        path.trim_start_matches('/').to_string()
    }

    /// Structural validation; must not change any state
    fn check(&self, _descriptor: &TableDescriptor, _context: &Context) -> Result<()> {
        Ok(())
    }

    /// Naming rules for the namespace; permissive unless overridden
    fn validate_namespace(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    fn is_static_configuration(&self) -> bool {
        true
    }

    fn clone_box(&self) -> Box<dyn StorageBackend>;
}

impl Clone for Box<dyn StorageBackend> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Format-related keys every backend accepts in a named collection
pub(crate) const FORMAT_KEYS: [&str; 4] = ["format", "compression", "compression_method", "structure"];

/// Optional keys of a backend plus the format keys
pub(crate) fn optional_keys<'a>(backend_keys: &[&'a str]) -> Vec<&'a str> {
    backend_keys.iter().copied().chain(FORMAT_KEYS).collect()
}

pub(crate) fn format_from_collection(collection: &NamedCollection, format: &mut FormatSpec) {
    if let Some(value) = collection.get("format") {
        format.format = value.to_string();
    }
    if let Some(value) = collection.get_any(&["compression_method", "compression"]) {
        format.compression_method = value.to_string();
    }
    if let Some(value) = collection.get("structure") {
        format.structure = value.to_string();
    }
}

pub(crate) fn is_format_arg(context: &Context, value: &str) -> bool {
    is_auto(value) || context.settings().is_known_format(value)
}

/// Parse the trailing `format [, structure] [, compression]` arguments
pub(crate) fn format_from_tail(
    engine: EngineKind,
    tail: &[String],
    format: &mut FormatSpec,
    context: &Context,
    with_structure: bool,
) -> Result<()> {
    let max = if with_structure { 3 } else { 2 };
    if tail.len() > max {
        return Err(Error::configuration(
            engine,
            format!(
                "too many arguments: expected at most {} after the location, got {}",
                max,
                tail.len()
            ),
        ));
    }

    let mut rest = tail.iter();
    if let Some(name) = rest.next() {
        if !is_format_arg(context, name) {
            return Err(Error::configuration(
                engine,
                format!("unknown format '{}'", name),
            ));
        }
        format.format = name.clone();
    }
    if with_structure && let Some(structure) = rest.next() {
        format.structure = structure.clone();
    }
    if let Some(compression) = rest.next() {
        format.compression_method = compression.clone();
    }
    Ok(())
}

/// `[format, structure, compression]` for canonical positional output
pub(crate) fn format_tail(format: &FormatSpec) -> [String; 3] {
    [
        format.format.clone(),
        format.structure.clone(),
        format.compression_method.clone(),
    ]
}
