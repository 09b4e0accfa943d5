// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Session settings, usually parsed from YAML.
//!
//! ```yaml
//! default_format: Parquet
//! default_compression: zstd
//! schema_inference_mode: union
//! allow_named_collection_override: false
//!
//! s3:
//!   skip_empty_files: true
//!   throw_on_zero_files_match: true
//! file:
//!   truncate_on_insert: true
//! ```
//!
//! Every field is optional.

use crate::{EngineKind, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Listing and write policy for one backend kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendSettings {
    pub skip_empty_files: bool,
    pub truncate_on_insert: bool,
    pub create_new_file_on_insert: bool,
    pub ignore_missing_files: bool,
    pub throw_on_zero_files_match: bool,
}

/// How inferred schemas from several files are combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaInferenceMode {
    /// Take the schema of the first file that yields one
    #[default]
    Default,
    /// Union the schemas of all files
    Union,
}

/// Session-wide settings consulted during initialization and planning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Applied to a format left as `auto`
    pub default_format: Option<String>,
    /// Applied to a compression method left as `auto`
    pub default_compression: Option<String>,
    /// Format names accepted in arguments (matched case-insensitively)
    pub known_formats: Vec<String>,
    pub schema_inference_use_cache: bool,
    pub schema_inference_mode: SchemaInferenceMode,
    pub allow_named_collection_override: bool,
    pub s3: BackendSettings,
    pub azure: BackendSettings,
    pub hdfs: BackendSettings,
    pub file: BackendSettings,
}

fn default_known_formats() -> Vec<String> {
    [
        "CSV",
        "CSVWithNames",
        "CSVWithNamesAndTypes",
        "TSV",
        "TabSeparated",
        "TSVWithNames",
        "TSVRaw",
        "JSON",
        "JSONEachRow",
        "JSONCompactEachRow",
        "JSONLines",
        "NDJSON",
        "Parquet",
        "ORC",
        "Avro",
        "Arrow",
        "ArrowStream",
        "Native",
        "RowBinary",
        "Values",
        "LineAsString",
        "RawBLOB",
        "TSKV",
        "Npy",
        "Protobuf",
        "MsgPack",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_format: None,
            default_compression: None,
            known_formats: default_known_formats(),
            schema_inference_use_cache: true,
            schema_inference_mode: SchemaInferenceMode::Default,
            allow_named_collection_override: true,
            s3: BackendSettings::default(),
            azure: BackendSettings::default(),
            hdfs: BackendSettings::default(),
            file: BackendSettings::default(),
        }
    }
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// The policy section for `kind`
    #[must_use]
    pub fn backend(&self, kind: EngineKind) -> &BackendSettings {
        match kind {
            EngineKind::S3 => &self.s3,
            EngineKind::Azure => &self.azure,
            EngineKind::Hdfs => &self.hdfs,
            EngineKind::Local => &self.file,
        }
    }

    #[must_use]
    pub fn is_known_format(&self, name: &str) -> bool {
        self.known_formats
            .iter()
            .any(|known| known.eq_ignore_ascii_case(name))
    }
}
