// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Listing and read/write policy derived from (configuration, context)

use crate::settings::SchemaInferenceMode;
use crate::{EngineKind, Settings};

/// What an insert into an existing object should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertMode {
    /// Overwrite the existing object
    Truncate,
    /// Write a new sibling object with a numbered suffix
    CreateNewFile,
    /// Fail because the object already exists
    Reject,
}

/// Policy consumed by the execution layer
///
/// A pure function of the backend kind and the session settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySettings {
    pub truncate_on_insert: bool,
    pub create_new_file_on_insert: bool,
    pub schema_inference_use_cache: bool,
    pub schema_inference_mode: SchemaInferenceMode,
    pub skip_empty_files: bool,
    pub ignore_non_existent_file: bool,
    pub throw_on_zero_files_match: bool,
}

impl QuerySettings {
    #[must_use]
    pub fn for_engine(engine: EngineKind, settings: &Settings) -> Self {
        let backend = settings.backend(engine);
        Self {
            truncate_on_insert: backend.truncate_on_insert,
            create_new_file_on_insert: backend.create_new_file_on_insert,
            schema_inference_use_cache: settings.schema_inference_use_cache,
            schema_inference_mode: settings.schema_inference_mode,
            skip_empty_files: backend.skip_empty_files,
            ignore_non_existent_file: backend.ignore_missing_files,
            throw_on_zero_files_match: backend.throw_on_zero_files_match,
        }
    }

    /// Truncation wins over creating a new file
    #[must_use]
    pub fn insert_mode(&self) -> InsertMode {
        if self.truncate_on_insert {
            InsertMode::Truncate
        } else if self.create_new_file_on_insert {
            InsertMode::CreateNewFile
        } else {
            InsertMode::Reject
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_are_per_engine() {
        let mut settings = Settings::default();
        settings.s3.skip_empty_files = true;
        settings.file.create_new_file_on_insert = true;

        let s3 = QuerySettings::for_engine(EngineKind::S3, &settings);
        assert!(s3.skip_empty_files);
        assert_eq!(s3.insert_mode(), InsertMode::Reject);

        let local = QuerySettings::for_engine(EngineKind::Local, &settings);
        assert!(!local.skip_empty_files);
        assert_eq!(local.insert_mode(), InsertMode::CreateNewFile);
    }

    #[test]
    fn test_truncate_wins() {
        let mut settings = Settings::default();
        settings.azure.truncate_on_insert = true;
        settings.azure.create_new_file_on_insert = true;
        let qs = QuerySettings::for_engine(EngineKind::Azure, &settings);
        assert_eq!(qs.insert_mode(), InsertMode::Truncate);
        assert_eq!(qs, QuerySettings::for_engine(EngineKind::Azure, &settings));
    }
}
