// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Table configuration for object-storage backed tables
//!
//! A [`Configuration`] is the validated description of where a table
//! lives (S3, Azure Blob Storage, HDFS or the local filesystem), which
//! objects belong to it (possibly via glob patterns) and how they are
//! encoded. It is built from a named collection or positional engine
//! arguments, checked against backend naming rules, and turned into an
//! `object_store` handle and a prefix-scoped [`ListingPlan`].
//!
//! ```no_run
//! use objconf::{Configuration, Context, EngineArgs, EngineKind};
//!
//! # fn main() -> objconf::Result<()> {
//! let context = Context::default();
//! let mut config = Configuration::new(EngineKind::S3);
//! config.initialize(
//!     &EngineArgs::literals(["s3://logs/2024/*.json", "NOSIGN", "JSONEachRow"]),
//!     &context,
//!     false,
//! )?;
//! config.check(&context)?;
//! assert_eq!(config.path_without_glob()?, "2024/");
//! # Ok(())
//! # }
//! ```

pub mod args;
pub mod backends;
pub mod configuration;
pub mod context;
pub mod error;
pub mod format;
pub mod glob;
pub mod handle;
pub mod listing;
pub mod named_collection;
pub mod query_settings;
mod resolver;
pub mod settings;

pub use args::{ArgumentSource, EngineArg, EngineArgs};
pub use backends::{EngineKind, StorageBackend, TableDescriptor};
pub use configuration::{Configuration, InitState, PARTITION_ID_WILDCARD};
pub use context::Context;
pub use error::{Error, Result};
pub use format::{CompressionMethod, DeferredField, FormatSpec, AUTO};
pub use glob::GlobPattern;
pub use handle::{BackendAdapterFactory, BackendTarget, ObjectStoreAdapterFactory, StorageHandle};
pub use listing::{list_matching, ListingPlan, PathListing};
pub use named_collection::NamedCollection;
pub use query_settings::{InsertMode, QuerySettings};
pub use settings::{BackendSettings, SchemaInferenceMode, Settings};
