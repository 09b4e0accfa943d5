// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Turning a finalized configuration into an I/O handle
//!
//! Configurations never talk to a backend themselves. They describe the
//! connection as a [`BackendTarget`] and hand it to a
//! [`BackendAdapterFactory`], which returns an [`ObjectStore`].

use crate::backends::{AzureTarget, HdfsTarget, LocalTarget, S3Credentials, S3Target};
use crate::{Context, EngineKind, Error, Result};
use diagnostics::*;
use object_store::ObjectStore;
use object_store::aws::AmazonS3Builder;
use object_store::azure::{AzureConfigKey, MicrosoftAzureBuilder};
use object_store::local::LocalFileSystem;
use std::fmt;
use std::sync::Arc;

/// Typed connection description produced by a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendTarget {
    S3(S3Target),
    Azure(AzureTarget),
    Hdfs(HdfsTarget),
    Local(LocalTarget),
}

impl BackendTarget {
    #[must_use]
    pub fn kind(&self) -> EngineKind {
        match self {
            BackendTarget::S3(_) => EngineKind::S3,
            BackendTarget::Azure(_) => EngineKind::Azure,
            BackendTarget::Hdfs(_) => EngineKind::Hdfs,
            BackendTarget::Local(_) => EngineKind::Local,
        }
    }
}

/// Builds the storage behind a configuration
pub trait BackendAdapterFactory: Send + Sync {
    fn create(
        &self,
        target: &BackendTarget,
        context: &Context,
        is_readonly: bool,
    ) -> Result<Arc<dyn ObjectStore>>;
}

/// An I/O handle and the intent it was created with
#[derive(Clone)]
pub struct StorageHandle {
    store: Arc<dyn ObjectStore>,
    engine: EngineKind,
    readonly: bool,
}

impl fmt::Debug for StorageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageHandle")
            .field("store", &self.store.to_string())
            .field("engine", &self.engine)
            .field("readonly", &self.readonly)
            .finish()
    }
}

impl StorageHandle {
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, engine: EngineKind, readonly: bool) -> Self {
        Self {
            store,
            engine,
            readonly,
        }
    }

    /// The store for reading and listing
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    #[must_use]
    pub fn engine(&self) -> EngineKind {
        self.engine
    }

    #[must_use]
    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    /// The store for writing; fails on a handle opened read-only
    pub fn writable_store(&self) -> Result<&Arc<dyn ObjectStore>> {
        if self.readonly {
            return Err(Error::usage(format!(
                "{} storage handle was opened read-only",
                self.engine
            )));
        }
        Ok(&self.store)
    }
}

/// Default factory backed by the `object_store` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectStoreAdapterFactory;

impl ObjectStoreAdapterFactory {
    fn s3(target: &S3Target) -> Result<Arc<dyn ObjectStore>> {
        if crate::glob::has_wildcard(&target.bucket) {
            return Err(Error::configuration(
                EngineKind::S3,
                format!("cannot open a store for bucket pattern '{}'", target.bucket),
            ));
        }

        let mut builder = match target.credentials {
            S3Credentials::Default => AmazonS3Builder::from_env(),
            _ => AmazonS3Builder::new(),
        }
        .with_bucket_name(&target.bucket);

        if let Some(region) = &target.region {
            builder = builder.with_region(region);
        }

        if let Some(endpoint) = &target.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }

        builder = match &target.credentials {
            S3Credentials::Default => builder,
            S3Credentials::NoSign => builder.with_skip_signature(true),
            S3Credentials::Static {
                access_key_id,
                secret_access_key,
                session_token,
            } => {
                let builder = builder
                    .with_access_key_id(access_key_id)
                    .with_secret_access_key(secret_access_key);
                match session_token {
                    Some(token) => builder.with_token(token),
                    None => builder,
                }
            }
        };

        Ok(Arc::new(builder.build()?))
    }

    fn azure(target: &AzureTarget) -> Result<Arc<dyn ObjectStore>> {
        let mut builder = MicrosoftAzureBuilder::new().with_container_name(&target.container);
        if let Some(account) = &target.account {
            builder = builder.with_account(account);
        }
        if let Some(key) = &target.access_key {
            builder = builder.with_access_key(key);
        }
        if let Some(endpoint) = &target.endpoint {
            builder = builder
                .with_config(AzureConfigKey::Endpoint, endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }
        Ok(Arc::new(builder.build()?))
    }

    fn local(target: &LocalTarget, is_readonly: bool) -> Result<Arc<dyn ObjectStore>> {
        if let Some(root) = &target.root
            && !is_readonly
        {
            std::fs::create_dir_all(root)?;
        }
        Ok(Arc::new(LocalFileSystem::new()))
    }
}

impl BackendAdapterFactory for ObjectStoreAdapterFactory {
    fn create(
        &self,
        target: &BackendTarget,
        _context: &Context,
        is_readonly: bool,
    ) -> Result<Arc<dyn ObjectStore>> {
        let engine = target.kind().engine_name();
        debug!("Building object store for {engine}, readonly: {is_readonly}", engine: engine, is_readonly: is_readonly);

        match target {
            BackendTarget::S3(s3) => Self::s3(s3),
            BackendTarget::Azure(azure) => Self::azure(azure),
            BackendTarget::Local(local) => Self::local(local, is_readonly),
            BackendTarget::Hdfs(_) => Err(Error::UnsupportedBackend {
                engine: EngineKind::Hdfs,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s3_target(credentials: S3Credentials) -> BackendTarget {
        BackendTarget::S3(S3Target {
            bucket: "data-lake".to_string(),
            endpoint: Some("http://localhost:9000".to_string()),
            region: None,
            credentials,
        })
    }

    #[test]
    fn test_builds_s3_store_without_network() {
        let factory = ObjectStoreAdapterFactory;
        let target = s3_target(S3Credentials::Static {
            access_key_id: "AKID".to_string(),
            secret_access_key: "SECRET".to_string(),
            session_token: None,
        });
        assert_eq!(target.kind(), EngineKind::S3);
        let store = factory.create(&target, &Context::default(), true);
        assert!(store.is_ok());

        let store = factory.create(&s3_target(S3Credentials::NoSign), &Context::default(), true);
        assert!(store.is_ok());
    }

    #[test]
    fn test_globbed_bucket_cannot_be_opened() {
        let target = BackendTarget::S3(S3Target {
            bucket: "logs-*".to_string(),
            endpoint: None,
            region: None,
            credentials: S3Credentials::NoSign,
        });
        let err = ObjectStoreAdapterFactory
            .create(&target, &Context::default(), true)
            .expect_err("pattern bucket");
        assert!(err.is_configuration());
    }

    #[test]
    fn test_hdfs_is_unsupported() {
        let target = BackendTarget::Hdfs(HdfsTarget {
            namenode: "hdfs://nn:8020".to_string(),
        });
        let err = ObjectStoreAdapterFactory
            .create(&target, &Context::default(), true)
            .expect_err("hdfs");
        assert!(matches!(err, Error::UnsupportedBackend { engine: EngineKind::Hdfs }));
    }

    #[test]
    fn test_readonly_handle_refuses_writes() {
        let store: Arc<dyn ObjectStore> = Arc::new(object_store::memory::InMemory::new());
        let handle = StorageHandle::new(store.clone(), EngineKind::Local, true);
        assert!(handle.writable_store().expect_err("readonly").is_usage());

        let handle = StorageHandle::new(store, EngineKind::Local, false);
        assert!(handle.writable_store().is_ok());
        assert!(!handle.is_readonly());
    }
}
