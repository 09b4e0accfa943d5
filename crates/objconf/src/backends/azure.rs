// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Azure Blob Storage

use super::{
    format_from_collection, format_from_tail, format_tail, is_format_arg, optional_keys,
    EngineKind, StorageBackend, TableDescriptor,
};
use crate::handle::BackendTarget;
use crate::{Context, Error, NamedCollection, Result};
use std::fmt;

const ENGINE: EngineKind = EngineKind::Azure;
const BLOB_HOST_SUFFIX: &str = ".blob.core.windows.net";

/// How the storage account is reached
#[derive(Clone, PartialEq, Eq)]
pub enum AzureConnection {
    /// `AccountName=...;AccountKey=...;BlobEndpoint=...`
    ConnectionString(String),
    /// `https://account.blob.core.windows.net`
    StorageAccountUrl(String),
}

impl Default for AzureConnection {
    fn default() -> Self {
        AzureConnection::StorageAccountUrl(String::new())
    }
}

impl AzureConnection {
    /// Positional arguments do not say which form they carry
    fn detect(value: &str) -> Self {
        let lower = value.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            AzureConnection::StorageAccountUrl(value.to_string())
        } else {
            AzureConnection::ConnectionString(value.to_string())
        }
    }

    fn as_str(&self) -> &str {
        match self {
            AzureConnection::ConnectionString(s) | AzureConnection::StorageAccountUrl(s) => s,
        }
    }

    /// Value of `key` in a connection string
    fn field(&self, key: &str) -> Option<&str> {
        let AzureConnection::ConnectionString(s) = self else {
            return None;
        };
        s.split(';')
            .filter_map(|part| part.split_once('='))
            .find(|(k, _)| k.trim().eq_ignore_ascii_case(key))
            .map(|(_, v)| v.trim())
    }

    fn account_from_url(&self) -> Option<&str> {
        let AzureConnection::StorageAccountUrl(url) = self else {
            return None;
        };
        let (_, rest) = url.split_once("://")?;
        let host = rest.split('/').next()?;
        host.strip_suffix(BLOB_HOST_SUFFIX)
    }
}

impl fmt::Debug for AzureConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AzureConnection::ConnectionString(_) => {
                f.write_str("ConnectionString(<redacted>)")
            }
            AzureConnection::StorageAccountUrl(url) => {
                f.debug_tuple("StorageAccountUrl").field(url).finish()
            }
        }
    }
}

/// Finalized Azure connection description
#[derive(Clone, PartialEq, Eq)]
pub struct AzureTarget {
    pub container: String,
    pub account: Option<String>,
    pub access_key: Option<String>,
    /// Custom blob endpoint (emulators, sovereign clouds)
    pub endpoint: Option<String>,
}

impl fmt::Debug for AzureTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureTarget")
            .field("container", &self.container)
            .field("account", &self.account)
            .field("access_key", &self.access_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[derive(Clone, Default)]
pub struct AzureBackend {
    connection: AzureConnection,
    account_name: Option<String>,
    account_key: Option<String>,
}

impl fmt::Debug for AzureBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureBackend")
            .field("connection", &self.connection)
            .field("account_name", &self.account_name)
            .field("account_key", &self.account_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AzureBackend {
    fn account(&self) -> Option<String> {
        self.account_name
            .as_deref()
            .or_else(|| self.connection.field("AccountName"))
            .or_else(|| self.connection.account_from_url())
            .map(str::to_string)
    }

    fn access_key(&self) -> Option<String> {
        self.account_key
            .as_deref()
            .or_else(|| self.connection.field("AccountKey"))
            .map(str::to_string)
    }

    fn endpoint(&self) -> Option<String> {
        match &self.connection {
            AzureConnection::ConnectionString(_) => {
                self.connection.field("BlobEndpoint").map(str::to_string)
            }
            AzureConnection::StorageAccountUrl(url) if self.connection.account_from_url().is_none() => {
                Some(url.trim_end_matches('/').to_string())
            }
            AzureConnection::StorageAccountUrl(_) => None,
        }
    }
}

impl StorageBackend for AzureBackend {
    fn kind(&self) -> EngineKind {
        ENGINE
    }

    fn from_named_collection(
        &mut self,
        collection: &NamedCollection,
        descriptor: &mut TableDescriptor,
        _context: &Context,
    ) -> Result<()> {
        collection.validate_keys(
            ENGINE,
            &["container", "blob_path"],
            &optional_keys(&[
                "connection_string",
                "storage_account_url",
                "account_name",
                "account_key",
            ]),
        )?;

        self.connection = match (
            collection.get("connection_string"),
            collection.get("storage_account_url"),
        ) {
            (Some(conn), None) => AzureConnection::ConnectionString(conn.to_string()),
            (None, Some(url)) => AzureConnection::StorageAccountUrl(url.to_string()),
            (Some(_), Some(_)) => {
                return Err(Error::configuration(
                    ENGINE,
                    "connection_string and storage_account_url are mutually exclusive",
                ));
            }
            (None, None) => {
                return Err(Error::configuration(
                    ENGINE,
                    "one of connection_string or storage_account_url is required",
                ));
            }
        };
        self.account_name = collection.get("account_name").map(str::to_string);
        self.account_key = collection.get("account_key").map(str::to_string);

        descriptor.namespace = collection.require("container", ENGINE)?.to_string();
        descriptor.paths = vec![collection.require("blob_path", ENGINE)?.to_string()];
        format_from_collection(collection, &mut descriptor.format);
        Ok(())
    }

    fn from_args(
        &mut self,
        args: &[String],
        descriptor: &mut TableDescriptor,
        context: &Context,
        with_structure: bool,
    ) -> Result<()> {
        let [conn, container, blob_path, rest @ ..] = args else {
            return Err(Error::configuration(
                ENGINE,
                format!(
                    "expected at least 3 arguments (connection, container, blob_path), got {}",
                    args.len()
                ),
            ));
        };
        self.connection = AzureConnection::detect(conn);
        descriptor.namespace = container.clone();
        descriptor.paths = vec![blob_path.clone()];

        let mut rest = rest;
        self.account_name = None;
        self.account_key = None;
        if rest.len() >= 2 && !is_format_arg(context, &rest[0]) {
            self.account_name = Some(rest[0].clone());
            self.account_key = Some(rest[1].clone());
            rest = &rest[2..];
        }

        format_from_tail(ENGINE, rest, &mut descriptor.format, context, with_structure)
    }

    fn to_args(&self, descriptor: &TableDescriptor) -> Vec<String> {
        let mut args = vec![
            self.connection.as_str().to_string(),
            descriptor.namespace.clone(),
            descriptor.paths.first().cloned().unwrap_or_default(),
        ];
        if let (Some(name), Some(key)) = (&self.account_name, &self.account_key) {
            args.push(name.clone());
            args.push(key.clone());
        }
        args.extend(format_tail(&descriptor.format));
        args
    }

    fn data_source_description(&self, descriptor: &TableDescriptor) -> String {
        match self.account() {
            Some(account) => format!(
                "https://{}{}/{}",
                account, BLOB_HOST_SUFFIX, descriptor.namespace
            ),
            None => format!("azure://{}", descriptor.namespace),
        }
    }

    fn target(&self, descriptor: &TableDescriptor) -> BackendTarget {
        BackendTarget::Azure(AzureTarget {
            container: descriptor.namespace.clone(),
            account: self.account(),
            access_key: self.access_key(),
            endpoint: self.endpoint(),
        })
    }

    fn check(&self, descriptor: &TableDescriptor, _context: &Context) -> Result<()> {
        if self.account_name.is_some() != self.account_key.is_some() {
            return Err(Error::validation(
                ENGINE,
                "account_name and account_key must be given together",
            ));
        }
        if let AzureConnection::ConnectionString(_) = self.connection
            && self.connection.field("AccountName").is_none()
            && self.connection.field("BlobEndpoint").is_none()
        {
            return Err(Error::validation(
                ENGINE,
                "connection string has neither AccountName nor BlobEndpoint",
            ));
        }
        if self.connection.as_str().is_empty() {
            return Err(Error::validation(ENGINE, "connection must not be empty"));
        }
        if descriptor.paths.iter().any(String::is_empty) {
            return Err(Error::validation(ENGINE, "blob path must not be empty"));
        }
        Ok(())
    }

    fn validate_namespace(&self, name: &str) -> Result<()> {
        let fail = |reason: &str| {
            Err(Error::validation(
                ENGINE,
                format!("invalid container name '{}': {}", name, reason),
            ))
        };
        if !(3..=63).contains(&name.len()) {
            return fail("must be between 3 and 63 characters long");
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return fail("only lowercase letters, digits and '-' are allowed");
        }
        if !name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
            return fail("must start with a letter or digit");
        }
        if name.ends_with('-') || name.contains("--") {
            return fail("hyphens must not be trailing or consecutive");
        }
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn StorageBackend> {
        Box::new(self.clone())
    }
}
