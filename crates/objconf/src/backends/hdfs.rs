// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! HDFS and federated `viewfs` namespaces

use super::{
    format_from_collection, format_from_tail, format_tail, optional_keys, EngineKind,
    StorageBackend, TableDescriptor,
};
use crate::handle::BackendTarget;
use crate::{glob, Context, Error, NamedCollection, Result};

const ENGINE: EngineKind = EngineKind::Hdfs;
const SCHEMES: [&str; 2] = ["hdfs", "viewfs"];

/// Finalized HDFS connection description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HdfsTarget {
    /// `hdfs://host:port`
    pub namenode: String,
}

#[derive(Debug, Clone, Default)]
pub struct HdfsBackend;

fn split_url(url: &str) -> Result<(String, String)> {
    let (scheme, rest) = url
        .split_once("://")
        .ok_or_else(|| Error::configuration(ENGINE, format!("'{}' is not a URL", url)))?;
    if !SCHEMES.iter().any(|s| s.eq_ignore_ascii_case(scheme)) {
        return Err(Error::configuration(
            ENGINE,
            format!("unsupported URL scheme '{}', expected hdfs or viewfs", scheme),
        ));
    }
    let (authority, path) = match rest.find('/') {
        Some(i) => rest.split_at(i),
        None => (rest, "/"),
    };
    if authority.is_empty() {
        return Err(Error::configuration(
            ENGINE,
            format!("URL '{}' has no namenode", url),
        ));
    }
    Ok((
        format!("{}://{}", scheme.to_ascii_lowercase(), authority),
        path.to_string(),
    ))
}

impl HdfsBackend {
    fn apply_url(url: &str, descriptor: &mut TableDescriptor) -> Result<()> {
        let (namespace, path) = split_url(url)?;
        descriptor.namespace = namespace;
        descriptor.paths = vec![path];
        Ok(())
    }
}

impl StorageBackend for HdfsBackend {
    fn kind(&self) -> EngineKind {
        ENGINE
    }

    fn from_named_collection(
        &mut self,
        collection: &NamedCollection,
        descriptor: &mut TableDescriptor,
        _context: &Context,
    ) -> Result<()> {
        collection.validate_keys(ENGINE, &["url"], &optional_keys(&[]))?;
        Self::apply_url(collection.require("url", ENGINE)?, descriptor)?;
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
        let Some((url, rest)) = args.split_first() else {
            return Err(Error::configuration(ENGINE, "missing url argument"));
        };
        Self::apply_url(url, descriptor)?;
        format_from_tail(ENGINE, rest, &mut descriptor.format, context, with_structure)
    }

    fn to_args(&self, descriptor: &TableDescriptor) -> Vec<String> {
        let path = descriptor.paths.first().map_or("", String::as_str);
        let mut args = vec![format!("{}{}", descriptor.namespace, path)];
        args.extend(format_tail(&descriptor.format));
        args
    }

    fn data_source_description(&self, descriptor: &TableDescriptor) -> String {
        descriptor.namespace.clone()
    }

    fn target(&self, descriptor: &TableDescriptor) -> BackendTarget {
        BackendTarget::Hdfs(HdfsTarget {
            namenode: descriptor.namespace.clone(),
        })
    }

    fn path_without_glob(&self, path: &str) -> String {
        if glob::has_wildcard(path) {
            glob::align_to_delimiter(glob::literal_prefix(path)).to_string()
        } else {
            path.to_string()
        }
    }

    fn check(&self, descriptor: &TableDescriptor, _context: &Context) -> Result<()> {
        match descriptor.paths.iter().find(|p| !p.starts_with('/')) {
            Some(path) => Err(Error::validation(
                ENGINE,
                format!("path '{}' must be absolute", path),
            )),
            None => Ok(()),
        }
    }

    fn clone_box(&self) -> Box<dyn StorageBackend> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_url() {
        let (ns, path) = split_url("hdfs://namenode:9000/warehouse/t/*.orc").expect("split");
        assert_eq!(ns, "hdfs://namenode:9000");
        assert_eq!(path, "/warehouse/t/*.orc");

        let (ns, path) = split_url("viewfs://cluster").expect("root");
        assert_eq!(ns, "viewfs://cluster");
        assert_eq!(path, "/");

        assert!(split_url("hdfs:///no/authority").is_err());
        assert!(split_url("s3://bucket/key").is_err());
    }

    #[test]
    fn test_prefix_aligns_to_directory() {
        let backend = HdfsBackend;
        assert_eq!(backend.path_without_glob("/data/part-*.orc"), "/data/");
        assert_eq!(backend.path_without_glob("/data/x{1,2}/y"), "/data/");
        assert_eq!(backend.path_without_glob("/data/plain.orc"), "/data/plain.orc");
    }

    #[test]
    fn test_args_round_trip() {
        let ctx = Context::default();
        let mut backend = HdfsBackend;
        let mut d = TableDescriptor::default();
        let args = vec!["hdfs://nn:8020/t/*.parquet".to_string(), "Parquet".to_string()];
        backend.from_args(&args, &mut d, &ctx, false).expect("parse");

        let canonical = backend.to_args(&d);
        assert_eq!(canonical[0], "hdfs://nn:8020/t/*.parquet");
        let mut d2 = TableDescriptor::default();
        backend.from_args(&canonical, &mut d2, &ctx, true).expect("reparse");
        assert_eq!(d, d2);
    }
}
