// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Local filesystem tables

use super::{
    format_from_collection, format_from_tail, format_tail, optional_keys, EngineKind,
    StorageBackend, TableDescriptor,
};
use crate::handle::BackendTarget;
use crate::{glob, Context, Error, NamedCollection, Result};
use std::path::{Path, PathBuf};

const ENGINE: EngineKind = EngineKind::Local;
const FILE_SCHEME: &str = "file://";

/// Finalized local filesystem description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTarget {
    /// User files directory, when one is configured
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct LocalBackend {
    user_files_root: Option<PathBuf>,
}

impl LocalBackend {
    /// Remember the user files root and store the path anchored under it
    fn apply_path(&mut self, raw: &str, descriptor: &mut TableDescriptor, context: &Context) {
        self.user_files_root = context.user_files_path().map(Path::to_path_buf);
        descriptor.namespace = self
            .user_files_root
            .as_ref()
            .map(|root| glob::escape(&root.to_string_lossy()))
            .unwrap_or_default();
        descriptor.paths = vec![self.resolve_path(raw)];
    }
}

impl StorageBackend for LocalBackend {
    fn kind(&self) -> EngineKind {
        ENGINE
    }

    fn from_named_collection(
        &mut self,
        collection: &NamedCollection,
        descriptor: &mut TableDescriptor,
        context: &Context,
    ) -> Result<()> {
        collection.validate_keys(ENGINE, &[], &optional_keys(&["path", "url"]))?;
        let path = collection.get_any(&["path", "url"]).ok_or_else(|| {
            Error::configuration(ENGINE, "missing required parameter 'path'")
        })?;
        self.apply_path(path, descriptor, context);
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
        let Some((path, rest)) = args.split_first() else {
            return Err(Error::configuration(ENGINE, "missing path argument"));
        };
        self.apply_path(path, descriptor, context);
        format_from_tail(ENGINE, rest, &mut descriptor.format, context, with_structure)
    }

    fn to_args(&self, descriptor: &TableDescriptor) -> Vec<String> {
        let mut args: Vec<String> = descriptor.paths.first().cloned().into_iter().collect();
        args.extend(format_tail(&descriptor.format));
        args
    }

    fn data_source_description(&self, _descriptor: &TableDescriptor) -> String {
        let root = self
            .user_files_root
            .as_ref()
            .map(|root| root.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{}{}", FILE_SCHEME, root)
    }

    fn target(&self, _descriptor: &TableDescriptor) -> BackendTarget {
        BackendTarget::Local(LocalTarget {
            root: self.user_files_root.clone(),
        })
    }

    /// Strip `file://` and anchor relative paths under the user files root
    fn resolve_path(&self, raw: &str) -> String {
        let path = raw.strip_prefix(FILE_SCHEME).unwrap_or(raw);
        match &self.user_files_root {
            Some(root) if !path.starts_with('/') => {
                let root = root.to_string_lossy();
                format!("{}/{}", glob::escape(root.trim_end_matches('/')), path)
            }
            _ => path.to_string(),
        }
    }

    fn path_without_glob(&self, path: &str) -> String {
        if glob::has_wildcard(path) {
            glob::align_to_delimiter(glob::literal_prefix(path)).to_string()
        } else {
            path.to_string()
        }
    }

    /// Relative paths without a user files root resolve against the
    /// working directory
    fn object_key(&self, path: &str) -> String {
        if path.starts_with('/') {
            return path.trim_start_matches('/').to_string();
        }
        match std::env::current_dir() {
            Ok(cwd) => {
                let cwd = cwd.to_string_lossy();
                let cwd = glob::escape(cwd.trim_matches('/'));
                if cwd.is_empty() {
                    path.to_string()
                } else {
                    format!("{}/{}", cwd, path)
                }
            }
            Err(_) => path.to_string(),
        }
    }

    fn check(&self, descriptor: &TableDescriptor, _context: &Context) -> Result<()> {
        for path in &descriptor.paths {
            if path.is_empty() {
                return Err(Error::validation(ENGINE, "path must not be empty"));
            }
            if path.split('/').any(|part| part == "..") {
                return Err(Error::validation(
                    ENGINE,
                    format!("path '{}' must not contain '..'", path),
                ));
            }
            if let Some(root) = &self.user_files_root {
                let literal = glob::unescape(glob::literal_prefix(path));
                if !Path::new(&literal).starts_with(root) {
                    return Err(Error::validation(
                        ENGINE,
                        format!(
                            "path '{}' is outside the user files directory '{}'",
                            path,
                            root.display()
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn StorageBackend> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str], ctx: &Context) -> Result<(LocalBackend, TableDescriptor)> {
        let mut backend = LocalBackend::default();
        let mut d = TableDescriptor::default();
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        backend.from_args(&args, &mut d, ctx, false)?;
        Ok((backend, d))
    }

    #[test]
    fn test_relative_path_is_anchored_under_root() {
        let ctx = Context::default().with_user_files_path("/srv/user_files/");
        let (backend, d) = parse(&["data/*.csv", "CSV"], &ctx).expect("parse");
        assert_eq!(d.paths, vec!["/srv/user_files/data/*.csv"]);
        assert_eq!(d.namespace, "/srv/user_files/");
        assert!(backend.check(&d, &ctx).is_ok());
        assert_eq!(backend.object_key(&d.paths[0]), "srv/user_files/data/*.csv");
    }

    #[test]
    fn test_without_root_paths_are_kept() {
        let ctx = Context::default();
        let (backend, d) = parse(&["file://data/*.csv"], &ctx).expect("parse");
        assert_eq!(d.paths, vec!["data/*.csv"]);
        assert_eq!(d.namespace, "");
        assert!(backend.check(&d, &ctx).is_ok());
    }

    #[test]
    fn test_escape_attempts_are_rejected() {
        let ctx = Context::default().with_user_files_path("/srv/user_files");
        let (backend, d) = parse(&["../etc/passwd"], &ctx).expect("parse");
        assert!(backend.check(&d, &ctx).expect_err("dotdot").is_validation());

        let (backend, d) = parse(&["/etc/*.conf"], &ctx).expect("parse");
        assert!(backend.check(&d, &ctx).expect_err("outside").is_validation());
    }

    #[test]
    fn test_url_alias_in_collection() {
        let ctx = Context::default();
        let c: NamedCollection = [("url", "data/*.csv"), ("format", "CSV")].into_iter().collect();
        let mut backend = LocalBackend::default();
        let mut d = TableDescriptor::default();
        backend.from_named_collection(&c, &mut d, &ctx).expect("parse");
        assert_eq!(d.paths, vec!["data/*.csv"]);
        assert_eq!(d.format.format, "CSV");
    }

    #[test]
    fn test_root_with_glob_characters_is_literal() {
        let ctx = Context::default().with_user_files_path("/srv/{team}");
        let (backend, d) = parse(&["a.csv"], &ctx).expect("parse");
        assert_eq!(d.paths, vec!["/srv/\\{team\\}/a.csv"]);
        assert_eq!(d.namespace, "/srv/\\{team\\}");
        assert!(!glob::has_wildcard(&d.namespace));
        assert!(backend.check(&d, &ctx).is_ok());
        assert_eq!(backend.data_source_description(&d), "file:///srv/{team}");
    }

    #[test]
    fn test_paths_set_later_are_anchored() {
        let ctx = Context::default().with_user_files_path("/srv/user_files");
        let (backend, _) = parse(&["a.csv"], &ctx).expect("parse");
        assert_eq!(backend.resolve_path("b/*.csv"), "/srv/user_files/b/*.csv");
        assert_eq!(backend.resolve_path("file:///tmp/c.csv"), "/tmp/c.csv");
    }

    #[test]
    fn test_prefix_aligns_to_directory() {
        let backend = LocalBackend::default();
        assert_eq!(backend.path_without_glob("/var/log/app-*.log"), "/var/log/");
        assert_eq!(backend.path_without_glob("/var/log/app.log"), "/var/log/app.log");
    }
}
