// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! S3 and S3-compatible object storage
//!
//! Accepted URL forms:
//! - `s3://bucket/key` (also `s3a://`, `s3n://`)
//! - `https://bucket.s3.region.amazonaws.com/key` (virtual-hosted)
//! - `https://s3.region.amazonaws.com/bucket/key` (path-style)
//! - `http://minio:9000/bucket/key` (path-style, any other host)
//!
//! The key is taken verbatim from the URL so glob characters survive.

use super::{
    format_from_collection, format_from_tail, format_tail, is_format_arg, optional_keys,
    EngineKind, StorageBackend, TableDescriptor,
};
use crate::handle::BackendTarget;
use crate::{glob, Context, Error, NamedCollection, Result};
use std::fmt;

const ENGINE: EngineKind = EngineKind::S3;
const NOSIGN: &str = "NOSIGN";
const AWS_DOMAIN: &str = ".amazonaws.com";

/// How requests are authenticated
#[derive(Clone, Default, PartialEq, Eq)]
pub enum S3Credentials {
    /// Environment / instance credentials
    #[default]
    Default,
    /// Anonymous, unsigned requests
    NoSign,
    Static {
        access_key_id: String,
        secret_access_key: String,
        session_token: Option<String>,
    },
}

impl fmt::Debug for S3Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            S3Credentials::Default => f.write_str("Default"),
            S3Credentials::NoSign => f.write_str("NoSign"),
            S3Credentials::Static {
                access_key_id,
                session_token,
                ..
            } => f
                .debug_struct("Static")
                .field("access_key_id", access_key_id)
                .field("secret_access_key", &"<redacted>")
                .field("session_token", &session_token.as_ref().map(|_| "<redacted>"))
                .finish(),
        }
    }
}

/// Finalized S3 connection description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Target {
    pub bucket: String,
    /// `None` means the default AWS endpoint
    pub endpoint: Option<String>,
    pub region: Option<String>,
    pub credentials: S3Credentials,
}

#[derive(Debug, Clone, Default)]
pub struct S3Backend {
    endpoint: Option<String>,
    region: Option<String>,
    credentials: S3Credentials,
}

/// Result of splitting an S3 URL
#[derive(Debug, PartialEq, Eq)]
struct S3Uri {
    endpoint: Option<String>,
    bucket: String,
    key: String,
    region: Option<String>,
}

fn region_of(host_base: &str) -> Option<String> {
    let rest = host_base
        .strip_prefix("s3.")
        .or_else(|| host_base.strip_prefix("s3-"))?;
    let rest = rest.strip_prefix("dualstack.").unwrap_or(rest);
    (!rest.is_empty()).then(|| rest.to_string())
}

fn split_first_segment(path: &str) -> (&str, &str) {
    path.split_once('/').unwrap_or((path, ""))
}

fn parse_s3_url(url: &str) -> Result<S3Uri> {
    let (scheme, rest) = url
        .split_once("://")
        .ok_or_else(|| Error::configuration(ENGINE, format!("'{}' is not a URL", url)))?;
    let scheme = scheme.to_ascii_lowercase();
    let (authority, path) = split_first_segment(rest);
    if authority.is_empty() {
        return Err(Error::configuration(
            ENGINE,
            format!("URL '{}' has no bucket or host", url),
        ));
    }

    let uri = match scheme.as_str() {
        "s3" | "s3a" | "s3n" => S3Uri {
            endpoint: None,
            bucket: authority.to_string(),
            key: path.to_string(),
            region: None,
        },
        "http" | "https" => {
            if authority.contains('@') {
                return Err(Error::configuration(
                    ENGINE,
                    "credentials embedded in the URL are not supported",
                ));
            }
            if !glob::has_wildcard(authority) {
                _ = url::Url::parse(&format!("{}://{}/", scheme, authority)).map_err(|e| {
                    Error::configuration(ENGINE, format!("invalid host in '{}': {}", url, e))
                })?;
            }
            let host = authority
                .rsplit_once(':')
                .filter(|(_, port)| port.parse::<u16>().is_ok())
                .map_or(authority, |(host, _)| host);

            match host.strip_suffix(AWS_DOMAIN) {
                Some(base) if base == "s3" || base.starts_with("s3.") || base.starts_with("s3-") => {
                    let (bucket, key) = split_first_segment(path);
                    S3Uri {
                        endpoint: Some(format!("{}://{}", scheme, authority)),
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                        region: region_of(base),
                    }
                }
                Some(base) => {
                    let idx = base.rfind(".s3").filter(|i| {
                        matches!(base[i + 3..].chars().next(), None | Some('.') | Some('-'))
                    });
                    let Some(idx) = idx else {
                        return Err(Error::configuration(
                            ENGINE,
                            format!("cannot find bucket in AWS host '{}'", host),
                        ));
                    };
                    let service = &base[idx + 1..];
                    S3Uri {
                        endpoint: Some(format!("{}://{}{}", scheme, service, AWS_DOMAIN)),
                        bucket: base[..idx].to_string(),
                        key: path.to_string(),
                        region: region_of(service),
                    }
                }
                None => {
                    let (bucket, key) = split_first_segment(path);
                    S3Uri {
                        endpoint: Some(format!("{}://{}", scheme, authority)),
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                        region: None,
                    }
                }
            }
        }
        other => {
            return Err(Error::configuration(
                ENGINE,
                format!("unsupported URL scheme '{}'", other),
            ));
        }
    };

    if uri.bucket.is_empty() {
        return Err(Error::configuration(
            ENGINE,
            format!("URL '{}' has no bucket", url),
        ));
    }
    Ok(uri)
}

impl S3Backend {
    fn apply_url(&mut self, url: &str, descriptor: &mut TableDescriptor) -> Result<()> {
        let uri = parse_s3_url(url)?;
        self.endpoint = uri.endpoint;
        self.region = uri.region;
        descriptor.namespace = uri.bucket;
        descriptor.paths = vec![uri.key];
        Ok(())
    }

    fn url(&self, descriptor: &TableDescriptor) -> String {
        let key = descriptor.paths.first().map_or("", String::as_str);
        match &self.endpoint {
            Some(endpoint) => format!("{}/{}/{}", endpoint, descriptor.namespace, key),
            None => format!("s3://{}/{}", descriptor.namespace, key),
        }
    }
}

impl StorageBackend for S3Backend {
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
            &["url"],
            &optional_keys(&[
                "access_key_id",
                "secret_access_key",
                "session_token",
                "no_sign_request",
                "region",
            ]),
        )?;

        self.apply_url(collection.require("url", ENGINE)?, descriptor)?;
        if let Some(region) = collection.get("region") {
            self.region = Some(region.to_string());
        }

        let no_sign = collection
            .get_bool("no_sign_request", ENGINE)?
            .unwrap_or(false);
        let access_key_id = collection.get("access_key_id");
        let secret_access_key = collection.get("secret_access_key");
        let session_token = collection.get("session_token");

        self.credentials = match (no_sign, access_key_id, secret_access_key) {
            (true, None, None) if session_token.is_none() => S3Credentials::NoSign,
            (true, _, _) => {
                return Err(Error::configuration(
                    ENGINE,
                    "no_sign_request cannot be combined with access keys",
                ));
            }
            (false, Some(id), Some(secret)) => S3Credentials::Static {
                access_key_id: id.to_string(),
                secret_access_key: secret.to_string(),
                session_token: session_token.map(str::to_string),
            },
            (false, None, None) if session_token.is_none() => S3Credentials::Default,
            _ => {
                return Err(Error::configuration(
                    ENGINE,
                    "access_key_id and secret_access_key must be given together",
                ));
            }
        };

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
        let Some((url, mut rest)) = args.split_first() else {
            return Err(Error::configuration(ENGINE, "missing url argument"));
        };
        self.apply_url(url, descriptor)?;

        self.credentials = S3Credentials::Default;
        if rest.first().is_some_and(|a| a.eq_ignore_ascii_case(NOSIGN)) {
            self.credentials = S3Credentials::NoSign;
            rest = &rest[1..];
        } else if rest.len() >= 2 && !is_format_arg(context, &rest[0]) {
            let mut session_token = None;
            let mut consumed = 2;
            if let Some(token) = rest.get(2)
                && !is_format_arg(context, token)
            {
                session_token = Some(token.clone());
                consumed = 3;
            }
            self.credentials = S3Credentials::Static {
                access_key_id: rest[0].clone(),
                secret_access_key: rest[1].clone(),
                session_token,
            };
            rest = &rest[consumed..];
        }

        format_from_tail(ENGINE, rest, &mut descriptor.format, context, with_structure)
    }

    fn to_args(&self, descriptor: &TableDescriptor) -> Vec<String> {
        let mut args = vec![self.url(descriptor)];
        match &self.credentials {
            S3Credentials::Default => {}
            S3Credentials::NoSign => args.push(NOSIGN.to_string()),
            S3Credentials::Static {
                access_key_id,
                secret_access_key,
                session_token,
            } => {
                args.push(access_key_id.clone());
                args.push(secret_access_key.clone());
                args.extend(session_token.iter().cloned());
            }
        }
        args.extend(format_tail(&descriptor.format));
        args
    }

    fn data_source_description(&self, descriptor: &TableDescriptor) -> String {
        match &self.endpoint {
            Some(endpoint) => format!("{}/{}", endpoint, descriptor.namespace),
            None => format!("s3://{}", descriptor.namespace),
        }
    }

    fn target(&self, descriptor: &TableDescriptor) -> BackendTarget {
        BackendTarget::S3(S3Target {
            bucket: descriptor.namespace.clone(),
            endpoint: self.endpoint.clone(),
            region: self.region.clone(),
            credentials: self.credentials.clone(),
        })
    }

    fn check(&self, descriptor: &TableDescriptor, _context: &Context) -> Result<()> {
        if descriptor.paths.iter().any(String::is_empty) {
            return Err(Error::validation(ENGINE, "object key must not be empty"));
        }
        Ok(())
    }

    fn validate_namespace(&self, name: &str) -> Result<()> {
        let fail = |reason: &str| {
            Err(Error::validation(
                ENGINE,
                format!("invalid bucket name '{}': {}", name, reason),
            ))
        };
        if !(3..=63).contains(&name.len()) {
            return fail("must be between 3 and 63 characters long");
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-')
        {
            return fail("only lowercase letters, digits, '.' and '-' are allowed");
        }
        let alnum = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
        if !alnum(name.chars().next()) || !alnum(name.chars().last()) {
            return fail("must begin and end with a letter or digit");
        }
        if name.parse::<std::net::Ipv4Addr>().is_ok() {
            return fail("must not be formatted as an IP address");
        }
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn StorageBackend> {
        Box::new(self.clone())
    }
}
