// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Prefix-scoped listing of the objects a configuration designates
//!
//! Each path becomes one listing: the literal prefix (aligned down to a
//! `/` so delimiter-scoped APIs accept it) goes to the store, and the
//! compiled glob filters what comes back. Glob-free paths skip listing
//! and are fetched with a single `head`.

use crate::glob::{self, GlobPattern};
use crate::{Configuration, Context, EngineKind, Error, QuerySettings, Result};
use diagnostics::*;
use futures::TryStreamExt;
use object_store::path::Path;
use object_store::{ObjectMeta, ObjectStore};
use percent_encoding::percent_decode_str;
use std::collections::HashSet;

/// How one configured path is enumerated
#[derive(Debug, Clone)]
pub struct PathListing {
    /// Compiled pattern over store keys
    pub pattern: GlobPattern,
    /// Unescaped listing prefix, ending in `/` or empty
    pub prefix: String,
    /// The exact key when the path has no wildcard
    pub exact: Option<String>,
}

/// Listing strategy for an initialized configuration
#[derive(Debug, Clone)]
pub struct ListingPlan {
    engine: EngineKind,
    namespace: String,
    listings: Vec<PathListing>,
    settings: QuerySettings,
}

impl ListingPlan {
    pub fn new(configuration: &Configuration, context: &Context) -> Result<Self> {
        let settings = configuration.query_settings(context)?;
        let listings = configuration
            .paths()?
            .iter()
            .map(|path| {
                let key = configuration.object_key(path);
                let pattern = GlobPattern::parse(&key)?;
                let prefix = glob::unescape(glob::align_to_delimiter(glob::literal_prefix(&key)));
                let exact = (!pattern.has_wildcard()).then(|| pattern.key_prefix());
                Ok(PathListing {
                    pattern,
                    prefix,
                    exact,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Planned {count} listings for {engine}",
            count: listings.len(),
            engine: configuration.engine_name()
        );
        Ok(Self {
            engine: configuration.engine_kind(),
            namespace: configuration.namespace()?.to_string(),
            listings,
            settings,
        })
    }

    #[must_use]
    pub fn engine(&self) -> EngineKind {
        self.engine
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub fn listings(&self) -> &[PathListing] {
        &self.listings
    }

    #[must_use]
    pub fn query_settings(&self) -> &QuerySettings {
        &self.settings
    }

    /// True if any configured path designates `key`
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        self.listings.iter().any(|l| l.pattern.matches(key))
    }

    /// Keep the keys some path designates, in input order
    pub fn filter_keys<'a, I>(&self, keys: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        keys.into_iter().filter(|k| self.matches(k)).collect()
    }
}

/// A store location with each segment percent-decoded
///
/// `object_store` encodes characters such as `[` or `%` inside path
/// segments; patterns are written against the literal key.
fn decoded_key(location: &Path) -> String {
    location
        .parts()
        .map(|part| percent_decode_str(part.as_ref()).decode_utf8_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Enumerate the objects `plan` designates in `store`
///
/// Results follow path order; within a globbed path they are sorted by
/// key. A key matched by several paths is returned once.
pub async fn list_matching(store: &dyn ObjectStore, plan: &ListingPlan) -> Result<Vec<ObjectMeta>> {
    let settings = plan.query_settings();
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for listing in plan.listings() {
        let found = match &listing.exact {
            Some(key) => match store.head(&Path::from(key.as_str())).await {
                Ok(meta) => vec![meta],
                Err(object_store::Error::NotFound { .. }) if settings.ignore_non_existent_file => {
                    debug!("Ignoring missing object {key}", key: key.as_str());
                    Vec::new()
                }
                Err(err) => return Err(err.into()),
            },
            None => {
                let prefix = (!listing.prefix.is_empty()).then(|| Path::from(listing.prefix.as_str()));
                let mut metas: Vec<ObjectMeta> = store.list(prefix.as_ref()).try_collect().await?;
                let listed = metas.len();
                metas.retain(|meta| listing.pattern.matches(&decoded_key(&meta.location)));
                metas.sort_by(|a, b| a.location.cmp(&b.location));
                debug!(
                    "Listed {listed} objects under '{prefix}', {matched} match {pattern}",
                    listed: listed,
                    prefix: listing.prefix.as_str(),
                    matched: metas.len(),
                    pattern: listing.pattern.as_str()
                );
                metas
            }
        };

        for meta in found {
            if settings.skip_empty_files && meta.size == 0 {
                continue;
            }
            if seen.insert(meta.location.clone()) {
                out.push(meta);
            }
        }
    }

    if out.is_empty() && settings.throw_on_zero_files_match {
        let pattern = plan
            .listings()
            .iter()
            .map(|l| l.pattern.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(Error::NoMatchingFiles { pattern });
    }
    Ok(out)
}
