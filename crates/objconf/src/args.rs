// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Raw engine arguments and their resolution into one argument source
//!
//! A table definition reaches us either as an explicit named collection
//! or as a positional list. A positional list whose first element is an
//! identifier refers to a collection registered in the [`Context`]; the
//! `key = value` pairs that follow override its entries. Everything else
//! must be a plain literal list.

use crate::{Context, EngineKind, Error, NamedCollection, Result};
use std::fmt;

/// One argument of a table definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineArg {
    /// A string or numeric literal
    Literal(String),
    /// A bare identifier (the name of a named collection)
    Identifier(String),
    /// `key = value`
    KeyValue { key: String, value: String },
}

impl EngineArg {
    pub fn literal<S: Into<String>>(value: S) -> Self {
        EngineArg::Literal(value.into())
    }

    pub fn identifier<S: Into<String>>(name: S) -> Self {
        EngineArg::Identifier(name.into())
    }

    pub fn key_value<K: Into<String>, V: Into<String>>(key: K, value: V) -> Self {
        EngineArg::KeyValue {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for EngineArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineArg::Literal(v) => write!(f, "'{}'", v.replace('\'', "\\'")),
            EngineArg::Identifier(name) => f.write_str(name),
            EngineArg::KeyValue { key, value } => {
                write!(f, "{} = '{}'", key, value.replace('\'', "\\'"))
            }
        }
    }
}

/// Raw arguments as produced by the SQL layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineArgs {
    Named(NamedCollection),
    Positional(Vec<EngineArg>),
}

impl EngineArgs {
    /// Positional literals
    pub fn literals<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        EngineArgs::Positional(values.into_iter().map(EngineArg::literal).collect())
    }
}

impl From<NamedCollection> for EngineArgs {
    fn from(collection: NamedCollection) -> Self {
        EngineArgs::Named(collection)
    }
}

/// The argument source chosen for initialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentSource {
    Named(NamedCollection),
    Positional(Vec<String>),
}

impl ArgumentSource {
    /// Decide once between a named collection and a positional list
    pub fn resolve(args: &EngineArgs, context: &Context, engine: EngineKind) -> Result<Self> {
        let args = match args {
            EngineArgs::Named(collection) => return Ok(ArgumentSource::Named(collection.clone())),
            EngineArgs::Positional(args) => args,
        };

        match args.first() {
            None => Err(Error::configuration(
                engine,
                "at least one argument is required",
            )),
            Some(EngineArg::Identifier(name)) => {
                let base = context.named_collection(name).ok_or_else(|| {
                    Error::configuration(engine, format!("there is no named collection '{}'", name))
                })?;
                let overrides = collect_overrides(&args[1..], engine)?;
                if !overrides.is_empty() && !context.settings().allow_named_collection_override {
                    return Err(Error::configuration(
                        engine,
                        format!("named collection '{}' cannot be overridden", name),
                    ));
                }
                Ok(ArgumentSource::Named(base.with_overrides(overrides)))
            }
            Some(_) => args
                .iter()
                .enumerate()
                .map(|(i, arg)| match arg {
                    EngineArg::Literal(value) => Ok(value.clone()),
                    other => Err(Error::configuration(
                        engine,
                        format!(
                            "argument #{} ({}) must be a literal; key-value arguments are only allowed after a named collection",
                            i + 1,
                            other
                        ),
                    )),
                })
                .collect::<Result<Vec<_>>>()
                .map(ArgumentSource::Positional),
        }
    }

    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            ArgumentSource::Named(_) => "named collection",
            ArgumentSource::Positional(_) => "positional arguments",
        }
    }
}

fn collect_overrides(args: &[EngineArg], engine: EngineKind) -> Result<Vec<(&str, &str)>> {
    args.iter()
        .map(|arg| match arg {
            EngineArg::KeyValue { key, value } => Ok((key.as_str(), value.as_str())),
            other => Err(Error::configuration(
                engine,
                format!("expected key = value after named collection, got {}", other),
            )),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Settings;

    fn ctx() -> Context {
        let creds: NamedCollection = [("url", "s3://bucket/data/*.csv"), ("format", "CSV")]
            .into_iter()
            .collect();
        Context::default().with_named_collection("s3_creds", creds)
    }

    #[test]
    fn test_plain_literals_are_positional() {
        let args = EngineArgs::literals(["s3://bucket/key", "CSV"]);
        let source = ArgumentSource::resolve(&args, &ctx(), EngineKind::S3).expect("resolve");
        assert_eq!(
            source,
            ArgumentSource::Positional(vec!["s3://bucket/key".into(), "CSV".into()])
        );
    }

    #[test]
    fn test_identifier_uses_registered_collection_with_overrides() {
        let args = EngineArgs::Positional(vec![
            EngineArg::identifier("s3_creds"),
            EngineArg::key_value("format", "Parquet"),
        ]);
        let source = ArgumentSource::resolve(&args, &ctx(), EngineKind::S3).expect("resolve");
        let ArgumentSource::Named(collection) = source else {
            panic!("expected named source");
        };
        assert_eq!(collection.get("format"), Some("Parquet"));
        assert_eq!(collection.get("url"), Some("s3://bucket/data/*.csv"));
    }

    #[test]
    fn test_unknown_collection_is_configuration_error() {
        let args = EngineArgs::Positional(vec![EngineArg::identifier("nope")]);
        let err = ArgumentSource::resolve(&args, &ctx(), EngineKind::Azure).expect_err("missing");
        assert!(err.is_configuration());
        assert!(err.to_string().contains("'nope'"));
    }

    #[test]
    fn test_override_can_be_disabled() {
        let settings = Settings {
            allow_named_collection_override: false,
            ..Settings::default()
        };
        let creds: NamedCollection = [("url", "x")].into_iter().collect();
        let ctx = Context::new(settings).with_named_collection("c", creds);
        let args = EngineArgs::Positional(vec![
            EngineArg::identifier("c"),
            EngineArg::key_value("format", "CSV"),
        ]);
        assert!(ArgumentSource::resolve(&args, &ctx, EngineKind::S3).is_err());

        let args = EngineArgs::Positional(vec![EngineArg::identifier("c")]);
        assert!(ArgumentSource::resolve(&args, &ctx, EngineKind::S3).is_ok());
    }

    #[test]
    fn test_mixed_shapes_are_rejected() {
        let args = EngineArgs::Positional(vec![
            EngineArg::literal("s3://b/k"),
            EngineArg::key_value("format", "CSV"),
        ]);
        let err = ArgumentSource::resolve(&args, &ctx(), EngineKind::S3).expect_err("mixed");
        assert!(err.to_string().contains("argument #2"));

        let empty = EngineArgs::Positional(vec![]);
        assert!(ArgumentSource::resolve(&empty, &ctx(), EngineKind::S3).is_err());
    }

    #[test]
    fn test_display_quotes_literals() {
        assert_eq!(EngineArg::literal("a'b").to_string(), "'a\\'b'");
        assert_eq!(EngineArg::key_value("format", "CSV").to_string(), "format = 'CSV'");
    }
}
