// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Initialization of a [`Configuration`] from engine arguments
//!
//! The argument source is decided once ([`ArgumentSource::resolve`]); the
//! matching backend parser fills a scratch descriptor, shared
//! post-processing applies session defaults and validates patterns, and
//! only then is the result committed. A failure leaves the instance in
//! [`InitState::Failed`] with none of the partial state visible.

use crate::args::{ArgumentSource, EngineArg, EngineArgs};
use crate::backends::{EngineKind, TableDescriptor};
use crate::configuration::{Configuration, InitState};
use crate::format::{is_auto, AUTO};
use crate::{glob, Context, Error, Result};
use diagnostics::*;

impl Configuration {
    /// Initialize from raw engine arguments
    ///
    /// `with_structure` means a positional list reserves the slot after
    /// the format for the table structure.
    pub fn initialize(
        &mut self,
        args: &EngineArgs,
        context: &Context,
        with_structure: bool,
    ) -> Result<()> {
        match self.state {
            InitState::Uninitialized => {}
            InitState::Initialized => {
                return Err(Error::usage(format!(
                    "{} configuration is already initialized",
                    self.engine_name()
                )));
            }
            InitState::Initializing => {
                return Err(Error::usage(format!(
                    "{} configuration is being initialized",
                    self.engine_name()
                )));
            }
            InitState::Failed => {
                return Err(Error::usage(format!(
                    "{} configuration failed to initialize; create a new one",
                    self.engine_name()
                )));
            }
        }

        self.state = InitState::Initializing;
        let engine = self.engine_kind();
        let mut backend = self.backend.clone();
        let mut descriptor = TableDescriptor::default();

        let result = ArgumentSource::resolve(args, context, engine).and_then(|source| {
            debug!(
                "Initializing {engine} configuration from {source}",
                engine: engine.engine_name(),
                source: source.describe()
            );
            let parsed = match &source {
                ArgumentSource::Named(collection) => {
                    backend.from_named_collection(collection, &mut descriptor, context)
                }
                ArgumentSource::Positional(values) => {
                    backend.from_args(values, &mut descriptor, context, with_structure)
                }
            };
            parsed?;
            post_process(engine, &mut descriptor, context)
        });

        match result {
            Ok(()) => {
                self.deferred = descriptor.format.deferred();
                self.descriptor = descriptor;
                self.backend = backend;
                self.state = InitState::Initialized;
                info!(
                    "Initialized {engine} configuration, format: {format}, globs: {globs}",
                    engine: engine.engine_name(),
                    format: self.format(),
                    globs: self.with_globs()
                );
                if !self.deferred.is_empty() {
                    let deferred = format!("{:?}", self.deferred);
                    debug!("Deferred to inference: {deferred}", deferred: deferred);
                }
                Ok(())
            }
            Err(error) => {
                self.state = InitState::Failed;
                let message = error.to_string();
                warn!(
                    "Failed to initialize {engine} configuration: {message}",
                    engine: engine.engine_name(),
                    message: message
                );
                Err(error)
            }
        }
    }

    /// Rewrite `args` so that they carry an explicit structure and format
    ///
    /// Used before shipping a table definition to remote workers, which
    /// must not repeat inference. Values already given are kept.
    /// `with_structure` describes the layout `args` were written in, as for
    /// [`Configuration::initialize`]; the rewritten list always carries the
    /// structure slot.
    pub fn add_structure_and_format_to_args(
        &self,
        args: &mut Vec<EngineArg>,
        structure: &str,
        format: &str,
        context: &Context,
        with_structure: bool,
    ) -> Result<()> {
        let engine = self.engine_kind();
        match args.first() {
            Some(EngineArg::Identifier(name)) => {
                let collection = context.named_collection(name).ok_or_else(|| {
                    Error::configuration(engine, format!("there is no named collection '{}'", name))
                })?;
                for (key, value) in [("format", format), ("structure", structure)] {
                    fill_named(args, collection.get(key), key, value);
                }
                Ok(())
            }
            Some(_) => {
                let values = match ArgumentSource::resolve(
                    &EngineArgs::Positional(args.clone()),
                    context,
                    engine,
                )? {
                    ArgumentSource::Positional(values) => values,
                    ArgumentSource::Named(_) => {
                        return Err(Error::configuration(
                            engine,
                            "expected positional arguments",
                        ));
                    }
                };

                let mut backend = engine.new_backend();
                let mut descriptor = TableDescriptor::default();
                backend.from_args(&values, &mut descriptor, context, with_structure)?;
                if is_auto(&descriptor.format.format) {
                    descriptor.format.format = format.to_string();
                }
                if is_auto(&descriptor.format.structure) {
                    descriptor.format.structure = structure.to_string();
                }
                *args = backend
                    .to_args(&descriptor)
                    .into_iter()
                    .map(EngineArg::Literal)
                    .collect();
                Ok(())
            }
            None => Err(Error::configuration(
                engine,
                "at least one argument is required",
            )),
        }
    }
}

/// Replace an `"auto"` override of `key`, or append one when neither the
/// collection nor an override sets a concrete value
fn fill_named(args: &mut Vec<EngineArg>, base: Option<&str>, key: &str, value: &str) {
    let existing = args.iter_mut().find_map(|arg| match arg {
        EngineArg::KeyValue { key: k, value: v } if k.eq_ignore_ascii_case(key) => Some(v),
        _ => None,
    });
    match existing {
        Some(v) if is_auto(v.as_str()) => *v = value.to_string(),
        Some(_) => {}
        None if base.is_none_or(is_auto) => args.push(EngineArg::key_value(key, value)),
        None => {}
    }
}

/// Defaults and validation shared by both argument sources
fn post_process(engine: EngineKind, descriptor: &mut TableDescriptor, context: &Context) -> Result<()> {
    let settings = context.settings();
    let format = &mut descriptor.format;

    if is_auto(&format.format)
        && let Some(default) = &settings.default_format
    {
        format.format = default.clone();
    }
    if is_auto(&format.compression_method)
        && let Some(default) = &settings.default_compression
    {
        format.compression_method = default.clone();
    }
    if format.format.is_empty() {
        format.format = AUTO.to_string();
    }
    if format.structure.is_empty() {
        format.structure = AUTO.to_string();
    }
    if !is_auto(&format.format) && !settings.is_known_format(&format.format) {
        return Err(Error::configuration(
            engine,
            format!("unknown format '{}'", format.format),
        ));
    }
    format.normalize_compression(engine)?;

    if descriptor.paths.is_empty() {
        return Err(Error::configuration(engine, "no path given"));
    }
    for path in &descriptor.paths {
        glob::validate(path).map_err(|e| e.in_engine(engine))?;
    }
    glob::validate(&descriptor.namespace).map_err(|e| e.in_engine(engine))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NamedCollection, Settings};

    #[test]
    fn test_failed_initialization_is_terminal() {
        let mut config = Configuration::new(EngineKind::S3);
        let err = config
            .initialize(&EngineArgs::literals(["s3://bucket/data/{2020,2021"]), &Context::default(), false)
            .expect_err("unterminated alternation");
        assert!(err.is_pattern());
        assert_eq!(config.state(), InitState::Failed);
        assert!(config.path().expect_err("failed").is_usage());

        let retry = config
            .initialize(&EngineArgs::literals(["s3://bucket/ok.csv"]), &Context::default(), false)
            .expect_err("no reuse");
        assert!(retry.is_usage());
    }

    #[test]
    fn test_session_defaults_apply() {
        let settings = Settings {
            default_format: Some("Parquet".to_string()),
            default_compression: Some("zst".to_string()),
            ..Settings::default()
        };
        let ctx = Context::new(settings);
        let mut config = Configuration::new(EngineKind::Hdfs);
        config
            .initialize(&EngineArgs::literals(["hdfs://nn:8020/t/*.parquet"]), &ctx, false)
            .expect("initialize");
        assert_eq!(config.format(), "Parquet");
        assert_eq!(config.compression_method(), "zstd");
        assert_eq!(config.deferred(), [crate::DeferredField::Structure]);
    }

    #[test]
    fn test_unknown_compression_names_engine() {
        let mut config = Configuration::new(EngineKind::Local);
        let err = config
            .initialize(&EngineArgs::literals(["/tmp/a.csv", "CSV", "rar"]), &Context::default(), false)
            .expect_err("bad codec");
        assert!(err.is_configuration());
        assert!(err.to_string().starts_with("File configuration error"));
    }

    #[test]
    fn test_structure_slot_follows_flag() {
        let ctx = Context::default();
        let mut config = Configuration::new(EngineKind::Local);
        config
            .initialize(&EngineArgs::literals(["/tmp/a.csv", "CSV", "a UInt8", "gzip"]), &ctx, true)
            .expect("with structure");
        assert_eq!(config.structure(), "a UInt8");
        assert_eq!(config.compression_method(), "gzip");

        let mut config = Configuration::new(EngineKind::Local);
        assert!(config
            .initialize(&EngineArgs::literals(["/tmp/a.csv", "CSV", "a UInt8", "gzip"]), &ctx, false)
            .is_err());
    }

    #[test]
    fn test_add_structure_and_format_to_positional_args() {
        let ctx = Context::default();
        let config = Configuration::new(EngineKind::S3);
        let mut args = vec![EngineArg::literal("s3://bucket/data/*.csv"), EngineArg::literal("NOSIGN")];
        config
            .add_structure_and_format_to_args(&mut args, "a Int32", "CSV", &ctx, false)
            .expect("rewrite");
        let expected: Vec<EngineArg> = ["s3://bucket/data/*.csv", "NOSIGN", "CSV", "a Int32", "auto"]
            .into_iter()
            .map(EngineArg::literal)
            .collect();
        assert_eq!(args, expected);
    }

    #[test]
    fn test_add_structure_keeps_compression_without_structure_slot() {
        let ctx = Context::default();
        let mut config = Configuration::new(EngineKind::S3);
        let literals = ["s3://bucket/data/*.csv", "CSV", "gzip"];
        config
            .initialize(&EngineArgs::literals(literals), &ctx, false)
            .expect("initialize");
        assert_eq!(config.compression_method(), "gzip");

        let mut args: Vec<EngineArg> = literals.into_iter().map(EngineArg::literal).collect();
        config
            .add_structure_and_format_to_args(&mut args, "a Int32", "CSV", &ctx, false)
            .expect("rewrite");
        let expected: Vec<EngineArg> = ["s3://bucket/data/*.csv", "CSV", "a Int32", "gzip"]
            .into_iter()
            .map(EngineArg::literal)
            .collect();
        assert_eq!(args, expected);

        let mut reparsed = Configuration::new(EngineKind::S3);
        reparsed
            .initialize(&EngineArgs::literals(["s3://bucket/data/*.csv", "CSV", "a Int32", "gzip"]), &ctx, true)
            .expect("rewritten args parse with structure");
        assert_eq!(reparsed.structure(), "a Int32");
        assert_eq!(reparsed.compression_method(), "gzip");
    }

    #[test]
    fn test_pattern_errors_name_the_engine() {
        let mut config = Configuration::new(EngineKind::Hdfs);
        let err = config
            .initialize(&EngineArgs::literals(["hdfs://nn:8020/t/{a,b"]), &Context::default(), false)
            .expect_err("unterminated alternation");
        assert!(err.is_pattern());
        assert!(err.to_string().starts_with("HDFS: "), "{err}");
    }

    #[test]
    fn test_add_structure_and_format_to_named_args() {
        let base: NamedCollection = [("url", "s3://bucket/k.csv"), ("format", "TSV")]
            .into_iter()
            .collect();
        let ctx = Context::default().with_named_collection("lake", base);
        let config = Configuration::new(EngineKind::S3);
        let mut args = vec![
            EngineArg::identifier("lake"),
            EngineArg::key_value("structure", "auto"),
        ];
        config
            .add_structure_and_format_to_args(&mut args, "x String", "CSV", &ctx, false)
            .expect("rewrite");
        assert_eq!(
            args,
            vec![
                EngineArg::identifier("lake"),
                EngineArg::key_value("structure", "x String"),
            ]
        );
    }
}
