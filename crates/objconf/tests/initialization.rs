// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use objconf::{
    Configuration, Context, EngineArg, EngineArgs, EngineKind, InitState, NamedCollection,
    Settings,
};

fn collection(entries: &[(&str, &str)]) -> NamedCollection {
    entries.iter().copied().collect()
}

#[test]
fn test_named_collection_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    diagnostics::init();
    let ctx = Context::default();
    let mut config = Configuration::new(EngineKind::Local);
    let args = EngineArgs::from(collection(&[("url", "data/*.csv"), ("format", "CSV")]));
    config.initialize(&args, &ctx, false)?;

    assert_eq!(config.path()?, "data/*.csv");
    assert_eq!(config.format(), "CSV");
    assert!(config.with_globs());
    assert!(config.is_path_with_globs());
    assert_eq!(config.path_without_glob()?, "data/");
    config.check(&ctx)?;
    Ok(())
}

#[test]
fn test_glob_free_path_is_its_own_prefix() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::default();
    for kind in EngineKind::ALL {
        let args = match kind {
            EngineKind::S3 => vec!["s3://bucket/a/b/c.parquet"],
            EngineKind::Azure => vec!["https://acct.blob.core.windows.net", "container", "a/b/c.parquet"],
            EngineKind::Hdfs => vec!["hdfs://nn:8020/a/b/c.parquet"],
            EngineKind::Local => vec!["/a/b/c.parquet"],
        };
        let mut config = Configuration::new(kind);
        config.initialize(&EngineArgs::literals(args), &ctx, false)?;
        assert!(!config.is_path_with_globs(), "{kind}");
        assert_eq!(config.path_without_glob()?, config.path()?, "{kind}");
    }
    Ok(())
}

#[test]
fn test_alternation_prefix() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Configuration::new(EngineKind::S3);
    config.initialize(
        &EngineArgs::literals(["s3://bucket/data/{2020,2021}/*.csv", "CSV"]),
        &Context::default(),
        false,
    )?;
    assert!(config.is_path_with_globs());
    assert_eq!(config.path_without_glob()?, "data/");
    assert_eq!(config.namespace()?, "bucket");
    assert_eq!(config.data_source_description()?, "s3://bucket");
    Ok(())
}

#[test]
fn test_reinitialization_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::default();
    let args = EngineArgs::literals(["hdfs://nn:8020/t/*.orc", "ORC"]);
    let mut config = Configuration::new(EngineKind::Hdfs);
    config.initialize(&args, &ctx, false)?;

    let err = config.initialize(&args, &ctx, false).expect_err("second initialize");
    assert!(err.is_usage());
    assert_eq!(config.state(), InitState::Initialized);
    assert_eq!(config.path()?, "/t/*.orc");
    Ok(())
}

#[test]
fn test_fresh_configuration_rejects_accessors() {
    for kind in EngineKind::ALL {
        let config = Configuration::new(kind);
        assert!(config.path().expect_err("path").is_usage());
        assert!(config.paths().expect_err("paths").is_usage());
        assert!(config.namespace().expect_err("namespace").is_usage());
        assert!(config.check(&Context::default()).expect_err("check").is_usage());
    }
}

#[test]
fn test_unterminated_alternation_fails_at_initialization() {
    let mut config = Configuration::new(EngineKind::Local);
    let err = config
        .initialize(
            &EngineArgs::literals(["data/{2020,2021"]),
            &Context::default(),
            false,
        )
        .expect_err("pattern error");
    assert!(err.is_pattern());
    assert!(err.to_string().contains("{2020,2021"));
    assert_eq!(config.state(), InitState::Failed);
}

#[test]
fn test_clones_do_not_alias_paths() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Configuration::new(EngineKind::S3);
    config.initialize(
        &EngineArgs::literals(["s3://bucket/a/*.csv"]),
        &Context::default(),
        false,
    )?;
    let mut copy = config.clone();
    assert_eq!(copy.paths()?, config.paths()?);

    copy.set_paths(vec!["b/1.csv".to_string(), "b/2.csv".to_string()])?;
    assert_eq!(config.paths()?, ["a/*.csv"]);
    assert_eq!(copy.paths()?, ["b/1.csv", "b/2.csv"]);
    assert_eq!(copy.state(), config.state());
    Ok(())
}

#[test]
fn test_registered_collection_with_overrides() -> Result<(), Box<dyn std::error::Error>> {
    let lake = collection(&[
        ("url", "https://lake.s3.eu-west-1.amazonaws.com/events/*.parquet"),
        ("access_key_id", "AKID"),
        ("secret_access_key", "SECRET"),
        ("format", "auto"),
    ]);
    let ctx = Context::default().with_named_collection("lake", lake);
    let mut config = Configuration::new(EngineKind::S3);
    let args = EngineArgs::Positional(vec![
        EngineArg::identifier("lake"),
        EngineArg::key_value("format", "Parquet"),
        EngineArg::key_value("compression", "zst"),
    ]);
    config.initialize(&args, &ctx, false)?;

    assert_eq!(config.namespace()?, "lake");
    assert_eq!(config.path()?, "events/*.parquet");
    assert_eq!(config.format(), "Parquet");
    assert_eq!(config.compression_method(), "zstd");
    assert_eq!(
        config.data_source_description()?,
        "https://s3.eu-west-1.amazonaws.com/lake"
    );
    config.check(&ctx)?;
    Ok(())
}

#[test]
fn test_validation_errors_name_the_engine() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::default();
    let mut config = Configuration::new(EngineKind::Azure);
    config.initialize(
        &EngineArgs::literals(["https://acct.blob.core.windows.net", "Bad--Container", "x.csv"]),
        &ctx,
        false,
    )?;
    let err = config.check(&ctx).expect_err("container name");
    assert!(err.is_validation());
    assert!(err.to_string().starts_with("AzureBlobStorage"));
    Ok(())
}

#[test]
fn test_settings_file_drives_query_settings() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::Builder::new().prefix("objconf-").tempdir()?;
    let path = dir.path().join("settings.yaml");
    std::fs::write(
        &path,
        "default_format: Parquet\ns3:\n  skip_empty_files: true\n  truncate_on_insert: true\n",
    )?;
    let ctx = Context::new(Settings::from_file(&path)?);

    let mut config = Configuration::new(EngineKind::S3);
    config.initialize(&EngineArgs::literals(["s3://bucket/t/*"]), &ctx, false)?;
    assert_eq!(config.format(), "Parquet");

    let qs = config.query_settings(&ctx)?;
    assert!(qs.skip_empty_files);
    assert_eq!(qs.insert_mode(), objconf::InsertMode::Truncate);
    assert_eq!(qs, config.query_settings(&ctx)?);
    Ok(())
}

#[test]
fn test_user_files_root_is_not_a_pattern() -> Result<(), Box<dyn std::error::Error>> {
    for root in ["/srv/{team}", "/srv/a{b"] {
        let ctx = Context::default().with_user_files_path(root);
        let mut config = Configuration::new(EngineKind::Local);
        config.initialize(&EngineArgs::literals(["a.csv", "CSV"]), &ctx, false)?;
        assert!(!config.is_path_with_globs(), "{root}");
        assert!(!config.is_namespace_with_globs(), "{root}");
        assert!(!config.with_globs(), "{root}");
        assert_eq!(config.data_source_description()?, format!("file://{root}"));
        config.check(&ctx)?;
    }
    Ok(())
}

#[test]
fn test_relative_local_path_set_later_is_anchored() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::default().with_user_files_path("/srv/user_files");
    let mut config = Configuration::new(EngineKind::Local);
    config.initialize(&EngineArgs::literals(["a.csv"]), &ctx, false)?;
    assert_eq!(config.path()?, "/srv/user_files/a.csv");

    config.set_path("b/*.csv")?;
    assert_eq!(config.path()?, "/srv/user_files/b/*.csv");
    config.check(&ctx)?;

    config.set_path("/etc/*.conf")?;
    assert!(config.check(&ctx).expect_err("outside root").is_validation());
    Ok(())
}
