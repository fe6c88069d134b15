//! Configuration loading tests

use std::io::Write;

use trueno_track::config::{TrackingConfig, ENV_MAX_RESULTS};
use trueno_track::search::ViewType;
use trueno_track::Error;

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[search]\nmax_results = 250\nrun_view_type = \"deleted_only\"\n\n\
         [experiment]\ndefault_name = \"alpha\""
    )
    .unwrap();

    let config = TrackingConfig::load(file.path()).unwrap();
    assert_eq!(config.search.max_results, 250);
    assert_eq!(config.search.run_view_type, ViewType::DeletedOnly);
    assert_eq!(config.experiment.default_name, "alpha");
}

#[test]
fn test_load_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = TrackingConfig::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_empty_toml_is_default() {
    assert_eq!(
        TrackingConfig::from_toml_str("").unwrap(),
        TrackingConfig::default()
    );
}

#[test]
fn test_invalid_values_rejected() {
    for source in [
        "[search]\nmax_results = 0",
        "[search]\nmax_results = 100001",
        "[search]\nrun_view_type = \"sometimes\"",
        "[experiment]\ndefault_name = \"\"",
        "search = 3",
    ] {
        let err = TrackingConfig::from_toml_str(source).unwrap_err();
        assert!(matches!(err, Error::Config(_)), "{source:?} gave {err:?}");
    }
}

#[test]
fn test_override_out_of_range_rejected() {
    let err = TrackingConfig::default()
        .with_overrides(|name| (name == ENV_MAX_RESULTS).then(|| "0".to_string()))
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_config_roundtrips_through_toml() {
    let config = TrackingConfig::from_toml_str("[search]\nrun_view_type = \"all\"").unwrap();
    let rendered = toml::to_string(&config).unwrap();
    assert_eq!(TrackingConfig::from_toml_str(&rendered).unwrap(), config);
}
