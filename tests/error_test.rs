//! Tests for error types

use trueno_track::Error;

#[test]
fn test_not_implemented_error() {
    let error = Error::NotImplemented("create_recorder");
    let error_str = format!("{error}");
    assert!(error_str.contains("`create_recorder` is not implemented"));
    assert!(error_str.contains("TrackedExperiment"));
}

#[test]
fn test_experiment_not_found_error() {
    let error = Error::ExperimentNotFound("17".to_string());
    assert_eq!(format!("{error}"), "Experiment not found: 17");
}

#[test]
fn test_run_not_found_error() {
    let error = Error::RunNotFound("abc123".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Run not found"));
    assert!(error_str.contains("abc123"));
}

#[test]
fn test_already_exists_error() {
    let error = Error::AlreadyExists("experiment named \"x\"".to_string());
    assert!(format!("{error}").starts_with("Already exists"));
}

#[test]
fn test_invalid_filter_error() {
    let error = Error::InvalidFilter("OR is not supported".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Invalid filter"));
    assert!(error_str.contains("OR is not supported"));
}

#[test]
fn test_invalid_input_error() {
    let error = Error::InvalidInput("max_results must be positive".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Invalid input"));
    assert!(error_str.contains("max_results must be positive"));
}

#[test]
fn test_config_and_backend_errors() {
    assert!(format!("{}", Error::Config("bad".to_string())).contains("Configuration error"));
    assert!(format!("{}", Error::Backend("timeout".to_string())).contains("Backend error"));
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let error: Error = io_error.into();
    let error_str = format!("{error}");
    assert!(error_str.contains("IO error"));
}

#[test]
fn test_arrow_error_conversion() {
    let arrow_error = arrow::error::ArrowError::SchemaError("mismatch".to_string());
    let error: Error = arrow_error.into();
    assert!(format!("{error}").contains("Arrow error"));
}

#[test]
fn test_other_error() {
    let error = Error::Other("custom error message".to_string());
    let error_str = format!("{error}");
    assert_eq!(error_str, "custom error message");
}

#[test]
fn test_error_debug() {
    let error = Error::NotImplemented("search_records");
    let debug_str = format!("{error:?}");
    assert!(debug_str.contains("NotImplemented"));
}

#[test]
fn test_result_type_alias() {
    #[allow(clippy::unnecessary_wraps)]
    fn returns_result() -> trueno_track::Result<i32> {
        Ok(42)
    }

    let result = returns_result();
    assert!(result.is_ok());
    assert_eq!(result.unwrap(), 42);
}

#[test]
fn test_result_type_alias_error() {
    fn returns_error() -> trueno_track::Result<i32> {
        Err(Error::Other("test error".to_string()))
    }

    let result = returns_error();
    assert!(result.is_err());
}
