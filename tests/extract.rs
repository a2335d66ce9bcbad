//! Integration tests for the `extract` command.
use supergrid_results::cli::{ArchiveOpts, ExtractOpts, handle_extract_command};
use supergrid_results::log::is_logger_initialised;
use supergrid_results::settings::Settings;
use supergrid_results::store::{list_results, load_results};
use tempfile::tempdir;

mod common;
use common::{DEMO_RUN_NAME, demo_results, disable_logging, get_model_dir};

/// An integration test for the `extract` command.
///
/// We also check that the logger is initialised after it is run.
#[test]
fn test_handle_extract_command() {
    disable_logging();
    assert!(!is_logger_initialised());

    let dir = tempdir().unwrap();
    let file_path = dir.path().join("results.sgr");
    let settings = Settings {
        results_file: Some(file_path.clone()),
        group: "demo".to_string(),
        ..Settings::default()
    };
    handle_extract_command(&get_model_dir(), &ExtractOpts::default(), Some(settings)).unwrap();
    assert!(is_logger_initialised());

    // The run name comes from the model options
    assert_eq!(
        list_results(&file_path, "demo").unwrap(),
        [format!("demo/{DEMO_RUN_NAME}")]
    );
    assert_eq!(
        load_results(DEMO_RUN_NAME, &file_path, "demo")
            .unwrap()
            .unwrap(),
        demo_results()
    );

    // Command-line values take precedence over the settings
    let opts = ExtractOpts {
        run_name: Some("renamed".to_string()),
        archive: ArchiveOpts {
            results_file: None,
            group: Some("other".to_string()),
        },
        no_compress: true,
    };
    let settings = Settings {
        results_file: Some(file_path.clone()),
        ..Settings::default()
    };

    // Second time will fail because the logging is already initialised
    assert_eq!(
        handle_extract_command(&get_model_dir(), &opts, Some(settings))
            .unwrap_err()
            .chain()
            .next()
            .unwrap()
            .to_string(),
        "Failed to initialise logging."
    );
}
