//! Common code for integration tests.
use std::env;
use std::path::{Path, PathBuf};
use supergrid_results::extract::extract_results;
use supergrid_results::input::load_model_dir;
use supergrid_results::results::Results;
use supergrid_results::store::save_results;

/// Run name under which the demo model is stored
#[allow(dead_code)]
pub const DEMO_RUN_NAME: &str = "carbontax=50";

/// Get the path to the demo model.
#[allow(dead_code)]
pub fn get_model_dir() -> PathBuf {
    PathBuf::from("demos/simple")
}

/// Get the path to the demo chart configuration.
#[allow(dead_code)]
pub fn get_chart_config_path() -> PathBuf {
    PathBuf::from("demos/chart.toml")
}

/// Silence the logger for tests which initialise it
#[allow(dead_code)]
pub fn disable_logging() {
    unsafe { env::set_var("SUPERGRID_LOG_LEVEL", "off") };
}

/// Extract the results of the demo model
#[allow(dead_code)]
pub fn demo_results() -> Results {
    let model = load_model_dir(&get_model_dir()).unwrap();
    extract_results(&model, model.status).unwrap()
}

/// Write the demo results to a new archive in `dir`
#[allow(dead_code)]
pub fn demo_archive(dir: &Path) -> PathBuf {
    let file_path = dir.join("results.sgr");
    save_results(&demo_results(), DEMO_RUN_NAME, Some(&file_path), "", true).unwrap();

    file_path
}
