//! Code for loading program settings.
use crate::chart::ChartConfig;
use crate::get_config_dir;
use crate::input::read_toml;
use anyhow::{Context, Result};
use documented::DocumentedFields;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::{Path, PathBuf};

const SETTINGS_FILE_NAME: &str = "settings.toml";

const DEFAULT_SETTINGS_FILE_HEADER: &str = "# This file contains the program settings for supergrid-results
# Values given on the command line take precedence over these.
";

fn default_log_level() -> String {
    "info".to_string()
}

fn default_compress() -> bool {
    true
}

fn default_chart_dir() -> PathBuf {
    PathBuf::from("supergrid_charts")
}

/// Get the path to where the settings file will be read from
pub fn get_settings_file_path() -> PathBuf {
    let mut path = get_config_dir();
    path.push(SETTINGS_FILE_NAME);

    path
}

/// Program settings from config file
#[derive(Debug, DocumentedFields, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// The default program log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// The results archive to use when none is given on the command line
    #[serde(default)]
    pub results_file: Option<PathBuf>,
    /// Group prefix under which runs are stored
    #[serde(default)]
    pub group: String,
    /// Whether to compress stored results
    #[serde(default = "default_compress")]
    pub compress: bool,
    /// Folder in which charts and tables are written
    #[serde(default = "default_chart_dir")]
    pub chart_dir: PathBuf,
    /// Chart configuration file with technology colours, labels and region groups
    #[serde(default)]
    pub chart_config: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            results_file: None,
            group: String::new(),
            compress: default_compress(),
            chart_dir: default_chart_dir(),
            chart_config: None,
        }
    }
}

impl Settings {
    /// Read the settings file from the user's config folder.
    ///
    /// If the file is not present, default values are used.
    pub fn load() -> Result<Settings> {
        Self::load_from_path(&get_settings_file_path())
    }

    fn load_from_path(file_path: &Path) -> Result<Settings> {
        if !file_path.is_file() {
            return Ok(Settings::default());
        }

        read_toml(file_path)
    }

    /// The chart configuration named in the settings, or the built-in one
    pub fn chart_config(&self) -> Result<ChartConfig> {
        match &self.chart_config {
            Some(file_path) => ChartConfig::from_path(file_path).with_context(|| {
                format!("Failed to load chart configuration {}", file_path.display())
            }),
            None => Ok(ChartConfig::default()),
        }
    }

    /// The contents of the default settings file, with every setting commented out
    pub fn default_file_contents() -> Result<String> {
        let settings_raw = toml::to_string(&Settings::default())?;

        let mut out = DEFAULT_SETTINGS_FILE_HEADER.to_string();
        for line in settings_raw.lines() {
            if let Some(last) = line.find('=') {
                let field = line[..last].trim();
                let docs = Settings::get_field_docs(field)
                    .with_context(|| format!("Missing doc comment for field {field}"))?;
                for line in docs.lines() {
                    write!(&mut out, "\n# # {}\n", line.trim())?;
                }

                writeln!(&mut out, "# {}", line.trim())?;
            }
        }

        Ok(out)
    }
}
