//! Storage, analysis and charting of capacity-expansion model results.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod analysis;
pub mod chart;
pub mod cli;
pub mod compare;
pub mod extract;
pub mod id;
pub mod input;
pub mod log;
pub mod model;
pub mod options;
pub mod output;
pub mod results;
pub mod sets;
pub mod settings;
pub mod store;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get config dir for program.
///
/// This is `~/.config/supergrid-results` on Linux. If the platform config folder cannot be
/// determined, the current folder is used.
pub fn get_config_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_default();
    path.push("supergrid-results");

    path
}
