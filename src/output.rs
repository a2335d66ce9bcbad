//! Writing analysis tables to CSV files.
use crate::analysis::{Analysis, TechRegionTable};
use crate::id::{ClassID, RegionID, TechID};
use anyhow::{Context, Result};
use log::info;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Annual electricity per technology and region (GWh)
const ANNUAL_ELECTRICITY_FILE_NAME: &str = "annual_electricity.csv";

/// Installed capacity per technology and region (GW)
const CAPACITY_FILE_NAME: &str = "capacity.csv";

/// Transmission capacity between regions (GW)
const TRANSMISSION_CAPACITY_FILE_NAME: &str = "transmission_capacity.csv";

/// Class utilisation per technology, class and region (GW)
const CLASS_UTILISATION_FILE_NAME: &str = "class_utilisation.csv";

/// Create an output folder (and its parents) if it doesn't already exist
pub fn create_output_directory(output_dir: &Path) -> Result<()> {
    if output_dir.is_dir() {
        return Ok(());
    }

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))
}

/// A row of a technology × region table
#[derive(Serialize, Debug, PartialEq)]
struct TechRegionRow<'a> {
    tech: &'a TechID,
    region: &'a str,
    value: f64,
}

#[derive(Serialize, Debug, PartialEq)]
struct TransmissionCapacityRow<'a> {
    region: &'a RegionID,
    to_region: &'a RegionID,
    value: f64,
}

#[derive(Serialize, Debug, PartialEq)]
struct ClassUtilisationRow<'a> {
    tech: &'a TechID,
    class: &'a ClassID,
    region: &'a RegionID,
    used: f64,
    limit: f64,
}

fn write_tech_region_table(file_path: &Path, table: &TechRegionTable) -> Result<()> {
    let mut writer = csv::Writer::from_path(file_path)?;
    for (tech, values) in table.techs().iter().zip(table.values().rows()) {
        for (region, value) in table.columns().iter().zip(values) {
            writer.serialize(TechRegionRow {
                tech,
                region,
                value: *value,
            })?;
        }
    }
    writer.flush()?;

    Ok(())
}

/// Write the analysis tables as CSV files.
///
/// # Arguments
///
/// * `analysis` - The analysed results
/// * `output_dir` - Folder to write to, which must exist
pub fn write_analysis_tables(analysis: &Analysis, output_dir: &Path) -> Result<()> {
    let regions = &analysis.results().sets.regions;
    let context = |file_name: &str| format!("Failed to write {file_name}");

    write_tech_region_table(
        &output_dir.join(ANNUAL_ELECTRICITY_FILE_NAME),
        &analysis.annual_electricity,
    )
    .with_context(|| context(ANNUAL_ELECTRICITY_FILE_NAME))?;
    write_tech_region_table(&output_dir.join(CAPACITY_FILE_NAME), &analysis.capacity)
        .with_context(|| context(CAPACITY_FILE_NAME))?;

    let mut writer = csv::Writer::from_path(output_dir.join(TRANSMISSION_CAPACITY_FILE_NAME))
        .with_context(|| context(TRANSMISSION_CAPACITY_FILE_NAME))?;
    for ((from, to), value) in analysis.transmission_capacity.indexed_iter() {
        if from != to {
            writer.serialize(TransmissionCapacityRow {
                region: &regions[from],
                to_region: &regions[to],
                value: *value,
            })?;
        }
    }
    writer.flush()?;

    let mut writer = csv::Writer::from_path(output_dir.join(CLASS_UTILISATION_FILE_NAME))
        .with_context(|| context(CLASS_UTILISATION_FILE_NAME))?;
    for entry in &analysis.class_utilisation {
        for (r, region) in regions.iter().enumerate() {
            writer.serialize(ClassUtilisationRow {
                tech: &entry.tech,
                class: &entry.class,
                region,
                used: entry.used[r],
                limit: entry.limit[r],
            })?;
        }
    }
    writer.flush()?;
    info!("Wrote analysis tables to {}", output_dir.display());

    Ok(())
}
