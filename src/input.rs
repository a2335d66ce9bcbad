//! Reading a solved model which has been exported to a folder.
//!
//! The folder holds `model.toml` (status, sets, technologies and options) plus one CSV file per
//! parameter and per decision variable. Hours are numbered from 1 in the files.
use crate::id::{ClassID, IDCollection, RegionID, TechID};
use crate::model::{ModelData, VariableData, VariableKey, VariableName};
use crate::options::options_from_toml;
use crate::results::{
    CLASS_LIMITS, ClassVectors, DEMAND, HYDRO_CAPACITY, ModelStatus, Parameter,
    TRANSMISSION_LIMITS,
};
use crate::sets::{ModelSets, TechType};
use anyhow::{Context, Result, bail, ensure};
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use log::info;
use ndarray::{Array1, Array2};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const MODEL_FILE_NAME: &str = "model.toml";
const DEMAND_FILE_NAME: &str = "demand.csv";
const CLASS_LIMITS_FILE_NAME: &str = "class_limits.csv";
const HYDRO_CAPACITY_FILE_NAME: &str = "hydro_capacity.csv";
const TRANSMISSION_LIMITS_FILE_NAME: &str = "transmission_limits.csv";

/// The file holding each decision variable
const VARIABLE_FILES: [(VariableName, &str); 9] = [
    (VariableName::SystemCost, "system_cost.csv"),
    (VariableName::CO2Emissions, "co2_emissions.csv"),
    (VariableName::FuelUse, "fuel_use.csv"),
    (VariableName::Electricity, "electricity.csv"),
    (VariableName::Charging, "charging.csv"),
    (VariableName::StorageLevel, "storage_level.csv"),
    (VariableName::Transmission, "transmission.csv"),
    (VariableName::TransmissionCapacity, "transmission_capacity.csv"),
    (VariableName::Capacity, "capacity.csv"),
];

/// Format an error message for a problem with an input file
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Read and parse a TOML file
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;

    Ok(toml_data)
}

/// Read every row of a CSV file, which must not be empty
pub fn read_vec_from_csv<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let vec = csv::Reader::from_path(file_path)
        .and_then(|mut reader| reader.deserialize().collect::<Result<Vec<T>, _>>())
        .with_context(|| input_err_msg(file_path))?;
    ensure!(
        !vec.is_empty(),
        "{}: CSV file cannot be empty",
        input_err_msg(file_path)
    );

    Ok(vec)
}

/// Read every row of a CSV file, returning no rows if the file doesn't exist
fn read_optional_csv<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    if file_path.is_file() {
        read_vec_from_csv(file_path)
    } else {
        Ok(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
struct ModelFile {
    status: ModelStatus,
    hours_per_period: f64,
    sets: SetsSection,
    techs: Vec<TechEntry>,
    #[serde(default)]
    options: toml::Table,
}

#[derive(Debug, Deserialize)]
struct SetsSection {
    regions: Vec<RegionID>,
    hours: usize,
}

#[derive(Debug, Deserialize)]
struct TechEntry {
    id: TechID,
    #[serde(rename = "type")]
    tech_type: TechType,
    classes: Vec<ClassID>,
    #[serde(default)]
    storage_classes: Vec<ClassID>,
}

/// Collect IDs into a set, rejecting duplicates
fn unique_set<T: std::hash::Hash + Eq + std::fmt::Display>(
    ids: Vec<T>,
    what: &str,
) -> Result<IndexSet<T>> {
    let mut set = IndexSet::new();
    for id in ids {
        ensure!(!set.contains(&id), "Duplicate {what} {id}");
        set.insert(id);
    }

    Ok(set)
}

fn read_sets(file: &ModelFile) -> Result<ModelSets> {
    let regions = unique_set(file.sets.regions.clone(), "region")?;
    let techs = unique_set(
        file.techs.iter().map(|tech| tech.id.clone()).collect(),
        "technology",
    )?;

    let mut classes = IndexMap::new();
    let mut storage_classes = IndexMap::new();
    let mut tech_types = IndexMap::new();
    for tech in &file.techs {
        let what = format!("class for technology {}", tech.id);
        classes.insert(tech.id.clone(), unique_set(tech.classes.clone(), &what)?);
        if !tech.storage_classes.is_empty() {
            storage_classes.insert(
                tech.id.clone(),
                unique_set(tech.storage_classes.clone(), &what)?,
            );
        }
        tech_types.insert(tech.id.clone(), tech.tech_type);
    }

    ModelSets::new(
        regions,
        techs,
        classes,
        storage_classes,
        file.sets.hours,
        tech_types,
    )
}

/// A row of a parameter or variable file. Which columns are present depends on the file.
#[derive(Debug, Deserialize)]
struct ValueRow {
    region: String,
    #[serde(default)]
    to_region: Option<String>,
    #[serde(default)]
    tech: Option<String>,
    #[serde(default)]
    class: Option<String>,
    #[serde(default)]
    hour: Option<usize>,
    value: f64,
}

/// A validated row, with IDs resolved against the sets and hours numbered from 0
#[derive(Debug)]
struct Row {
    region: usize,
    to_region: Option<usize>,
    tech: Option<TechID>,
    class: Option<ClassID>,
    hour: Option<usize>,
    value: f64,
}

impl Row {
    fn new(sets: &ModelSets, row: ValueRow) -> Result<Self> {
        let tech = row
            .tech
            .map(|tech| sets.techs.get_id_by_str(&tech))
            .transpose()?;
        let class = match (&tech, row.class) {
            (Some(tech), Some(class)) => {
                let is_class = |classes: Option<&IndexSet<ClassID>>| {
                    classes.is_some_and(|classes| classes.contains(class.as_str()))
                };
                ensure!(
                    is_class(sets.classes.get(tech)) || is_class(sets.storage_classes.get(tech)),
                    "Unknown class {class} for technology {tech}"
                );
                Some(ClassID::from(class))
            }
            (None, Some(class)) => Some(ClassID::from(class)),
            (_, None) => None,
        };
        let hour = row
            .hour
            .map(|hour| {
                ensure!(
                    (1..=sets.hours).contains(&hour),
                    "Hour {hour} is out of range (should be between 1 and {})",
                    sets.hours
                );
                Ok(hour - 1)
            })
            .transpose()?;

        Ok(Self {
            region: sets.region_index(&row.region)?,
            to_region: row
                .to_region
                .map(|region| sets.region_index(&region))
                .transpose()?,
            tech,
            class,
            hour,
            value: row.value,
        })
    }

    fn key(&self, sets: &ModelSets) -> VariableKey {
        let mut key = VariableKey::new().region(&sets.regions[self.region]);
        if let Some(to_region) = self.to_region {
            key = key.to_region(&sets.regions[to_region]);
        }
        if let Some(tech) = &self.tech {
            key = key.tech(tech);
        }
        if let Some(class) = &self.class {
            key = key.class(class);
        }
        if let Some(hour) = self.hour {
            key = key.hour(hour);
        }
        key
    }
}

/// Read a CSV file of values, resolving each row against the sets
fn read_rows(file_path: &Path, sets: &ModelSets, optional: bool) -> Result<Vec<Row>> {
    let rows: Vec<ValueRow> = if optional {
        read_optional_csv(file_path)?
    } else {
        read_vec_from_csv(file_path)?
    };

    rows.into_iter()
        .map(|row| Row::new(sets, row))
        .collect::<Result<_>>()
        .with_context(|| input_err_msg(file_path))
}

fn read_variable(file_path: &Path, sets: &ModelSets) -> Result<VariableData> {
    let mut values = HashMap::new();
    for row in read_rows(file_path, sets, false)? {
        let key = row.key(sets);
        ensure!(
            !values.contains_key(&key),
            "{}: Duplicate entry for {key}",
            input_err_msg(file_path)
        );
        values.insert(key, row.value);
    }

    Ok(VariableData::Sparse(values))
}

fn read_demand(file_path: &Path, sets: &ModelSets) -> Result<Parameter> {
    let mut demand = Array2::zeros((sets.hours, sets.num_regions()));
    for row in read_rows(file_path, sets, false)? {
        let hour = row
            .hour
            .with_context(|| format!("{}: Missing hour", input_err_msg(file_path)))?;
        demand[[hour, row.region]] = row.value;
    }

    Ok(Parameter::Hourly(demand))
}

fn read_class_parameter(file_path: &Path, sets: &ModelSets) -> Result<Parameter> {
    let rows = read_rows(file_path, sets, true)?;
    let mut blocks: IndexMap<(TechID, ClassID), Array1<f64>> = IndexMap::new();
    for row in rows {
        let (Some(tech), Some(class)) = (row.tech, row.class) else {
            bail!("{}: Missing technology or class", input_err_msg(file_path));
        };
        blocks
            .entry((tech, class))
            .or_insert_with(|| Array1::zeros(sets.num_regions()))[row.region] = row.value;
    }

    let mut vectors = ClassVectors::new();
    for ((tech, class), block) in blocks {
        vectors.insert(&tech, &class, block)?;
    }

    Ok(Parameter::ByClass(vectors))
}

fn read_interregional(file_path: &Path, sets: &ModelSets) -> Result<Parameter> {
    let n = sets.num_regions();
    let mut limits = Array2::zeros((n, n));
    for row in read_rows(file_path, sets, true)? {
        let to_region = row
            .to_region
            .with_context(|| format!("{}: Missing to_region", input_err_msg(file_path)))?;
        limits[[row.region, to_region]] = row.value;
    }

    Ok(Parameter::Interregional(limits))
}

/// Load a solved model from a folder.
///
/// # Arguments
///
/// * `model_dir` - Folder containing `model.toml` and the parameter and variable CSV files
pub fn load_model_dir(model_dir: &Path) -> Result<ModelData> {
    let file_path = model_dir.join(MODEL_FILE_NAME);
    let file: ModelFile = read_toml(&file_path)?;
    let sets = read_sets(&file).with_context(|| input_err_msg(&file_path))?;
    let options = options_from_toml(file.options).with_context(|| input_err_msg(&file_path))?;
    ensure!(
        file.hours_per_period > 0.0,
        "{}: hours_per_period must be positive",
        input_err_msg(&file_path)
    );

    let mut parameters = IndexMap::new();
    parameters.insert(
        DEMAND.to_string(),
        read_demand(&model_dir.join(DEMAND_FILE_NAME), &sets)?,
    );
    parameters.insert(
        CLASS_LIMITS.to_string(),
        read_class_parameter(&model_dir.join(CLASS_LIMITS_FILE_NAME), &sets)?,
    );
    parameters.insert(
        HYDRO_CAPACITY.to_string(),
        read_class_parameter(&model_dir.join(HYDRO_CAPACITY_FILE_NAME), &sets)?,
    );
    parameters.insert(
        TRANSMISSION_LIMITS.to_string(),
        read_interregional(&model_dir.join(TRANSMISSION_LIMITS_FILE_NAME), &sets)?,
    );

    let variables = VARIABLE_FILES
        .iter()
        .map(|(name, file_name)| Ok((*name, read_variable(&model_dir.join(file_name), &sets)?)))
        .collect::<Result<HashMap<_, _>>>()?;

    info!(
        "Loaded model with {} regions, {} technologies and {} hours ({})",
        sets.num_regions(),
        sets.techs.len(),
        sets.hours,
        sets.techs.iter().join(", ")
    );

    Ok(ModelData {
        status: file.status,
        sets,
        options,
        hours_per_period: file.hours_per_period,
        parameters,
        variables,
    })
}
