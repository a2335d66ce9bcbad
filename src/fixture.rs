//! Fixtures for tests
//!
//! The fixture model has two regions, three hours and four technologies. Electricity output in
//! each hour exactly meets demand in each region.
use crate::chart::{
    ChartConfig, ChartRenderer, DispatchChart, StackedBarChart, UtilisationCharts,
};
use crate::extract::extract_results;
use crate::id::{ClassID, RegionID, TechID};
use crate::model::{ModelData, VariableData, VariableKey, VariableName};
use crate::options::ModelOptions;
use crate::results::{
    CLASS_LIMITS, ClassVectors, DEMAND, HYDRO_CAPACITY, ModelStatus, Parameter, Results,
    TRANSMISSION_LIMITS,
};
use crate::sets::{ModelSets, TechType};
use indexmap::{IndexMap, IndexSet, indexmap};
use anyhow::Result;
use ndarray::{Array1, array};
use rstest::fixture;
use std::collections::HashMap;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// Regions, in order
pub const REGIONS: [&str; 2] = ["NOR", "DEU"];

/// Number of real hours represented by each modelled hour
pub const HOURS_PER_PERIOD: f64 = 1000.0;

/// Electricity output: (tech, class, [hourly values for each region])
pub const ELECTRICITY: [(&str, &str, [[f64; 3]; 2]); 5] = [
    ("pv", "a1", [[1.0, 2.0, 3.0], [2.0, 2.0, 2.0]]),
    ("pv", "a2", [[0.0, 1.0, 0.0], [1.0, 1.0, 1.0]]),
    ("wind", "a1", [[4.0, 4.0, 4.0], [3.0, 3.0, 3.0]]),
    ("hydro", "x0", [[5.0, 5.0, 5.0], [0.0, 0.0, 0.0]]),
    ("battery", "_", [[0.0, 0.0, 1.0], [0.0, 1.0, 0.0]]),
];

/// Installed capacity: (tech, class, [value for each region])
pub const CAPACITY: [(&str, &str, [f64; 2]); 5] = [
    ("pv", "a1", [3.0, 2.0]),
    ("pv", "a2", [1.0, 1.0]),
    ("wind", "a1", [4.0, 3.0]),
    ("hydro", "x0", [5.0, 0.0]),
    ("battery", "_", [1.0, 1.0]),
];

/// Demand: [hourly values for each region]
pub const DEMAND_VALUES: [[f64; 3]; 2] = [[10.0, 12.0, 13.0], [6.0, 7.0, 6.0]];

/// System cost per region
pub const SYSTEM_COST: [f64; 2] = [300.0, 240.0];

#[fixture]
pub fn sets() -> ModelSets {
    let classes = |ids: &[&str]| -> IndexSet<ClassID> { ids.iter().map(|&id| id.into()).collect() };
    ModelSets::new(
        REGIONS.iter().map(|&id| id.into()).collect(),
        ["pv", "wind", "hydro", "battery"]
            .into_iter()
            .map(TechID::from)
            .collect(),
        indexmap! {
            "pv".into() => classes(&["a1", "a2"]),
            "wind".into() => classes(&["a1"]),
            "hydro".into() => classes(&["x0"]),
            "battery".into() => classes(&["_"]),
        },
        indexmap! {"battery".into() => classes(&["_"])},
        3,
        indexmap! {
            "pv".into() => TechType::Vre,
            "wind".into() => TechType::Vre,
            "hydro".into() => TechType::Hydro,
            "battery".into() => TechType::Storage,
        },
    )
    .unwrap()
}

fn region(index: usize) -> RegionID {
    REGIONS[index].into()
}

fn class_key(region_index: usize, tech: &str, class: &str) -> VariableKey {
    VariableKey::new()
        .region(&region(region_index))
        .tech(&tech.into())
        .class(&class.into())
}

fn class_vectors(values: &[(&str, &str, [f64; 2])]) -> ClassVectors {
    let mut vectors = ClassVectors::new();
    for (tech, class, values) in values {
        vectors
            .insert(&(*tech).into(), &(*class).into(), Array1::from(values.to_vec()))
            .unwrap();
    }
    vectors
}

fn parameters() -> IndexMap<String, Parameter> {
    let demand = array![
        [DEMAND_VALUES[0][0], DEMAND_VALUES[1][0]],
        [DEMAND_VALUES[0][1], DEMAND_VALUES[1][1]],
        [DEMAND_VALUES[0][2], DEMAND_VALUES[1][2]],
    ];
    let class_limits = class_vectors(&[
        ("pv", "a1", [5.0, 5.0]),
        ("pv", "a2", [2.0, 2.0]),
        ("wind", "a1", [10.0, 3.0]),
    ]);
    let hydro_capacity = class_vectors(&[("hydro", "x0", [6.0, 0.0])]);

    indexmap! {
        DEMAND.to_string() => Parameter::Hourly(demand),
        CLASS_LIMITS.to_string() => Parameter::ByClass(class_limits),
        HYDRO_CAPACITY.to_string() => Parameter::ByClass(hydro_capacity),
        TRANSMISSION_LIMITS.to_string() => Parameter::Interregional(array![[0.0, 2.0], [2.0, 0.0]]),
    }
}

fn variables() -> HashMap<VariableName, VariableData> {
    let mut electricity = HashMap::new();
    for (tech, class, values) in ELECTRICITY {
        for (r, hourly) in values.iter().enumerate() {
            for (h, value) in hourly.iter().enumerate() {
                electricity.insert(class_key(r, tech, class).hour(h), *value);
            }
        }
    }

    let capacity = CAPACITY
        .iter()
        .flat_map(|(tech, class, values)| {
            values
                .iter()
                .enumerate()
                .map(move |(r, value)| (class_key(r, tech, class), *value))
        })
        .collect();

    let hourly = |tech: &str, class: Option<&str>, values: [[f64; 3]; 2]| {
        let mut map = HashMap::new();
        for (r, hourly) in values.iter().enumerate() {
            for (h, value) in hourly.iter().enumerate() {
                let mut key = VariableKey::new().region(&region(r)).tech(&tech.into());
                if let Some(class) = class {
                    key = key.class(&class.into());
                }
                map.insert(key.hour(h), *value);
            }
        }
        VariableData::Sparse(map)
    };

    let per_region = |values: [f64; 2]| {
        VariableData::Sparse(
            values
                .iter()
                .enumerate()
                .map(|(r, value)| (VariableKey::new().region(&region(r)), *value))
                .collect(),
        )
    };

    let mut fuel_use = HashMap::new();
    let mut transmission = HashMap::new();
    let mut transmission_capacity = HashMap::new();
    for r in 0..REGIONS.len() {
        for tech in ["pv", "wind", "hydro", "battery"] {
            fuel_use.insert(VariableKey::new().region(&region(r)).tech(&tech.into()), 0.0);
        }
        for r2 in 0..REGIONS.len() {
            if r == r2 {
                continue;
            }
            let key = VariableKey::new().region(&region(r)).to_region(&region(r2));
            let (flows, capacity) = if r == 0 {
                ([0.0, 1.0, 0.0], 1.0)
            } else {
                ([0.0, 0.0, 0.0], 0.5)
            };
            for (h, flow) in flows.into_iter().enumerate() {
                transmission.insert(key.clone().hour(h), flow);
            }
            transmission_capacity.insert(key, capacity);
        }
    }

    indexmap::indexmap! {
        VariableName::SystemCost => per_region(SYSTEM_COST),
        VariableName::CO2Emissions => per_region([1.0, 2.0]),
        VariableName::FuelUse => VariableData::Sparse(fuel_use),
        VariableName::Electricity => VariableData::Sparse(electricity),
        VariableName::Charging => hourly("battery", None, [[1.0, 0.0, 0.0], [1.0, 0.0, 0.0]]),
        VariableName::StorageLevel => hourly("battery", Some("_"), [[1.0, 1.0, 0.0], [1.0, 0.0, 0.0]]),
        VariableName::Transmission => VariableData::Sparse(transmission),
        VariableName::TransmissionCapacity => VariableData::Sparse(transmission_capacity),
        VariableName::Capacity => VariableData::Sparse(capacity),
    }
    .into_iter()
    .collect()
}

#[fixture]
pub fn model_data(sets: ModelSets) -> ModelData {
    let options: ModelOptions = [("carbontax".to_string(), 50.0.into())]
        .into_iter()
        .collect();

    ModelData {
        status: ModelStatus::Optimal,
        sets,
        options,
        hours_per_period: HOURS_PER_PERIOD,
        parameters: parameters(),
        variables: variables(),
    }
}

#[fixture]
pub fn results(model_data: ModelData) -> Results {
    extract_results(&model_data, model_data.status).unwrap()
}

#[fixture]
pub fn chart_config() -> ChartConfig {
    ChartConfig::default()
}

/// Records which charts were drawn
#[derive(Default)]
pub struct RecordingRenderer {
    pub drawn: Vec<String>,
    pub bar_charts: Vec<StackedBarChart>,
}

impl ChartRenderer for RecordingRenderer {
    fn stacked_bars(&mut self, chart: &StackedBarChart) -> Result<()> {
        self.drawn.push(chart.name.clone());
        self.bar_charts.push(chart.clone());
        Ok(())
    }

    fn small_multiples(&mut self, charts: &UtilisationCharts) -> Result<()> {
        self.drawn.push(charts.name.clone());
        Ok(())
    }

    fn stacked_area(&mut self, chart: &DispatchChart) -> Result<()> {
        self.drawn.push(chart.name.clone());
        Ok(())
    }
}
