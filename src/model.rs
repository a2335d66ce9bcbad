//! The interface to a solved optimisation model.
//!
//! The model itself is solved elsewhere. Result extraction only needs to be able to look up the
//! index sets, parameters and the solved values of decision variables, which is captured by the
//! [`SolvedModel`] and [`DecisionVariable`] traits. [`ModelData`] is an in-memory implementation,
//! e.g. for a model whose values have been exported to disk.
use crate::id::{ClassID, RegionID, TechID};
use crate::options::ModelOptions;
use crate::results::{ModelStatus, Parameter};
use crate::sets::ModelSets;
use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use strum::{Display, EnumIter};

/// The decision variables whose values are extracted from a solved model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum VariableName {
    /// System cost per region
    SystemCost,
    /// CO2 emissions per region
    CO2Emissions,
    /// Fuel use per region and technology
    FuelUse,
    /// Electricity output per region, technology, class and hour
    Electricity,
    /// Storage charging per region, storage technology and hour
    Charging,
    /// Storage level per region, storage technology, storage class and hour
    StorageLevel,
    /// Transmission flow per region pair and hour
    Transmission,
    /// Installed transmission capacity per region pair
    TransmissionCapacity,
    /// Installed capacity per region, technology and class
    Capacity,
}

/// A possibly partial index into a decision variable.
///
/// Fields which are `None` are unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VariableKey {
    /// The region (or origin region, for transmission)
    pub region: Option<RegionID>,
    /// The destination region, for transmission
    pub to_region: Option<RegionID>,
    /// The technology
    pub tech: Option<TechID>,
    /// The class
    pub class: Option<ClassID>,
    /// The hour (starting from zero)
    pub hour: Option<usize>,
}

impl VariableKey {
    /// An empty key, which matches every element
    pub fn new() -> Self {
        Self::default()
    }

    /// Constrain the region
    pub fn region(mut self, region: &RegionID) -> Self {
        self.region = Some(region.clone());
        self
    }

    /// Constrain the destination region
    pub fn to_region(mut self, region: &RegionID) -> Self {
        self.to_region = Some(region.clone());
        self
    }

    /// Constrain the technology
    pub fn tech(mut self, tech: &TechID) -> Self {
        self.tech = Some(tech.clone());
        self
    }

    /// Constrain the class
    pub fn class(mut self, class: &ClassID) -> Self {
        self.class = Some(class.clone());
        self
    }

    /// Constrain the hour
    pub fn hour(mut self, hour: usize) -> Self {
        self.hour = Some(hour);
        self
    }

    /// Whether `other` agrees with every field constrained by `self`
    pub fn matches(&self, other: &VariableKey) -> bool {
        fn agrees<T: PartialEq>(pattern: Option<&T>, value: Option<&T>) -> bool {
            pattern.is_none_or(|pattern| value == Some(pattern))
        }

        agrees(self.region.as_ref(), other.region.as_ref())
            && agrees(self.to_region.as_ref(), other.to_region.as_ref())
            && agrees(self.tech.as_ref(), other.tech.as_ref())
            && agrees(self.class.as_ref(), other.class.as_ref())
            && agrees(self.hour.as_ref(), other.hour.as_ref())
    }
}

impl fmt::Display for VariableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(region) = &self.region {
            parts.push(format!("region={region}"));
        }
        if let Some(to_region) = &self.to_region {
            parts.push(format!("to_region={to_region}"));
        }
        if let Some(tech) = &self.tech {
            parts.push(format!("tech={tech}"));
        }
        if let Some(class) = &self.class {
            parts.push(format!("class={class}"));
        }
        if let Some(hour) = self.hour {
            parts.push(format!("hour={hour}"));
        }
        write!(f, "[{}]", parts.join(", "))
    }
}

/// The result of looking up a (possibly partial) key in a decision variable
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// The key identified a single element
    Scalar(f64),
    /// The key matched several elements
    Elements(Vec<(VariableKey, f64)>),
}

/// A decision variable whose solved values can be looked up
pub trait DecisionVariable {
    /// Look up a key, returning either a single value or every element matching the key.
    ///
    /// Returns an error if nothing matches.
    fn select(&self, key: &VariableKey) -> Result<Selection>;

    /// Look up the value of a single element
    fn value(&self, key: &VariableKey) -> Result<f64> {
        match self.select(key)? {
            Selection::Scalar(value) => Ok(value),
            Selection::Elements(elements) => bail!(
                "Key {key} matches {} elements rather than one",
                elements.len()
            ),
        }
    }
}

/// The solved values of a decision variable, held in memory
#[derive(Debug, Clone, PartialEq)]
pub enum VariableData {
    /// A variable with no indices
    Scalar(f64),
    /// A variable defined over some subset of its index product
    Sparse(HashMap<VariableKey, f64>),
}

impl DecisionVariable for VariableData {
    fn select(&self, key: &VariableKey) -> Result<Selection> {
        match self {
            Self::Scalar(value) => Ok(Selection::Scalar(*value)),
            Self::Sparse(values) => {
                if let Some(value) = values.get(key) {
                    return Ok(Selection::Scalar(*value));
                }

                let elements: Vec<_> = values
                    .iter()
                    .filter(|(element, _)| key.matches(element))
                    .map(|(element, value)| (element.clone(), *value))
                    .collect();
                match elements.len() {
                    0 => bail!("No element matching {key}"),
                    1 => Ok(Selection::Scalar(elements[0].1)),
                    _ => Ok(Selection::Elements(elements)),
                }
            }
        }
    }
}

/// A solved model from which results can be extracted
pub trait SolvedModel {
    /// The index sets (including the technology type classification)
    fn sets(&self) -> &ModelSets;

    /// The options the model was run with
    fn options(&self) -> &ModelOptions;

    /// Number of real hours represented by each modelled hour
    fn hours_per_period(&self) -> f64;

    /// Look up a parameter by name
    fn parameter(&self, name: &str) -> Result<&Parameter>;

    /// Look up a decision variable
    fn variable(&self, name: VariableName) -> Result<&dyn DecisionVariable>;
}

/// A solved model held entirely in memory
#[derive(Debug, Clone, PartialEq)]
pub struct ModelData {
    /// The solver status
    pub status: ModelStatus,
    /// The index sets
    pub sets: ModelSets,
    /// The options the model was run with
    pub options: ModelOptions,
    /// Number of real hours represented by each modelled hour
    pub hours_per_period: f64,
    /// Parameters, keyed by name
    pub parameters: IndexMap<String, Parameter>,
    /// Solved decision variables
    pub variables: HashMap<VariableName, VariableData>,
}

impl SolvedModel for ModelData {
    fn sets(&self) -> &ModelSets {
        &self.sets
    }

    fn options(&self) -> &ModelOptions {
        &self.options
    }

    fn hours_per_period(&self) -> f64 {
        self.hours_per_period
    }

    fn parameter(&self, name: &str) -> Result<&Parameter> {
        self.parameters
            .get(name)
            .with_context(|| format!("Model has no parameter named {name}"))
    }

    fn variable(&self, name: VariableName) -> Result<&dyn DecisionVariable> {
        let variable = self
            .variables
            .get(&name)
            .with_context(|| format!("Model has no variable named {name}"))?;
        Ok(variable)
    }
}
