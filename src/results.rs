//! The results record produced from a solved model.
use crate::id::{ClassID, TechID};
use crate::options::ModelOptions;
use crate::sets::ModelSets;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use indexmap::map::Entry;
use ndarray::{Array, Array1, Array2, Array3, Dimension, Ix1, Ix2};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Demand per hour and region
pub const DEMAND: &str = "demand";
/// Capacity limit per region, technology and class
pub const CLASS_LIMITS: &str = "classlimits";
/// Hydro capacity limit per region and hydro class
pub const HYDRO_CAPACITY: &str = "hydrocapacity";
/// Transmission capacity limit per region pair
pub const TRANSMISSION_LIMITS: &str = "transmissionlimits";

/// The parameters copied from the model into [`Results`]
pub const RESULT_PARAMETERS: [&str; 4] =
    [DEMAND, CLASS_LIMITS, HYDRO_CAPACITY, TRANSMISSION_LIMITS];

/// The termination status reported by the solver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ModelStatus {
    /// An optimal solution was found
    Optimal,
    /// A solution was found but it may not be optimal
    Feasible,
    /// The model is infeasible
    Infeasible,
    /// The solver stopped at an iteration or time limit
    Limit,
    /// Anything else
    Other,
}

/// Metadata about the time discretisation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HourInfo {
    /// Number of real hours represented by each modelled hour
    pub hours_per_period: f64,
}

/// A technology and one of its classes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TechClass {
    /// The technology
    pub tech: TechID,
    /// The class, which is only meaningful for this technology
    pub class: ClassID,
}

impl TechClass {
    /// Create a new [`TechClass`]
    pub fn new(tech: &TechID, class: &ClassID) -> Self {
        Self {
            tech: tech.clone(),
            class: class.clone(),
        }
    }
}

/// A dense array for each (technology, class) combination.
///
/// Technologies have differing class sets, so the (technology, class) product is irregular while
/// the remaining dimensions are always complete. Storing one dense block per combination avoids
/// materialising the mostly empty full product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "D: Dimension + Serialize",
    deserialize = "D: Dimension + Deserialize<'de>"
))]
pub struct ClassArrays<D: Dimension>(IndexMap<TechClass, Array<f64, D>>);

/// Per (technology, class): one (hour × region) matrix
pub type ClassMatrices = ClassArrays<Ix2>;

/// Per (technology, class): one value per region
pub type ClassVectors = ClassArrays<Ix1>;

impl<D: Dimension> Default for ClassArrays<D> {
    fn default() -> Self {
        Self(IndexMap::new())
    }
}

impl<D: Dimension> ClassArrays<D> {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the block for a (technology, class) combination, which must not already be present
    pub fn insert(&mut self, tech: &TechID, class: &ClassID, block: Array<f64, D>) -> Result<()> {
        match self.0.entry(TechClass::new(tech, class)) {
            Entry::Vacant(entry) => {
                entry.insert(block);
                Ok(())
            }
            Entry::Occupied(_) => {
                anyhow::bail!("Values for technology {tech}, class {class} already present")
            }
        }
    }

    /// Get the block for a (technology, class) combination
    pub fn get(&self, tech: &TechID, class: &ClassID) -> Result<&Array<f64, D>> {
        self.0
            .get(&TechClass::new(tech, class))
            .with_context(|| format!("No values for technology {tech}, class {class}"))
    }

    /// Whether there is a block for the (technology, class) combination
    pub fn contains(&self, tech: &TechID, class: &ClassID) -> bool {
        self.0.contains_key(&TechClass::new(tech, class))
    }

    /// Iterate over the (technology, class) combinations and their blocks
    pub fn iter(&self) -> impl Iterator<Item = (&TechClass, &Array<f64, D>)> {
        self.0.iter()
    }

    /// Number of blocks
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no blocks
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Elementwise sum of the blocks for the given classes of one technology.
    ///
    /// # Arguments
    ///
    /// * `tech` - The technology
    /// * `classes` - The classes to add up
    /// * `shape` - The shape of each block (used when there are no classes)
    pub fn sum_classes<'a, I>(&self, tech: &TechID, classes: I, shape: D) -> Result<Array<f64, D>>
    where
        I: IntoIterator<Item = &'a ClassID>,
    {
        let mut total = Array::zeros(shape);
        for class in classes {
            total += self.get(tech, class)?;
        }

        Ok(total)
    }
}

/// A model parameter, in the shape in which it is defined
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Parameter {
    /// Defined per region
    Regional(Array1<f64>),
    /// Defined per hour and region (hour × region)
    Hourly(Array2<f64>),
    /// Defined per region pair (region × region)
    Interregional(Array2<f64>),
    /// Defined per technology and class, with a value per region
    ByClass(ClassVectors),
}

impl Parameter {
    /// The values as an (hour × region) matrix
    pub fn as_hourly(&self) -> Result<&Array2<f64>> {
        match self {
            Self::Hourly(values) => Ok(values),
            _ => anyhow::bail!("Parameter is not defined per hour and region"),
        }
    }

    /// The values as a (region × region) matrix
    pub fn as_interregional(&self) -> Result<&Array2<f64>> {
        match self {
            Self::Interregional(values) => Ok(values),
            _ => anyhow::bail!("Parameter is not defined per region pair"),
        }
    }

    /// The values per (technology, class)
    pub fn as_by_class(&self) -> Result<&ClassVectors> {
        match self {
            Self::ByClass(values) => Ok(values),
            _ => anyhow::bail!("Parameter is not defined per technology and class"),
        }
    }
}

/// The results of a model run.
///
/// Created once from a solved model and read-only afterwards; anything derived from it is a new
/// value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Results {
    /// Solver status
    pub status: ModelStatus,
    /// The options the model was run with
    pub options: ModelOptions,
    /// Time discretisation metadata
    pub hour_info: HourInfo,
    /// The index sets
    pub sets: ModelSets,
    /// Parameters, keyed by name
    pub params: IndexMap<String, Parameter>,
    /// System cost per region (M€/year)
    pub system_cost: Array1<f64>,
    /// CO2 emissions per region (Mt/year)
    pub co2_emissions: Array1<f64>,
    /// Fuel use (region × technology, GWh/year)
    pub fuel_use: Array2<f64>,
    /// Electricity output per (technology, class), hour × region (GW)
    pub electricity: ClassMatrices,
    /// Charging per storage technology, hour × region (GW)
    pub charging: IndexMap<TechID, Array2<f64>>,
    /// Storage level per (storage technology, storage class), hour × region (GWh)
    pub storage_level: ClassMatrices,
    /// Transmission flow (hour × from region × to region, GW)
    pub transmission: Array3<f64>,
    /// Transmission capacity (from region × to region, GW)
    pub transmission_capacity: Array2<f64>,
    /// Installed capacity per (technology, class), per region (GW)
    pub capacity: ClassVectors,
}

impl Results {
    /// Look up a parameter by name
    pub fn param(&self, name: &str) -> Result<&Parameter> {
        self.params
            .get(name)
            .with_context(|| format!("Results have no parameter named {name}"))
    }

    /// Check that the arrays agree with the index sets.
    ///
    /// For every technology and each of its classes there must be exactly one electricity
    /// matrix of shape (hours × regions) and no others; likewise for storage levels over the
    /// storage classes of storage technologies.
    pub fn check_shapes(&self) -> Result<()> {
        let sets = &self.sets;
        let (hours, regions) = (sets.hours, sets.num_regions());

        let mut expected = 0;
        for tech in &sets.techs {
            for class in sets.classes_of(tech)? {
                let block = self.electricity.get(tech, class)?;
                ensure!(
                    block.dim() == (hours, regions),
                    "Electricity for {tech}, {class} has the wrong shape"
                );
                ensure!(
                    self.capacity.get(tech, class)?.len() == regions,
                    "Capacity for {tech}, {class} has the wrong shape"
                );
                expected += 1;
            }
        }
        ensure!(
            self.electricity.len() == expected,
            "Electricity defined for unknown technology/class combinations"
        );

        let mut expected = 0;
        for tech in sets.storage_techs() {
            for class in sets.storage_classes_of(tech)? {
                ensure!(
                    self.storage_level.get(tech, class)?.dim() == (hours, regions),
                    "Storage level for {tech}, {class} has the wrong shape"
                );
                expected += 1;
            }
        }
        ensure!(
            self.storage_level.len() == expected,
            "Storage level defined for unknown technology/class combinations"
        );

        Ok(())
    }
}
