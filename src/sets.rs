//! The index sets over which model parameters and decision variables are defined.
//!
//! Sets are data rather than types: the order of regions and hours matters when charting, while
//! the order of technologies and classes determines the row order of aggregated tables.
use crate::id::{ClassID, IDCollection, RegionID, TechID};
use anyhow::{Context, Result, ensure};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use strum::Display;

/// The type of a technology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TechType {
    /// Variable renewable energy (wind, solar)
    Vre,
    /// Dispatchable thermal plants
    Thermal,
    /// Hydropower
    Hydro,
    /// Storage technologies, which have a charging variable and their own class set
    Storage,
}

/// The named, ordered index sets of a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSets {
    /// Regions (REGION)
    pub regions: IndexSet<RegionID>,
    /// Technologies (TECH)
    pub techs: IndexSet<TechID>,
    /// The classes of each technology (CLASS)
    pub classes: IndexMap<TechID, IndexSet<ClassID>>,
    /// The storage classes of each storage technology (STORAGECLASS)
    pub storage_classes: IndexMap<TechID, IndexSet<ClassID>>,
    /// Number of hours in the dispatch horizon (HOUR)
    pub hours: usize,
    /// The type of each technology
    pub tech_types: IndexMap<TechID, TechType>,
}

impl ModelSets {
    /// Create a new [`ModelSets`], checking that the sets are consistent.
    ///
    /// Every technology needs a type and a class set, and every storage technology needs a
    /// storage class set.
    pub fn new(
        regions: IndexSet<RegionID>,
        techs: IndexSet<TechID>,
        classes: IndexMap<TechID, IndexSet<ClassID>>,
        storage_classes: IndexMap<TechID, IndexSet<ClassID>>,
        hours: usize,
        tech_types: IndexMap<TechID, TechType>,
    ) -> Result<Self> {
        let sets = Self {
            regions,
            techs,
            classes,
            storage_classes,
            hours,
            tech_types,
        };
        sets.validate()?;

        Ok(sets)
    }

    fn validate(&self) -> Result<()> {
        ensure!(!self.regions.is_empty(), "At least one region must be defined");
        ensure!(self.hours > 0, "At least one hour must be defined");

        for tech in &self.techs {
            self.tech_type(tech)?;
            self.classes_of(tech)?;
            if self.is_storage(tech) {
                self.storage_classes_of(tech)?;
            }
        }

        for tech in self.classes.keys().chain(self.storage_classes.keys()) {
            ensure!(
                self.techs.contains(tech),
                "Classes defined for unknown technology {tech}"
            );
        }

        Ok(())
    }

    /// The type of the given technology
    pub fn tech_type(&self, tech: &TechID) -> Result<TechType> {
        self.tech_types
            .get(tech)
            .copied()
            .with_context(|| format!("No type defined for technology {tech}"))
    }

    /// Whether the given technology is a storage technology
    pub fn is_storage(&self, tech: &TechID) -> bool {
        self.tech_types.get(tech) == Some(&TechType::Storage)
    }

    /// The storage technologies, in TECH order
    pub fn storage_techs(&self) -> impl Iterator<Item = &TechID> {
        self.techs.iter().filter(|tech| self.is_storage(tech))
    }

    /// The classes of the given technology
    pub fn classes_of(&self, tech: &TechID) -> Result<&IndexSet<ClassID>> {
        self.classes
            .get(tech)
            .with_context(|| format!("No classes defined for technology {tech}"))
    }

    /// The storage classes of the given storage technology
    pub fn storage_classes_of(&self, tech: &TechID) -> Result<&IndexSet<ClassID>> {
        self.storage_classes
            .get(tech)
            .with_context(|| format!("No storage classes defined for technology {tech}"))
    }

    /// The position of a region in REGION
    pub fn region_index(&self, region: &str) -> Result<usize> {
        self.regions.get_index_by_str(region)
    }

    /// The position of a technology in TECH
    pub fn tech_index(&self, tech: &str) -> Result<usize> {
        self.techs.get_index_by_str(tech)
    }

    /// Number of regions
    pub fn num_regions(&self) -> usize {
        self.regions.len()
    }
}
