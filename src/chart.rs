//! Chart configuration, region selection and the data behind each chart.
//!
//! The numbers shown in a chart are computed into plain data structures first and then handed to
//! a [`ChartRenderer`], which does the drawing.
//!
//! The default configuration has two region groups for the 21-region Europe and MENA layout:
//! `EUROPE` (the eight European regions as one block) and `EUROPE_MENA` (Europe and MENA as
//! two blocks). Other groups can be given in a chart configuration file.
use crate::id::TechID;
use crate::input::read_toml;
use crate::sets::ModelSets;
use anyhow::{Context, Result, bail, ensure};
use itertools::Itertools;
use serde::de::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;

pub mod svg;
pub use svg::SvgRenderer;

/// Selector which shows every region as its own bar
pub const BARS_SELECTOR: &str = "BARS";

/// Selector which adds all regions together
pub const TOTAL_SELECTOR: &str = "TOTAL";

/// An RGB colour, written as `#rrggbb` in configuration files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Colour(pub u8, pub u8, pub u8);

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

impl std::str::FromStr for Colour {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let hex = s
            .strip_prefix('#')
            .with_context(|| format!("Invalid colour '{s}': should be in form #rrggbb"))?;
        ensure!(
            hex.len() == 6 && hex.is_ascii(),
            "Invalid colour '{s}': should be in form #rrggbb"
        );
        let component = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .with_context(|| format!("Invalid colour '{s}': should be in form #rrggbb"))
        };

        Ok(Self(component(0)?, component(2)?, component(4)?))
    }
}

impl<'de> Deserialize<'de> for Colour {
    fn deserialize<D>(deserialiser: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserialiser)?;
        s.parse().map_err(|err: anyhow::Error| D::Error::custom(err))
    }
}

impl Serialize for Colour {
    fn serialize<S>(&self, serialiser: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serialiser.collect_str(self)
    }
}

/// How a technology is drawn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartTech {
    /// The technology
    pub id: TechID,
    /// Fill colour
    pub colour: Colour,
    /// Label used in legends
    pub label: String,
}

/// A contiguous block of regions (by position in REGION) shown as one bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionBlock {
    /// Label for the bar
    pub label: String,
    /// Position of the first region in the block
    pub start: usize,
    /// One past the position of the last region in the block
    pub end: usize,
}

/// A named way of splitting the regions into blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionGroup {
    /// The name used to select this grouping
    pub name: String,
    /// The blocks, in display order
    pub blocks: Vec<RegionBlock>,
}

/// Fixed lookup tables used when charting results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Colour and label for each technology which can be charted, in display order
    pub techs: Vec<ChartTech>,
    /// Technologies whose class utilisation is charted
    pub class_techs: Vec<TechID>,
    /// Technology whose output comes from capacity which existed before the model run. Its
    /// output is excluded when calculating system cost per unit energy.
    pub existing_tech: TechID,
    /// Named groupings of regions
    #[serde(default)]
    pub region_groups: Vec<RegionGroup>,
}

impl Default for ChartConfig {
    fn default() -> Self {
        let techs = [
            ("gasCCS", "#a0a0a0", "gas CCS"),
            ("coal", "#404040", "coal"),
            ("gasGT", "#c8c8c8", "gas GT"),
            ("gasCCGT", "#8c8c8c", "gas CCGT"),
            ("bioGT", "#98c860", "bio GT"),
            ("bioCCGT", "#60a030", "bio CCGT"),
            ("bioCCS", "#307018", "bio CCS"),
            ("nuclear", "#d84040", "nuclear"),
            ("wind", "#3070d0", "wind"),
            ("offwind", "#1840a0", "offshore wind"),
            ("hydro", "#60c0e0", "hydro"),
            ("csp", "#f0a020", "CSP"),
            ("pv", "#f8d820", "solar PV"),
            ("pvroof", "#f8e880", "rooftop PV"),
            ("battery", "#a050c0", "battery"),
        ]
        .into_iter()
        .map(|(id, colour, label)| ChartTech {
            id: id.into(),
            // The table above is well-formed
            colour: colour.parse().unwrap_or(Colour(0, 0, 0)),
            label: label.to_string(),
        })
        .collect();

        let region_group = |name: &str, blocks: &[(&str, usize, usize)]| RegionGroup {
            name: name.to_string(),
            blocks: blocks
                .iter()
                .map(|&(label, start, end)| RegionBlock {
                    label: label.to_string(),
                    start,
                    end,
                })
                .collect(),
        };

        Self {
            techs,
            class_techs: ["wind", "offwind", "pv", "pvroof", "csp", "hydro"]
                .into_iter()
                .map(TechID::from)
                .collect(),
            existing_tech: "hydro".into(),
            region_groups: vec![
                region_group("EUROPE", &[("Europe", 0, 8)]),
                region_group("EUROPE_MENA", &[("Europe", 0, 8), ("MENA", 8, 21)]),
            ],
        }
    }
}

impl ChartConfig {
    /// Read chart configuration from a TOML file
    pub fn from_path(file_path: &Path) -> Result<Self> {
        let config: Self = read_toml(file_path)?;
        ensure!(
            config.techs.iter().map(|tech| &tech.id).all_unique(),
            "Technologies listed more than once in {}",
            file_path.display()
        );

        Ok(config)
    }

    /// Look up how a technology is drawn, with its position in the display order.
    ///
    /// Every technology which is charted must be listed.
    pub fn tech(&self, tech: &TechID) -> Result<(usize, &ChartTech)> {
        self.techs
            .iter()
            .find_position(|entry| entry.id == *tech)
            .with_context(|| {
                format!(
                    "No chart colour or label for technology {tech} (add it to the chart \
                     configuration)"
                )
            })
    }

    /// Sort technologies into display order, failing if any is not in the configuration
    pub fn display_order<'a, I>(&self, techs: I) -> Result<Vec<&'a TechID>>
    where
        I: IntoIterator<Item = &'a TechID>,
    {
        let mut positioned = techs
            .into_iter()
            .map(|tech| Ok((self.tech(tech)?.0, tech)))
            .collect::<Result<Vec<_>>>()?;
        positioned.sort_by_key(|(position, _)| *position);

        Ok(positioned.into_iter().map(|(_, tech)| tech).collect())
    }
}

/// Which regions a chart shows, and how they are split into bars
#[derive(Debug, Clone, PartialEq)]
pub enum RegionSelector {
    /// A single region (by position in REGION)
    Region(usize),
    /// Every region as its own bar
    Bars,
    /// All regions added together
    Total,
    /// A named grouping of regions into blocks
    Group(RegionGroup),
}

/// A set of regions shown as one bar
#[derive(Debug, Clone, PartialEq)]
pub struct RegionColumn {
    /// Label for the bar
    pub label: String,
    /// Positions of the regions in REGION
    pub regions: Vec<usize>,
}

impl RegionSelector {
    /// Resolve a selector string.
    ///
    /// [`BARS_SELECTOR`], [`TOTAL_SELECTOR`] and the names of configured region groups are
    /// checked first, then the regions. All matches are exact.
    pub fn parse(selector: &str, sets: &ModelSets, config: &ChartConfig) -> Result<Self> {
        if selector == BARS_SELECTOR {
            return Ok(Self::Bars);
        }
        if selector == TOTAL_SELECTOR {
            return Ok(Self::Total);
        }
        if let Some(group) = config
            .region_groups
            .iter()
            .find(|group| group.name == selector)
        {
            return Ok(Self::Group(group.clone()));
        }

        match sets.regions.get_index_of(selector) {
            Some(index) => Ok(Self::Region(index)),
            None => bail!(
                "Unknown region {selector}; valid regions are: {}",
                sets.regions.iter().join(", ")
            ),
        }
    }

    /// A short name for the selection, used in chart titles and file names
    pub fn label(&self, sets: &ModelSets) -> String {
        match self {
            Self::Region(index) => sets
                .regions
                .get_index(*index)
                .map_or_else(String::new, ToString::to_string),
            Self::Bars => BARS_SELECTOR.to_string(),
            Self::Total => TOTAL_SELECTOR.to_string(),
            Self::Group(group) => group.name.clone(),
        }
    }

    /// The bars making up the chart
    pub fn columns(&self, sets: &ModelSets) -> Result<Vec<RegionColumn>> {
        let num_regions = sets.num_regions();
        let columns = match self {
            Self::Region(index) => {
                ensure!(*index < num_regions, "Region index {index} out of range");
                vec![RegionColumn {
                    label: sets.regions[*index].to_string(),
                    regions: vec![*index],
                }]
            }
            Self::Bars => sets
                .regions
                .iter()
                .enumerate()
                .map(|(index, region)| RegionColumn {
                    label: region.to_string(),
                    regions: vec![index],
                })
                .collect(),
            Self::Total => vec![RegionColumn {
                label: TOTAL_SELECTOR.to_string(),
                regions: (0..num_regions).collect(),
            }],
            Self::Group(group) => group
                .blocks
                .iter()
                .map(|block| {
                    ensure!(
                        block.start < block.end && block.end <= num_regions,
                        "Region block {} ({}..{}) of group {} does not fit the {num_regions} \
                         regions",
                        block.label,
                        block.start,
                        block.end,
                        group.name
                    );
                    Ok(RegionColumn {
                        label: block.label.clone(),
                        regions: (block.start..block.end).collect(),
                    })
                })
                .collect::<Result<_>>()?,
        };

        Ok(columns)
    }
}

/// Every region included in any of the columns, in REGION order
pub fn selected_regions(columns: &[RegionColumn]) -> Vec<usize> {
    columns
        .iter()
        .flat_map(|column| column.regions.iter().copied())
        .sorted()
        .dedup()
        .collect()
}

/// Options for the dispatch chart
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChartOptions {
    /// Overlay storage charging and discharging power
    pub storage_power: bool,
    /// Overlay the storage energy level
    pub storage_level: bool,
}

/// One series in a stacked chart
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    /// The technology shown
    pub tech: TechID,
    /// Legend label
    pub label: String,
    /// Fill colour
    pub colour: Colour,
    /// One value per category (bar or hour)
    pub values: Vec<f64>,
}

/// A stacked bar chart, optionally with a marker on each bar
#[derive(Debug, Clone, PartialEq)]
pub struct StackedBarChart {
    /// File name stem
    pub name: String,
    /// Chart title
    pub title: String,
    /// Y-axis description
    pub y_label: String,
    /// Bar labels
    pub categories: Vec<String>,
    /// Stacked series, bottom first
    pub series: Vec<Series>,
    /// Label for the markers
    pub marker_label: String,
    /// A marker value per bar (e.g. demand)
    pub markers: Vec<f64>,
    /// Text shown on the chart
    pub annotation: Option<String>,
}

impl StackedBarChart {
    /// Total height of each bar
    pub fn bar_totals(&self) -> Vec<f64> {
        (0..self.categories.len())
            .map(|i| self.series.iter().map(|series| series.values[i]).sum())
            .collect()
    }
}

/// Used capacity and remaining headroom for each class of a technology
#[derive(Debug, Clone, PartialEq)]
pub struct UtilisationChart {
    /// The technology
    pub tech: TechID,
    /// Label for the technology
    pub label: String,
    /// Colour for used capacity
    pub colour: Colour,
    /// Class labels
    pub classes: Vec<String>,
    /// Installed capacity per class
    pub used: Vec<f64>,
    /// Capacity which could still be built per class
    pub headroom: Vec<f64>,
}

/// A grid of class utilisation charts
#[derive(Debug, Clone, PartialEq)]
pub struct UtilisationCharts {
    /// File name stem
    pub name: String,
    /// Overall title
    pub title: String,
    /// One chart per technology
    pub charts: Vec<UtilisationChart>,
}

/// Hourly dispatch shown as a stacked area chart
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchChart {
    /// File name stem
    pub name: String,
    /// Chart title
    pub title: String,
    /// Stacked generation, one value per hour
    pub series: Vec<Series>,
    /// Demand per hour
    pub demand: Vec<f64>,
    /// Storage charging per hour, drawn as negative power
    pub storage_charging: Option<Vec<f64>>,
    /// Storage energy level per hour
    pub storage_level: Option<Vec<f64>>,
}

impl DispatchChart {
    /// Number of hours shown
    pub fn num_hours(&self) -> usize {
        self.demand.len()
    }
}

/// Something which can draw charts
pub trait ChartRenderer {
    /// Draw a stacked bar chart
    fn stacked_bars(&mut self, chart: &StackedBarChart) -> Result<()>;

    /// Draw a grid of small utilisation charts
    fn small_multiples(&mut self, charts: &UtilisationCharts) -> Result<()>;

    /// Draw a stacked area chart
    fn stacked_area(&mut self, chart: &DispatchChart) -> Result<()>;
}
