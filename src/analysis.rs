//! Aggregation of a [`Results`] record into the tables and charts used for reporting.
//!
//! [`analyze_results`] computes every aggregate once. The returned [`Analysis`] can then produce
//! the charts for any region selection, drawing them with a [`ChartRenderer`].
use crate::chart::{
    ChartConfig, ChartOptions, ChartRenderer, DispatchChart, RegionColumn, RegionSelector, Series,
    StackedBarChart, UtilisationChart, UtilisationCharts, selected_regions,
};
use crate::id::{ClassID, TechID};
use crate::results::{CLASS_LIMITS, DEMAND, HYDRO_CAPACITY, Results};
use crate::sets::{ModelSets, TechType};
use crate::units::{Energy, Money, MoneyPerEnergy};
use anyhow::{Context, Result};
use float_cmp::approx_eq;
use log::{debug, warn};
use ndarray::{Array1, Array2, Array3, Axis, Ix1, Ix2, s};

/// Label of the column holding the sum over all regions
pub const TOTAL_COLUMN: &str = "TOTAL";

/// A table of values with one row per technology and one column per region, plus a final
/// [`TOTAL_COLUMN`]
#[derive(Debug, Clone, PartialEq)]
pub struct TechRegionTable {
    techs: Vec<TechID>,
    columns: Vec<String>,
    values: Array2<f64>,
}

impl TechRegionTable {
    /// Create a table from a (technology × region) array, appending the total column
    fn new(sets: &ModelSets, per_region: &Array2<f64>) -> Self {
        let num_regions = sets.num_regions();
        let mut values = Array2::<f64>::zeros((sets.techs.len(), num_regions + 1));
        values.slice_mut(s![.., ..num_regions]).assign(per_region);
        values
            .column_mut(num_regions)
            .assign(&per_region.sum_axis(Axis(1)));

        let columns = sets
            .regions
            .iter()
            .map(ToString::to_string)
            .chain([TOTAL_COLUMN.to_string()])
            .collect();

        Self {
            techs: sets.techs.iter().cloned().collect(),
            columns,
            values,
        }
    }

    /// The technologies (rows)
    pub fn techs(&self) -> &[TechID] {
        &self.techs
    }

    /// The column labels
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The whole table
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// The value for a technology in a column
    pub fn get(&self, tech: &str, column: &str) -> Result<f64> {
        let row = self
            .techs
            .iter()
            .position(|id| id.as_str() == tech)
            .with_context(|| format!("Unknown technology {tech}"))?;
        let col = self
            .columns
            .iter()
            .position(|label| label == column)
            .with_context(|| format!("Unknown column {column}"))?;

        Ok(self.values[[row, col]])
    }

    /// The value for a technology summed over all regions
    pub fn total(&self, tech: &str) -> Result<f64> {
        self.get(tech, TOTAL_COLUMN)
    }

    /// The value for the technology in the given row, summed over some regions
    fn region_sum(&self, row: usize, regions: &[usize]) -> f64 {
        regions.iter().map(|&r| self.values[[row, r]]).sum()
    }

    /// The sum over every technology and region
    pub fn grand_total(&self) -> f64 {
        self.values.column(self.columns.len() - 1).sum()
    }
}

/// Installed capacity of one class of a technology against the capacity which may be built
#[derive(Debug, Clone, PartialEq)]
pub struct ClassUtilisation {
    /// The technology
    pub tech: TechID,
    /// The class
    pub class: ClassID,
    /// Installed capacity per region (GW)
    pub used: Array1<f64>,
    /// Capacity limit per region (GW)
    pub limit: Array1<f64>,
}

/// The charts for one region selection, along with the figures shown on them
#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    /// Label of the region selection
    pub label: String,
    /// Annual generation per technology (TWh)
    pub generation: StackedBarChart,
    /// Class utilisation per technology (GW)
    pub utilisation: UtilisationCharts,
    /// Hourly dispatch (GW)
    pub dispatch: DispatchChart,
    /// System cost per unit of new generation over the selected regions
    pub system_cost: Option<MoneyPerEnergy>,
}

impl ChartData {
    /// Append `_<suffix>` to the name of each chart, so that charts of different runs can be
    /// written to the same place
    pub fn with_name_suffix(mut self, suffix: &str) -> Self {
        for name in [
            &mut self.generation.name,
            &mut self.utilisation.name,
            &mut self.dispatch.name,
        ] {
            name.push('_');
            name.push_str(suffix);
        }

        self
    }

    /// Draw the charts
    pub fn draw(&self, renderer: &mut dyn ChartRenderer) -> Result<()> {
        renderer.stacked_bars(&self.generation)?;
        renderer.small_multiples(&self.utilisation)?;
        renderer.stacked_area(&self.dispatch)
    }
}

/// Aggregates derived from one [`Results`] record
#[derive(Debug)]
pub struct Analysis<'a> {
    results: &'a Results,
    config: &'a ChartConfig,
    /// Installed capacity, summed over classes (GW)
    pub capacity: TechRegionTable,
    /// Annual electricity output, summed over classes (GWh)
    pub annual_electricity: TechRegionTable,
    /// Electricity output per hour (hour × technology × region, GW)
    pub hourly_electricity: Array3<f64>,
    /// The storage technologies, in TECH order
    pub storage_techs: Vec<TechID>,
    /// Storage level per hour (hour × storage technology × region, GWh)
    pub storage_level: Array3<f64>,
    /// Charging per hour (hour × storage technology × region, GW)
    pub charging: Array3<f64>,
    /// Transmission capacity (from region × to region, GW)
    pub transmission_capacity: Array2<f64>,
    /// Demand per hour (hour × region, GW)
    pub demand: Array2<f64>,
    /// Annual demand per region (GWh)
    pub annual_demand: Array1<f64>,
    /// Utilisation of every class of the technologies listed in the chart configuration
    pub class_utilisation: Vec<ClassUtilisation>,
}

/// Compute the aggregates for a results record.
///
/// # Arguments
///
/// * `results` - The results to analyse
/// * `config` - Lookup tables for charting
pub fn analyze_results<'a>(results: &'a Results, config: &'a ChartConfig) -> Result<Analysis<'a>> {
    let sets = &results.sets;
    let hours_per_period = results.hour_info.hours_per_period;
    let (hours, num_regions) = (sets.hours, sets.num_regions());
    let hourly_shape = Ix2(hours, num_regions);

    let mut capacity = Array2::<f64>::zeros((sets.techs.len(), num_regions));
    let mut hourly_electricity = Array3::<f64>::zeros((hours, sets.techs.len(), num_regions));
    for (k, tech) in sets.techs.iter().enumerate() {
        let classes = sets.classes_of(tech)?;
        capacity.row_mut(k).assign(&results.capacity.sum_classes(
            tech,
            classes,
            Ix1(num_regions),
        )?);
        hourly_electricity
            .slice_mut(s![.., k, ..])
            .assign(&results.electricity.sum_classes(tech, classes, hourly_shape)?);
    }

    let annual = hourly_electricity.sum_axis(Axis(0)) * hours_per_period;
    let annual_electricity = TechRegionTable::new(sets, &annual);
    check_annual_electricity(sets, &hourly_electricity, &annual_electricity, hours_per_period);

    let storage_techs: Vec<TechID> = sets.storage_techs().cloned().collect();
    let mut storage_level = Array3::<f64>::zeros((hours, storage_techs.len(), num_regions));
    let mut charging = Array3::<f64>::zeros((hours, storage_techs.len(), num_regions));
    for (k, tech) in storage_techs.iter().enumerate() {
        storage_level.slice_mut(s![.., k, ..]).assign(
            &results
                .storage_level
                .sum_classes(tech, sets.storage_classes_of(tech)?, hourly_shape)?,
        );
        let tech_charging = results
            .charging
            .get(tech)
            .with_context(|| format!("No charging values for storage technology {tech}"))?;
        charging.slice_mut(s![.., k, ..]).assign(tech_charging);
    }

    let demand = results.param(DEMAND)?.as_hourly()?.clone();
    let annual_demand = demand.sum_axis(Axis(0)) * hours_per_period;

    let analysis = Analysis {
        results,
        config,
        capacity: TechRegionTable::new(sets, &capacity),
        annual_electricity,
        hourly_electricity,
        storage_techs,
        storage_level,
        charging,
        transmission_capacity: results.transmission_capacity.clone(),
        demand,
        annual_demand,
        class_utilisation: class_utilisation(results, config)?,
    };
    debug!(
        "Total electricity {:.1} TWh, total demand {:.1} TWh",
        analysis.total_electricity().twh(),
        analysis.total_demand().twh()
    );

    Ok(analysis)
}

/// Cross-check annual output against a direct sum over hours and regions
fn check_annual_electricity(
    sets: &ModelSets,
    hourly: &Array3<f64>,
    annual: &TechRegionTable,
    hours_per_period: f64,
) {
    for (k, tech) in sets.techs.iter().enumerate() {
        let direct = hourly.slice(s![.., k, ..]).sum() * hours_per_period;
        let total = annual.values[[k, sets.num_regions()]];
        if !approx_eq!(f64, direct, total, epsilon = 1e-9 * direct.abs().max(1.0)) {
            warn!(
                "Annual electricity for {tech} does not match its hourly output ({total} vs \
                 {direct} GWh)"
            );
        }
    }
}

/// Installed capacity against capacity limits for each class of the charted technologies.
///
/// Limits for hydro come from the hydro capacity parameter; all other technologies use the
/// class limits. A class with no limit is shown with no headroom.
fn class_utilisation(results: &Results, config: &ChartConfig) -> Result<Vec<ClassUtilisation>> {
    let sets = &results.sets;
    let mut utilisation = Vec::new();
    for tech in config
        .class_techs
        .iter()
        .filter(|tech| sets.techs.contains(*tech))
    {
        let param = if sets.tech_type(tech)? == TechType::Hydro {
            HYDRO_CAPACITY
        } else {
            CLASS_LIMITS
        };
        let limits = results.param(param)?.as_by_class()?;

        for class in sets.classes_of(tech)? {
            let limit = if limits.contains(tech, class) {
                limits.get(tech, class)?.clone()
            } else {
                warn!("No capacity limit ({param}) for technology {tech}, class {class}");
                Array1::zeros(sets.num_regions())
            };
            utilisation.push(ClassUtilisation {
                tech: tech.clone(),
                class: class.clone(),
                used: results.capacity.get(tech, class)?.clone(),
                limit,
            });
        }
    }

    Ok(utilisation)
}

impl Analysis<'_> {
    /// The results being analysed
    pub fn results(&self) -> &Results {
        self.results
    }

    /// Total electricity output over all technologies and regions
    pub fn total_electricity(&self) -> Energy {
        Energy(self.annual_electricity.grand_total())
    }

    /// Total annual demand over all regions
    pub fn total_demand(&self) -> Energy {
        Energy(self.annual_demand.sum())
    }

    /// System cost per unit of new generation over the given regions.
    ///
    /// The output of the configured existing technology is excluded from the denominator.
    /// Returns `None` if there is no other generation in these regions.
    pub fn system_cost_per_energy(&self, regions: &[usize]) -> Option<MoneyPerEnergy> {
        let cost: Money = regions
            .iter()
            .map(|&r| Money(self.results.system_cost[r]))
            .sum();
        let total: Energy = (0..self.annual_electricity.techs.len())
            .map(|row| Energy(self.annual_electricity.region_sum(row, regions)))
            .sum();
        let existing = self
            .results
            .sets
            .techs
            .get_index_of(&self.config.existing_tech)
            .map_or(Energy(0.0), |row| {
                Energy(self.annual_electricity.region_sum(row, regions))
            });

        let new_energy = total - existing;
        (new_energy.value() > 0.0).then(|| cost / new_energy)
    }

    /// Compute the charts for a region selection without drawing them.
    ///
    /// # Arguments
    ///
    /// * `selector` - A region, `BARS`, `TOTAL` or a configured region group
    /// * `options` - Which storage overlays to include
    pub fn chart_data(&self, selector: &str, options: &ChartOptions) -> Result<ChartData> {
        let sets = &self.results.sets;
        let selector = RegionSelector::parse(selector, sets, self.config)?;
        let label = selector.label(sets);
        let columns = selector.columns(sets)?;
        let regions = selected_regions(&columns);
        let system_cost = self.system_cost_per_energy(&regions);

        Ok(ChartData {
            generation: self.generation_chart(&label, &columns, system_cost)?,
            utilisation: self.utilisation_charts(&label, &regions)?,
            dispatch: self.dispatch_chart(&label, &regions, options)?,
            label,
            system_cost,
        })
    }

    /// Compute the charts for a region selection and draw them
    pub fn chart(
        &self,
        selector: &str,
        options: &ChartOptions,
        renderer: &mut dyn ChartRenderer,
    ) -> Result<ChartData> {
        let data = self.chart_data(selector, options)?;
        data.draw(renderer)?;

        Ok(data)
    }

    /// Technologies in display order, with their position in TECH
    fn display_techs(&self) -> Result<Vec<(usize, &TechID)>> {
        let sets = &self.results.sets;
        self.config
            .display_order(&sets.techs)?
            .into_iter()
            .map(|tech| Ok((sets.tech_index(tech.as_str())?, tech)))
            .collect()
    }

    fn series(&self, tech: &TechID, values: Vec<f64>) -> Result<Series> {
        let (_, entry) = self.config.tech(tech)?;
        Ok(Series {
            tech: tech.clone(),
            label: entry.label.clone(),
            colour: entry.colour,
            values,
        })
    }

    fn generation_chart(
        &self,
        label: &str,
        columns: &[RegionColumn],
        system_cost: Option<MoneyPerEnergy>,
    ) -> Result<StackedBarChart> {
        let series = self
            .display_techs()?
            .into_iter()
            .map(|(row, tech)| {
                let values = columns
                    .iter()
                    .map(|column| {
                        Energy(self.annual_electricity.region_sum(row, &column.regions)).twh()
                    })
                    .collect();
                self.series(tech, values)
            })
            .collect::<Result<_>>()?;

        Ok(StackedBarChart {
            name: format!("generation_{label}"),
            title: format!("Annual generation ({label})"),
            y_label: "Electricity (TWh/year)".to_string(),
            categories: columns.iter().map(|column| column.label.clone()).collect(),
            series,
            marker_label: "demand".to_string(),
            markers: columns
                .iter()
                .map(|column| {
                    Energy(column.regions.iter().map(|&r| self.annual_demand[r]).sum()).twh()
                })
                .collect(),
            annotation: system_cost
                .map(|cost| format!("System cost: {:.1} €/MWh", cost.euro_per_mwh())),
        })
    }

    fn utilisation_charts(&self, label: &str, regions: &[usize]) -> Result<UtilisationCharts> {
        let mut charts: Vec<UtilisationChart> = Vec::new();
        for entry in &self.class_utilisation {
            let used: f64 = regions.iter().map(|&r| entry.used[r]).sum();
            let limit: f64 = regions.iter().map(|&r| entry.limit[r]).sum();

            if charts.last().is_none_or(|chart| chart.tech != entry.tech) {
                let (_, tech) = self.config.tech(&entry.tech)?;
                charts.push(UtilisationChart {
                    tech: entry.tech.clone(),
                    label: tech.label.clone(),
                    colour: tech.colour,
                    classes: Vec::new(),
                    used: Vec::new(),
                    headroom: Vec::new(),
                });
            }
            // Just pushed if it didn't exist
            if let Some(chart) = charts.last_mut() {
                chart.classes.push(entry.class.to_string());
                chart.used.push(used);
                chart.headroom.push((limit - used).max(0.0));
            }
        }

        Ok(UtilisationCharts {
            name: format!("utilisation_{label}"),
            title: format!("Class utilisation ({label})"),
            charts,
        })
    }

    fn dispatch_chart(
        &self,
        label: &str,
        regions: &[usize],
        options: &ChartOptions,
    ) -> Result<DispatchChart> {
        let hours = self.results.sets.hours;
        let hourly_sum = |values: &Array3<f64>, index: usize| -> Vec<f64> {
            (0..hours)
                .map(|h| regions.iter().map(|&r| values[[h, index, r]]).sum())
                .collect()
        };
        let storage_sum = |values: &Array3<f64>| -> Vec<f64> {
            let mut total = vec![0.0; hours];
            for k in 0..self.storage_techs.len() {
                for (h, value) in hourly_sum(values, k).into_iter().enumerate() {
                    total[h] += value;
                }
            }
            total
        };

        let series = self
            .display_techs()?
            .into_iter()
            .map(|(row, tech)| self.series(tech, hourly_sum(&self.hourly_electricity, row)))
            .collect::<Result<_>>()?;

        Ok(DispatchChart {
            name: format!("dispatch_{label}"),
            title: format!("Hourly dispatch ({label})"),
            series,
            demand: (0..hours)
                .map(|h| regions.iter().map(|&r| self.demand[[h, r]]).sum())
                .collect(),
            storage_charging: options.storage_power.then(|| {
                storage_sum(&self.charging)
                    .into_iter()
                    .map(|value| -value)
                    .collect()
            }),
            storage_level: options
                .storage_level
                .then(|| storage_sum(&self.storage_level)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{RecordingRenderer, assert_error, chart_config, results};
    use crate::results::{ClassMatrices, ClassVectors, Parameter};
    use float_cmp::assert_approx_eq;
    use ndarray::array;
    use rstest::rstest;

    #[rstest]
    fn test_annual_electricity(results: Results, chart_config: ChartConfig) {
        let analysis = analyze_results(&results, &chart_config).unwrap();
        let table = &analysis.annual_electricity;
        assert_eq!(table.columns(), ["NOR", "DEU", "TOTAL"]);
        assert_eq!(table.get("pv", "NOR").unwrap(), 7000.0);
        assert_eq!(table.get("pv", "DEU").unwrap(), 9000.0);
        assert_eq!(table.total("pv").unwrap(), 16000.0);
        assert_eq!(table.total("wind").unwrap(), 21000.0);
        assert_eq!(table.total("hydro").unwrap(), 15000.0);
        assert_eq!(table.total("battery").unwrap(), 2000.0);
        assert_eq!(analysis.total_electricity(), Energy(54000.0));
        assert_eq!(analysis.total_demand(), Energy(54000.0));
        assert_error!(table.get("coal", "NOR"), "Unknown technology coal");
    }

    #[rstest]
    fn test_capacity(results: Results, chart_config: ChartConfig) {
        let analysis = analyze_results(&results, &chart_config).unwrap();
        assert_eq!(
            *analysis.capacity.values(),
            array![
                [4.0, 3.0, 7.0],
                [4.0, 3.0, 7.0],
                [5.0, 0.0, 5.0],
                [1.0, 1.0, 2.0]
            ]
        );
    }

    #[rstest]
    fn test_hourly_and_storage(results: Results, chart_config: ChartConfig) {
        let analysis = analyze_results(&results, &chart_config).unwrap();
        // pv in NOR: classes a1 and a2 added together
        assert_eq!(analysis.hourly_electricity[[1, 0, 0]], 3.0);
        assert_eq!(analysis.storage_techs, [TechID::new("battery")]);
        assert_eq!(analysis.storage_level[[1, 0, 0]], 1.0);
        assert_eq!(analysis.charging[[0, 0, 1]], 1.0);
        assert_eq!(analysis.annual_demand, array![35000.0, 19000.0]);
        assert_eq!(analysis.transmission_capacity[[1, 0]], 0.5);
    }

    #[rstest]
    fn test_class_utilisation(results: Results, chart_config: ChartConfig) {
        let analysis = analyze_results(&results, &chart_config).unwrap();
        let entries: Vec<_> = analysis
            .class_utilisation
            .iter()
            .map(|entry| (entry.tech.as_str(), entry.class.as_str()))
            .collect();
        assert_eq!(
            entries,
            [("wind", "a1"), ("pv", "a1"), ("pv", "a2"), ("hydro", "x0")]
        );
        assert_eq!(analysis.class_utilisation[3].limit, array![6.0, 0.0]);
    }

    #[rstest]
    fn test_class_utilisation_without_limits(mut results: Results, chart_config: ChartConfig) {
        results.params.insert(
            CLASS_LIMITS.to_string(),
            Parameter::ByClass(ClassVectors::new()),
        );
        let analysis = analyze_results(&results, &chart_config).unwrap();
        assert_eq!(analysis.class_utilisation.len(), 4);
        assert_eq!(analysis.class_utilisation[0].limit, array![0.0, 0.0]);

        // Hydro limits are read from their own parameter
        assert_eq!(analysis.class_utilisation[3].limit, array![6.0, 0.0]);

        let data = analysis
            .chart_data("TOTAL", &ChartOptions::default())
            .unwrap();
        assert_eq!(data.utilisation.charts[1].headroom, [0.0, 0.0]);
    }

    #[rstest]
    fn test_system_cost(results: Results, chart_config: ChartConfig) {
        let analysis = analyze_results(&results, &chart_config).unwrap();

        // 540 M€ over 39000 GWh of non-hydro generation
        let total = analysis.system_cost_per_energy(&[0, 1]).unwrap();
        assert_approx_eq!(f64, total.euro_per_mwh(), 540.0 / 39.0, epsilon = 1e-9);

        let nor = analysis.system_cost_per_energy(&[0]).unwrap();
        assert_approx_eq!(f64, nor.euro_per_mwh(), 15.0, epsilon = 1e-9);
    }

    #[rstest]
    fn test_system_cost_without_existing_tech(results: Results, mut chart_config: ChartConfig) {
        chart_config.existing_tech = "nuclear".into();
        let analysis = analyze_results(&results, &chart_config).unwrap();
        let total = analysis.system_cost_per_energy(&[0, 1]).unwrap();
        assert_approx_eq!(f64, total.euro_per_mwh(), 10.0, epsilon = 1e-9);
    }

    #[rstest]
    fn test_system_cost_no_new_generation(mut results: Results, chart_config: ChartConfig) {
        // Only hydro generates
        let mut electricity = ClassMatrices::new();
        for (tech_class, block) in results.electricity.iter() {
            let block = if tech_class.tech.as_str() == "hydro" {
                block.clone()
            } else {
                Array2::zeros((3, 2))
            };
            electricity
                .insert(&tech_class.tech, &tech_class.class, block)
                .unwrap();
        }
        results.electricity = electricity;
        let analysis = analyze_results(&results, &chart_config).unwrap();
        assert!(analysis.system_cost_per_energy(&[0]).is_none());
    }

    #[rstest]
    fn test_chart_total_equals_sum_of_bars(results: Results, chart_config: ChartConfig) {
        let analysis = analyze_results(&results, &chart_config).unwrap();
        let options = ChartOptions::default();
        let bars = analysis.chart_data("BARS", &options).unwrap().generation;
        let total = analysis.chart_data("TOTAL", &options).unwrap().generation;

        assert_eq!(bars.categories, ["NOR", "DEU"]);
        assert_eq!(total.categories, ["TOTAL"]);
        for (bar_series, total_series) in bars.series.iter().zip(&total.series) {
            assert_eq!(bar_series.tech, total_series.tech);
            assert_approx_eq!(
                f64,
                bar_series.values.iter().sum::<f64>(),
                total_series.values[0]
            );
        }
        assert_approx_eq!(f64, bars.markers.iter().sum::<f64>(), total.markers[0]);
    }

    #[rstest]
    fn test_chart_generation(results: Results, chart_config: ChartConfig) {
        let analysis = analyze_results(&results, &chart_config).unwrap();
        let data = analysis
            .chart_data("NOR", &ChartOptions::default())
            .unwrap();
        assert_eq!(data.label, "NOR");

        let chart = &data.generation;
        assert_eq!(chart.name, "generation_NOR");
        let labels: Vec<_> = chart.series.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["wind", "hydro", "solar PV", "battery"]);
        assert_eq!(chart.series[0].values, [12.0]);
        assert_eq!(chart.markers, [35.0]);
        assert_eq!(chart.bar_totals(), [35.0]);
        assert_eq!(
            chart.annotation.as_deref(),
            Some("System cost: 15.0 €/MWh")
        );
    }

    #[rstest]
    fn test_chart_utilisation(results: Results, chart_config: ChartConfig) {
        let analysis = analyze_results(&results, &chart_config).unwrap();
        let data = analysis
            .chart_data("TOTAL", &ChartOptions::default())
            .unwrap();
        let charts = &data.utilisation.charts;
        assert_eq!(charts.len(), 3);
        assert_eq!(charts[1].label, "solar PV");
        assert_eq!(charts[1].classes, ["a1", "a2"]);
        assert_eq!(charts[1].used, [5.0, 2.0]);
        assert_eq!(charts[1].headroom, [5.0, 2.0]);
        assert_eq!(charts[0].headroom, [6.0]);
    }

    #[rstest]
    fn test_chart_dispatch(results: Results, chart_config: ChartConfig) {
        let analysis = analyze_results(&results, &chart_config).unwrap();
        let options = ChartOptions {
            storage_power: true,
            storage_level: true,
        };
        let dispatch = analysis.chart_data("TOTAL", &options).unwrap().dispatch;
        assert_eq!(dispatch.num_hours(), 3);
        assert_eq!(dispatch.demand, [16.0, 19.0, 19.0]);
        assert_eq!(dispatch.storage_charging, Some(vec![-2.0, 0.0, 0.0]));
        assert_eq!(dispatch.storage_level, Some(vec![2.0, 1.0, 0.0]));

        let dispatch = analysis
            .chart_data("TOTAL", &ChartOptions::default())
            .unwrap()
            .dispatch;
        assert!(dispatch.storage_charging.is_none());
        assert!(dispatch.storage_level.is_none());
    }

    #[rstest]
    fn test_chart_draws(results: Results, chart_config: ChartConfig) {
        let analysis = analyze_results(&results, &chart_config).unwrap();
        let mut renderer = RecordingRenderer::default();
        analysis
            .chart("DEU", &ChartOptions::default(), &mut renderer)
            .unwrap();
        assert_eq!(
            renderer.drawn,
            ["generation_DEU", "utilisation_DEU", "dispatch_DEU"]
        );
    }

    #[rstest]
    fn test_chart_data_with_name_suffix(results: Results, chart_config: ChartConfig) {
        let analysis = analyze_results(&results, &chart_config).unwrap();
        let data = analysis
            .chart_data("TOTAL", &ChartOptions::default())
            .unwrap()
            .with_name_suffix("highwind");
        assert_eq!(data.label, "TOTAL");

        let mut renderer = RecordingRenderer::default();
        data.draw(&mut renderer).unwrap();
        assert_eq!(
            renderer.drawn,
            [
                "generation_TOTAL_highwind",
                "utilisation_TOTAL_highwind",
                "dispatch_TOTAL_highwind"
            ]
        );
    }

    #[rstest]
    fn test_chart_unknown_region(results: Results, chart_config: ChartConfig) {
        let analysis = analyze_results(&results, &chart_config).unwrap();
        assert_error!(
            analysis.chart_data("FRA", &ChartOptions::default()),
            "Unknown region FRA; valid regions are: NOR, DEU"
        );
    }

    #[rstest]
    fn test_chart_missing_palette_entry(results: Results, mut chart_config: ChartConfig) {
        chart_config.techs.retain(|tech| tech.id.as_str() != "battery");
        let analysis = analyze_results(&results, &chart_config).unwrap();
        assert_error!(
            analysis.chart_data("TOTAL", &ChartOptions::default()),
            "No chart colour or label for technology battery (add it to the chart configuration)"
        );
    }
}
