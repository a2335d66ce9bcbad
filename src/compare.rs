//! Side-by-side comparison of stored scenarios.
use crate::analysis::analyze_results;
use crate::chart::{
    ChartConfig, ChartOptions, ChartRenderer, Series, StackedBarChart, TOTAL_SELECTOR,
};
use crate::id::TechID;
use crate::store::{archive_key, load_results};
use crate::units::Energy;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use itertools::Itertools;
use log::info;
use ndarray::{Array1, Array2, Axis};
use std::fmt;
use std::path::Path;

/// File name stem of the comparison chart
pub const COMPARISON_CHART_NAME: &str = "scenario_comparison";

/// Annual totals for several scenarios
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioComparison {
    /// Scenario labels (columns)
    pub scenarios: Vec<String>,
    /// Technologies in display order (rows)
    pub techs: Vec<TechID>,
    /// Annual electricity per technology and scenario (TWh)
    pub totals: Array2<f64>,
    /// Annual demand per scenario (TWh)
    pub demand: Array1<f64>,
}

/// Each technology's output as a percentage of demand, per scenario
#[derive(Debug, Clone, PartialEq)]
pub struct ShareTable {
    /// Technology labels
    pub labels: Vec<String>,
    /// Scenario labels
    pub scenarios: Vec<String>,
    /// Shares in percent, rounded to one decimal place (technology × scenario)
    pub shares: Array2<f64>,
}

/// Round a percentage to one decimal place
fn round_share(share: f64) -> f64 {
    (share * 10.0).round() / 10.0
}

impl ScenarioComparison {
    /// Total annual electricity of each scenario (TWh)
    pub fn scenario_totals(&self) -> Array1<f64> {
        self.totals.sum_axis(Axis(0))
    }

    /// Each technology's output as a share of demand
    pub fn share_table(&self, config: &ChartConfig) -> Result<ShareTable> {
        let labels = self
            .techs
            .iter()
            .map(|tech| Ok(config.tech(tech)?.1.label.clone()))
            .collect::<Result<_>>()?;
        let shares = Array2::from_shape_fn(self.totals.dim(), |(row, col)| {
            round_share(100.0 * self.totals[[row, col]] / self.demand[col])
        });

        Ok(ShareTable {
            labels,
            scenarios: self.scenarios.clone(),
            shares,
        })
    }

    /// A stacked bar per scenario with demand markers
    pub fn chart(&self, config: &ChartConfig) -> Result<StackedBarChart> {
        let series = self
            .techs
            .iter()
            .zip(self.totals.rows())
            .map(|(tech, row)| {
                let (_, entry) = config.tech(tech)?;
                Ok(Series {
                    tech: tech.clone(),
                    label: entry.label.clone(),
                    colour: entry.colour,
                    values: row.to_vec(),
                })
            })
            .collect::<Result<_>>()?;

        Ok(StackedBarChart {
            name: COMPARISON_CHART_NAME.to_string(),
            title: "Annual generation by scenario".to_string(),
            y_label: "Electricity (TWh/year)".to_string(),
            categories: self.scenarios.clone(),
            series,
            marker_label: "demand".to_string(),
            markers: self.demand.to_vec(),
            annotation: None,
        })
    }
}

impl ShareTable {
    /// The table as text cells: one row per technology, then a row of scenario labels
    pub fn rows(&self) -> Vec<Vec<String>> {
        let mut rows: Vec<Vec<String>> = self
            .labels
            .iter()
            .zip(self.shares.rows())
            .map(|(label, shares)| {
                std::iter::once(label.clone())
                    .chain(shares.iter().map(|share| format!("{share:.1}")))
                    .collect()
            })
            .collect();
        rows.push(
            std::iter::once("-".to_string())
                .chain(self.scenarios.iter().cloned())
                .collect(),
        );

        rows
    }
}

impl fmt::Display for ShareTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = self.rows();
        let widths = (0..=self.scenarios.len())
            .map(|col| rows.iter().map(|row| row[col].len()).max().unwrap_or(0))
            .collect_vec();

        for row in &rows {
            let line = row
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{cell:>width$}", width = *width))
                .join("  ");
            writeln!(f, "{line}")?;
        }

        Ok(())
    }
}

/// Compare stored scenarios.
///
/// Each scenario is loaded and analysed in turn and its all-regions charts are drawn, named
/// after the scenario label (e.g. `generation_TOTAL_<label>`).
/// Finally a chart comparing every scenario is drawn.
///
/// # Arguments
///
/// * `labels` - Display label for each scenario
/// * `run_names` - Stored run name for each scenario, in the same order as `labels`
/// * `file_path` - The results archive
/// * `group` - Group prefix of the stored runs
/// * `config` - Chart configuration
/// * `options` - Storage overlays for the per-scenario dispatch charts
/// * `renderer` - Where charts are drawn
pub fn compare_scenarios(
    labels: &[String],
    run_names: &[String],
    file_path: &Path,
    group: &str,
    config: &ChartConfig,
    options: &ChartOptions,
    renderer: &mut dyn ChartRenderer,
) -> Result<ScenarioComparison> {
    ensure!(
        labels.len() == run_names.len(),
        "Got {} scenario labels but {} run names",
        labels.len(),
        run_names.len()
    );
    ensure!(!labels.is_empty(), "No scenarios to compare");

    let mut per_scenario: Vec<IndexMap<TechID, f64>> = Vec::with_capacity(labels.len());
    let mut demand = Array1::<f64>::zeros(labels.len());
    for (col, (label, run_name)) in labels.iter().zip(run_names).enumerate() {
        let results = load_results(run_name, file_path, group)?.with_context(|| {
            format!(
                "No results for scenario {label} (run {})",
                archive_key(run_name, group)
            )
        })?;
        let analysis = analyze_results(&results, config)
            .with_context(|| format!("Failed to analyse scenario {label}"))?;
        let charts = analysis
            .chart_data(TOTAL_SELECTOR, options)
            .with_context(|| format!("Failed to chart scenario {label}"))?
            .with_name_suffix(label);
        charts
            .draw(renderer)
            .with_context(|| format!("Failed to chart scenario {label}"))?;

        let table = &analysis.annual_electricity;
        let totals = table
            .techs()
            .iter()
            .map(|tech| Ok((tech.clone(), Energy(table.total(tech.as_str())?).twh())))
            .collect::<Result<IndexMap<_, _>>>()?;
        demand[col] = analysis.total_demand().twh();
        ensure!(demand[col] > 0.0, "Scenario {label} has no demand");
        info!(
            "Scenario {label}: {:.1} TWh generated, {:.1} TWh demand",
            analysis.total_electricity().twh(),
            demand[col]
        );
        per_scenario.push(totals);
    }

    let all_techs = per_scenario
        .iter()
        .flat_map(IndexMap::keys)
        .unique()
        .collect_vec();
    let techs = config
        .display_order(all_techs)?
        .into_iter()
        .cloned()
        .collect_vec();
    let totals = Array2::from_shape_fn((techs.len(), labels.len()), |(row, col)| {
        per_scenario[col].get(&techs[row]).copied().unwrap_or(0.0)
    });

    let comparison = ScenarioComparison {
        scenarios: labels.to_vec(),
        techs,
        totals,
        demand,
    };
    renderer.stacked_bars(&comparison.chart(config)?)?;

    Ok(comparison)
}
