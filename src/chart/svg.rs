//! Drawing charts as SVG files with `plotters`.
use super::{
    ChartRenderer, Colour, DispatchChart, StackedBarChart, UtilisationChart, UtilisationCharts,
};
use anyhow::Result;
use log::info;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::{Path, PathBuf};

const CHART_SIZE: (u32, u32) = (1024, 640);
const PANEL_SIZE: (u32, u32) = (360, 300);
const CAPTION_FONT: (&str, u32) = ("sans-serif", 22);
const BAR_WIDTH: f64 = 0.7;

const DEMAND_COLOUR: RGBColor = BLACK;
const CHARGING_COLOUR: RGBColor = RGBColor(120, 40, 150);
const STORAGE_LEVEL_COLOUR: RGBColor = RGBColor(200, 60, 120);

fn rgb(colour: Colour) -> RGBColor {
    RGBColor(colour.0, colour.1, colour.2)
}

/// Writes each chart to `<name>.svg` in an output folder
#[derive(Debug)]
pub struct SvgRenderer {
    output_dir: PathBuf,
    written: Vec<PathBuf>,
}

impl SvgRenderer {
    /// Create a renderer writing into the given (existing) folder
    pub fn new(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            written: Vec::new(),
        }
    }

    /// The files written so far
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn file_path(&mut self, name: &str) -> PathBuf {
        let path = self.output_dir.join(format!("{name}.svg"));
        info!("Writing chart to {}", path.display());
        self.written.push(path.clone());
        path
    }
}

impl ChartRenderer for SvgRenderer {
    fn stacked_bars(&mut self, chart: &StackedBarChart) -> Result<()> {
        let path = self.file_path(&chart.name);
        let root = SVGBackend::new(&path, CHART_SIZE).into_drawing_area();
        draw_stacked_bars(&root, chart)?;
        root.present()?;

        Ok(())
    }

    fn small_multiples(&mut self, charts: &UtilisationCharts) -> Result<()> {
        let path = self.file_path(&charts.name);
        let (rows, cols) = grid_shape(charts.charts.len());
        let size = (
            PANEL_SIZE.0 * u32::try_from(cols)?,
            PANEL_SIZE.1 * u32::try_from(rows)? + 40,
        );
        let root = SVGBackend::new(&path, size).into_drawing_area();
        root.fill(&WHITE)?;
        let root = root.titled(&charts.title, CAPTION_FONT)?;
        for (panel, chart) in root.split_evenly((rows, cols)).iter().zip(&charts.charts) {
            draw_utilisation(panel, chart)?;
        }
        root.present()?;

        Ok(())
    }

    fn stacked_area(&mut self, chart: &DispatchChart) -> Result<()> {
        let path = self.file_path(&chart.name);
        let root = SVGBackend::new(&path, CHART_SIZE).into_drawing_area();
        draw_dispatch(&root, chart)?;
        root.present()?;

        Ok(())
    }
}

/// Rows and columns for a roughly square grid with at least `n` panels
fn grid_shape(n: usize) -> (usize, usize) {
    let mut cols = 1;
    while cols * cols < n {
        cols += 1;
    }
    let rows = n.div_ceil(cols).max(1);

    (rows, cols)
}

/// Upper limit for a value axis, leaving some room above the largest value
fn axis_max<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let max = values.into_iter().fold(0.0, f64::max);
    if max > 0.0 { max * 1.1 } else { 1.0 }
}

/// Formatter for category axes, where category `i` is centred on `x = i`
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn category_label(categories: &[String], x: f64) -> String {
    let i = x.round();
    if (x - i).abs() > 1e-6 || i < 0.0 {
        return String::new();
    }
    categories.get(i as usize).cloned().unwrap_or_default()
}

fn draw_stacked_bars<DB>(root: &DrawingArea<DB, Shift>, chart: &StackedBarChart) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let n = chart.categories.len();
    let y_max = axis_max(
        chart
            .bar_totals()
            .into_iter()
            .chain(chart.markers.iter().copied()),
    );

    let mut ctx = ChartBuilder::on(root)
        .caption(&chart.title, CAPTION_FONT)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5..(n as f64 - 0.5), 0.0..y_max)?;
    ctx.configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|x| category_label(&chart.categories, *x))
        .y_desc(chart.y_label.as_str())
        .draw()?;

    let mut bottoms = vec![0.0; n];
    for series in &chart.series {
        let colour = rgb(series.colour);
        let bars: Vec<_> = series
            .values
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let x = i as f64;
                let bar = Rectangle::new(
                    [
                        (x - BAR_WIDTH / 2.0, bottoms[i]),
                        (x + BAR_WIDTH / 2.0, bottoms[i] + value),
                    ],
                    colour.filled(),
                );
                bottoms[i] += value;
                bar
            })
            .collect();
        ctx.draw_series(bars)?
            .label(series.label.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], colour.filled()));
    }

    if !chart.markers.is_empty() {
        ctx.draw_series(chart.markers.iter().enumerate().map(|(i, marker)| {
            let x = i as f64;
            PathElement::new(
                vec![(x - BAR_WIDTH / 2.0, *marker), (x + BAR_WIDTH / 2.0, *marker)],
                DEMAND_COLOUR.stroke_width(3),
            )
        }))?
        .label(chart.marker_label.as_str())
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 10, y)], DEMAND_COLOUR.stroke_width(3)));
    }

    ctx.configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .position(SeriesLabelPosition::UpperRight)
        .draw()?;

    if let Some(annotation) = &chart.annotation {
        root.draw(&Text::new(
            annotation.as_str(),
            (80, 40),
            ("sans-serif", 16).into_font(),
        ))?;
    }

    Ok(())
}

fn draw_utilisation<DB>(area: &DrawingArea<DB, Shift>, chart: &UtilisationChart) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let n = chart.classes.len();
    let y_max = axis_max(chart.used.iter().zip(&chart.headroom).map(|(u, h)| u + h));
    let mut ctx = ChartBuilder::on(area)
        .caption(&chart.label, ("sans-serif", 16))
        .margin(8)
        .x_label_area_size(30)
        .y_label_area_size(45)
        .build_cartesian_2d(-0.5..(n as f64 - 0.5), 0.0..y_max)?;
    ctx.configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|x| category_label(&chart.classes, *x))
        .y_desc("GW")
        .draw()?;

    let colour = rgb(chart.colour);
    ctx.draw_series(chart.used.iter().enumerate().map(|(i, used)| {
        let x = i as f64;
        Rectangle::new(
            [(x - BAR_WIDTH / 2.0, 0.0), (x + BAR_WIDTH / 2.0, *used)],
            colour.filled(),
        )
    }))?;
    ctx.draw_series(
        chart
            .used
            .iter()
            .zip(&chart.headroom)
            .enumerate()
            .map(|(i, (used, headroom))| {
                let x = i as f64;
                Rectangle::new(
                    [
                        (x - BAR_WIDTH / 2.0, *used),
                        (x + BAR_WIDTH / 2.0, used + headroom),
                    ],
                    colour.mix(0.25).filled(),
                )
            }),
    )?;

    Ok(())
}

/// Points tracing an hourly profile as steps, so each hour covers `[h, h + 1)`
fn steps(values: &[f64]) -> Vec<(f64, f64)> {
    values
        .iter()
        .enumerate()
        .flat_map(|(h, value)| [(h as f64, *value), (h as f64 + 1.0, *value)])
        .collect()
}

fn draw_dispatch<DB>(root: &DrawingArea<DB, Shift>, chart: &DispatchChart) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let hours = chart.num_hours();

    let mut tops = vec![0.0; hours];
    let mut layers = Vec::new();
    for series in &chart.series {
        let bottom = tops.clone();
        for (top, value) in tops.iter_mut().zip(&series.values) {
            *top += value;
        }
        layers.push((series, bottom, tops.clone()));
    }

    let y_max = axis_max(
        tops.iter()
            .chain(&chart.demand)
            .chain(chart.storage_level.iter().flatten())
            .copied(),
    );
    let y_min = chart
        .storage_charging
        .iter()
        .flatten()
        .fold(0.0, |min: f64, value| min.min(*value))
        * 1.1;

    let mut ctx = ChartBuilder::on(root)
        .caption(&chart.title, CAPTION_FONT)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..(hours as f64), y_min..y_max)?;
    ctx.configure_mesh()
        .x_desc("Hour")
        .y_desc("Power (GW)")
        .draw()?;

    for (series, bottom, top) in layers {
        let colour = rgb(series.colour);
        let mut outline = steps(&top);
        outline.extend(steps(&bottom).into_iter().rev());
        ctx.draw_series(std::iter::once(Polygon::new(outline, colour.filled())))?
            .label(series.label.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], colour.filled()));
    }

    ctx.draw_series(LineSeries::new(
        steps(&chart.demand),
        DEMAND_COLOUR.stroke_width(2),
    ))?
    .label("demand")
    .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 10, y)], DEMAND_COLOUR.stroke_width(2)));

    if let Some(charging) = &chart.storage_charging {
        ctx.draw_series(LineSeries::new(steps(charging), CHARGING_COLOUR.stroke_width(2)))?
            .label("storage charging")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 10, y)], CHARGING_COLOUR));
    }
    if let Some(level) = &chart.storage_level {
        ctx.draw_series(LineSeries::new(steps(level), STORAGE_LEVEL_COLOUR.stroke_width(2)))?
            .label("storage level (GWh)")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 10, y)], STORAGE_LEVEL_COLOUR));
    }

    ctx.configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .position(SeriesLabelPosition::UpperRight)
        .draw()?;

    Ok(())
}
