//! The command line interface.
use crate::analysis::analyze_results;
use crate::chart::{ChartConfig, ChartOptions, SvgRenderer};
use crate::compare::compare_scenarios;
use crate::extract::extract_results;
use crate::input::load_model_dir;
use crate::log;
use crate::options::{canonical_run_name, merge_with_defaults};
use crate::output::{create_output_directory, write_analysis_tables};
use crate::results::Results;
use crate::settings::Settings;
use crate::store::{SaveOutcome, list_results, load_results, save_results};
use ::log::info;
use anyhow::{Context, Result, bail};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface for the results tool.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Which archive to use
#[derive(Args, Default)]
pub struct ArchiveOpts {
    /// The results archive (defaults to the value in `settings.toml`)
    #[arg(short = 'f', long)]
    pub results_file: Option<PathBuf>,
    /// Group prefix of the stored runs
    #[arg(short, long)]
    pub group: Option<String>,
}

impl ArchiveOpts {
    /// The group, falling back to the settings
    fn group<'a>(&'a self, settings: &'a Settings) -> &'a str {
        self.group.as_deref().unwrap_or(&settings.group)
    }

    /// The archive file, falling back to the settings
    fn results_file(&self, settings: &Settings) -> Result<PathBuf> {
        match self.results_file.as_ref().or(settings.results_file.as_ref()) {
            Some(file_path) => Ok(file_path.clone()),
            None => bail!(
                "No results file given (use --results-file or set results_file in settings.toml)"
            ),
        }
    }
}

/// Options for commands which write charts or tables
#[derive(Args, Default)]
pub struct ChartOpts {
    /// Directory for output files (defaults to the value in `settings.toml`)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Chart configuration file with technology colours, labels and region groups
    #[arg(long)]
    pub chart_config: Option<PathBuf>,
    /// Show storage charging on the dispatch chart
    #[arg(long)]
    pub storage_power: bool,
    /// Show the storage energy level on the dispatch chart
    #[arg(long)]
    pub storage_level: bool,
}

impl ChartOpts {
    fn chart_options(&self) -> ChartOptions {
        ChartOptions {
            storage_power: self.storage_power,
            storage_level: self.storage_level,
        }
    }

    /// Apply these options to the settings
    fn override_settings(&self, settings: &mut Settings) {
        if let Some(output_dir) = &self.output_dir {
            settings.chart_dir.clone_from(output_dir);
        }
        if let Some(chart_config) = &self.chart_config {
            settings.chart_config = Some(chart_config.clone());
        }
    }
}

/// Options for the extract command
#[derive(Args, Default)]
pub struct ExtractOpts {
    /// Name to store the run under (defaults to a name built from the model options)
    #[arg(long)]
    pub run_name: Option<String>,
    /// Which archive to write to
    #[command(flatten)]
    pub archive: ArchiveOpts,
    /// Store the results without compression
    #[arg(long)]
    pub no_compress: bool,
}

/// A scenario to compare, given as `label=run_name` or just `run_name`
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioArg {
    /// Display label
    pub label: String,
    /// Stored run name
    pub run_name: String,
}

impl FromStr for ScenarioArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (label, run_name) = s.split_once('=').unwrap_or((s, s));
        if label.is_empty() || run_name.is_empty() {
            return Err(format!("Invalid scenario '{s}': should be label=run_name"));
        }

        Ok(Self {
            label: label.to_string(),
            run_name: run_name.to_string(),
        })
    }
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Extract the results of a solved model and store them.
    Extract {
        /// Path to the model directory.
        model_dir: PathBuf,
        /// Other extract options
        #[command(flatten)]
        opts: ExtractOpts,
    },
    /// List the runs stored in an archive.
    List {
        /// Which archive to read
        #[command(flatten)]
        archive: ArchiveOpts,
    },
    /// Draw the charts for a stored run.
    Chart {
        /// The stored run name.
        run_name: String,
        /// A region, BARS (every region), TOTAL (all regions added) or a region group
        #[arg(short, long, default_value = crate::chart::BARS_SELECTOR)]
        region: String,
        /// Which archive to read
        #[command(flatten)]
        archive: ArchiveOpts,
        /// Chart options
        #[command(flatten)]
        opts: ChartOpts,
    },
    /// Compare stored runs side by side.
    Compare {
        /// Scenarios as label=run_name
        #[arg(required = true)]
        scenarios: Vec<ScenarioArg>,
        /// Which archive to read
        #[command(flatten)]
        archive: ArchiveOpts,
        /// Chart options
        #[command(flatten)]
        opts: ChartOpts,
    },
    /// Write the analysis tables for a stored run as CSV files.
    Export {
        /// The stored run name.
        run_name: String,
        /// Which archive to read
        #[command(flatten)]
        archive: ArchiveOpts,
        /// Directory for output files (defaults to the value in `settings.toml`)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Manage the program settings file.
    Settings {
        /// The available subcommands for managing the settings file.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Extract { model_dir, opts } => handle_extract_command(&model_dir, &opts, None),
            Self::List { archive } => handle_list_command(&archive, None),
            Self::Chart {
                run_name,
                region,
                archive,
                opts,
            } => handle_chart_command(&run_name, &region, &archive, &opts, None),
            Self::Compare {
                scenarios,
                archive,
                opts,
            } => handle_compare_command(&scenarios, &archive, &opts, None),
            Self::Export {
                run_name,
                archive,
                output_dir,
            } => handle_export_command(&run_name, &archive, output_dir.as_deref(), None),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and start the program
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ supergrid-results --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Load program settings, if not provided
fn load_settings(settings: Option<Settings>) -> Result<Settings> {
    match settings {
        Some(settings) => Ok(settings),
        None => Settings::load().context("Failed to load settings."),
    }
}

/// Load a stored run, treating a missing run as an error
fn load_run(run_name: &str, file_path: &Path, group: &str) -> Result<Results> {
    load_results(run_name, file_path, group)?
        .with_context(|| format!("Run {run_name} not found in {}", file_path.display()))
}

/// Handle the `extract` command.
pub fn handle_extract_command(
    model_dir: &Path,
    opts: &ExtractOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = load_settings(settings)?;
    log::init(Some(settings.log_level.as_str()), None).context("Failed to initialise logging.")?;

    let model = load_model_dir(model_dir).context("Failed to load model.")?;
    info!("Loaded model from {}", model_dir.display());
    let results = extract_results(&model, model.status).context("Failed to extract results.")?;

    let run_name = opts
        .run_name
        .clone()
        .unwrap_or_else(|| canonical_run_name(&model.options));

    // The model's own resultsfile option is the last resort
    let file_path = match opts.archive.results_file(&settings) {
        Ok(file_path) => file_path,
        Err(_) => PathBuf::from(
            merge_with_defaults(&model.options)
                .get("resultsfile")
                .map(ToString::to_string)
                .context("No results file given")?,
        ),
    };

    let compress = settings.compress && !opts.no_compress;
    let outcome = save_results(
        &results,
        &run_name,
        Some(&file_path),
        opts.archive.group(&settings),
        compress,
    )?;
    if outcome == SaveOutcome::Saved {
        info!("Results extracted as run {run_name}");
    }

    Ok(())
}

/// Handle the `list` command.
pub fn handle_list_command(archive: &ArchiveOpts, settings: Option<Settings>) -> Result<()> {
    let settings = load_settings(settings)?;
    log::init(Some(settings.log_level.as_str()), None).context("Failed to initialise logging.")?;

    let file_path = archive.results_file(&settings)?;
    for key in list_results(&file_path, archive.group(&settings))? {
        println!("{key}");
    }

    Ok(())
}

/// Resolve the output folder and chart configuration, then start logging there
fn prepare_chart_output(
    opts: &ChartOpts,
    settings: Option<Settings>,
) -> Result<(Settings, ChartConfig)> {
    let mut settings = load_settings(settings)?;
    opts.override_settings(&mut settings);

    create_output_directory(&settings.chart_dir)?;
    log::init(Some(settings.log_level.as_str()), Some(&settings.chart_dir))
        .context("Failed to initialise logging.")?;
    info!("Output folder: {}", settings.chart_dir.display());

    let config = settings.chart_config()?;

    Ok((settings, config))
}

/// Handle the `chart` command.
pub fn handle_chart_command(
    run_name: &str,
    region: &str,
    archive: &ArchiveOpts,
    opts: &ChartOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let (settings, config) = prepare_chart_output(opts, settings)?;
    let results = load_run(
        run_name,
        &archive.results_file(&settings)?,
        archive.group(&settings),
    )?;

    let analysis = analyze_results(&results, &config).context("Failed to analyse results.")?;
    let mut renderer = SvgRenderer::new(&settings.chart_dir);
    let data = analysis.chart(region, &opts.chart_options(), &mut renderer)?;
    if let Some(cost) = data.system_cost {
        info!("System cost ({}): {:.1} €/MWh", data.label, cost.euro_per_mwh());
    }

    Ok(())
}

/// Handle the `compare` command.
pub fn handle_compare_command(
    scenarios: &[ScenarioArg],
    archive: &ArchiveOpts,
    opts: &ChartOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let (settings, config) = prepare_chart_output(opts, settings)?;
    let labels: Vec<_> = scenarios.iter().map(|s| s.label.clone()).collect();
    let run_names: Vec<_> = scenarios.iter().map(|s| s.run_name.clone()).collect();

    let mut renderer = SvgRenderer::new(&settings.chart_dir);
    let comparison = compare_scenarios(
        &labels,
        &run_names,
        &archive.results_file(&settings)?,
        archive.group(&settings),
        &config,
        &opts.chart_options(),
        &mut renderer,
    )?;
    print!("{}", comparison.share_table(&config)?);

    Ok(())
}

/// Handle the `export` command.
pub fn handle_export_command(
    run_name: &str,
    archive: &ArchiveOpts,
    output_dir: Option<&Path>,
    settings: Option<Settings>,
) -> Result<()> {
    let mut settings = load_settings(settings)?;
    if let Some(output_dir) = output_dir {
        settings.chart_dir = output_dir.to_path_buf();
    }

    create_output_directory(&settings.chart_dir)?;
    log::init(Some(settings.log_level.as_str()), Some(&settings.chart_dir))
        .context("Failed to initialise logging.")?;

    let results = load_run(
        run_name,
        &archive.results_file(&settings)?,
        archive.group(&settings),
    )?;
    let config = settings.chart_config()?;
    let analysis = analyze_results(&results, &config).context("Failed to analyse results.")?;
    write_analysis_tables(&analysis, &settings.chart_dir)?;

    Ok(())
}
