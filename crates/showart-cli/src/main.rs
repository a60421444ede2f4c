use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use showart_core::settings::SETTINGS_FILENAME;
use showart_core::{EngineControl, EngineOptions, EventKind, Settings, Severity, Stage, StageReport, StageStatus, StopToken};

#[derive(Parser)]
#[command(name = "showart", version, about = "Match downloaded show artwork to a media library and move it into place")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Folder holding downloaded artwork and archives
    #[arg(short, long, global = true)]
    source: Option<PathBuf>,

    /// Library folder containing "Name (YYYY)" show folders (repeatable)
    #[arg(short, long = "target", global = true)]
    targets: Vec<PathBuf>,

    /// 7-Zip compatible extractor, bare name or path
    #[arg(long, global = true, default_value = "7z")]
    extractor: PathBuf,

    /// Settings file (default: <config dir>/showart/settings.json)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Do not remember --source/--target for the next run
    #[arg(long, global = true)]
    no_save: bool,

    /// Log every event, including stage boundaries
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Clone, Copy, Debug, PartialEq, Eq)]
enum Command {
    /// Unpack archives named after a library show
    Extract,
    /// Rename backdrops
    Backdrops,
    /// Rename season and folder posters
    Posters,
    /// Rename episode thumbnails after their videos
    Thumbs,
    /// Move renamed artwork into the library
    Relocate,
    /// Run every stage in order
    All,
}

impl Command {
    fn stage(self) -> Option<Stage> {
        match self {
            Command::Extract => Some(Stage::Extract),
            Command::Backdrops => Some(Stage::Backdrops),
            Command::Posters => Some(Stage::Posters),
            Command::Thumbs => Some(Stage::EpisodeThumbs),
            Command::Relocate => Some(Stage::Relocate),
            Command::All => None,
        }
    }
}

fn settings_path(cli: &Cli) -> anyhow::Result<PathBuf> {
    if let Some(path) = &cli.settings {
        return Ok(path.clone());
    }
    let config_dir = dirs::config_dir().context("failed to locate the user config directory; pass --settings")?;
    Ok(config_dir.join("showart").join(SETTINGS_FILENAME))
}

/// Command-line folders win over remembered ones. Strings are only for the sidecar file.
fn merge(mut settings: Settings, cli: &Cli) -> Settings {
    if let Some(source) = &cli.source {
        settings.source = source.display().to_string();
    }
    if !cli.targets.is_empty() {
        settings.targets = cli.targets.iter().map(|t| t.display().to_string()).collect();
    }
    settings
}

/// Engine folders taken from the command line as given, falling back to the remembered settings.
fn engine_options(remembered: &Settings, cli: &Cli) -> anyhow::Result<EngineOptions> {
    let source = match &cli.source {
        Some(source) => source.clone(),
        None => PathBuf::from(&remembered.source),
    };
    let targets: Vec<PathBuf> = if cli.targets.is_empty() {
        remembered.targets.iter().map(PathBuf::from).collect()
    } else {
        cli.targets.clone()
    };
    anyhow::ensure!(!source.as_os_str().is_empty(), "no source folder configured; pass --source");
    anyhow::ensure!(!targets.is_empty(), "no target folder configured; pass --target");
    let mut options = EngineOptions::new(source, targets);
    options.extractor = cli.extractor.clone();
    Ok(options)
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into());
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn log_event(stage: Stage, kind: EventKind, path: &Path, detail: &str) {
    let path = path.display();
    if matches!(kind, EventKind::StageStarted | EventKind::StageFinished) {
        tracing::debug!(%stage, ?kind, %path, "{detail}");
        return;
    }
    match kind.severity() {
        Severity::Info => tracing::info!(%stage, ?kind, %path, "{detail}"),
        Severity::Warning => tracing::warn!(%stage, ?kind, %path, "{detail}"),
        Severity::Error => tracing::error!(%stage, ?kind, %path, "{detail}"),
    }
}

fn print_summary(reports: &[StageReport]) {
    for report in reports {
        let status = match report.status {
            StageStatus::Completed => "completed".green(),
            other => format!("{other:?}").as_str().yellow(),
        };
        let errors = format!("{} error(s)", report.errors.len());
        let errors = if report.errors.is_empty() { errors.as_str().normal() } else { errors.as_str().red() };
        println!(
            "{:<15} {status}: {} changed, {} unrecognized, {} warning(s), {errors}",
            report.stage.name().bold(),
            report.changed,
            report.unrecognized,
            report.warnings.len(),
        );
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let path = settings_path(&cli)?;
    let remembered = Settings::load(&path)?;
    let options = engine_options(&remembered, &cli)?;
    let settings = merge(remembered, &cli);

    let stop_token = StopToken::new();
    let handler_token = stop_token.clone();
    ctrlc::set_handler(move || {
        tracing::warn!("stop requested, finishing the current stage");
        handler_token.request_stop();
    })?;
    let control = EngineControl::new().with_stop_token(stop_token);

    let result = match cli.command.stage() {
        Some(stage) => showart_core::run_stage_with_control(stage, &options, &control, &log_event).map(|r| vec![r]),
        None => showart_core::run_pipeline_with_control(&options, &control, &log_event),
    };

    if !cli.no_save {
        settings.save(&path)?;
    }
    print_summary(&result?);
    Ok(())
}
