pub mod archive;
pub mod artwork;
pub mod classify;
pub mod control;
pub mod episode;
pub mod event;
pub mod fs_ops;
pub mod naming;
pub mod relocate;
pub mod settings;
pub mod show_index;

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

pub use archive::{CommandExtractor, ExtractError, Extractor};
pub use classify::{Classification, Miss, Resolved};
pub use control::{EngineControl, RetryPolicy, StopToken};
pub use event::{Event, EventCallback, EventKind, Reporter, Severity, Stage, StageReport, StageStatus};
pub use settings::Settings;

fn default_extractor() -> PathBuf {
    PathBuf::from("7z")
}

/// Folders and tools for one engine invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Folder holding downloaded artwork and archives.
    pub source: PathBuf,
    /// Library roots whose immediate subfolders are show folders.
    pub targets: Vec<PathBuf>,
    /// 7-Zip compatible program, bare name or path.
    #[serde(default = "default_extractor")]
    pub extractor: PathBuf,
}

impl EngineOptions {
    pub fn new(source: impl Into<PathBuf>, targets: Vec<PathBuf>) -> Self {
        Self {
            source: source.into(),
            targets,
            extractor: default_extractor(),
        }
    }
}

/// Run a single stage.
pub fn run_stage(stage: Stage, options: &EngineOptions, on_event: &EventCallback<'_>) -> anyhow::Result<StageReport> {
    run_stage_with_control(stage, options, &EngineControl::default(), on_event)
}

/// Run a single stage with control options.
///
/// The target show index is rebuilt on every call. An empty index ends the stage
/// with `NoTargets`; a missing extractor ends the extract stage with `ExtractorMissing`.
pub fn run_stage_with_control(
    stage: Stage,
    options: &EngineOptions,
    control: &EngineControl,
    on_event: &EventCallback<'_>,
) -> anyhow::Result<StageReport> {
    let source = options.source.as_path();
    anyhow::ensure!(
        source.is_dir(),
        "source folder {} is not an existing directory",
        source.display()
    );

    let mut reporter = Reporter::new(on_event, stage);
    reporter.emit(EventKind::StageStarted, source, stage.name());

    let index = show_index::build_show_index(&options.targets, &mut reporter)
        .with_context(|| format!("{stage} stage: failed to scan target folders"))?;
    let status = if index.is_empty() {
        reporter.emit(EventKind::NoTargets, source, "no \"Name (YYYY)\" show folders in any target folder");
        StageStatus::NoTargets
    } else {
        let command = CommandExtractor::new(&options.extractor);
        let extractor: &dyn Extractor = control.extractor.as_deref().unwrap_or(&command);
        if stage.needs_extractor() && !extractor.is_available() {
            reporter.emit(
                EventKind::ExtractorMissing,
                &options.extractor,
                "archive extractor not found; install 7-Zip or pass its path",
            );
            StageStatus::ExtractorMissing
        } else {
            dispatch(stage, source, &index, extractor, control, &mut reporter)
                .with_context(|| format!("{stage} stage failed"))?
        }
    };

    reporter.emit(EventKind::StageFinished, source, &format!("{status:?}"));
    Ok(reporter.finish(status))
}

fn dispatch(
    stage: Stage,
    source: &Path,
    index: &show_index::ShowIndex,
    extractor: &dyn Extractor,
    control: &EngineControl,
    reporter: &mut Reporter,
) -> anyhow::Result<StageStatus> {
    match stage {
        Stage::Extract => return archive::stage_archives(source, index, extractor, &control.retry, reporter),
        Stage::Backdrops => artwork::run_backdrops(source, index, reporter)?,
        Stage::Posters => artwork::run_posters(source, index, reporter)?,
        Stage::EpisodeThumbs => episode::run_episode_thumbs(source, index, reporter)?,
        Stage::Relocate => relocate::run_relocate(source, index, reporter)?,
    }
    Ok(StageStatus::Completed)
}

/// Run every stage in pipeline order.
pub fn run_pipeline(options: &EngineOptions, on_event: &EventCallback<'_>) -> anyhow::Result<Vec<StageReport>> {
    run_pipeline_with_control(options, &EngineControl::default(), on_event)
}

/// Run every stage in pipeline order with control options.
///
/// A stop request is honoured between stages; the reports gathered so far are returned.
pub fn run_pipeline_with_control(
    options: &EngineOptions,
    control: &EngineControl,
    on_event: &EventCallback<'_>,
) -> anyhow::Result<Vec<StageReport>> {
    let mut reports = Vec::with_capacity(Stage::ALL.len());
    for stage in Stage::ALL {
        if control.stop_requested() {
            break;
        }
        reports.push(run_stage_with_control(stage, options, control, on_event)?);
    }
    Ok(reports)
}
