use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One engine operation. Selected explicitly by the caller for every invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Extract,
    Backdrops,
    Posters,
    EpisodeThumbs,
    Relocate,
}

impl Stage {
    /// Pipeline order.
    pub const ALL: [Stage; 5] = [
        Stage::Extract,
        Stage::Backdrops,
        Stage::Posters,
        Stage::EpisodeThumbs,
        Stage::Relocate,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::Backdrops => "backdrops",
            Stage::Posters => "posters",
            Stage::EpisodeThumbs => "episode-thumbs",
            Stage::Relocate => "relocate",
        }
    }

    /// Whether the stage depends on the external archive extractor.
    pub fn needs_extractor(self) -> bool {
        matches!(self, Stage::Extract)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// What happened to a path during a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    StageStarted,
    StageFinished,
    /// A configured target root is not an existing directory.
    MissingRoot,
    /// No show folders in any target root.
    NoTargets,
    NoArchives,
    NoMatches,
    ExtractorMissing,
    Extracted,
    ExtractionFailed,
    ArchiveDeleted,
    /// Archive still locked after every delete attempt; left in place.
    ArchiveLocked,
    Pruned,
    Moved,
    Renamed,
    Unrecognized,
    UnknownShow,
    /// Thumbnail has no `S..E..` token.
    NoEpisodeKey,
    /// Thumbnail key has no matching video in the target show.
    EpisodeKeyNotFound,
    SeasonFolderMissing,
    DestinationMissing,
    FolderRemoved,
    FolderNotEmpty,
    Failed,
}

impl EventKind {
    pub fn severity(self) -> Severity {
        match self {
            EventKind::MissingRoot
            | EventKind::ArchiveLocked
            | EventKind::NoEpisodeKey
            | EventKind::EpisodeKeyNotFound
            | EventKind::SeasonFolderMissing => Severity::Warning,
            EventKind::ExtractorMissing
            | EventKind::ExtractionFailed
            | EventKind::DestinationMissing
            | EventKind::Failed => Severity::Error,
            _ => Severity::Info,
        }
    }
}

/// Callback receiving every engine event: stage, kind, affected path and a human readable detail.
/// Subscribers may borrow local state for the duration of a run.
pub type EventCallback<'a> = dyn Fn(Stage, EventKind, &Path, &str) + Send + Sync + 'a;

/// Owned record of one callback invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub stage: Stage,
    pub kind: EventKind,
    pub path: PathBuf,
    pub detail: String,
}

impl Event {
    pub fn new(stage: Stage, kind: EventKind, path: &Path, detail: &str) -> Self {
        Self {
            stage,
            kind,
            path: path.to_path_buf(),
            detail: detail.to_string(),
        }
    }
}

/// How a stage ended. Everything except `Completed` is a stage-level abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageStatus {
    Completed,
    NoTargets,
    NoArchives,
    NoMatches,
    ExtractorMissing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: Stage,
    pub status: StageStatus,
    /// Archives extracted plus files moved or renamed.
    pub changed: u64,
    pub unrecognized: u64,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Forwards events for one stage to the caller's callback and tallies the stage report.
pub struct Reporter<'a> {
    inner: &'a EventCallback<'a>,
    stage: Stage,
    changed: u64,
    unrecognized: u64,
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl<'a> Reporter<'a> {
    pub fn new(inner: &'a EventCallback<'a>, stage: Stage) -> Self {
        Self {
            inner,
            stage,
            changed: 0,
            unrecognized: 0,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn emit(&mut self, kind: EventKind, path: &Path, detail: &str) {
        match kind {
            EventKind::Extracted | EventKind::Moved | EventKind::Renamed => self.changed += 1,
            EventKind::Unrecognized
            | EventKind::UnknownShow
            | EventKind::NoEpisodeKey
            | EventKind::EpisodeKeyNotFound => self.unrecognized += 1,
            _ => {}
        }
        match kind.severity() {
            Severity::Info => {}
            Severity::Warning => self.warnings.push(format!("{}: {}", path.display(), detail)),
            Severity::Error => self.errors.push(format!("{}: {}", path.display(), detail)),
        }
        (self.inner)(self.stage, kind, path, detail);
    }

    pub fn finish(self, status: StageStatus) -> StageReport {
        StageReport {
            stage: self.stage,
            status,
            changed: self.changed,
            unrecognized: self.unrecognized,
            warnings: self.warnings,
            errors: self.errors,
        }
    }
}
