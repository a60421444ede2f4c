use std::path::{Path, PathBuf};

use crate::event::{EventKind, Reporter};
use crate::fs_ops;
use crate::naming::EpisodeKey;

/// What a source file turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Backdrop,
    /// Season 1 and up; season 0 is `SpecialsPoster`.
    SeasonPoster(u32),
    SpecialsPoster,
    FolderPoster,
    /// Carries the base name of the video the thumbnail belongs to.
    EpisodeThumb(String),
    Unrecognized(Miss),
}

impl Classification {
    pub fn season_poster(season: u32) -> Self {
        if season == 0 {
            Classification::SpecialsPoster
        } else {
            Classification::SeasonPoster(season)
        }
    }
}

/// Why a file could not be placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Miss {
    /// Name matched a rule but the show is not in the target library.
    UnknownShow(String),
    NoEpisodeKey,
    EpisodeKeyNotFound(EpisodeKey),
    /// Relocation rule matched but the library has no folder for it.
    NoDestination(String),
    NoPattern,
}

impl Miss {
    pub fn event_kind(&self) -> EventKind {
        match self {
            Miss::UnknownShow(_) => EventKind::UnknownShow,
            Miss::NoEpisodeKey => EventKind::NoEpisodeKey,
            Miss::EpisodeKeyNotFound(_) => EventKind::EpisodeKeyNotFound,
            Miss::NoDestination(_) => EventKind::DestinationMissing,
            Miss::NoPattern => EventKind::Unrecognized,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Miss::UnknownShow(show) => format!("no target show folder named \"{show}\""),
            Miss::NoEpisodeKey => "no SxxEyy episode key in file name".to_string(),
            Miss::EpisodeKeyNotFound(key) => {
                format!("key not found: no video for {key} in the target show folder")
            }
            Miss::NoDestination(reason) => format!("cannot determine destination: {reason}"),
            Miss::NoPattern => "file name matches no artwork rule".to_string(),
        }
    }
}

/// A classified source file with the path it should end up at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub source: PathBuf,
    /// `None` exactly when the classification is `Unrecognized`.
    pub destination: Option<PathBuf>,
    pub classification: Classification,
}

impl Resolved {
    pub fn to(source: &Path, destination: PathBuf, classification: Classification) -> Self {
        Self {
            source: source.to_path_buf(),
            destination: Some(destination),
            classification,
        }
    }

    pub fn miss(source: &Path, miss: Miss) -> Self {
        Self {
            source: source.to_path_buf(),
            destination: None,
            classification: Classification::Unrecognized(miss),
        }
    }

    /// Carry out the decision: report a miss, or move/rename with overwrite.
    /// Failures are reported and never propagate, so sibling files still get processed.
    pub fn commit(&self, reporter: &mut Reporter) {
        let destination = match (&self.classification, &self.destination) {
            (Classification::Unrecognized(miss), _) => {
                reporter.emit(miss.event_kind(), &self.source, &miss.describe());
                return;
            }
            (_, Some(destination)) => destination,
            (_, None) => return,
        };
        if destination == &self.source {
            return;
        }
        let parent = destination.parent().unwrap_or_else(|| Path::new(""));
        if !parent.is_dir() {
            reporter.emit(
                EventKind::DestinationMissing,
                &self.source,
                &format!("destination folder {} does not exist", parent.display()),
            );
            return;
        }
        let kind = if self.source.parent() == Some(parent) {
            EventKind::Renamed
        } else {
            EventKind::Moved
        };
        match fs_ops::move_overwrite(&self.source, destination) {
            Ok(()) => reporter.emit(kind, &self.source, &destination.display().to_string()),
            Err(err) => reporter.emit(EventKind::Failed, &self.source, &format!("{err:#}")),
        }
    }
}
