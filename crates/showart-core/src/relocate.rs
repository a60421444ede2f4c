use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::classify::{Classification, Miss, Resolved};
use crate::event::{EventKind, Reporter};
use crate::fs_ops;
use crate::naming::{parse_season_file, split_with_extension, EpisodeKey, BACKDROP, FOLDER_POSTER, RELOCATABLE_EXTENSIONS};
use crate::show_index::{self, SeasonIndex, ShowFolder, ShowIndex};

static THUMB_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^(?P<base>.+)-thumb$").unwrap());

/// Classify a renamed artwork file by name alone and pick its library destination.
///
/// Thumbnails go to their season folder; season posters, the specials poster, the
/// backdrop and the folder poster go to the show root. Returns `None` for files
/// that are not relocatable images.
pub fn classify_for_relocation(file: &Path, show_target: &Path, seasons: &SeasonIndex) -> Option<Resolved> {
    let (stem, _) = split_with_extension(file, RELOCATABLE_EXTENSIONS)?;
    let file_name = file.file_name()?;

    if let Some(caps) = THUMB_RE.captures(stem) {
        let base = &caps["base"];
        if let Some(key) = EpisodeKey::find(base) {
            let resolved = match seasons.folder(key.season) {
                Some(folder) => Resolved::to(
                    file,
                    folder.join(file_name),
                    Classification::EpisodeThumb(base.to_string()),
                ),
                None => Resolved::miss(
                    file,
                    Miss::NoDestination(format!("no season folder for {key} in {}", show_target.display())),
                ),
            };
            return Some(resolved);
        }
    }

    let classification = if let Some(season) = parse_season_file(stem) {
        Classification::season_poster(season)
    } else if stem.eq_ignore_ascii_case(BACKDROP) {
        Classification::Backdrop
    } else if stem.eq_ignore_ascii_case(FOLDER_POSTER) {
        Classification::FolderPoster
    } else {
        return Some(Resolved::miss(file, Miss::NoPattern));
    };
    Some(Resolved::to(file, show_target.join(file_name), classification))
}

/// Move everything recognized out of each source show folder into the library,
/// then delete the folders that end up empty.
pub fn run_relocate(source: &Path, index: &ShowIndex, reporter: &mut Reporter) -> anyhow::Result<()> {
    for folder in show_index::show_folders(source, index, reporter)? {
        let seasons = show_index::build_season_index(&folder.target)?;
        for file in fs_ops::list_files(&folder.source)? {
            match classify_for_relocation(&file, &folder.target, &seasons) {
                Some(resolved) => {
                    warn_missing_season(&resolved, &seasons, reporter);
                    resolved.commit(reporter);
                }
                None => reporter.emit(EventKind::Unrecognized, &file, "not a relocatable image"),
            }
        }
        remove_if_empty(&folder, reporter);
    }
    Ok(())
}

/// Posters still go to the show root when their season folder is absent, with a warning.
fn warn_missing_season(resolved: &Resolved, seasons: &SeasonIndex, reporter: &mut Reporter) {
    let detail = match resolved.classification {
        Classification::SeasonPoster(season) if seasons.folder(season).is_none() => {
            format!("no Season {season:02} folder in the target show")
        }
        Classification::SpecialsPoster if seasons.folder(0).is_none() => {
            "no Specials folder in the target show".to_string()
        }
        _ => return,
    };
    reporter.emit(EventKind::SeasonFolderMissing, &resolved.source, &detail);
}

fn remove_if_empty(folder: &ShowFolder, reporter: &mut Reporter) {
    match fs_ops::is_dir_empty(&folder.source) {
        Ok(true) => match fs::remove_dir_all(&folder.source) {
            Ok(()) => reporter.emit(EventKind::FolderRemoved, &folder.source, "removed empty show folder"),
            Err(err) => reporter.emit(
                EventKind::Failed,
                &folder.source,
                &format!("failed to remove empty folder: {err}"),
            ),
        },
        Ok(false) => reporter.emit(EventKind::FolderNotEmpty, &folder.source, "folder not empty, left in place"),
        Err(err) => reporter.emit(EventKind::Failed, &folder.source, &format!("failed to read folder: {err}")),
    }
}
