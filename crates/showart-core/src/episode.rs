use std::collections::HashMap;
use std::path::Path;

use walkdir::WalkDir;

use crate::classify::{Classification, Miss, Resolved};
use crate::event::{EventKind, Reporter};
use crate::fs_ops;
use crate::naming::{
    parse_season_file, split_with_extension, EpisodeKey, ShowKey, BACKDROP, FOLDER_POSTER, IMAGE_EXTENSIONS,
    THUMB_SUFFIX, VIDEO_EXTENSIONS,
};
use crate::show_index::{self, ShowIndex};

/// Video base names (without extension) of one target show, keyed by episode.
#[derive(Debug, Default)]
pub struct VideoIndex {
    episodes: HashMap<EpisodeKey, String>,
}

impl VideoIndex {
    pub fn get(&self, key: &EpisodeKey) -> Option<&str> {
        self.episodes.get(key).map(String::as_str)
    }
}

/// Recursively collect videos under a target show folder. The first video per episode key wins.
///
/// Unreadable entries are reported as failures rather than skipped silently.
pub fn build_video_index(show_path: &Path, reporter: &mut Reporter) -> VideoIndex {
    let mut index = VideoIndex::default();
    for entry in WalkDir::new(show_path).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(show_path).to_path_buf();
                reporter.emit(EventKind::Failed, &path, &format!("failed to scan for videos: {err}"));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some((stem, _)) = split_with_extension(entry.path(), VIDEO_EXTENSIONS) else {
            continue;
        };
        if let Some(key) = EpisodeKey::find(stem) {
            index.episodes.entry(key).or_insert_with(|| stem.to_string());
        }
    }
    index
}

/// Names that earlier stages produce; they are never thumbnails.
fn is_processed_artwork(stem: &str, folder: &ShowKey) -> bool {
    stem.eq_ignore_ascii_case(FOLDER_POSTER)
        || stem.eq_ignore_ascii_case(BACKDROP)
        || stem.to_lowercase().ends_with(THUMB_SUFFIX)
        || parse_season_file(stem).is_some()
        || folder.matches(stem)
}

/// Rename an episode image to `<video base name>-thumb.<ext>` in place.
///
/// Returns `None` for files this stage does not consider (non-images and already
/// processed artwork). Images without an episode key, or whose key has no video in
/// the target show, come back unrecognized.
pub fn resolve_episode_thumb(file: &Path, folder: &ShowKey, videos: &VideoIndex) -> Option<Resolved> {
    let (stem, ext) = split_with_extension(file, IMAGE_EXTENSIONS)?;
    if is_processed_artwork(stem, folder) {
        return None;
    }
    let Some(key) = EpisodeKey::find(stem) else {
        return Some(Resolved::miss(file, Miss::NoEpisodeKey));
    };
    let Some(base) = videos.get(&key) else {
        return Some(Resolved::miss(file, Miss::EpisodeKeyNotFound(key)));
    };
    Some(Resolved::to(
        file,
        file.with_file_name(format!("{base}{THUMB_SUFFIX}.{ext}")),
        Classification::EpisodeThumb(base.to_string()),
    ))
}

pub fn run_episode_thumbs(source: &Path, index: &ShowIndex, reporter: &mut Reporter) -> anyhow::Result<()> {
    for folder in show_index::show_folders(source, index, reporter)? {
        let videos = build_video_index(&folder.target, reporter);
        for file in fs_ops::list_files(&folder.source)? {
            if let Some(resolved) = resolve_episode_thumb(&file, &folder.key, &videos) {
                resolved.commit(reporter);
            }
        }
    }
    Ok(())
}
