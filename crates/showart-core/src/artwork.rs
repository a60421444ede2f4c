//! Backdrop and poster rules.
//!
//! Loose files in the source root are moved straight into the matching target show
//! folder. Files inside a source show folder are renamed in place and reach the
//! library later through the relocator.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::classify::{Classification, Miss, Resolved};
use crate::event::Reporter;
use crate::fs_ops;
use crate::naming::{format_season_file, split_with_extension, ShowKey, BACKDROP, FOLDER_POSTER, IMAGE_EXTENSIONS};
use crate::show_index::{self, ShowIndex};

static BACKDROP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<show>.+) - (?i:backdrop)$").unwrap());
static SEASON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<show>.+) - (?i:season) (?P<season>[0-9]+)$").unwrap());

/// Resolver signature shared by the loose-file rules.
type LooseRule = fn(&Path, &ShowIndex) -> Option<Resolved>;

/// Resolver signature shared by the show-folder rules.
type FolderRule = fn(&Path, &ShowKey) -> Option<Resolved>;

fn in_target(file: &Path, show: &str, index: &ShowIndex, name: String, classification: Classification) -> Resolved {
    match index.path(show) {
        Some(target) => Resolved::to(file, target.join(name), classification),
        None => Resolved::miss(file, Miss::UnknownShow(show.to_string())),
    }
}

/// `<ShowKey> - Backdrop.<ext>` in the source root -> `<target show>/backdrop.<ext>`.
pub fn resolve_loose_backdrop(file: &Path, index: &ShowIndex) -> Option<Resolved> {
    let (stem, ext) = split_with_extension(file, IMAGE_EXTENSIONS)?;
    let caps = BACKDROP_RE.captures(stem)?;
    let show = caps.name("show")?.as_str();
    ShowKey::parse(show)?;
    Some(in_target(file, show, index, format!("{BACKDROP}.{ext}"), Classification::Backdrop))
}

/// Loose season and folder posters:
/// `<ShowKey> - Season <N>.<ext>` -> `season<NN>-poster.<ext>` (or `season-specials-poster.<ext>`),
/// `<ShowKey>.<ext>` -> `folder.<ext>`, both in the target show folder.
pub fn resolve_loose_poster(file: &Path, index: &ShowIndex) -> Option<Resolved> {
    let (stem, ext) = split_with_extension(file, IMAGE_EXTENSIONS)?;
    if let Some(caps) = SEASON_RE.captures(stem) {
        let show = caps.name("show")?.as_str();
        ShowKey::parse(show)?;
        let season: u32 = caps["season"].parse().ok()?;
        let name = format!("{}.{ext}", format_season_file(season));
        return Some(in_target(file, show, index, name, Classification::season_poster(season)));
    }
    ShowKey::parse(stem)?;
    Some(in_target(file, stem, index, format!("{FOLDER_POSTER}.{ext}"), Classification::FolderPoster))
}

/// `* - Backdrop.<ext>` inside a show folder -> `backdrop.<ext>` beside it.
pub fn resolve_folder_backdrop(file: &Path, _folder: &ShowKey) -> Option<Resolved> {
    let (stem, ext) = split_with_extension(file, IMAGE_EXTENSIONS)?;
    if !BACKDROP_RE.is_match(stem) {
        return None;
    }
    Some(Resolved::to(
        file,
        file.with_file_name(format!("{BACKDROP}.{ext}")),
        Classification::Backdrop,
    ))
}

/// Season and folder posters inside a show folder, renamed in place.
/// The season poster prefix must be the folder's own show; the folder poster
/// must carry the folder's exact name.
pub fn resolve_folder_poster(file: &Path, folder: &ShowKey) -> Option<Resolved> {
    let (stem, ext) = split_with_extension(file, IMAGE_EXTENSIONS)?;
    if let Some(caps) = SEASON_RE.captures(stem) {
        if !folder.matches(&caps["show"]) {
            return None;
        }
        let season: u32 = caps["season"].parse().ok()?;
        return Some(Resolved::to(
            file,
            file.with_file_name(format!("{}.{ext}", format_season_file(season))),
            Classification::season_poster(season),
        ));
    }
    if !folder.is_exactly(stem) {
        return None;
    }
    Some(Resolved::to(
        file,
        file.with_file_name(format!("{FOLDER_POSTER}.{ext}")),
        Classification::FolderPoster,
    ))
}

pub fn run_backdrops(source: &Path, index: &ShowIndex, reporter: &mut Reporter) -> anyhow::Result<()> {
    apply_loose(source, index, resolve_loose_backdrop, reporter)?;
    apply_in_folders(source, index, resolve_folder_backdrop, reporter)
}

pub fn run_posters(source: &Path, index: &ShowIndex, reporter: &mut Reporter) -> anyhow::Result<()> {
    apply_loose(source, index, resolve_loose_poster, reporter)?;
    apply_in_folders(source, index, resolve_folder_poster, reporter)
}

fn apply_loose(source: &Path, index: &ShowIndex, rule: LooseRule, reporter: &mut Reporter) -> anyhow::Result<()> {
    for file in fs_ops::list_files(source)? {
        if let Some(resolved) = rule(&file, index) {
            resolved.commit(reporter);
        }
    }
    Ok(())
}

fn apply_in_folders(source: &Path, index: &ShowIndex, rule: FolderRule, reporter: &mut Reporter) -> anyhow::Result<()> {
    for folder in show_index::show_folders(source, index, reporter)? {
        for file in fs_ops::list_files(&folder.source)? {
            if let Some(resolved) = rule(&file, &folder.key) {
                resolved.commit(reporter);
            }
        }
    }
    Ok(())
}
