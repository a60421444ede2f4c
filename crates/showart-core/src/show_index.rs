use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::event::{EventKind, Reporter};
use crate::fs_ops;
use crate::naming::{fold, ShowKey};

static SEASON_DIR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^season (?P<season>[0-9]+)$").unwrap());

const SPECIALS_DIR: &str = "Specials";

/// Show folders of the target library, keyed case-insensitively by `ShowKey`.
#[derive(Debug, Default)]
pub struct ShowIndex {
    shows: HashMap<String, PathBuf>,
}

impl ShowIndex {
    /// Target folder of a show, looked up by raw folder or file name.
    pub fn path(&self, name: &str) -> Option<&Path> {
        self.shows.get(&fold(name)).map(PathBuf::as_path)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.shows.contains_key(&fold(name))
    }

    pub fn is_empty(&self) -> bool {
        self.shows.is_empty()
    }

    /// First folder per key wins.
    fn insert(&mut self, key: &ShowKey, path: PathBuf) {
        self.shows.entry(key.folded().to_string()).or_insert(path);
    }
}

/// Scan the immediate subfolders of every target root for `Name (YYYY)` show folders.
///
/// Roots that are not existing directories are reported and skipped. On duplicate
/// keys the first root wins. An empty index is a valid result.
pub fn build_show_index(target_roots: &[PathBuf], reporter: &mut Reporter) -> anyhow::Result<ShowIndex> {
    let mut index = ShowIndex::default();
    for root in target_roots {
        if !root.is_dir() {
            reporter.emit(EventKind::MissingRoot, root, "target root is not an existing directory");
            continue;
        }
        for dir in fs_ops::list_dirs(root)? {
            let Some(key) = dir.file_name().and_then(|n| n.to_str()).and_then(ShowKey::parse) else {
                continue;
            };
            index.insert(&key, dir);
        }
    }
    Ok(index)
}

/// Season and specials folders directly beneath one target show folder.
#[derive(Debug, Default)]
pub struct SeasonIndex {
    seasons: BTreeMap<u32, PathBuf>,
    specials: Option<PathBuf>,
}

impl SeasonIndex {
    /// Folder for a season. Season 0 resolves to `Specials`, falling back to a `Season 0` folder.
    pub fn folder(&self, season: u32) -> Option<&Path> {
        if season == 0 {
            if let Some(specials) = &self.specials {
                return Some(specials);
            }
        }
        self.seasons.get(&season).map(PathBuf::as_path)
    }

}

/// Index `Season <N>` folders (case-insensitive, first one per number wins) and the
/// literal `Specials` folder of a show.
pub fn build_season_index(show_path: &Path) -> anyhow::Result<SeasonIndex> {
    let mut index = SeasonIndex::default();
    for dir in fs_ops::list_dirs(show_path)? {
        let Some(name) = dir.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name == SPECIALS_DIR {
            if index.specials.is_none() {
                index.specials = Some(dir);
            }
            continue;
        }
        let Some(season) = SEASON_DIR_RE
            .captures(name)
            .and_then(|caps| caps["season"].parse::<u32>().ok())
        else {
            continue;
        };
        index.seasons.entry(season).or_insert(dir);
    }
    Ok(index)
}

/// A source subfolder named after a show of the target library.
#[derive(Debug, Clone)]
pub struct ShowFolder {
    pub key: ShowKey,
    pub source: PathBuf,
    pub target: PathBuf,
}

/// Source subfolders whose name is a `ShowKey`, paired with the matching target show folder.
/// Show-like folders without a library counterpart are reported and left alone.
pub fn show_folders(source: &Path, index: &ShowIndex, reporter: &mut Reporter) -> anyhow::Result<Vec<ShowFolder>> {
    let mut folders = Vec::new();
    for dir in fs_ops::list_dirs(source)? {
        let Some(key) = dir.file_name().and_then(|n| n.to_str()).and_then(ShowKey::parse) else {
            continue;
        };
        match index.path(key.as_str()) {
            Some(target) => folders.push(ShowFolder {
                key,
                target: target.to_path_buf(),
                source: dir,
            }),
            None => reporter.emit(
                EventKind::UnknownShow,
                &dir,
                &format!("no target show folder named \"{key}\""),
            ),
        }
    }
    Ok(folders)
}
