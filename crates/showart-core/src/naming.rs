use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Image extensions handled by the backdrop, poster and thumbnail stages.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Image extensions the relocator moves into the library.
pub const RELOCATABLE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

pub const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "rar", "7z"];

pub const VIDEO_EXTENSIONS: &[&str] = &["mkv", "mp4", "avi", "mov", "mpg", "ts"];

static SHOW_KEY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^.+ \([0-9]{4}\)$").unwrap());
static EPISODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)S([0-9]{1,2})\s*E([0-9]{1,2})").unwrap());
static SEASON_POSTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^season(?P<season>[0-9]+)-poster$").unwrap());

pub const SPECIALS_POSTER: &str = "season-specials-poster";
pub const BACKDROP: &str = "backdrop";
pub const FOLDER_POSTER: &str = "folder";
pub const THUMB_SUFFIX: &str = "-thumb";

/// Normalize to NFC and lowercase, for case-insensitive name comparison.
pub fn fold(name: &str) -> String {
    name.nfc().collect::<String>().to_lowercase()
}

/// Show folder identifier of the form `Name (YYYY)`.
///
/// Equality and hashing ignore case, so `South Park (1997)` and
/// `south park (1997)` are the same key.
#[derive(Debug, Clone)]
pub struct ShowKey {
    name: String,
    folded: String,
}

impl ShowKey {
    /// Parse a folder or file name, returning `None` unless it ends in a four digit year in parentheses.
    pub fn parse(name: &str) -> Option<Self> {
        let name: String = name.nfc().collect();
        if !SHOW_KEY_RE.is_match(&name) {
            return None;
        }
        let folded = name.to_lowercase();
        Some(Self { name, folded })
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    pub fn folded(&self) -> &str {
        &self.folded
    }

    /// Case-insensitive comparison against a raw name.
    pub fn matches(&self, other: &str) -> bool {
        fold(other) == self.folded
    }

    /// Exact comparison against a raw name (Unicode normalized, case kept).
    pub fn is_exactly(&self, other: &str) -> bool {
        other.nfc().eq(self.name.chars())
    }
}

impl PartialEq for ShowKey {
    fn eq(&self, other: &Self) -> bool {
        self.folded == other.folded
    }
}

impl Eq for ShowKey {}

impl Hash for ShowKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folded.hash(state);
    }
}

impl fmt::Display for ShowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Season/episode pair joining thumbnails to videos, displayed as `S01E07`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EpisodeKey {
    pub season: u32,
    pub episode: u32,
}

impl EpisodeKey {
    pub fn new(season: u32, episode: u32) -> Self {
        Self { season, episode }
    }

    /// Find the first `S<season>E<episode>` token in `text`.
    ///
    /// Case-insensitive, tolerates whitespace between the two halves:
    /// `s01 e07`, `S01E07` and `S1E7` all yield `S01E07`.
    pub fn find(text: &str) -> Option<Self> {
        let caps = EPISODE_RE.captures(text)?;
        Some(Self {
            season: caps[1].parse().ok()?,
            episode: caps[2].parse().ok()?,
        })
    }
}

impl fmt::Display for EpisodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{:02}E{:02}", self.season, self.episode)
    }
}

/// Base name of a season poster: `season-specials-poster` for season 0, `season<NN>-poster` otherwise.
pub fn format_season_file(season: u32) -> String {
    if season == 0 {
        SPECIALS_POSTER.to_string()
    } else {
        format!("season{season:02}-poster")
    }
}

/// Season number of a `season<NN>-poster` base name.
pub fn parse_season_file(stem: &str) -> Option<u32> {
    if stem.eq_ignore_ascii_case(SPECIALS_POSTER) {
        return Some(0);
    }
    SEASON_POSTER_RE.captures(stem)?["season"].parse().ok()
}

/// Split a file name into stem and extension when the extension is in `allowed`.
/// Extensions compare case-insensitively; the returned extension keeps its casing.
pub fn split_with_extension<'a>(path: &'a Path, allowed: &[&str]) -> Option<(&'a str, &'a str)> {
    let stem = path.file_stem()?.to_str()?;
    let ext = path.extension()?.to_str()?;
    allowed
        .iter()
        .any(|a| a.eq_ignore_ascii_case(ext))
        .then_some((stem, ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_show_key_grammar() {
        assert!(ShowKey::parse("South Park (1997)").is_some());
        assert!(ShowKey::parse("Loki (2021)").is_some());
        assert!(ShowKey::parse("Loki").is_none());
        assert!(ShowKey::parse("Loki (21)").is_none());
        assert!(ShowKey::parse("Loki (2021) extra").is_none());
        assert!(ShowKey::parse(" (2021)").is_none());
        assert!(ShowKey::parse("Loki(2021)").is_none());
    }

    #[test]
    fn test_show_key_case_insensitive() {
        let a = ShowKey::parse("South Park (1997)").unwrap();
        let b = ShowKey::parse("SOUTH PARK (1997)").unwrap();
        assert_eq!(a, b);
        let set: HashSet<ShowKey> = [a.clone(), b].into_iter().collect();
        assert_eq!(set.len(), 1);
        assert!(a.matches("south park (1997)"));
        assert!(!a.is_exactly("south park (1997)"));
        assert!(a.is_exactly("South Park (1997)"));
    }

    #[test]
    fn test_show_key_nfc() {
        // "Amélie" with a combining acute accent vs the precomposed form
        let decomposed = ShowKey::parse("Ame\u{301}lie (2001)").unwrap();
        assert!(decomposed.matches("Am\u{e9}lie (2001)"));
        assert!(decomposed.is_exactly("Am\u{e9}lie (2001)"));
    }

    #[test]
    fn test_episode_key_normalization() {
        let expected = EpisodeKey::new(1, 7);
        assert_eq!(EpisodeKey::find("s01 e07"), Some(expected));
        assert_eq!(EpisodeKey::find("S01E07"), Some(expected));
        assert_eq!(EpisodeKey::find("S1E7"), Some(expected));
        assert_eq!(EpisodeKey::find("Show - S1 E7 - Pinkeye"), Some(expected));
        assert_eq!(EpisodeKey::find("S1E7").unwrap().to_string(), "S01E07");
        assert_eq!(EpisodeKey::find("Pinkeye"), None);
        assert_eq!(EpisodeKey::find("season01-poster"), None);
    }

    #[test]
    fn test_format_season_file() {
        assert_eq!(format_season_file(0), "season-specials-poster");
        assert_eq!(format_season_file(1), "season01-poster");
        assert_eq!(format_season_file(12), "season12-poster");
        for n in 0..=99 {
            let name = format_season_file(n);
            assert_eq!(parse_season_file(&name), Some(n));
            assert_eq!(format_season_file(parse_season_file(&name).unwrap()), name);
        }
    }

    #[test]
    fn test_split_with_extension() {
        let path = Path::new("Loki (2021) - Season 1.JPG");
        assert_eq!(
            split_with_extension(path, IMAGE_EXTENSIONS),
            Some(("Loki (2021) - Season 1", "JPG"))
        );
        assert_eq!(split_with_extension(Path::new("notes.txt"), IMAGE_EXTENSIONS), None);
        assert_eq!(split_with_extension(Path::new("cover.webp"), IMAGE_EXTENSIONS), None);
        assert!(split_with_extension(Path::new("cover.webp"), RELOCATABLE_EXTENSIONS).is_some());
        assert_eq!(split_with_extension(Path::new(".jpg"), IMAGE_EXTENSIONS), None);
    }
}
