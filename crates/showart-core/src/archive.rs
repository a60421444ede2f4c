use std::env;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use walkdir::WalkDir;

use crate::control::RetryPolicy;
use crate::event::{EventKind, Reporter, StageStatus};
use crate::fs_ops;
use crate::naming::{split_with_extension, ARCHIVE_EXTENSIONS, IMAGE_EXTENSIONS};
use crate::show_index::ShowIndex;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("extractor not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("extractor exited with {}: {stderr}", exit_label(.code))]
    Failed { code: Option<i32>, stderr: String },
    #[error(transparent)]
    Io(#[from] io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "no exit code".to_string(),
    }
}

/// Unpacks one archive into a folder, overwriting existing files without prompting.
pub trait Extractor: fmt::Debug + Send + Sync {
    fn is_available(&self) -> bool;

    fn extract(&self, archive: &Path, destination: &Path) -> Result<(), ExtractError>;
}

/// Runs a 7-Zip compatible program: `x <archive> -o<destination> -y -aoa`.
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    program: PathBuf,
}

impl CommandExtractor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Full path of the program: checked as-is when it contains a directory, otherwise searched on `PATH`.
    pub fn resolve(&self) -> Option<PathBuf> {
        if self.program.components().count() > 1 {
            return self.program.is_file().then(|| self.program.clone());
        }
        let path_var = env::var_os("PATH")?;
        env::split_paths(&path_var).find_map(|dir| {
            let candidate = dir.join(&self.program);
            if candidate.is_file() {
                return Some(candidate);
            }
            if cfg!(windows) {
                let exe = candidate.with_extension("exe");
                if exe.is_file() {
                    return Some(exe);
                }
            }
            None
        })
    }
}

impl Extractor for CommandExtractor {
    fn is_available(&self) -> bool {
        self.resolve().is_some()
    }

    fn extract(&self, archive: &Path, destination: &Path) -> Result<(), ExtractError> {
        let program = self
            .resolve()
            .ok_or_else(|| ExtractError::NotFound(self.program.clone()))?;
        let mut output_arg = OsString::from("-o");
        output_arg.push(destination);

        // output() waits for exit with stdout and stderr fully drained
        let output = Command::new(program)
            .arg("x")
            .arg(archive)
            .arg(output_arg)
            .arg("-y")
            .arg("-aoa")
            .stdin(Stdio::null())
            .output()?;

        if !output.status.success() {
            return Err(ExtractError::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Extract every archive in the source root whose base name is a show of the library.
///
/// Each match is unpacked into `<source>/<archive base name>/`, the archive is deleted
/// (retrying while locked) and everything that is not an image is pruned from the
/// output. One archive failing never stops the others.
pub fn stage_archives(
    source: &Path,
    index: &ShowIndex,
    extractor: &dyn Extractor,
    retry: &RetryPolicy,
    reporter: &mut Reporter,
) -> anyhow::Result<StageStatus> {
    let archives: Vec<PathBuf> = fs_ops::list_files(source)?
        .into_iter()
        .filter(|path| split_with_extension(path, ARCHIVE_EXTENSIONS).is_some())
        .collect();
    if archives.is_empty() {
        reporter.emit(EventKind::NoArchives, source, "no .zip, .rar or .7z archives in source folder");
        return Ok(StageStatus::NoArchives);
    }

    let matched: Vec<(PathBuf, String)> = archives
        .into_iter()
        .filter_map(|archive| {
            let (stem, _) = split_with_extension(&archive, ARCHIVE_EXTENSIONS)?;
            let stem = stem.to_string();
            index.contains(&stem).then_some((archive, stem))
        })
        .collect();
    if matched.is_empty() {
        reporter.emit(EventKind::NoMatches, source, "no archive is named after a target show");
        return Ok(StageStatus::NoMatches);
    }

    for (archive, name) in matched {
        let destination = source.join(&name);
        stage_one(
            &archive,
            &destination,
            extractor,
            retry,
            |path: &Path| fs_ops::remove_file_with_retry(path, retry),
            reporter,
        );
    }
    Ok(StageStatus::Completed)
}

/// Extract, delete and prune one archive. `remove_archive` deletes the archive and
/// returns the attempts it took.
fn stage_one<F>(
    archive: &Path,
    destination: &Path,
    extractor: &dyn Extractor,
    retry: &RetryPolicy,
    mut remove_archive: F,
    reporter: &mut Reporter,
) where
    F: FnMut(&Path) -> io::Result<u32>,
{
    if let Err(err) = fs::create_dir_all(destination) {
        reporter.emit(
            EventKind::Failed,
            archive,
            &format!("failed to create {}: {err}", destination.display()),
        );
        return;
    }

    match extractor.extract(archive, destination) {
        Ok(()) => reporter.emit(EventKind::Extracted, archive, &destination.display().to_string()),
        Err(err) => {
            reporter.emit(EventKind::ExtractionFailed, archive, &err.to_string());
            return;
        }
    }

    match remove_archive(archive) {
        Ok(attempts) => reporter.emit(
            EventKind::ArchiveDeleted,
            archive,
            &format!("deleted after {attempts} attempt(s)"),
        ),
        Err(err) if fs_ops::is_lock_error(&err) => {
            reporter.emit(
                EventKind::ArchiveLocked,
                archive,
                &format!(
                    "still locked after {} attempt(s), left in place: {err}",
                    retry.max_attempts.max(1)
                ),
            );
            return;
        }
        Err(err) => {
            reporter.emit(EventKind::Failed, archive, &format!("failed to delete archive: {err}"));
            return;
        }
    }

    let removed = prune_non_images(destination, reporter);
    if removed > 0 {
        reporter.emit(EventKind::Pruned, destination, &format!("removed {removed} non-image file(s)"));
    }
}

/// Delete every file below `dir` whose extension is not an accepted image type.
/// Returns the number of files removed; unreadable entries are reported as failures.
pub fn prune_non_images(dir: &Path, reporter: &mut Reporter) -> u64 {
    let mut removed = 0;
    for entry in WalkDir::new(dir) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(dir).to_path_buf();
                reporter.emit(EventKind::Failed, &path, &format!("failed to read entry while pruning: {err}"));
                continue;
            }
        };
        if !entry.file_type().is_file() || split_with_extension(entry.path(), IMAGE_EXTENSIONS).is_some() {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(err) => reporter.emit(
                EventKind::Failed,
                entry.path(),
                &format!("failed to remove non-image file: {err}"),
            ),
        }
    }
    removed
}
