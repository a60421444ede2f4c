use std::ffi::OsString;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::Context;

use crate::control::RetryPolicy;

/// Entries of a directory sorted by path, so every stage sees a stable order.
/// An unreadable entry fails the listing instead of being skipped.
pub fn list_dir(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = fs::read_dir(dir)
        .with_context(|| format!("failed to read directory {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<PathBuf>>>()
        .with_context(|| format!("failed to read an entry of {}", dir.display()))?;
    paths.sort();
    Ok(paths)
}

pub fn list_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    Ok(list_dir(dir)?.into_iter().filter(|p| p.is_file()).collect())
}

pub fn list_dirs(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    Ok(list_dir(dir)?.into_iter().filter(|p| p.is_dir()).collect())
}

/// True when `dir` has no entries at all, hidden ones included.
pub fn is_dir_empty(dir: &Path) -> io::Result<bool> {
    Ok(fs::read_dir(dir)?.next().is_none())
}

/// Move `src` to `dst`, replacing any existing file at `dst`.
///
/// Within one filesystem this is a plain rename. Across filesystems the data is
/// copied to a temporary sibling of `dst` which is then renamed over it, so `dst`
/// is either fully replaced or untouched. `src` is only removed after that.
pub fn move_overwrite(src: &Path, dst: &Path) -> anyhow::Result<()> {
    if src == dst {
        return Ok(());
    }
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::CrossesDevices => copy_then_replace(src, dst),
        Err(err) => Err(err)
            .with_context(|| format!("failed to move {} to {}", src.display(), dst.display())),
    }
}

fn copy_then_replace(src: &Path, dst: &Path) -> anyhow::Result<()> {
    let temp = temp_sibling(dst);
    if let Err(err) = fs::copy(src, &temp).and_then(|_| fs::rename(&temp, dst)) {
        let _ = fs::remove_file(&temp);
        return Err(err)
            .with_context(|| format!("failed to copy {} to {}", src.display(), dst.display()));
    }
    fs::remove_file(src).with_context(|| format!("failed to remove {}", src.display()))
}

fn temp_sibling(dst: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(dst.file_name().unwrap_or_default());
    name.push(".partial");
    dst.with_file_name(name)
}

/// Errors worth retrying: the file is held open by another process.
pub fn is_lock_error(err: &io::Error) -> bool {
    if matches!(err.kind(), ErrorKind::PermissionDenied | ErrorKind::ResourceBusy) {
        return true;
    }
    // ERROR_SHARING_VIOLATION, ERROR_LOCK_VIOLATION
    cfg!(windows) && matches!(err.raw_os_error(), Some(32 | 33))
}

/// Delete a file, retrying lock errors per `policy`. Returns the number of attempts used.
/// Any other error is returned immediately.
pub fn remove_file_with_retry(path: &Path, policy: &RetryPolicy) -> io::Result<u32> {
    remove_with_retry(path, policy, |p| fs::remove_file(p))
}

pub(crate) fn remove_with_retry<F>(path: &Path, policy: &RetryPolicy, mut remove: F) -> io::Result<u32>
where
    F: FnMut(&Path) -> io::Result<()>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match remove(path) {
            Ok(()) => return Ok(attempt),
            Err(err) if is_lock_error(&err) && attempt < max_attempts => {
                thread::sleep(policy.delay);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
