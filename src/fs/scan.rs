//! working-tree enumeration and cleanup

use std::fs;
use std::path::{Component, Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::error::{Error, IoResultExt, Result};
use crate::ignore::IgnoreSet;

/// a trackable file found under the working-tree root
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScannedFile {
    /// absolute (root-joined) path on disk
    pub path: PathBuf,
    /// root-relative path with `/` separators, used as the commit key
    pub rel_path: String,
}

/// enumerate every regular file under `root` not excluded by `ignores`
///
/// ignored directories are pruned without descending. symlinks are not
/// followed and not yielded. results are sorted by relative path.
pub fn scan_working_tree(root: &Path, ignores: &IgnoreSet) -> Result<Vec<ScannedFile>> {
    let mut files = Vec::new();

    for entry in walk(root, ignores) {
        let entry = entry.map_err(|e| walk_error(root, e))?;
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            tracing::debug!(path = %entry.path().display(), "skipping symlink");
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        let rel_path = to_rel_path(root, entry.path())?;
        files.push(ScannedFile {
            path: entry.into_path(),
            rel_path,
        });
    }

    files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    Ok(files)
}

/// delete every non-ignored file under `root`
///
/// entries are visited children-first so emptied directories can be removed;
/// a directory that cannot be removed (still holding ignored content) is kept.
/// symlinks are removed without being followed. returns the number of files
/// removed.
pub fn clean_working_tree(root: &Path, ignores: &IgnoreSet) -> Result<usize> {
    let entries = walk(root, ignores)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| walk_error(root, e))?;

    let mut removed = 0;
    for entry in entries.iter().rev() {
        let path = entry.path();
        if entry.file_type().is_dir() {
            if let Err(e) = fs::remove_dir(path) {
                tracing::debug!(path = %path.display(), error = %e, "keeping directory");
            }
        } else {
            fs::remove_file(path).with_path(path)?;
            removed += 1;
        }
    }

    tracing::debug!(root = %root.display(), removed, "cleaned working tree");
    Ok(removed)
}

/// turn a commit file key into a relative path that stays inside the root
///
/// `/` is the only separator; a backslash is an ordinary filename character.
pub fn validate_rel_path(rel_path: &str) -> Result<PathBuf> {
    let invalid = || Error::InvalidPath(rel_path.to_string());

    if rel_path.is_empty() || rel_path.contains('\0') {
        return Err(invalid());
    }

    let mut path = PathBuf::new();
    for component in rel_path.split('/') {
        if component.is_empty() || component == "." || component == ".." {
            return Err(invalid());
        }
        path.push(component);
    }

    // rejects anything the platform would read as rooted or prefixed
    if !path.components().all(|c| matches!(c, Component::Normal(_))) {
        return Err(invalid());
    }

    Ok(path)
}

fn walk(root: &Path, ignores: &IgnoreSet) -> impl Iterator<Item = walkdir::Result<DirEntry>> {
    let ignores = ignores.clone();
    WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| !is_ignored_entry(entry, &ignores))
}

fn is_ignored_entry(entry: &DirEntry, ignores: &IgnoreSet) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| ignores.matches_name(name))
        .unwrap_or(false)
}

fn to_rel_path(root: &Path, path: &Path) -> Result<String> {
    let rel = path
        .strip_prefix(root)
        .map_err(|_| Error::InvalidPath(path.display().to_string()))?;

    let parts = rel
        .components()
        .map(|c| {
            c.as_os_str()
                .to_str()
                .ok_or_else(|| Error::InvalidPath(path.display().to_string()))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(parts.join("/"))
}

fn walk_error(root: &Path, e: walkdir::Error) -> Error {
    let path = e.path().unwrap_or(root).to_path_buf();
    Error::Io {
        path,
        source: e.into(),
    }
}
