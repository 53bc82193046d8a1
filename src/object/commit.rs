use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use crate::error::{Error, IoResultExt, Result};
use crate::hash::Hash;
use crate::object::blob::fsync_dir;
use crate::repo::Repo;
use crate::types::Commit;

/// write a commit to `commits/<id>.json`
///
/// commits are immutable: if the file already exists it is left as is
/// (identical content yields an identical id).
pub fn write_commit(repo: &Repo, commit: &Commit) -> Result<Hash> {
    let commit_path = commit_path(repo, &commit.id);

    if commit_path.exists() {
        return Ok(commit.id);
    }

    let commits_dir = repo.commits_path();
    fs::create_dir_all(&commits_dir).with_path(&commits_dir)?;

    let json = serde_json::to_string_pretty(commit)?;

    // atomic write: temp -> fsync -> rename
    let tmp_path = commits_dir.join(format!("{}.json.tmp-{}", commit.id, uuid::Uuid::new_v4()));
    {
        let mut tmp_file = File::create(&tmp_path).with_path(&tmp_path)?;
        tmp_file.write_all(json.as_bytes()).with_path(&tmp_path)?;
        tmp_file.sync_all().with_path(&tmp_path)?;
    }

    if let Err(e) = fs::rename(&tmp_path, &commit_path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(Error::Io {
            path: commit_path,
            source: e,
        });
    }
    fsync_dir(&commits_dir)?;

    tracing::debug!(id = %commit.id, files = commit.files.len(), "wrote commit");
    Ok(commit.id)
}

/// read a commit
pub fn read_commit(repo: &Repo, id: &Hash) -> Result<Commit> {
    let path = commit_path(repo, id);

    let json = fs::read_to_string(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::CommitNotFound(*id)
        } else {
            Error::Io {
                path: path.clone(),
                source: e,
            }
        }
    })?;

    let commit: Commit = serde_json::from_str(&json).map_err(|e| Error::CorruptCommit {
        id: id.to_hex(),
        message: e.to_string(),
    })?;

    if commit.id != *id {
        return Err(Error::CorruptCommit {
            id: id.to_hex(),
            message: format!("file holds commit {}", commit.id),
        });
    }

    Ok(commit)
}

/// get the filesystem path to a commit
pub fn commit_path(repo: &Repo, id: &Hash) -> PathBuf {
    repo.commits_path().join(format!("{}.json", id))
}

/// check if a commit exists
pub fn commit_exists(repo: &Repo, id: &Hash) -> bool {
    commit_path(repo, id).is_file()
}

/// list every commit id present on disk, sorted
pub fn list_commits(repo: &Repo) -> Result<Vec<Hash>> {
    let commits_dir = repo.commits_path();
    let mut ids = Vec::new();

    if !commits_dir.exists() {
        return Ok(ids);
    }

    for entry in fs::read_dir(&commits_dir).with_path(&commits_dir)? {
        let entry = entry.with_path(&commits_dir)?;
        let name = entry.file_name();
        let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
            continue;
        };
        if let Ok(id) = Hash::from_hex(stem) {
            ids.push(id);
        }
    }

    ids.sort();
    Ok(ids)
}
