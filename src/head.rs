use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crate::error::{Error, IoResultExt, Result};
use crate::hash::Hash;
use crate::repo::Repo;

/// read HEAD
///
/// a missing or empty HEAD file means "no commits yet".
pub fn read_head(repo: &Repo) -> Result<Option<Hash>> {
    let head_path = repo.head_path();

    let content = match fs::read_to_string(&head_path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(Error::Io {
                path: head_path,
                source: e,
            })
        }
    };

    let hex = content.trim();
    if hex.is_empty() {
        return Ok(None);
    }
    Hash::from_hex(hex)
        .map(Some)
        .map_err(|_| Error::CorruptHead(hex.to_string()))
}

/// point HEAD at a commit
pub fn write_head(repo: &Repo, hash: &Hash) -> Result<()> {
    write_head_contents(repo, &hash.to_hex())
}

/// reset HEAD to "no commits"
pub fn clear_head(repo: &Repo) -> Result<()> {
    write_head_contents(repo, "")
}

fn write_head_contents(repo: &Repo, contents: &str) -> Result<()> {
    let head_path = repo.head_path();

    // atomic write: temp -> fsync -> rename
    let tmp_path = repo
        .path()
        .join(format!("HEAD.tmp-{}", uuid::Uuid::new_v4()));
    // no trailing newline, matching existing repositories
    write_temp(&tmp_path, |tmp_file| tmp_file.write_all(contents.as_bytes()))?;

    if let Err(e) = fs::rename(&tmp_path, &head_path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(Error::Io {
            path: head_path,
            source: e,
        });
    }

    let dir = File::open(repo.path()).with_path(repo.path())?;
    dir.sync_all().with_path(repo.path())?;

    tracing::debug!(head = contents, "updated HEAD");
    Ok(())
}

/// create `tmp_path`, fill it and fsync it; the file is removed again on any failure
fn write_temp<F>(tmp_path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut File) -> std::io::Result<()>,
{
    let written = File::create(tmp_path).and_then(|mut tmp_file| {
        write(&mut tmp_file)?;
        tmp_file.sync_all()
    });
    if let Err(e) = written {
        let _ = fs::remove_file(tmp_path);
        return Err(Error::Io {
            path: tmp_path.to_path_buf(),
            source: e,
        });
    }
    Ok(())
}
