use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::error::{Error, IoResultExt, Result};
use crate::fs::{clean_working_tree, validate_rel_path};
use crate::hash::Hash;
use crate::head::write_head;
use crate::object::{read_blob_to, read_commit};
use crate::repo::Repo;

/// restore options
#[derive(Clone, Debug, Default)]
pub struct RestoreOptions {
    /// delete every non-ignored file before writing the commit's files.
    /// without it (overlay) only the commit's files are (over)written and
    /// anything else on disk is left alone.
    pub clean: bool,
}

/// check out a commit into the working tree and move HEAD to it
///
/// every file is first fetched into a staging directory under
/// `.paperrepo/tmp`, so a missing or corrupt blob aborts before the working
/// tree is touched. returns the number of files written.
pub fn restore(repo: &Repo, id: &Hash, opts: RestoreOptions) -> Result<usize> {
    if !Repo::is_repo(repo.root()) {
        return Err(Error::NotARepository(repo.root().to_path_buf()));
    }
    let _lock = repo.lock()?;

    let commit = read_commit(repo, id)?;

    let mut targets = Vec::with_capacity(commit.files.len());
    for (rel_path, digest) in &commit.files {
        targets.push((validate_rel_path(rel_path)?, *digest));
    }

    // stage: fetch and verify every blob
    let staging = StagingDir::create(repo)?;
    let mut staged = Vec::with_capacity(targets.len());
    for (index, (rel_path, digest)) in targets.into_iter().enumerate() {
        let tmp = staging.path().join(index.to_string());
        stage_blob(repo, &digest, &tmp)?;
        staged.push((tmp, rel_path));
    }

    if opts.clean {
        let ignores = repo.ignore_set()?;
        clean_working_tree(repo.root(), &ignores)?;
    }

    // swap staged files into place
    let mut written = 0;
    for (tmp, rel_path) in staged {
        let dest = repo.root().join(&rel_path);
        place_file(&tmp, &dest)?;
        written += 1;
    }

    write_head(repo, &commit.id)?;

    tracing::info!(
        id = %commit.id,
        clean = opts.clean,
        written,
        "restored working tree"
    );
    Ok(written)
}

/// restore `root`, which must already be a repository
pub fn restore_working_tree(root: &Path, id: &Hash, opts: RestoreOptions) -> Result<usize> {
    let repo = Repo::open(root)?;
    restore(&repo, id, opts)
}

fn stage_blob(repo: &Repo, digest: &Hash, tmp: &Path) -> Result<()> {
    let file = File::create(tmp).with_path(tmp)?;
    let mut writer = BufWriter::new(file);
    read_blob_to(repo, digest, &mut writer)?;

    let file = writer
        .into_inner()
        .map_err(|e| Error::Io {
            path: tmp.to_path_buf(),
            source: e.into_error(),
        })?;
    file.sync_all().with_path(tmp)?;
    Ok(())
}

/// move a staged file over `dest`, keeping the permissions of any file it replaces
fn place_file(tmp: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).with_path(parent)?;
    }

    if let Ok(meta) = fs::symlink_metadata(dest) {
        if meta.is_file() {
            fs::set_permissions(tmp, meta.permissions()).with_path(tmp)?;
        }
    }

    fs::rename(tmp, dest).with_path(dest)?;
    tracing::trace!(path = %dest.display(), "restored file");
    Ok(())
}

/// scratch directory removed on drop, whatever the outcome
struct StagingDir {
    path: PathBuf,
}

impl StagingDir {
    fn create(repo: &Repo) -> Result<Self> {
        let path = repo
            .tmp_path()
            .join(format!("restore-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&path).with_path(&path)?;
        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove staging directory");
            }
        }
    }
}
