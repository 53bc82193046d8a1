use std::path::Path;

use crate::error::Result;
use crate::fs::scan_working_tree;
use crate::head::{read_head, write_head};
use crate::object::{write_blob_file, write_commit};
use crate::repo::Repo;
use crate::types::{Commit, FileMap};

/// commit options
#[derive(Clone, Debug, Default)]
pub struct CommitOptions {
    /// ignore patterns added to the repository's set for this commit only
    pub extra_ignores: Vec<String>,
}

/// snapshot the working tree and advance HEAD
///
/// every call creates a new commit, even if nothing changed.
pub fn commit(repo: &Repo, message: &str) -> Result<Commit> {
    commit_with_options(repo, message, &CommitOptions::default())
}

/// snapshot the working tree with per-call options
pub fn commit_with_options(repo: &Repo, message: &str, opts: &CommitOptions) -> Result<Commit> {
    // recreate any part of the layout that went missing since open
    repo.ensure_layout()?;
    let _lock = repo.lock()?;

    let parent = read_head(repo)?;
    let ignores = repo.ignore_set()?.with(&opts.extra_ignores)?;

    // blobs are always written before the commit that references them
    let mut files = FileMap::new();
    for file in scan_working_tree(repo.root(), &ignores)? {
        let digest = write_blob_file(repo, &file.path)?;
        files.insert(file.rel_path, digest);
    }

    let commit = Commit::new(parent, message, files);
    write_commit(repo, &commit)?;
    write_head(repo, &commit.id)?;

    tracing::info!(
        id = %commit.id,
        parent = ?commit.parent,
        files = commit.files.len(),
        "committed working tree"
    );
    Ok(commit)
}

/// commit `root`, initializing the repository first if needed
pub fn commit_working_tree(root: &Path, message: &str, opts: &CommitOptions) -> Result<Commit> {
    let repo = Repo::open_or_init(root)?;
    commit_with_options(&repo, message, opts)
}

/// make sure `root` is a repository with at least one commit
///
/// returns the commit made, or None if HEAD already named one.
pub fn ensure_initial_snapshot(root: &Path, message: &str) -> Result<Option<Commit>> {
    let repo = Repo::open_or_init(root)?;
    if read_head(&repo)?.is_some() {
        return Ok(None);
    }
    commit(&repo, message).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::compute_hash;
    use crate::object::{blob_exists, read_blob, read_commit};
    use std::fs;
    use tempfile::tempdir;

    fn test_repo() -> (tempfile::TempDir, Repo) {
        let dir = tempdir().unwrap();
        let repo = Repo::init(dir.path()).unwrap();
        (dir, repo)
    }

    #[test]
    fn test_commit_single_file() {
        let (dir, repo) = test_repo();
        fs::write(dir.path().join("intro.txt"), "hello v1").unwrap();

        let c = commit(&repo, "initial").unwrap();

        assert!(c.is_root());
        assert_eq!(c.message, "initial");
        assert_eq!(c.files.len(), 1);
        assert_eq!(c.files["intro.txt"], compute_hash(b"hello v1"));
        assert_eq!(read_head(&repo).unwrap(), Some(c.id));
        assert_eq!(read_commit(&repo, &c.id).unwrap(), c);
    }

    #[test]
    fn test_commit_nested_and_ignored() {
        let (dir, repo) = test_repo();
        let root = dir.path();
        fs::create_dir_all(root.join("data")).unwrap();
        fs::create_dir_all(root.join("submissions/1")).unwrap();
        fs::write(root.join("data/table.csv"), "col1,col2\n1,2\n").unwrap();
        fs::write(root.join("submissions/1/main.tex"), "sent").unwrap();

        let c = commit(&repo, "nested").unwrap();

        assert_eq!(c.files.keys().collect::<Vec<_>>(), vec!["data/table.csv"]);
    }

    #[test]
    fn test_commit_extra_ignores() {
        let (dir, repo) = test_repo();
        fs::write(dir.path().join("main.tex"), "x").unwrap();
        fs::write(dir.path().join("main.log"), "noise").unwrap();

        let opts = CommitOptions {
            extra_ignores: vec!["*.log".to_string()],
        };
        let c = commit_with_options(&repo, "no logs", &opts).unwrap();

        assert!(c.files.contains_key("main.tex"));
        assert!(!c.files.contains_key("main.log"));
    }

    #[test]
    fn test_commit_updates_parent() {
        let (dir, repo) = test_repo();
        let file = dir.path().join("intro.txt");

        fs::write(&file, "v1").unwrap();
        let c1 = commit(&repo, "v1").unwrap();

        fs::write(&file, "v2").unwrap();
        let c2 = commit(&repo, "v2").unwrap();

        assert_eq!(c2.parent, Some(c1.id));
        assert_eq!(read_head(&repo).unwrap(), Some(c2.id));
    }

    #[test]
    fn test_unchanged_tree_still_advances_head() {
        let (dir, repo) = test_repo();
        fs::write(dir.path().join("intro.txt"), "same").unwrap();

        let c1 = commit(&repo, "first").unwrap();
        let c2 = commit(&repo, "second").unwrap();

        assert_ne!(c1.id, c2.id);
        assert_eq!(c1.files, c2.files);
        assert_eq!(read_head(&repo).unwrap(), Some(c2.id));
    }

    #[test]
    fn test_commit_blobs_resolve() {
        let (dir, repo) = test_repo();
        fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        fs::write(dir.path().join("b.txt"), "alpha").unwrap();

        let c = commit(&repo, "dedup").unwrap();

        // identical content shares one blob
        assert_eq!(c.files["a.txt"], c.files["b.txt"]);
        for digest in c.files.values() {
            assert!(blob_exists(&repo, digest));
            assert_eq!(read_blob(&repo, digest).unwrap(), b"alpha");
        }
    }

    #[test]
    fn test_commit_empty_tree() {
        let (_dir, repo) = test_repo();
        let c = commit(&repo, "empty").unwrap();
        assert!(c.files.is_empty());
    }

    #[test]
    fn test_commit_working_tree_auto_inits() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("intro.txt"), "hello").unwrap();

        let c = commit_working_tree(dir.path(), "auto", &CommitOptions::default()).unwrap();

        assert!(Repo::is_repo(dir.path()));
        assert_eq!(c.files.len(), 1);
    }

    #[test]
    fn test_commit_fails_while_locked() {
        let (_dir, repo) = test_repo();
        let _held = repo.lock().unwrap();

        let result = commit(&repo, "blocked");
        assert!(matches!(result, Err(crate::Error::LockContention)));
        assert_eq!(read_head(&repo).unwrap(), None);
    }

    #[test]
    fn test_ensure_initial_snapshot() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("paper.yaml"), "{}").unwrap();

        let first = ensure_initial_snapshot(dir.path(), "Initial snapshot (auto)").unwrap();
        assert!(first.is_some());

        let second = ensure_initial_snapshot(dir.path(), "Initial snapshot (auto)").unwrap();
        assert!(second.is_none());
    }
}
