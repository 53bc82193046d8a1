use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::head::read_head;
use crate::object::read_commit;
use crate::repo::Repo;
use crate::types::Commit;

/// current HEAD commit id, None before the first commit
pub fn head(repo: &Repo) -> Result<Option<Hash>> {
    read_head(repo)
}

/// current HEAD commit
pub fn head_commit(repo: &Repo) -> Result<Option<Commit>> {
    match read_head(repo)? {
        Some(id) => read_commit(repo, &id).map(Some),
        None => Ok(None),
    }
}

/// walk back from HEAD along parent links, newest first
///
/// stops at the root commit or once `limit` commits were collected.
/// `None` is unlimited and `Some(0)` yields an empty list; a falsy `0` does
/// not mean "everything" here.
pub fn history(repo: &Repo, limit: Option<usize>) -> Result<Vec<Commit>> {
    match read_head(repo)? {
        Some(id) => history_from(repo, &id, limit),
        None => Ok(vec![]),
    }
}

/// walk back from an arbitrary commit
pub fn history_from(repo: &Repo, start: &Hash, limit: Option<usize>) -> Result<Vec<Commit>> {
    let mut commits = Vec::new();
    let mut visited = HashSet::new();
    let mut next = Some(*start);

    while let Some(id) = next {
        if limit.is_some_and(|max| commits.len() >= max) {
            break;
        }
        // only reachable by hand-editing commit files
        if !visited.insert(id) {
            return Err(Error::CorruptCommit {
                id: id.to_hex(),
                message: "parent chain loops back on itself".to_string(),
            });
        }

        let commit = read_commit(repo, &id)?;
        next = commit.parent;
        commits.push(commit);
    }

    Ok(commits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::head::write_head;
    use crate::object::{commit_path, write_commit};
    use crate::ops::commit::commit;
    use crate::types::FileMap;
    use std::fs;
    use tempfile::tempdir;

    fn test_repo() -> (tempfile::TempDir, Repo) {
        let dir = tempdir().unwrap();
        let repo = Repo::init(dir.path()).unwrap();
        (dir, repo)
    }

    #[test]
    fn test_history_empty_repo() {
        let (_dir, repo) = test_repo();
        assert!(history(&repo, None).unwrap().is_empty());
        assert_eq!(head(&repo).unwrap(), None);
        assert!(head_commit(&repo).unwrap().is_none());
    }

    #[test]
    fn test_history_is_linear_newest_first() {
        let (dir, repo) = test_repo();
        let file = dir.path().join("intro.txt");

        let mut made = Vec::new();
        for i in 0..4 {
            fs::write(&file, format!("v{}", i)).unwrap();
            made.push(commit(&repo, &format!("commit {}", i)).unwrap());
        }

        let entries = history(&repo, None).unwrap();

        assert_eq!(entries.len(), 4);
        let ids: Vec<_> = entries.iter().map(|c| c.id).collect();
        let expected: Vec<_> = made.iter().rev().map(|c| c.id).collect();
        assert_eq!(ids, expected);
        for pair in entries.windows(2) {
            assert_eq!(pair[0].parent, Some(pair[1].id));
        }
        assert!(entries.last().unwrap().is_root());
    }

    #[test]
    fn test_history_limit() {
        let (dir, repo) = test_repo();
        let file = dir.path().join("intro.txt");

        for i in 0..5 {
            fs::write(&file, format!("v{}", i)).unwrap();
            commit(&repo, &format!("commit {}", i)).unwrap();
        }

        let entries = history(&repo, Some(2)).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "commit 4");
        assert_eq!(entries[1].message, "commit 3");

        assert!(history(&repo, Some(0)).unwrap().is_empty());
        assert_eq!(history(&repo, Some(50)).unwrap().len(), 5);
    }

    #[test]
    fn test_history_missing_commit_is_not_found() {
        let (dir, repo) = test_repo();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        let c = commit(&repo, "only").unwrap();

        fs::remove_file(commit_path(&repo, &c.id)).unwrap();

        let result = history(&repo, None);
        assert!(matches!(result, Err(Error::CommitNotFound(_))));
    }

    #[test]
    fn test_history_detects_cycle() {
        let (_dir, repo) = test_repo();

        // a commit whose stored id names itself as parent; only possible by tampering
        let mut forged = crate::types::Commit::with_timestamp(None, "loop", 1.0, FileMap::new());
        forged.parent = Some(forged.id);
        write_commit(&repo, &forged).unwrap();
        write_head(&repo, &forged.id).unwrap();

        let result = history(&repo, None);
        assert!(matches!(result, Err(Error::CorruptCommit { .. })));
    }
}
