use crate::error::Result;
use crate::hash::Hash;
use crate::object::read_commit;
use crate::repo::Repo;
use crate::types::{ChangeKind, DiffEntry, FileMap};

/// compare two commits and return the paths whose content differs
pub fn diff(repo: &Repo, from: &Hash, to: &Hash) -> Result<Vec<DiffEntry>> {
    if from == to {
        return Ok(vec![]);
    }

    let old = read_commit(repo, from)?.files;
    let new = read_commit(repo, to)?.files;

    Ok(diff_file_maps(&old, &new))
}

/// compare two file maps, sorted by path
pub fn diff_file_maps(old: &FileMap, new: &FileMap) -> Vec<DiffEntry> {
    let mut changes = Vec::new();
    let mut old_iter = old.iter().peekable();
    let mut new_iter = new.iter().peekable();

    // both maps are ordered, so a merge walk visits each path once
    loop {
        let entry = match (old_iter.peek(), new_iter.peek()) {
            (None, None) => break,
            (Some((path, hash)), None) => {
                let entry = deleted(path, hash);
                old_iter.next();
                entry
            }
            (None, Some((path, hash))) => {
                let entry = added(path, hash);
                new_iter.next();
                entry
            }
            (Some((old_path, old_hash)), Some((new_path, new_hash))) => {
                match old_path.cmp(new_path) {
                    std::cmp::Ordering::Less => {
                        let entry = deleted(old_path, old_hash);
                        old_iter.next();
                        entry
                    }
                    std::cmp::Ordering::Greater => {
                        let entry = added(new_path, new_hash);
                        new_iter.next();
                        entry
                    }
                    std::cmp::Ordering::Equal => {
                        let entry = (old_hash != new_hash).then(|| DiffEntry {
                            path: old_path.to_string(),
                            kind: ChangeKind::Modified,
                            old: Some(**old_hash),
                            new: Some(**new_hash),
                        });
                        old_iter.next();
                        new_iter.next();
                        match entry {
                            Some(entry) => entry,
                            None => continue,
                        }
                    }
                }
            }
        };
        changes.push(entry);
    }

    changes
}

fn added(path: &str, hash: &Hash) -> DiffEntry {
    DiffEntry {
        path: path.to_string(),
        kind: ChangeKind::Added,
        old: None,
        new: Some(*hash),
    }
}

fn deleted(path: &str, hash: &Hash) -> DiffEntry {
    DiffEntry {
        path: path.to_string(),
        kind: ChangeKind::Deleted,
        old: Some(*hash),
        new: None,
    }
}
