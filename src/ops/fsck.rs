use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::head::read_head;
use crate::object::{commit_exists, list_blobs, list_commits, read_blob_to, read_commit};
use crate::repo::Repo;

/// fsck report
#[derive(Debug, Default)]
pub struct FsckReport {
    /// commit files examined
    pub commits_checked: usize,
    /// distinct blobs read back and verified
    pub blobs_checked: usize,
    /// commits that fail to parse or whose id doesn't match their content
    pub corrupt_commits: Vec<CorruptCommit>,
    /// blobs referenced by a commit but absent from the store
    pub missing_blobs: Vec<BlobRef>,
    /// blobs whose content no longer hashes to their digest
    pub corrupt_blobs: Vec<BlobRef>,
    /// commits naming a parent that isn't on disk
    pub missing_parents: Vec<(Hash, Hash)>,
    /// blobs no commit references
    pub dangling_blobs: Vec<Hash>,
    /// HEAD is unreadable or names a missing commit
    pub head_problem: Option<String>,
}

impl FsckReport {
    pub fn is_ok(&self) -> bool {
        self.corrupt_commits.is_empty()
            && self.missing_blobs.is_empty()
            && self.corrupt_blobs.is_empty()
            && self.missing_parents.is_empty()
            && self.head_problem.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct CorruptCommit {
    pub id: Hash,
    pub message: String,
}

/// a blob as referenced from one commit entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRef {
    pub hash: Hash,
    pub commit: Hash,
    pub path: String,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum BlobState {
    Ok,
    Missing,
    Corrupt,
}

/// verify repository integrity
///
/// every commit on disk is checked, not only those reachable from HEAD.
/// unreferenced blobs are reported but don't make the repository unhealthy.
pub fn fsck(repo: &Repo) -> Result<FsckReport> {
    let mut report = FsckReport::default();
    let mut blob_states: HashMap<Hash, BlobState> = HashMap::new();
    let mut referenced = HashSet::new();

    let commit_ids = list_commits(repo)?;
    let known: HashSet<Hash> = commit_ids.iter().copied().collect();

    for id in &commit_ids {
        report.commits_checked += 1;

        let commit = match read_commit(repo, id) {
            Ok(commit) => commit,
            Err(Error::CorruptCommit { message, .. }) => {
                report.corrupt_commits.push(CorruptCommit { id: *id, message });
                continue;
            }
            Err(e) => return Err(e),
        };

        if !commit.verify_id() {
            report.corrupt_commits.push(CorruptCommit {
                id: *id,
                message: "id does not match commit content".to_string(),
            });
        }

        if let Some(parent) = commit.parent {
            if !known.contains(&parent) {
                report.missing_parents.push((*id, parent));
            }
        }

        for (path, hash) in &commit.files {
            referenced.insert(*hash);

            let state = match blob_states.get(hash) {
                Some(state) => *state,
                None => {
                    let state = check_blob(repo, hash)?;
                    if state != BlobState::Missing {
                        report.blobs_checked += 1;
                    }
                    blob_states.insert(*hash, state);
                    state
                }
            };

            let blob_ref = || BlobRef {
                hash: *hash,
                commit: *id,
                path: path.clone(),
            };
            match state {
                BlobState::Ok => {}
                BlobState::Missing => report.missing_blobs.push(blob_ref()),
                BlobState::Corrupt => report.corrupt_blobs.push(blob_ref()),
            }
        }
    }

    match read_head(repo) {
        Ok(Some(id)) if !commit_exists(repo, &id) => {
            report.head_problem = Some(format!("HEAD names missing commit {}", id));
        }
        Ok(_) => {}
        Err(Error::CorruptHead(content)) => {
            report.head_problem = Some(format!("HEAD is not a commit id: {:?}", content));
        }
        Err(e) => return Err(e),
    }

    report.dangling_blobs = list_blobs(repo)?
        .into_iter()
        .filter(|hash| !referenced.contains(hash))
        .collect();

    tracing::debug!(
        commits = report.commits_checked,
        blobs = report.blobs_checked,
        ok = report.is_ok(),
        "fsck finished"
    );
    Ok(report)
}

fn check_blob(repo: &Repo, hash: &Hash) -> Result<BlobState> {
    match read_blob_to(repo, hash, &mut std::io::sink()) {
        Ok(_) => Ok(BlobState::Ok),
        Err(Error::ObjectNotFound(_)) => Ok(BlobState::Missing),
        Err(Error::CorruptObject(_)) => Ok(BlobState::Corrupt),
        Err(e) => Err(e),
    }
}
