use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::head::read_head;
use crate::object::{commit_exists, list_commits};
use crate::repo::Repo;

/// shortest prefix accepted when resolving an abbreviated id
pub const MIN_PREFIX_LEN: usize = 4;

/// resolve `HEAD`, a full commit id, or a unique id prefix to a commit id
pub fn resolve_commit(repo: &Repo, rev: &str) -> Result<Hash> {
    let rev = rev.trim();

    if rev.eq_ignore_ascii_case("HEAD") {
        return read_head(repo)?.ok_or_else(|| Error::UnknownRevision(rev.to_string()));
    }

    // full id
    if rev.len() == 64 && rev.chars().all(|c| c.is_ascii_hexdigit()) {
        let id = Hash::from_hex(rev)?;
        if !commit_exists(repo, &id) {
            return Err(Error::CommitNotFound(id));
        }
        return Ok(id);
    }

    if rev.len() < MIN_PREFIX_LEN || !rev.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::UnknownRevision(rev.to_string()));
    }

    let prefix = rev.to_ascii_lowercase();
    let mut matches = list_commits(repo)?
        .into_iter()
        .filter(|id| id.to_hex().starts_with(&prefix));

    match (matches.next(), matches.next()) {
        (Some(id), None) => Ok(id),
        (Some(_), Some(_)) => Err(Error::AmbiguousCommit(rev.to_string())),
        (None, _) => Err(Error::UnknownRevision(rev.to_string())),
    }
}
