//! paperrepo - linear snapshot store for paper working trees
//!
//! a content-addressed snapshot history for a single directory, meant to sit
//! inside a paper's working folder and record its state before and after each
//! edit.
//!
//! # Core concepts
//!
//! - **Blob**: file content, zstd-compressed, addressed by the SHA-256 of the
//!   uncompressed bytes
//! - **Commit**: a JSON record of parent, message, timestamp and the
//!   path → blob map of every tracked file
//! - **HEAD**: the id of the latest commit; history is a single parent chain
//!
//! # On-disk layout
//!
//! ```text
//! <root>/.paperrepo/
//!     objects/<hh>/<62 hex>     compressed blobs
//!     commits/<64 hex>.json     commits
//!     HEAD                      current commit id, empty before the first commit
//!     config.toml               optional settings
//! ```
//!
//! # Example usage
//!
//! ```no_run
//! use paperrepo::{ops, Repo};
//! use std::path::Path;
//!
//! // initialize a repository inside a paper folder
//! let repo = Repo::init(Path::new("/path/to/paper")).unwrap();
//!
//! // snapshot the working tree
//! let commit = ops::commit(&repo, "before supervisor review").unwrap();
//!
//! // put it back later
//! ops::restore(&repo, &commit.id, ops::RestoreOptions { clean: true }).unwrap();
//! ```

mod config;
mod error;
mod hash;
mod head;
mod ignore;
mod object;
mod repo;

pub mod fs;
pub mod ops;
pub mod types;

pub use config::{Config, IgnoreConfig, StoreConfig, DEFAULT_COMPRESSION_LEVEL};
pub use error::{Error, Result};
pub use hash::{compute_hash, ContentHasher, Hash};
pub use head::{clear_head, read_head, write_head};
pub use ignore::{IgnoreSet, DEFAULT_IGNORES, REPO_DIR_NAME};
pub use object::{
    blob_exists, blob_path, commit_exists, commit_path, list_blobs, list_commits, read_blob,
    read_blob_to, read_commit, write_blob, write_blob_file, write_commit,
};
pub use repo::{Repo, RepoLock};
pub use types::{ChangeKind, Commit, DiffEntry, FileMap};
