//! high-level operations on paperrepo repositories

mod commit;
mod diff;
mod fsck;
mod history;
mod resolve;
mod restore;

pub use commit::{commit, commit_with_options, commit_working_tree, ensure_initial_snapshot, CommitOptions};
pub use diff::{diff, diff_file_maps};
pub use fsck::{fsck, BlobRef, CorruptCommit, FsckReport};
pub use history::{head, head_commit, history, history_from};
pub use resolve::{resolve_commit, MIN_PREFIX_LEN};
pub use restore::{restore, restore_working_tree, RestoreOptions};
