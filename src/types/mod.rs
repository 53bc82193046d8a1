mod commit;
mod diff;

pub use commit::{compute_commit_id, now_timestamp, Commit, FileMap};
pub use diff::{ChangeKind, DiffEntry};
