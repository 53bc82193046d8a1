pub mod blob;
pub mod commit;

pub use blob::{blob_exists, blob_path, list_blobs, read_blob, read_blob_to, write_blob, write_blob_file};
pub use commit::{commit_exists, commit_path, list_commits, read_commit, write_commit};
