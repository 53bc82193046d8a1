pub mod scan;

pub use scan::{clean_working_tree, scan_working_tree, validate_rel_path, ScannedFile};
