use std::path::PathBuf;

use crate::Hash;

/// error type for paperrepo operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not a repository: {0} (no .paperrepo directory)")]
    NotARepository(PathBuf),

    #[error("blob not found: {0}")]
    ObjectNotFound(Hash),

    #[error("commit not found: {0}")]
    CommitNotFound(Hash),

    #[error("no commit matches '{0}'")]
    UnknownRevision(String),

    #[error("ambiguous commit prefix '{0}'")]
    AmbiguousCommit(String),

    #[error("corrupt blob: {0} does not match its content")]
    CorruptObject(Hash),

    #[error("corrupt commit {id}: {message}")]
    CorruptCommit { id: String, message: String },

    #[error("corrupt HEAD: {0}")]
    CorruptHead(String),

    #[error("invalid path in working tree: {0}")]
    InvalidPath(String),

    #[error("file changed while being stored: {0}")]
    SourceChanged(PathBuf),

    #[error("lock contention on repository")]
    LockContention,

    #[error("invalid ignore pattern '{pattern}': {message}")]
    InvalidIgnorePattern { pattern: String, message: String },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("config serialization error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("invalid hash hex: {0}")]
    InvalidHashHex(String),
}

impl Error {
    /// true for a missing blob or commit
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ObjectNotFound(_) | Error::CommitNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// helper to wrap io errors with path context
pub trait IoResultExt<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| Error::Io {
            path: path.into(),
            source,
        })
    }
}
