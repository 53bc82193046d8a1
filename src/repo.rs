use std::fs::{self, File};
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};

use crate::config::Config;
use crate::error::{Error, IoResultExt, Result};
use crate::ignore::{IgnoreSet, REPO_DIR_NAME};

/// a snapshot repository rooted at a working tree
///
/// all metadata lives in `<root>/.paperrepo`:
/// `objects/` (blobs), `commits/` (one json file per commit) and `HEAD`.
#[derive(Debug)]
pub struct Repo {
    root: PathBuf,
    path: PathBuf,
    config: Config,
}

impl Repo {
    /// is `root` a tracked working tree
    pub fn is_repo(root: &Path) -> bool {
        root.join(REPO_DIR_NAME).is_dir()
    }

    /// initialize the metadata layout under `root`
    ///
    /// idempotent: existing objects, commits and a non-empty HEAD are left alone.
    pub fn init(root: &Path) -> Result<Self> {
        let repo = Self {
            root: root.to_path_buf(),
            path: root.join(REPO_DIR_NAME),
            config: Config::default(),
        };
        repo.ensure_layout()?;

        let config = Config::load_or_default(&repo.config_path())?;
        tracing::debug!(root = %root.display(), "initialized repository");
        Ok(Self { config, ..repo })
    }

    /// open an existing repository
    pub fn open(root: &Path) -> Result<Self> {
        if !Self::is_repo(root) {
            return Err(Error::NotARepository(root.to_path_buf()));
        }

        let path = root.join(REPO_DIR_NAME);
        let config = Config::load_or_default(&path.join("config.toml"))?;

        Ok(Self {
            root: root.to_path_buf(),
            path,
            config,
        })
    }

    /// open, initializing first if `root` is not yet a repository
    pub fn open_or_init(root: &Path) -> Result<Self> {
        if Self::is_repo(root) {
            Self::open(root)
        } else {
            Self::init(root)
        }
    }

    /// create any missing part of the layout
    pub(crate) fn ensure_layout(&self) -> Result<()> {
        fs::create_dir_all(self.objects_path()).with_path(self.objects_path())?;
        fs::create_dir_all(self.commits_path()).with_path(self.commits_path())?;

        let head = self.head_path();
        if !head.exists() {
            // empty HEAD means no commits yet
            fs::write(&head, b"").with_path(&head)?;
        }
        Ok(())
    }

    /// working-tree root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// metadata directory (`<root>/.paperrepo`)
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// repository configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// mutable access to configuration
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// save configuration changes
    pub fn save_config(&self) -> Result<()> {
        self.config.save(&self.config_path())
    }

    /// default ignores plus the configured extras
    pub fn ignore_set(&self) -> Result<IgnoreSet> {
        IgnoreSet::default().with(&self.config.ignore.extra)
    }

    /// path to config.toml
    pub fn config_path(&self) -> PathBuf {
        self.path.join("config.toml")
    }

    /// path to objects directory
    pub fn objects_path(&self) -> PathBuf {
        self.path.join("objects")
    }

    /// path to commits directory
    pub fn commits_path(&self) -> PathBuf {
        self.path.join("commits")
    }

    /// path to HEAD file
    pub fn head_path(&self) -> PathBuf {
        self.path.join("HEAD")
    }

    /// path to tmp directory (restore staging)
    pub fn tmp_path(&self) -> PathBuf {
        self.path.join("tmp")
    }

    /// path to lock file
    pub fn lock_path(&self) -> PathBuf {
        self.path.join("lock")
    }

    /// acquire exclusive lock on repository
    /// returns a guard that releases the lock on drop
    pub fn lock(&self) -> Result<RepoLock> {
        self.try_lock()?.ok_or(Error::LockContention)
    }

    /// try to acquire exclusive lock, returning None if already locked
    pub fn try_lock(&self) -> Result<Option<RepoLock>> {
        let lock_path = self.lock_path();
        let file = File::create(&lock_path).with_path(&lock_path)?;

        match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(flock) => Ok(Some(RepoLock { flock })),
            Err((_, errno)) => match flock_error(lock_path, errno) {
                Error::LockContention => Ok(None),
                e => Err(e),
            },
        }
    }
}

/// only a held lock is contention; any other errno is an io error
fn flock_error(lock_path: PathBuf, errno: Errno) -> Error {
    if errno == Errno::EWOULDBLOCK {
        Error::LockContention
    } else {
        Error::Io {
            path: lock_path,
            source: errno.into(),
        }
    }
}

/// guard that holds repository lock until dropped
pub struct RepoLock {
    #[allow(dead_code)]
    flock: Flock<File>,
}
// lock is released automatically when Flock is dropped
