//! ignore policy shared by the working-tree scanner and clean restore

use glob::Pattern;

use crate::error::{Error, Result};

/// name of the repository metadata directory at the working-tree root
pub const REPO_DIR_NAME: &str = ".paperrepo";

/// names excluded from snapshots and from clean-delete by default
pub const DEFAULT_IGNORES: &[&str] = &[
    REPO_DIR_NAME,
    "submissions",
    "reviews",
    "events",
    "__pycache__",
    ".DS_Store",
];

/// a set of path-component patterns
///
/// a path is ignored when any of its components matches one of the patterns.
/// plain names match literally; glob syntax (`*.aux`) is also accepted.
#[derive(Clone, Debug)]
pub struct IgnoreSet {
    patterns: Vec<Pattern>,
}

impl IgnoreSet {
    /// empty set (nothing ignored, not even the metadata directory)
    pub fn empty() -> Self {
        Self { patterns: vec![] }
    }

    /// add one pattern
    pub fn add(&mut self, pattern: &str) -> Result<()> {
        let compiled = Pattern::new(pattern).map_err(|e| Error::InvalidIgnorePattern {
            pattern: pattern.to_string(),
            message: e.msg.to_string(),
        })?;
        if !self.patterns.iter().any(|p| p.as_str() == pattern) {
            self.patterns.push(compiled);
        }
        Ok(())
    }

    /// builder-style union with further patterns
    pub fn with<I, S>(mut self, patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for pattern in patterns {
            self.add(pattern.as_ref())?;
        }
        Ok(self)
    }

    /// does a single file or directory name match
    pub fn matches_name(&self, name: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(name))
    }

    /// does any component of a `/`-separated relative path match
    pub fn is_ignored(&self, rel_path: &str) -> bool {
        rel_path
            .split('/')
            .filter(|c| !c.is_empty())
            .any(|c| self.matches_name(c))
    }

    /// pattern strings, in insertion order
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|p| p.as_str())
    }
}

impl Default for IgnoreSet {
    fn default() -> Self {
        let patterns = DEFAULT_IGNORES
            .iter()
            .map(|name| Pattern::new(&Pattern::escape(name)))
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap_or_default();
        Self { patterns }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ignores() {
        let set = IgnoreSet::default();
        for name in DEFAULT_IGNORES {
            assert!(set.matches_name(name), "{name} should be ignored");
        }
        assert!(!set.matches_name("intro.tex"));
    }

    #[test]
    fn test_component_matching() {
        let set = IgnoreSet::default();
        assert!(set.is_ignored(".paperrepo/HEAD"));
        assert!(set.is_ignored("submissions/20240101/payload/main.tex"));
        assert!(set.is_ignored("figures/.DS_Store"));
        assert!(set.is_ignored("code/__pycache__/mod.pyc"));
        assert!(!set.is_ignored("figures/plot.png"));
        // only whole components match
        assert!(!set.is_ignored("my_submissions/file.txt"));
    }

    #[test]
    fn test_glob_patterns() {
        let set = IgnoreSet::default().with(["*.aux", "build"]).unwrap();
        assert!(set.is_ignored("main.aux"));
        assert!(set.is_ignored("chapters/ch1.aux"));
        assert!(set.is_ignored("build/main.pdf"));
        assert!(!set.is_ignored("main.tex"));
    }

    #[test]
    fn test_duplicate_patterns_collapse() {
        let set = IgnoreSet::default().with(["events", "build", "build"]).unwrap();
        assert_eq!(set.patterns().count(), DEFAULT_IGNORES.len() + 1);
    }

    #[test]
    fn test_invalid_pattern() {
        let result = IgnoreSet::empty().with(["[unclosed"]);
        assert!(matches!(result, Err(Error::InvalidIgnorePattern { .. })));
    }

    #[test]
    fn test_empty_set() {
        let set = IgnoreSet::empty();
        assert!(!set.is_ignored(".paperrepo/HEAD"));
    }
}
