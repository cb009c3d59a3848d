//! Root directories that generated paths are anchored to.

use std::path::{Path, PathBuf};

/// Anchors every path a generation pass produces.
///
/// Passed explicitly to whatever needs to turn a relative path into an absolute one, nothing
/// ever consults the process' current directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootPaths {
    /// Root of the workspace, where the workspace definition and sources live.
    root: PathBuf,
    /// Directory, relative to `root`, that generated artifacts are placed under.
    generated: PathBuf,
}

impl RootPaths {
    pub fn new(root: impl Into<PathBuf>, generated: impl Into<PathBuf>) -> Self {
        RootPaths {
            root: root.into(),
            generated: generated.into(),
        }
    }

    /// Root of the workspace.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute directory for generated artifacts.
    pub fn generated(&self) -> PathBuf {
        self.root.join(&self.generated)
    }

    /// Anchors `path` to the workspace root. Absolute paths are returned as-is.
    pub fn join(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    /// Returns `path` relative to the workspace root, if it lives under it.
    pub fn relative<'a>(&self, path: &'a Path) -> Option<&'a Path> {
        path.strip_prefix(&self.root).ok()
    }
}
