//! Listing the files under a source root.
//!
//! Classification is a pure function over whatever a [`FileListing`] returns, the real
//! filesystem is only one implementation.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

/// Enumerates files under a root directory.
pub trait FileListing: Send + Sync {
    /// Every file below `root`, recursively, whose extension is one of `extensions`.
    ///
    /// Extensions are compared without their leading dot and ignoring case. The returned paths
    /// are sorted. A root that doesn't exist lists as empty.
    fn list(&self, root: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>, io::Error>;
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };
    extensions
        .iter()
        .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(ext))
}

/// A [`FileListing`] backed by the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskListing;

impl FileListing for DiskListing {
    fn list(&self, root: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>, io::Error> {
        let mut files = Vec::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(err) if err.kind() == io::ErrorKind::NotFound && dir == root => {
                    tracing::warn!(?root, "source root does not exist");
                    return Ok(Vec::new());
                }
                Err(err) => return Err(err),
            };

            for entry in entries {
                let entry = entry?;
                let file_type = entry.file_type()?;
                let path = entry.path();
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() && has_extension(&path, extensions) {
                    files.push(path);
                }
            }
        }

        files.sort();
        Ok(files)
    }
}

/// A [`FileListing`] over a fixed set of paths.
#[derive(Debug, Default, Clone)]
pub struct MemoryListing {
    files: BTreeSet<PathBuf>,
}

impl MemoryListing {
    pub fn new<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        MemoryListing {
            files: files.into_iter().map(Into::into).collect(),
        }
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>) {
        self.files.insert(path.into());
    }
}

impl FileListing for MemoryListing {
    fn list(&self, root: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>, io::Error> {
        Ok(self
            .files
            .iter()
            .filter(|path| path.starts_with(root) && has_extension(path, extensions))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoketest_memory_listing() {
        let listing = MemoryListing::new([
            "/ws/Code/Client/NetImgui_Api.h",
            "/ws/Code/Client/Private/NetImgui_Client.CPP",
            "/ws/Code/Client/readme.md",
            "/ws/Code/ClientOther/a.cpp",
        ]);
        let files = listing
            .list(Path::new("/ws/Code/Client"), &[".h", "cpp"])
            .unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("/ws/Code/Client/NetImgui_Api.h"),
                PathBuf::from("/ws/Code/Client/Private/NetImgui_Client.CPP"),
            ]
        );
    }

    #[test]
    fn smoketest_disk_listing() {
        let temp = tempfile::TempDir::new().unwrap();
        let root = temp.path().join("Sample");
        std::fs::create_dir_all(root.join("Shaders")).unwrap();
        std::fs::write(root.join("main.cpp"), b"").unwrap();
        std::fs::write(root.join("notes.txt"), b"").unwrap();
        std::fs::write(root.join("Shaders/BlitVS.hlsl"), b"").unwrap();

        let files = DiskListing.list(&root, &["cpp", "hlsl"]).unwrap();
        assert_eq!(
            files,
            vec![root.join("Shaders/BlitVS.hlsl"), root.join("main.cpp")]
        );

        let missing = DiskListing
            .list(&temp.path().join("missing"), &["cpp"])
            .unwrap();
        assert!(missing.is_empty());
    }
}
