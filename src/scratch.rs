//! Scoped intermediate files

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::error::CleanupError;

/// Temporary directory plus a registry of the intermediates created in it.
///
/// Dropping a `ScratchSpace` without calling [`cleanup`](Self::cleanup)
/// still removes the directory on a best-effort basis.
#[derive(Debug)]
pub struct ScratchSpace {
    dir: TempDir,
    files: Vec<PathBuf>,
}

impl ScratchSpace {
    pub fn new() -> std::io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("filler-dub-").tempdir()?;
        debug!("Scratch space created at {}", dir.path().display());
        Ok(Self {
            dir,
            files: Vec::new(),
        })
    }

    /// Create the scratch directory under `parent`
    pub fn new_in(parent: impl AsRef<Path>) -> std::io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("filler-dub-")
            .tempdir_in(parent)?;
        Ok(Self {
            dir,
            files: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Register and return a path for the intermediate `name`
    pub fn file(&mut self, name: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        self.register(path.clone());
        path
    }

    /// Track an intermediate created elsewhere
    pub fn register(&mut self, path: PathBuf) {
        if !self.files.contains(&path) {
            self.files.push(path);
        }
    }

    pub fn registered(&self) -> &[PathBuf] {
        &self.files
    }

    /// Delete every registered file, then the directory.
    ///
    /// Files already gone are not failures. Every other failure is logged and
    /// returned; none is propagated.
    pub async fn cleanup(self) -> Vec<CleanupError> {
        let mut failures = Vec::new();
        let mut removed = 0;

        for path in &self.files {
            match tokio::fs::remove_file(path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!("Failed to remove intermediate {}: {}", path.display(), e);
                    failures.push(CleanupError {
                        path: path.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        let dir_path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            warn!("Failed to remove scratch directory {}: {}", dir_path.display(), e);
            failures.push(CleanupError {
                path: dir_path,
                message: e.to_string(),
            });
        }

        if removed > 0 {
            info!("🧹 Cleaned up {} intermediate files", removed);
        }

        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cleanup_removes_everything() {
        let mut scratch = ScratchSpace::new().unwrap();
        let audio = scratch.file("extracted_audio.wav");
        tokio::fs::write(&audio, b"RIFF").await.unwrap();
        let dir = scratch.path().to_path_buf();

        let failures = scratch.cleanup().await;

        assert!(failures.is_empty());
        assert!(!audio.exists());
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_missing_files_are_not_failures() {
        let mut scratch = ScratchSpace::new().unwrap();
        scratch.file("never_written.wav");

        assert!(scratch.cleanup().await.is_empty());
    }

    #[tokio::test]
    async fn test_failures_are_collected() {
        let mut scratch = ScratchSpace::new().unwrap();
        // A directory cannot be removed as a file
        let bogus = scratch.file("not_a_file");
        tokio::fs::create_dir(&bogus).await.unwrap();
        let dir = scratch.path().to_path_buf();

        let failures = scratch.cleanup().await;

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].path, bogus);
        assert!(!dir.exists());
    }

    #[test]
    fn test_drop_removes_directory() {
        let mut scratch = ScratchSpace::new().unwrap();
        let file = scratch.file("speech.wav");
        std::fs::write(&file, b"data").unwrap();
        let dir = scratch.path().to_path_buf();

        drop(scratch);
        assert!(!dir.exists());
    }

    #[test]
    fn test_register_is_deduplicated() {
        let mut scratch = ScratchSpace::new().unwrap();
        let a = scratch.file("a.wav");
        scratch.register(a.clone());
        assert_eq!(scratch.registered(), &[a]);
    }
}
