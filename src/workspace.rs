//! Temporary sort workspace.

use std::io;
use std::path::{Path, PathBuf};

use log;
use tempfile;

const WORKSPACE_PREFIX: &str = "ext_merge_sort";

/// Private temporary directory holding run files of a single sort invocation.
///
/// Runs are named after their slot number (`<slot>.txt`), merge outputs after the pair of slots being
/// merged (`<left>_<right>.txt`). The directory is removed when the workspace is dropped unless it was
/// detached with [`TempWorkspace::persist`].
pub struct TempWorkspace {
    dir: tempfile::TempDir,
}

impl TempWorkspace {
    /// Creates a uniquely named workspace directory.
    ///
    /// # Arguments
    /// * `parent` - Directory the workspace is created in. If the parameter is [`None`] default OS temporary
    ///   directory will be used.
    pub fn create(parent: Option<&Path>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);

        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        }?;

        log::info!("using {} as a temporary directory", dir.path().display());

        return Ok(TempWorkspace { dir });
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of the run stored in `slot`.
    pub fn chunk_path(&self, slot: usize) -> PathBuf {
        self.path().join(format!("{}.txt", slot))
    }

    /// Path of the in-progress merge output of runs `left` and `right`.
    pub fn pair_path(&self, left: usize, right: usize) -> PathBuf {
        self.path().join(format!("{}_{}.txt", left, right))
    }

    /// Detaches the directory from the workspace so it outlives it. Returns the directory path.
    #[allow(deprecated)]
    pub fn persist(self) -> PathBuf {
        self.dir.into_path()
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use rstest::*;

    use super::TempWorkspace;

    #[fixture]
    fn parent_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    #[rstest]
    fn test_workspace_naming(parent_dir: tempfile::TempDir) {
        let workspace = TempWorkspace::create(Some(parent_dir.path())).unwrap();

        assert!(workspace.path().starts_with(parent_dir.path()));
        assert_eq!(workspace.chunk_path(0), workspace.path().join("0.txt"));
        assert_eq!(workspace.chunk_path(12), workspace.path().join("12.txt"));
        assert_eq!(workspace.pair_path(4, 6), workspace.path().join("4_6.txt"));
        assert_ne!(workspace.pair_path(1, 12), workspace.pair_path(11, 2));
    }

    #[rstest]
    fn test_workspaces_are_unique(parent_dir: tempfile::TempDir) {
        let first = TempWorkspace::create(Some(parent_dir.path())).unwrap();
        let second = TempWorkspace::create(Some(parent_dir.path())).unwrap();

        assert_ne!(first.path(), second.path());
    }

    #[rstest]
    fn test_workspace_removed_on_drop(parent_dir: tempfile::TempDir) {
        let workspace = TempWorkspace::create(Some(parent_dir.path())).unwrap();
        let path = workspace.path().to_path_buf();
        fs::write(workspace.chunk_path(0), b"a\n").unwrap();

        drop(workspace);
        assert!(!path.exists());
    }

    #[rstest]
    fn test_persisted_workspace_survives(parent_dir: tempfile::TempDir) {
        let workspace = TempWorkspace::create(Some(parent_dir.path())).unwrap();
        fs::write(workspace.chunk_path(3), b"a\n").unwrap();

        let path = workspace.persist();
        assert!(path.join("3.txt").exists());
    }

    #[test]
    fn test_missing_parent() {
        let parent_dir = tempfile::tempdir().unwrap();
        let missing = parent_dir.path().join("missing");

        assert!(TempWorkspace::create(Some(&missing)).is_err());
    }
}
