//! Scratch directories and source files for integration tests

use batch_rename::{Config, DiskFile};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Scratch layout: an input directory with source files and an output directory
pub struct Workspace {
    /// Keeps the directories alive for the duration of the test
    pub root: TempDir,
    /// Where source files are created
    pub input: PathBuf,
    /// Where outputs are delivered
    pub output: PathBuf,
}

impl Workspace {
    /// Create an empty workspace
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("failed to create temp dir");
        let input = root.path().join("input");
        let output = root.path().join("output");
        std::fs::create_dir_all(&input).expect("failed to create input dir");
        Self {
            root,
            input,
            output,
        }
    }

    /// Write `size` bytes of `fill` to `input/name` and open it as a source file
    pub async fn file(&self, name: &str, size: usize, fill: u8) -> DiskFile {
        let path = self.input.join(name);
        tokio::fs::write(&path, vec![fill; size])
            .await
            .expect("failed to write source file");
        DiskFile::open(&path).await.expect("failed to open source file")
    }

    /// Path inside the output directory
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.output.join(name)
    }

    /// Root of the scratch area
    pub fn root(&self) -> &Path {
        self.root.path()
    }
}

/// Config delivering into `output` with no pacing delays
pub fn fast_config(output: &Path) -> Config {
    let mut config = Config::default();
    config.output.output_dir = output.to_path_buf();
    config.archive.inter_batch_delay = Duration::ZERO;
    config.output.individual_delay = Duration::ZERO;
    config
}
