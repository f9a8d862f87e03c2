//! Core types: source files, numbering options, renamed entries and progress events

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A readable file selected by the host
///
/// Handles are owned by the caller; the library only reads the name, the size and
/// the content. `read` may fail if the file was moved or deleted after selection.
#[async_trait]
pub trait SourceFile: Send + Sync {
    /// File name including extension (no directory components)
    fn name(&self) -> &str;

    /// Size in bytes
    fn size(&self) -> u64;

    /// Read the whole content
    async fn read(&self) -> std::io::Result<Vec<u8>>;
}

#[async_trait]
impl<T: SourceFile + ?Sized> SourceFile for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn size(&self) -> u64 {
        (**self).size()
    }

    async fn read(&self) -> std::io::Result<Vec<u8>> {
        (**self).read().await
    }
}

/// [`SourceFile`] backed by a path on the local filesystem
#[derive(Clone, Debug)]
pub struct DiskFile {
    path: PathBuf,
    name: String,
    size: u64,
}

impl DiskFile {
    /// Stat `path` and build a handle for it
    ///
    /// The name is the final path component; the size is taken from metadata at
    /// selection time.
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let meta = tokio::fs::metadata(&path).await?;
        if !meta.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            path,
            name,
            size: meta.len(),
        })
    }

    /// Path this handle reads from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SourceFile for DiskFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    async fn read(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}

/// [`SourceFile`] holding its content in memory
#[derive(Clone, Debug)]
pub struct MemoryFile {
    name: String,
    data: Arc<[u8]>,
}

impl MemoryFile {
    /// Create an in-memory file
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: Arc::from(data.into()),
        }
    }
}

#[async_trait]
impl SourceFile for MemoryFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    async fn read(&self) -> std::io::Result<Vec<u8>> {
        Ok(self.data.to_vec())
    }
}

/// Numbering settings for a render call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberingOptions {
    /// First index as text; its length is the default zero-padding width ("0007" → 4)
    pub start_number: String,

    /// Increment between consecutive files (values below 1 are treated as 1)
    pub gap: u64,

    /// Append the original extension to the rendered name
    pub keep_extension: bool,
}

impl Default for NumberingOptions {
    fn default() -> Self {
        Self {
            start_number: "1".to_string(),
            gap: 1,
            keep_extension: true,
        }
    }
}

/// One renamed file, in input order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenamedEntry {
    /// Original file name
    pub original: String,
    /// Rendered name (preview name, before sanitization)
    pub renamed: String,
}

/// Progress notification
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Human-readable status line
    pub message: String,
    /// Overall progress (0.0 to 100.0)
    pub percent: f32,
}

impl ProgressEvent {
    /// Create an event, clamping `percent` into 0..=100
    pub fn new(message: impl Into<String>, percent: f32) -> Self {
        Self {
            message: message.into(),
            percent: percent.clamp(0.0, 100.0),
        }
    }
}

/// Receiver of progress notifications
///
/// Implemented for any `Fn(ProgressEvent) + Send + Sync` closure. Calls always come
/// from the task running the operation, never concurrently.
pub trait ProgressReporter: Send + Sync {
    /// Handle one progress event
    fn report(&self, event: ProgressEvent);
}

impl<F> ProgressReporter for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn report(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Summary of one produced archive
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveSummary {
    /// Archive file name (e.g. `renamed-files.zip`)
    pub file_name: String,
    /// Number of entries written
    pub entries: usize,
    /// Sum of the input sizes packed into this archive
    pub input_bytes: u64,
    /// Size of the finished archive
    pub archive_bytes: u64,
    /// Where the sink stored it, if it stores to a path
    pub location: Option<PathBuf>,
}

/// Result of a completed archive run
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveReport {
    /// Archives in delivery order
    pub archives: Vec<ArchiveSummary>,
}

impl ArchiveReport {
    /// Total entries across all archives
    pub fn total_entries(&self) -> usize {
        self.archives.iter().map(|a| a.entries).sum()
    }
}

/// One file delivered on its own (without an archive)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedFile {
    /// Name the file was delivered under (sanitized and disambiguated)
    pub file_name: String,
    /// Size of the delivered content
    pub bytes: u64,
    /// Where the sink stored it, if it stores to a path
    pub location: Option<PathBuf>,
}
