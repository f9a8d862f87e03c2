//! Delivery of finished archives and files.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Maximum number of suffixes tried for a free target name
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Destination for finished outputs (the "save as download" step)
///
/// `deliver` is called once per archive (or per file when saving individually),
/// strictly one after another, in input order.
#[async_trait]
pub trait ArchiveSink: Send + Sync {
    /// Hand over `data` under `file_name`
    ///
    /// Returns where the output ended up, when the sink stores to a path.
    async fn deliver(&self, file_name: &str, data: Vec<u8>) -> std::io::Result<Option<PathBuf>>;
}

/// [`ArchiveSink`] saving outputs into a directory
///
/// Each output is first written to a `.part` file next to its target and then
/// renamed into place, so a partially written output never carries the final
/// name. Existing files are never overwritten: `name.zip` becomes
/// `name (1).zip`, `name (2).zip`, and so on.
#[derive(Clone, Debug)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Create a sink writing into `dir` (created on first delivery)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn free_target(&self, file_name: &str) -> std::io::Result<PathBuf> {
        let candidate = self.dir.join(file_name);
        if !tokio::fs::try_exists(&candidate).await? {
            return Ok(candidate);
        }

        let (stem, extension) = crate::renamer::split_extension(file_name);
        for i in 1..=MAX_RENAME_ATTEMPTS {
            let name = if extension.is_empty() {
                format!("{} ({})", stem, i)
            } else {
                format!("{} ({}).{}", stem, i, extension)
            };
            let path = self.dir.join(name);
            if !tokio::fs::try_exists(&path).await? {
                return Ok(path);
            }
        }

        Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!(
                "could not find a free name for {} after {} attempts",
                file_name, MAX_RENAME_ATTEMPTS
            ),
        ))
    }
}

#[async_trait]
impl ArchiveSink for DirectorySink {
    async fn deliver(&self, file_name: &str, data: Vec<u8>) -> std::io::Result<Option<PathBuf>> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let target = self.free_target(file_name).await?;
        let (partial, mut file) = create_partial(&target).await?;

        debug!(target = ?target, partial = ?partial, bytes = data.len(), "writing output");
        let written = async {
            file.write_all(&data).await?;
            file.sync_all().await
        }
        .await;
        drop(file);
        drop(data);

        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }

        if let Err(e) = tokio::fs::rename(&partial, &target).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }

        info!(path = ?target, "output saved");
        Ok(Some(target))
    }
}

/// Create a fresh temporary file next to `target`
///
/// Tries `name.part`, then `name.1.part`, `name.2.part`, and so on. The file is
/// opened with `create_new`, so an existing file is never truncated.
async fn create_partial(target: &Path) -> std::io::Result<(PathBuf, tokio::fs::File)> {
    let base = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    for i in 0..=MAX_RENAME_ATTEMPTS {
        let name = if i == 0 {
            format!("{}.part", base)
        } else {
            format!("{}.{}.part", base, i)
        };
        let partial = target.with_file_name(name);
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&partial)
            .await
        {
            Ok(file) => return Ok((partial, file)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AlreadyExists,
        format!(
            "could not find a free temporary name for {} after {} attempts",
            target.display(),
            MAX_RENAME_ATTEMPTS
        ),
    ))
}
