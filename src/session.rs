//! High-level entry point bundling configuration and a delivery sink

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::archive::{ArchiveRequest, ArchiveSink, DirectorySink, archive_files, save_individually};
use crate::config::Config;
use crate::error::Result;
use crate::renamer::render;
use crate::types::{
    ArchiveReport, NumberingOptions, ProgressReporter, RenamedEntry, SavedFile, SourceFile,
};

/// A configured renaming session
///
/// Holds a validated [`Config`] and the sink outputs are delivered to. By default
/// outputs are written into `output.output_dir` through a [`DirectorySink`].
///
/// # Example
///
/// ```no_run
/// use batch_rename::{Config, DiskFile, NumberingOptions, RenameSession};
/// use tokio_util::sync::CancellationToken;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let session = RenameSession::new(Config::default())?;
///     let files = vec![
///         DiskFile::open("IMG_1.png").await?,
///         DiskFile::open("IMG_2.png").await?,
///     ];
///
///     let entries = session.preview(&files, "photo_{index}", &NumberingOptions::default());
///     let report = session
///         .download_archives(&files, &entries, None, CancellationToken::new())
///         .await?;
///     println!("wrote {} archive(s)", report.archives.len());
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct RenameSession {
    config: Arc<Config>,
    sink: Arc<dyn ArchiveSink>,
}

impl RenameSession {
    /// Create a session delivering into `config.output.output_dir`
    pub fn new(config: Config) -> Result<Self> {
        let sink = Arc::new(DirectorySink::new(config.output.output_dir.clone()));
        Self::with_sink(config, sink)
    }

    /// Create a session delivering through a custom sink
    pub fn with_sink(config: Config, sink: Arc<dyn ArchiveSink>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            sink,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Render the new names for `files` (see [`render`])
    pub fn preview<F: SourceFile>(
        &self,
        files: &[F],
        pattern: &str,
        options: &NumberingOptions,
    ) -> Vec<RenamedEntry> {
        render(files, pattern, options)
    }

    /// Pack `files` under their rendered names and deliver the archive(s)
    pub async fn download_archives<F: SourceFile>(
        &self,
        files: &[F],
        entries: &[RenamedEntry],
        progress: Option<&dyn ProgressReporter>,
        cancel: CancellationToken,
    ) -> Result<ArchiveReport> {
        archive_files(self.request(files, entries, progress, cancel)).await
    }

    /// Deliver each file on its own under its rendered name
    pub async fn download_individually<F: SourceFile>(
        &self,
        files: &[F],
        entries: &[RenamedEntry],
        progress: Option<&dyn ProgressReporter>,
        cancel: CancellationToken,
    ) -> Result<Vec<SavedFile>> {
        save_individually(self.request(files, entries, progress, cancel)).await
    }

    fn request<'a, F: SourceFile>(
        &'a self,
        files: &'a [F],
        entries: &'a [RenamedEntry],
        progress: Option<&'a dyn ProgressReporter>,
        cancel: CancellationToken,
    ) -> ArchiveRequest<'a, F> {
        ArchiveRequest {
            files,
            entries,
            sink: self.sink.as_ref(),
            progress,
            cancel,
            config: &self.config,
        }
    }
}
