//! The archive pipeline: read, package and deliver each planned archive in order.

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::batching::plan_archives;
use super::context::{PipelineContext, ProgressScale, fraction};
use super::packaging::{PackEntry, package_archive};
use super::selection::validate_selection;
use super::sink::ArchiveSink;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{ArchiveReport, ArchiveSummary, ProgressReporter, RenamedEntry, SourceFile};
use crate::utils::resolve_entry_names;

/// Inputs of an archive (or individual save) run
///
/// `files` and `entries` are parallel: `entries[i]` holds the rendered name of
/// `files[i]`, as returned by [`render`](crate::render).
pub struct ArchiveRequest<'a, F> {
    /// Files to pack, in order
    pub files: &'a [F],
    /// Rendered names, one per file
    pub entries: &'a [RenamedEntry],
    /// Where finished outputs go
    pub sink: &'a dyn ArchiveSink,
    /// Optional progress receiver
    pub progress: Option<&'a dyn ProgressReporter>,
    /// Cooperative cancellation, polled before each batch and each file read
    pub cancel: CancellationToken,
    /// Limits, naming and pacing
    pub config: &'a Config,
}

impl<'a, F: SourceFile> ArchiveRequest<'a, F> {
    /// Request without progress reporting and with a fresh (never cancelled) token
    pub fn new(
        files: &'a [F],
        entries: &'a [RenamedEntry],
        sink: &'a dyn ArchiveSink,
        config: &'a Config,
    ) -> Self {
        Self {
            files,
            entries,
            sink,
            progress: None,
            cancel: CancellationToken::new(),
            config,
        }
    }

    /// Report progress to `progress`
    pub fn with_progress(mut self, progress: &'a dyn ProgressReporter) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Observe `cancel` for cancellation
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Validate the request and compute the final entry names
    ///
    /// Cancellation is checked first so an aborted run always reports
    /// [`Error::Cancelled`], whatever else is wrong with the request.
    pub(crate) fn prepare(&self, ctx: &PipelineContext<'_>) -> Result<Vec<String>> {
        ctx.check_cancelled()?;
        if self.files.len() != self.entries.len() {
            return Err(Error::InvalidInput(format!(
                "{} files but {} renamed entries",
                self.files.len(),
                self.entries.len()
            )));
        }
        validate_selection(self.files, &self.config.selection)?;
        let renamed: Vec<&str> = self.entries.iter().map(|e| e.renamed.as_str()).collect();
        resolve_entry_names(&renamed, self.config.archive.name_collision)
    }
}

/// Pack the renamed files into one or more ZIP archives and deliver them
///
/// Selections up to `single_archive_threshold` bytes become a single
/// `{base_name}.zip`; larger ones are split into parts named
/// `{base_name}-part{K}-of-{N}.zip`, delivered in order with
/// `inter_batch_delay` between them. Entries are written in input order under
/// their sanitized, disambiguated names.
///
/// The selection is first checked against the `selection` limits of the config.
/// Any failure stops the run. Archives delivered before the failure stay
/// delivered. Cancellation surfaces as [`Error::Cancelled`].
pub async fn archive_files<F: SourceFile>(
    request: ArchiveRequest<'_, F>,
) -> Result<ArchiveReport> {
    let ctx = PipelineContext::new(request.progress, &request.cancel);
    let names = request.prepare(&ctx)?;

    let files = request.files;
    if files.is_empty() {
        debug!("no files selected, nothing to archive");
        return Ok(ArchiveReport::default());
    }

    let archive_config = &request.config.archive;
    let sizes: Vec<u64> = files.iter().map(|f| f.size()).collect();
    let plan = plan_archives(&sizes, archive_config);
    let total = plan.len();

    info!(
        files = files.len(),
        archives = total,
        bytes = sizes.iter().sum::<u64>(),
        "starting archive run"
    );

    let mut report = ArchiveReport::default();
    for (index, range) in plan.into_iter().enumerate() {
        if index > 0 {
            ctx.pause(archive_config.inter_batch_delay).await?;
        }
        ctx.check_cancelled()?;

        let (archive_name, label) = if total == 1 {
            (archive_config.single_archive_name(), None)
        } else {
            (
                archive_config.part_archive_name(index + 1, total),
                Some(format!("Part {} of {}", index + 1, total)),
            )
        };

        let batch = Batch {
            files: &files[range.clone()],
            names: &names[range],
            archive_name: &archive_name,
            label: label.as_deref(),
            scale: ProgressScale::new(index, total),
        };
        let summary = build_archive(batch, &ctx, request.sink).await?;
        report.archives.push(summary);
    }

    info!(
        archives = report.archives.len(),
        entries = report.total_entries(),
        "archive run complete"
    );
    Ok(report)
}

/// One planned archive
struct Batch<'a, F> {
    files: &'a [F],
    names: &'a [String],
    archive_name: &'a str,
    label: Option<&'a str>,
    scale: ProgressScale,
}

async fn build_archive<F: SourceFile>(
    batch: Batch<'_, F>,
    ctx: &PipelineContext<'_>,
    sink: &dyn ArchiveSink,
) -> Result<ArchiveSummary> {
    let count = batch.files.len();
    info!(archive = batch.archive_name, files = count, "building archive");

    let mut entries = Vec::with_capacity(count);
    let mut input_bytes: u64 = 0;
    for (j, (file, name)) in batch.files.iter().zip(batch.names).enumerate() {
        ctx.check_cancelled()?;
        ctx.report(
            batch.label,
            &format!("Reading {} ({}/{})", file.name(), j + 1, count),
            batch.scale.reading(fraction(j as u64, count as u64)),
        );

        let data = file.read().await.map_err(|source| {
            error!(file = file.name(), error = %source, "failed to read file");
            Error::Read {
                name: file.name().to_string(),
                source,
            }
        })?;
        debug!(file = file.name(), entry = %name, bytes = data.len(), "file read");

        input_bytes += data.len() as u64;
        entries.push(PackEntry {
            name: name.clone(),
            data,
        });
    }

    let bytes = package_archive(
        batch.archive_name,
        entries,
        ctx,
        batch.scale,
        batch.label,
    )
    .await?;
    let archive_bytes = bytes.len() as u64;

    let location = sink
        .deliver(batch.archive_name, bytes)
        .await
        .map_err(|source| {
            error!(archive = batch.archive_name, error = %source, "failed to deliver archive");
            Error::Delivery {
                name: batch.archive_name.to_string(),
                source,
            }
        })?;

    ctx.report(
        batch.label,
        &format!("Saved {}", batch.archive_name),
        batch.scale.done(),
    );
    info!(
        archive = batch.archive_name,
        entries = count,
        bytes = archive_bytes,
        "archive delivered"
    );

    Ok(ArchiveSummary {
        file_name: batch.archive_name.to_string(),
        entries: count,
        input_bytes,
        archive_bytes,
        location,
    })
}
