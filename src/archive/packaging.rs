//! Store-only ZIP packaging of one batch, run on a blocking thread.

use std::io::{Cursor, Write};

use chrono::{Datelike, Local, Timelike};
use tokio::sync::mpsc;
use zip::result::{ZipError, ZipResult};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::context::{PipelineContext, ProgressScale, fraction};
use crate::error::{Error, PackagingFailureKind, Result};

/// Entries at or above this size need zip64 headers
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// Bytes written between packaging progress updates
const PROGRESS_CHUNK: usize = 8 * 1024 * 1024;

/// Approximate per-entry overhead (local header, central directory record, name)
const ENTRY_OVERHEAD: usize = 128;

/// One file ready to be written into an archive.
pub(crate) struct PackEntry {
    pub(crate) name: String,
    pub(crate) data: Vec<u8>,
}

/// Packaging progress, in payload bytes.
#[derive(Clone, Copy, Debug)]
struct PackProgress {
    written: u64,
    total: u64,
}

/// Build a ZIP archive from `entries`, reporting progress as it is written.
///
/// Packaging failures are classified for logging and returned unchanged.
pub(crate) async fn package_archive(
    archive_name: &str,
    entries: Vec<PackEntry>,
    ctx: &PipelineContext<'_>,
    scale: ProgressScale,
    label: Option<&str>,
) -> Result<Vec<u8>> {
    let entry_count = entries.len();
    let (tx, mut rx) = mpsc::unbounded_channel::<PackProgress>();

    let handle = tokio::task::spawn_blocking(move || {
        write_zip(entries, |p| {
            let _ = tx.send(p);
        })
    });

    while let Some(p) = rx.recv().await {
        let f = fraction(p.written, p.total);
        ctx.report(
            label,
            &format!("Creating archive... {:.0}%", f * 100.0),
            scale.packaging(f),
        );
    }

    let result = match handle.await {
        Ok(result) => result,
        Err(e) => Err(ZipError::Io(std::io::Error::other(format!(
            "packaging task panicked: {}",
            e
        )))),
    };

    match result {
        Ok(bytes) => {
            tracing::info!(
                archive = archive_name,
                entries = entry_count,
                bytes = bytes.len(),
                "archive packaged"
            );
            Ok(bytes)
        }
        Err(e) => {
            let kind = PackagingFailureKind::classify(&e);
            tracing::error!(
                archive = archive_name,
                kind = kind.as_str(),
                error = %e,
                "failed to package archive"
            );
            Err(Error::Packaging {
                archive: archive_name.to_string(),
                source: e,
            })
        }
    }
}

/// Write all entries into an in-memory, store-only ZIP.
fn write_zip(
    entries: Vec<PackEntry>,
    mut on_progress: impl FnMut(PackProgress),
) -> ZipResult<Vec<u8>> {
    let total: u64 = entries.iter().map(|e| e.data.len() as u64).sum();
    let capacity = entries
        .iter()
        .map(|e| e.data.len() + 2 * (e.name.len() + ENTRY_OVERHEAD))
        .sum::<usize>()
        + ENTRY_OVERHEAD;

    let mut buffer = Vec::new();
    buffer.try_reserve_exact(capacity).map_err(|e| {
        ZipError::Io(std::io::Error::new(
            std::io::ErrorKind::OutOfMemory,
            format!("memory allocation of {} bytes failed: {}", capacity, e),
        ))
    })?;

    let mut writer = ZipWriter::new(Cursor::new(buffer));
    let modified = current_zip_time();
    let mut written: u64 = 0;

    on_progress(PackProgress { written, total });

    for entry in entries {
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .last_modified_time(modified)
            .unix_permissions(0o644)
            .large_file(entry.data.len() as u64 >= ZIP64_THRESHOLD);

        writer.start_file(entry.name.as_str(), options)?;
        for chunk in entry.data.chunks(PROGRESS_CHUNK) {
            writer.write_all(chunk)?;
            written += chunk.len() as u64;
            on_progress(PackProgress { written, total });
        }
        if entry.data.is_empty() {
            on_progress(PackProgress { written, total });
        }
    }

    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}

fn current_zip_time() -> zip::DateTime {
    let now = Local::now();
    zip::DateTime::from_date_and_time(
        u16::try_from(now.year()).unwrap_or(1980),
        now.month() as u8,
        now.day() as u8,
        now.hour() as u8,
        now.minute() as u8,
        now.second().min(59) as u8,
    )
    .unwrap_or_default()
}
