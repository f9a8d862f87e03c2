//! Partitioning of an ordered selection into archive parts.

use std::ops::Range;

use crate::config::ArchiveConfig;

/// Per-part limits used when a selection is too large for one archive
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchLimits {
    /// Maximum number of files per part
    pub max_files: usize,
    /// Maximum cumulative input bytes per part
    pub max_bytes: u64,
}

impl From<&ArchiveConfig> for BatchLimits {
    fn from(config: &ArchiveConfig) -> Self {
        Self {
            max_files: config.max_batch_files,
            max_bytes: config.max_batch_bytes,
        }
    }
}

/// Split files with the given `sizes` into contiguous batches
///
/// A new batch starts when the running batch already holds `max_files` files, or
/// when adding the next file would exceed `max_bytes` and the batch is not empty.
/// Files are never split, so a file larger than `max_bytes` forms its own batch.
/// The ranges cover `0..sizes.len()` exactly once, in order.
pub fn plan_batches(sizes: &[u64], limits: BatchLimits) -> Vec<Range<usize>> {
    let max_files = limits.max_files.max(1);
    let mut batches = Vec::new();
    let mut start = 0;
    let mut bytes: u64 = 0;

    for (i, &size) in sizes.iter().enumerate() {
        let count = i - start;
        if count > 0 && (count >= max_files || bytes.saturating_add(size) > limits.max_bytes) {
            batches.push(start..i);
            start = i;
            bytes = 0;
        }
        bytes = bytes.saturating_add(size);
    }

    if start < sizes.len() {
        batches.push(start..sizes.len());
    }

    batches
}

/// Decide how many archives to build for `sizes`
///
/// Selections whose total size is at most `single_archive_threshold` go into one
/// archive regardless of file count; larger ones are split with [`plan_batches`].
pub(crate) fn plan_archives(sizes: &[u64], config: &ArchiveConfig) -> Vec<Range<usize>> {
    if sizes.is_empty() {
        return Vec::new();
    }

    let total = sizes.iter().fold(0u64, |acc, &s| acc.saturating_add(s));
    if total <= config.single_archive_threshold {
        tracing::debug!(
            files = sizes.len(),
            total_bytes = total,
            "selection fits in a single archive"
        );
        return vec![0..sizes.len()];
    }

    let batches = plan_batches(sizes, BatchLimits::from(config));
    tracing::debug!(
        files = sizes.len(),
        total_bytes = total,
        parts = batches.len(),
        "selection split into parts"
    );
    batches
}
