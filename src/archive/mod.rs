//! Archive pipeline for renamed files
//!
//! Turns an ordered selection plus its rendered names into delivered outputs:
//! 1. Resolve - check selection limits, sanitize entry names and settle collisions
//! 2. Plan - one archive, or parts bounded by file count and bytes
//! 3. Read - load each batch's files sequentially
//! 4. Package - write a store-only ZIP on a blocking thread
//! 5. Deliver - hand the archive to an [`ArchiveSink`], pausing between parts
//!
//! Memory stays bounded by one batch: its files plus the archive being built.

mod batching;
mod context;
mod individual;
mod packaging;
mod pipeline;
mod selection;
mod sink;

pub use batching::{BatchLimits, plan_batches};
pub use individual::save_individually;
pub use pipeline::{ArchiveRequest, archive_files};
pub use selection::validate_selection;
pub use sink::{ArchiveSink, DirectorySink};

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
