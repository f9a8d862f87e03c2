//! # batch-rename
//!
//! Library for renaming a selection of files by pattern and delivering the
//! result as ZIP archives.
//!
//! ## Design Philosophy
//!
//! batch-rename is designed to be:
//! - **Predictable** - Rendering never fails; malformed tokens stay literal
//! - **Memory-bounded** - Large selections are split into parts, built one at a time
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Cancellable** - Every run observes a cancellation token and reports progress
//!
//! ## Quick Start
//!
//! ```no_run
//! use batch_rename::{ArchiveRequest, Config, DirectorySink, DiskFile, NumberingOptions};
//! use batch_rename::{ProgressEvent, archive_files, render};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let files = vec![
//!         DiskFile::open("IMG_1.png").await?,
//!         DiskFile::open("IMG_2.png").await?,
//!     ];
//!
//!     let options = NumberingOptions {
//!         start_number: "01".to_string(),
//!         gap: 1,
//!         keep_extension: true,
//!     };
//!     let entries = render(&files, "photo_{index}", &options);
//!
//!     let config = Config::default();
//!     let sink = DirectorySink::new("./renamed");
//!     let progress = |event: ProgressEvent| println!("{:>5.1}% {}", event.percent, event.message);
//!
//!     let report = archive_files(
//!         ArchiveRequest::new(&files, &entries, &sink, &config).with_progress(&progress),
//!     )
//!     .await?;
//!     println!("{} archive(s) written", report.archives.len());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

use tokio_util::sync::CancellationToken;

/// Archive pipeline (batching, packaging, delivery)
pub mod archive;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Pattern-based name rendering
pub mod renamer;
/// High-level session facade
pub mod session;
/// Core types
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use archive::{
    ArchiveRequest, ArchiveSink, BatchLimits, DirectorySink, archive_files, plan_batches,
    save_individually, validate_selection,
};
pub use config::{ArchiveConfig, Config, NameCollisionAction, OutputConfig, SelectionConfig};
pub use error::{Error, PackagingFailureKind, Result};
pub use renamer::{render, render_with_date};
pub use session::RenameSession;
pub use types::{
    ArchiveReport, ArchiveSummary, DiskFile, MemoryFile, NumberingOptions, ProgressEvent,
    ProgressReporter, RenamedEntry, SavedFile, SourceFile,
};

/// Cancel `token` when the process receives a termination signal.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use batch_rename::cancel_on_signal;
/// use tokio_util::sync::CancellationToken;
///
/// #[tokio::main]
/// async fn main() {
///     let token = CancellationToken::new();
///     tokio::spawn(cancel_on_signal(token.clone()));
///
///     // pass `token` to archive_files / save_individually
/// }
/// ```
pub async fn cancel_on_signal(token: CancellationToken) {
    tokio::select! {
        _ = wait_for_signal() => {
            tracing::info!("cancelling running operation");
            token.cancel();
        }
        _ = token.cancelled() => {}
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Handlers may fail to register in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM signal");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
