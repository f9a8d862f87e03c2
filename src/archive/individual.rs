//! Delivering renamed files one by one instead of zipped.

use tracing::{debug, error, info};

use super::context::{PipelineContext, fraction};
use super::pipeline::ArchiveRequest;
use crate::error::{Error, Result};
use crate::types::{SavedFile, SourceFile};

/// Deliver every file through the sink under its final name
///
/// The selection limits apply as for [`archive_files`](super::archive_files).
/// Files are read and delivered one at a time, in input order, with
/// `output.individual_delay` between deliveries. Names are sanitized and
/// disambiguated exactly as for archive entries. Cancellation is polled before
/// each read; files delivered before a failure stay delivered.
pub async fn save_individually<F: SourceFile>(
    request: ArchiveRequest<'_, F>,
) -> Result<Vec<SavedFile>> {
    let ctx = PipelineContext::new(request.progress, &request.cancel);
    let names = request.prepare(&ctx)?;

    let total = request.files.len();
    if total == 0 {
        debug!("no files selected, nothing to save");
        return Ok(Vec::new());
    }
    info!(files = total, "saving files individually");

    let mut saved = Vec::with_capacity(total);
    for (i, (file, name)) in request.files.iter().zip(names).enumerate() {
        if i > 0 {
            ctx.pause(request.config.output.individual_delay).await?;
        }
        ctx.check_cancelled()?;

        let data = file.read().await.map_err(|source| {
            error!(file = file.name(), error = %source, "failed to read file");
            Error::Read {
                name: file.name().to_string(),
                source,
            }
        })?;
        let bytes = data.len() as u64;

        let location = request.sink.deliver(&name, data).await.map_err(|source| {
            error!(file = %name, error = %source, "failed to deliver file");
            Error::Delivery {
                name: name.clone(),
                source,
            }
        })?;
        debug!(file = file.name(), saved_as = %name, bytes, "file delivered");

        ctx.report(
            None,
            &format!("Saved {} ({}/{})", name, i + 1, total),
            fraction(i as u64 + 1, total as u64) * 100.0,
        );
        saved.push(SavedFile {
            file_name: name,
            bytes,
            location,
        });
    }

    info!(files = saved.len(), "individual save complete");
    Ok(saved)
}
