//! Up-front checks on a selection before anything is read.

use crate::config::SelectionConfig;
use crate::error::{Error, Result};
use crate::types::SourceFile;

/// Reject selections that exceed the configured count and size limits
///
/// Checks the file count first, then each file in order against
/// `max_file_size` (naming the first file that is too large), then the
/// combined size. Sizes are the ones reported by [`SourceFile::size`].
pub fn validate_selection<F: SourceFile>(files: &[F], limits: &SelectionConfig) -> Result<()> {
    if files.len() > limits.max_files {
        return Err(Error::InvalidInput(format!(
            "maximum {} files allowed, {} selected",
            limits.max_files,
            files.len()
        )));
    }

    let mut total: u64 = 0;
    for file in files {
        let size = file.size();
        if size > limits.max_file_size {
            tracing::warn!(
                file = file.name(),
                bytes = size,
                limit = limits.max_file_size,
                "file exceeds size limit"
            );
            return Err(Error::InvalidInput(format!(
                "file \"{}\" is too large ({} bytes, maximum file size is {} bytes)",
                file.name(),
                size,
                limits.max_file_size
            )));
        }
        total = total.saturating_add(size);
    }

    if total > limits.max_total_size {
        return Err(Error::InvalidInput(format!(
            "total file size {} bytes exceeds the maximum of {} bytes",
            total, limits.max_total_size
        )));
    }

    Ok(())
}
