//! Pipeline context: cancellation polling, progress scaling and reporting.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::types::{ProgressEvent, ProgressReporter};

/// Explicit per-operation state threaded through every pipeline step.
pub(crate) struct PipelineContext<'a> {
    progress: Option<&'a dyn ProgressReporter>,
    cancel: &'a CancellationToken,
}

impl<'a> PipelineContext<'a> {
    pub(crate) fn new(
        progress: Option<&'a dyn ProgressReporter>,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self { progress, cancel }
    }

    /// Fail with [`Error::Cancelled`] if cancellation was requested.
    pub(crate) fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            tracing::warn!("operation cancelled");
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    /// Sleep for `delay`, returning early with [`Error::Cancelled`] on cancellation.
    pub(crate) async fn pause(&self, delay: Duration) -> Result<()> {
        if delay.is_zero() {
            return self.check_cancelled();
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => Ok(()),
            _ = self.cancel.cancelled() => {
                tracing::warn!("operation cancelled during delay");
                Err(Error::Cancelled)
            }
        }
    }

    /// Emit a progress event, prefixing the message with `label` when present.
    pub(crate) fn report(&self, label: Option<&str>, message: &str, percent: f32) {
        let Some(progress) = self.progress else {
            return;
        };
        let message = match label {
            Some(label) => format!("{}: {}", label, message),
            None => message.to_string(),
        };
        progress.report(ProgressEvent::new(message, percent));
    }
}

/// Maps per-archive progress onto the overall 0..100 range.
///
/// Archive `index` of `total` owns an equal slice of the range; reading fills
/// the first half of that slice and packaging the second half.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ProgressScale {
    start: f32,
    end: f32,
}

impl ProgressScale {
    pub(crate) fn new(index: usize, total: usize) -> Self {
        let total = total.max(1) as f32;
        Self {
            start: index as f32 * 100.0 / total,
            end: (index + 1) as f32 * 100.0 / total,
        }
    }

    /// Percent after `fraction` of the reading phase.
    pub(crate) fn reading(&self, fraction: f32) -> f32 {
        self.lerp(fraction.clamp(0.0, 1.0) * 0.5)
    }

    /// Percent after `fraction` of the packaging phase.
    pub(crate) fn packaging(&self, fraction: f32) -> f32 {
        self.lerp(0.5 + fraction.clamp(0.0, 1.0) * 0.5)
    }

    /// Percent once this archive is finished.
    pub(crate) fn done(&self) -> f32 {
        self.end
    }

    fn lerp(&self, t: f32) -> f32 {
        if t >= 1.0 {
            self.end
        } else {
            self.start + (self.end - self.start) * t
        }
    }
}

/// Fraction `done / total`, treating an empty total as complete.
pub(crate) fn fraction(done: u64, total: u64) -> f32 {
    if total == 0 {
        1.0
    } else {
        (done as f64 / total as f64) as f32
    }
}
