//! Progress bar for detail batches.

use filmfetch_core::fetch::{FetchEvent, FetchReporter, TracingReporter};
use indicatif::{ProgressBar, ProgressStyle};

/// Draws a progress bar for each batch and forwards every event to tracing.
///
/// Log lines are written with the bar suspended so the two never interleave.
pub(crate) struct ProgressReporter {
    bar: ProgressBar,
    inner: TracingReporter,
}

impl ProgressReporter {
    /// Creates a reporter; a disabled one only forwards to tracing.
    pub(crate) fn new(enabled: bool) -> Self {
        let bar = if enabled {
            ProgressBar::new(0)
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{pos}/{len}] {bar:40} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self {
            bar,
            inner: TracingReporter,
        }
    }
}

impl FetchReporter for ProgressReporter {
    fn report(&self, event: &FetchEvent) {
        self.bar.suspend(|| self.inner.report(event));

        match event {
            FetchEvent::BatchStarted { total, .. } => {
                self.bar.reset();
                self.bar.set_length(u64::try_from(*total).unwrap_or(u64::MAX));
                self.bar.set_message("fetching details");
            }
            FetchEvent::Succeeded {
                progress: Some(_), ..
            }
            | FetchEvent::Forbidden { index: Some(_), .. }
            | FetchEvent::Exhausted { index: Some(_), .. } => self.bar.inc(1),
            FetchEvent::BatchFinished { .. } => self.bar.finish_and_clear(),
            _ => {}
        }
    }
}
