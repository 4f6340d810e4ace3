//! Progress notifications for long-running downloads.
//!
//! A [`ProgressSink`] receives a percentage, a short label and free-form log
//! lines. Notifications are fire-and-forget: sinks cannot fail and must not
//! block the download.

/// Receiver of download progress.
pub trait ProgressSink {
    /// Overall progress, 0 to 100.
    fn progress(&self, percent: u8);

    /// Short status such as `"3/12"`.
    fn label(&self, text: &str);

    /// Human-readable log line.
    fn log(&self, line: &str);
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn progress(&self, _percent: u8) {}

    fn label(&self, _text: &str) {}

    fn log(&self, _line: &str) {}
}

/// Forwards notifications to `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn progress(&self, percent: u8) {
        tracing::debug!(percent, "progress");
    }

    fn label(&self, text: &str) {
        tracing::debug!(label = text, "progress label");
    }

    fn log(&self, line: &str) {
        tracing::info!("{}", line);
    }
}

impl<P: ProgressSink + ?Sized> ProgressSink for &P {
    fn progress(&self, percent: u8) {
        (**self).progress(percent)
    }

    fn label(&self, text: &str) {
        (**self).label(text)
    }

    fn log(&self, line: &str) {
        (**self).log(line)
    }
}

/// Percentage reported before chapter `index` (0-based) of `total`.
///
/// Chapter work covers the first 80 percent of a run.
pub fn chapter_percent(index: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((index as f64 / total as f64) * 80.0) as u8
}
