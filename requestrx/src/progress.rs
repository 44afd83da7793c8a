use tokio::sync::mpsc::UnboundedSender;

use crate::ticket::Ticket;

/// The two independent transfer directions progress is tracked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProgressChannel {
    Upload,
    Download,
}

/// Upload and download completion percentages for the current invocation.
///
/// Values are clamped to `[0.0, 100.0]`. A channel counts as complete only
/// at exactly `100.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Progress {
    upload: f64,
    download: f64,
}

impl Progress {
    pub fn upload(&self) -> f64 {
        self.upload
    }

    pub fn download(&self) -> f64 {
        self.download
    }

    pub fn upload_complete(&self) -> bool {
        self.upload == 100.0
    }

    pub fn download_complete(&self) -> bool {
        self.download == 100.0
    }

    pub(crate) fn set(&mut self, channel: ProgressChannel, percentage: f64) {
        // Non-finite reports are not percentages.
        if !percentage.is_finite() {
            return;
        }
        let clamped = percentage.clamp(0.0, 100.0);
        match channel {
            ProgressChannel::Upload => self.upload = clamped,
            ProgressChannel::Download => self.download = clamped,
        }
    }

    pub(crate) fn reset(&mut self, channel: Option<ProgressChannel>) {
        match channel {
            Some(ProgressChannel::Upload) => self.upload = 0.0,
            Some(ProgressChannel::Download) => self.download = 0.0,
            None => *self = Progress::default(),
        }
    }
}

/// One progress report emitted by a call, tagged with the invocation that
/// produced it so stale reports can be dropped.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ProgressReport {
    pub(crate) ticket: Ticket,
    pub(crate) channel: ProgressChannel,
    pub(crate) percentage: f64,
}

/// Cloneable handle a call hands to its transport to report progress on one
/// channel.
///
/// The reporter stays bound to the invocation it was created for. Reports
/// sent after that invocation has been superseded are dropped without any
/// state change.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    ticket: Ticket,
    channel: ProgressChannel,
    tx: UnboundedSender<ProgressReport>,
}

impl ProgressReporter {
    pub(crate) fn new(
        ticket: Ticket,
        channel: ProgressChannel,
        tx: UnboundedSender<ProgressReport>,
    ) -> Self {
        ProgressReporter {
            ticket,
            channel,
            tx,
        }
    }

    /// Records `percentage` for this reporter's channel.
    pub fn report(&self, percentage: f64) {
        let _ = self.tx.send(ProgressReport {
            ticket: self.ticket,
            channel: self.channel,
            percentage,
        });
    }

    pub fn channel(&self) -> ProgressChannel {
        self.channel
    }

    pub fn ticket(&self) -> Ticket {
        self.ticket
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_defaults_to_zero() {
        let progress = Progress::default();
        assert_eq!(progress.upload(), 0.0);
        assert_eq!(progress.download(), 0.0);
        assert!(!progress.upload_complete());
        assert!(!progress.download_complete());
    }

    #[test]
    fn test_set_clamps_out_of_range_reports() {
        let mut progress = Progress::default();
        progress.set(ProgressChannel::Upload, 150.0);
        progress.set(ProgressChannel::Download, -25.0);
        assert_eq!(progress.upload(), 100.0);
        assert_eq!(progress.download(), 0.0);
    }

    #[test]
    fn test_set_ignores_non_finite_reports() {
        let mut progress = Progress::default();
        progress.set(ProgressChannel::Upload, 40.0);
        progress.set(ProgressChannel::Upload, f64::NAN);
        progress.set(ProgressChannel::Upload, f64::INFINITY);
        assert_eq!(progress.upload(), 40.0);
    }

    #[test]
    fn test_complete_means_exactly_one_hundred() {
        let mut progress = Progress::default();
        progress.set(ProgressChannel::Download, 99.9);
        assert!(!progress.download_complete());
        progress.set(ProgressChannel::Download, 100.0);
        assert!(progress.download_complete());
    }

    #[test]
    fn test_reset_clears_one_channel_or_both() {
        let mut progress = Progress::default();
        progress.set(ProgressChannel::Upload, 60.0);
        progress.set(ProgressChannel::Download, 80.0);

        progress.reset(Some(ProgressChannel::Upload));
        assert_eq!(progress.upload(), 0.0);
        assert_eq!(progress.download(), 80.0);

        progress.reset(None);
        assert_eq!(progress.download(), 0.0);
    }
}
