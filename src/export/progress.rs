//! Progress accounting.
//!
//! Every selected channel owns an equal share of the total and divides it
//! equally among its surviving files. The reported value is recomputed from
//! per-channel counters, so a finished run reports exactly 100.

use parking_lot::Mutex;

/// Sender for reporting progress percentages (0.0 -- 100.0).
pub struct ProgressSender {
    callback: Box<dyn Fn(f64) + Send + Sync>,
}

impl ProgressSender {
    pub fn new(callback: impl Fn(f64) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Create a no-op sender that discards all progress reports.
    pub fn noop() -> Self {
        Self {
            callback: Box::new(|_| {}),
        }
    }

    pub fn send(&self, percent: f64) {
        (self.callback)(percent);
    }
}

impl std::fmt::Debug for ProgressSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSender").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ChannelProgress {
    done: usize,
    /// `None` until the channel's surviving files are known.
    total: Option<usize>,
}

impl ChannelProgress {
    fn fraction(&self) -> f64 {
        match self.total {
            None => 0.0,
            Some(0) => 1.0,
            Some(total) => self.done.min(total) as f64 / total as f64,
        }
    }
}

#[derive(Debug)]
pub struct ProgressTracker {
    channels: Mutex<Vec<ChannelProgress>>,
    sender: ProgressSender,
}

impl ProgressTracker {
    pub fn new(channels: usize, sender: ProgressSender) -> Self {
        Self {
            channels: Mutex::new(vec![ChannelProgress::default(); channels]),
            sender,
        }
    }

    /// Declare how many files channel `index` will process. A channel
    /// without files contributes its whole share at once.
    pub fn start_channel(&self, index: usize, files: usize) {
        let mut channels = self.channels.lock();
        if let Some(channel) = channels.get_mut(index) {
            channel.total = Some(files);
        }
        if files == 0 {
            self.sender.send(Self::percent(&channels));
        }
    }

    /// One file of channel `index` finished, whatever its result.
    pub fn file_done(&self, index: usize) {
        let mut channels = self.channels.lock();
        if let Some(channel) = channels.get_mut(index) {
            channel.done += 1;
        }
        self.sender.send(Self::percent(&channels));
    }

    pub fn current(&self) -> f64 {
        Self::percent(&self.channels.lock())
    }

    fn percent(channels: &[ChannelProgress]) -> f64 {
        if channels.is_empty() {
            return 100.0;
        }
        let sum: f64 = channels.iter().map(ChannelProgress::fraction).sum();
        (sum / channels.len() as f64 * 100.0).min(100.0)
    }
}
