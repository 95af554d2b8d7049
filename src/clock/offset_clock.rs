use chrono::{DateTime, Duration, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::metrics;

use super::now::NowReceiver;
use super::offset::UtcOffset;

/// Live local-time display for one row.
///
/// Idle until given a UTC offset, then republishes "now shifted by offset"
/// as `HH:MM:SS` on every shared clock tick. Setting a new offset replaces
/// the previous tick task; dropping the clock halts it.
pub struct OffsetClock {
    now_rx: NowReceiver,
    time_tx: watch::Sender<Option<String>>,
    task: Option<JoinHandle<()>>,
}

impl OffsetClock {
    pub fn new(now_rx: NowReceiver) -> Self {
        let (time_tx, _rx) = watch::channel(None);
        Self {
            now_rx,
            time_tx,
            task: None,
        }
    }

    /// Switch the clock to `offset`, or back to idle on `None`.
    ///
    /// The previous tick task is always aborted first, so at most one task
    /// feeds the time channel at any instant.
    pub fn set_offset(&mut self, offset: Option<UtcOffset>) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        let Some(offset) = offset else {
            self.time_tx.send_replace(None);
            return;
        };

        metrics::record_clock_restart();
        let mut now_rx = self.now_rx.clone();
        let time_tx = self.time_tx.clone();
        self.time_tx
            .send_replace(Some(format_shifted(*now_rx.borrow_and_update(), offset)));
        self.task = Some(tokio::spawn(async move {
            while now_rx.changed().await.is_ok() {
                let now = *now_rx.borrow_and_update();
                time_tx.send_replace(Some(format_shifted(now, offset)));
            }
        }));
    }

    /// Latest formatted time, `None` while idle.
    pub fn time(&self) -> Option<String> {
        self.time_tx.borrow().clone()
    }

    /// Observe time updates.
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.time_tx.subscribe()
    }
}

impl Drop for OffsetClock {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Shift `now` by the offset and format the result as if it were UTC.
/// The arithmetic is manual; no timezone database is consulted.
pub fn format_shifted(now: DateTime<Utc>, offset: UtcOffset) -> String {
    (now + Duration::minutes(i64::from(offset.minutes())))
        .format("%H:%M:%S")
        .to_string()
}
