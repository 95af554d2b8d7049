use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Receiver half of the shared wall-clock channel.
pub type NowReceiver = watch::Receiver<DateTime<Utc>>;

/// Process-wide wall-clock tick source.
///
/// A single interval task publishes `Utc::now()` to every subscriber instead
/// of one timer per row. Subscribers attach with [`SharedNow::subscribe`] and
/// detach by dropping the receiver; neither affects the others. `stop` halts
/// the task deterministically.
pub struct SharedNow {
    tx: watch::Sender<DateTime<Utc>>,
    tick_interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SharedNow {
    pub fn new(tick_interval: Duration) -> Self {
        let (tx, _rx) = watch::channel(Utc::now());
        Self {
            tx,
            tick_interval,
            task: Mutex::new(None),
        }
    }

    /// Spawn the tick task. Calling `start` again replaces the previous task.
    pub fn start(&self) {
        let tx = self.tx.clone();
        let tick_interval = self.tick_interval;
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                tx.send_replace(Utc::now());
            }
        });
        if let Some(previous) = self.task.lock().unwrap().replace(handle) {
            previous.abort();
        }
    }

    /// Halt the tick task. Subscribers keep their last observed value.
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().unwrap().take() {
            task.abort();
            debug!("Shared clock stopped");
        }
    }

    /// Attach a subscriber.
    pub fn subscribe(&self) -> NowReceiver {
        self.tx.subscribe()
    }
}

impl Drop for SharedNow {
    fn drop(&mut self) {
        self.stop();
    }
}
