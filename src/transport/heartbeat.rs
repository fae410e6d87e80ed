//! Heartbeat timer keeping idle event streams open

use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Recurring background tick, stoppable and restart-safe
#[derive(Default)]
pub struct Heartbeat {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Heartbeat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Start ticking every `period`, first tick one period from now.
    ///
    /// `tick` returns false to end the loop. Does nothing if already running.
    /// Must be called from within a tokio runtime.
    pub fn start<F>(&self, period: Duration, mut tick: F)
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }

        let period = period.max(Duration::from_millis(1));
        let first = Instant::now() + period;
        *task = Some(tokio::spawn(async move {
            let mut interval = time::interval_at(first, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if !tick() {
                    break;
                }
            }
        }));
    }

    /// Stop the timer. Safe to call repeatedly.
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.stop();
    }
}
