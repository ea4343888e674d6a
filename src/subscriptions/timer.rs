// SPDX-License-Identifier: MPL-2.0

//! The publishing timer. Wraps a spawned tokio task so the rest of the engine
//! only sees "periodic wake-ups until cancelled".

use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Fires a tick closure at a fixed interval on the runtime's executor.
///
/// Scheduling is absolute - each deadline is the previous deadline plus the
/// interval, so ticks do not drift with callback latency. Missed deadlines
/// are skipped rather than bursted. The closure returning false ends the
/// task, as does cancellation; whichever happens, no tick fires after the
/// current one completes.
pub(crate) struct PublishingTimer {
    cancel: CancellationToken,
}

impl PublishingTimer {
    pub fn new() -> PublishingTimer {
        PublishingTimer {
            cancel: CancellationToken::new(),
        }
    }

    /// Arms the timer. The first tick fires one interval from now. Must be
    /// called in the context of a tokio runtime.
    pub fn arm<F>(&self, interval: Duration, mut on_tick: F)
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            let mut timer = interval_at(Instant::now() + interval, interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = timer.tick() => {
                        if !on_tick() {
                            break;
                        }
                    }
                }
            }
        });
    }

    /// Stops the timer. Idempotent; the in-flight tick, if any, runs to
    /// completion.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::PublishingTimer;

    #[tokio::test(start_paused = true)]
    async fn fires_on_the_interval() {
        let timer = PublishingTimer::new();
        let ticks = Arc::new(AtomicU32::new(0));
        let counter = ticks.clone();
        timer.arm(Duration::from_millis(100), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });
        tokio::time::sleep(Duration::from_millis(450)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_ticks() {
        let timer = PublishingTimer::new();
        let ticks = Arc::new(AtomicU32::new(0));
        let counter = ticks.clone();
        timer.arm(Duration::from_millis(100), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });
        tokio::time::sleep(Duration::from_millis(250)).await;
        timer.cancel();
        assert!(timer.is_cancelled());
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn tick_returning_false_ends_the_task() {
        let timer = PublishingTimer::new();
        let ticks = Arc::new(AtomicU32::new(0));
        let counter = ticks.clone();
        timer.arm(Duration::from_millis(100), move || {
            counter.fetch_add(1, Ordering::SeqCst) < 2
        });
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }
}
