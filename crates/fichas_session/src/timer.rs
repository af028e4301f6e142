//! Single-shot inactivity countdown.
//!
//! Arming spawns a sleeping task that reports [`TimerFired`] on a channel.
//! Every arm or cancel moves to a new generation, so a firing that was
//! already queued when the timer was rearmed is recognised as stale.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Delivered when a countdown elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub generation: u64,
}

#[derive(Debug)]
pub struct InactivityTimer {
    timeout: Duration,
    generation: u64,
    handle: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<TimerFired>,
}

impl InactivityTimer {
    pub fn new(timeout: Duration, tx: mpsc::UnboundedSender<TimerFired>) -> Self {
        Self {
            timeout,
            generation: 0,
            handle: None,
            tx,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_armed(&self) -> bool {
        self.handle.is_some()
    }

    /// Start a new countdown, dropping the previous one. Returns its
    /// generation.
    pub fn arm(&mut self) -> u64 {
        self.cancel();
        let generation = self.generation;
        let timeout = self.timeout;
        let tx = self.tx.clone();
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = tx.send(TimerFired { generation });
        }));
        tracing::trace!(generation, ?timeout, "inactivity timer armed");
        generation
    }

    pub fn rearm(&mut self) -> u64 {
        self.arm()
    }

    /// Stop the countdown without firing. Calling it on an idle timer is a
    /// no-op apart from invalidating queued firings.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.generation += 1;
    }

    /// Whether `fired` belongs to the countdown currently armed.
    pub fn is_current(&self, fired: &TimerFired) -> bool {
        self.handle.is_some() && fired.generation == self.generation
    }

    /// Consume a firing: returns `true` and disarms if it is current.
    pub fn accept(&mut self, fired: TimerFired) -> bool {
        if !self.is_current(&fired) {
            tracing::debug!(
                fired = fired.generation,
                current = self.generation,
                "ignoring stale timer firing"
            );
            return false;
        }
        self.handle = None;
        true
    }
}

impl Drop for InactivityTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    const FIVE_MINUTES: Duration = Duration::from_secs(300);

    // The timer wheel rounds deadlines up to the next millisecond.
    fn assert_within_tick(elapsed: Duration) {
        assert!(elapsed >= FIVE_MINUTES, "fired early: {elapsed:?}");
        assert!(elapsed < FIVE_MINUTES + Duration::from_millis(10), "fired late: {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_timeout() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = InactivityTimer::new(FIVE_MINUTES, tx);
        let start = Instant::now();
        let generation = timer.arm();

        let fired = rx.recv().await.unwrap();
        assert_eq!(fired.generation, generation);
        assert_within_tick(start.elapsed());
        assert!(timer.accept(fired));
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_yields_single_firing_after_last_rearm() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = InactivityTimer::new(FIVE_MINUTES, tx);
        timer.arm();

        tokio::time::sleep(Duration::from_secs(200)).await;
        let rearmed_at = Instant::now();
        let generation = timer.rearm();

        let fired = rx.recv().await.unwrap();
        assert_within_tick(rearmed_at.elapsed());
        assert!(timer.accept(fired));
        assert_eq!(fired.generation, generation);

        let extra = tokio::time::timeout(Duration::from_secs(900), rx.recv()).await;
        assert!(extra.is_err(), "no second firing expected");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_firing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = InactivityTimer::new(FIVE_MINUTES, tx);
        timer.arm();
        timer.cancel();
        timer.cancel();

        let fired = tokio::time::timeout(Duration::from_secs(600), rx.recv()).await;
        assert!(fired.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_generation_is_rejected() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut timer = InactivityTimer::new(FIVE_MINUTES, tx);
        let old = timer.arm();
        timer.rearm();

        assert!(!timer.accept(TimerFired { generation: old }));
        assert!(timer.is_armed());
    }
}
