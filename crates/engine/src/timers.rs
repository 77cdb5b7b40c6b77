//! Arms, fires, and cancels the per-(kind, round) timers.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

use basaltbft_core_types::{Round, Timeout, TimeoutConfig};

/// Schedules timeouts and delivers their fires to a listener.
///
/// At most one timer is armed per `(kind, round)` key; arming an armed key
/// is a no-op. A fired timer stays in the registry until the listener
/// acknowledges it with [`try_finish`](TimeoutScheduler::try_finish), so a
/// cancellation racing a fire is detected there: a fire whose key is gone
/// was cancelled and must not change state.
pub struct TimeoutScheduler<M> {
    config: TimeoutConfig,
    listener: mpsc::UnboundedSender<M>,
    timers: HashMap<Timeout, JoinHandle<()>>,
}

impl<M> TimeoutScheduler<M>
where
    M: From<Timeout> + Send + 'static,
{
    /// Create a scheduler delivering fires to `listener`.
    pub fn new(config: TimeoutConfig, listener: mpsc::UnboundedSender<M>) -> Self {
        Self {
            config,
            listener,
            timers: HashMap::new(),
        }
    }

    /// Arm the timer for `timeout`, unless one is already armed.
    pub fn schedule(&mut self, timeout: Timeout) {
        if self.timers.contains_key(&timeout) {
            return;
        }

        let duration = self.config.duration_for(timeout);
        let listener = self.listener.clone();

        trace!(%timeout, ?duration, "Arming timer");

        let task = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let _ = listener.send(M::from(timeout));
        });

        self.timers.insert(timeout, task);
    }

    /// Cancel the timer for `timeout`, if armed.
    pub fn cancel(&mut self, timeout: &Timeout) {
        if let Some(task) = self.timers.remove(timeout) {
            trace!(%timeout, "Cancelling timer");
            task.abort();
        }
    }

    /// Cancel every timer armed for a round below `round`.
    ///
    /// Entering a round supersedes everything armed for earlier rounds.
    pub fn cancel_below(&mut self, round: Round) {
        self.timers.retain(|timeout, task| {
            if timeout.round < round {
                task.abort();
                false
            } else {
                true
            }
        });
    }

    /// Cancel all armed timers.
    pub fn cancel_all(&mut self) {
        for (_, task) in self.timers.drain() {
            task.abort();
        }
    }

    /// Acknowledge a fire. Returns false if the timer had been cancelled
    /// after its fire was already queued; such a fire must be ignored.
    pub fn try_finish(&mut self, timeout: &Timeout) -> bool {
        self.timers.remove(timeout).is_some()
    }

    /// The number of timers currently armed or fired-but-unacknowledged.
    pub fn armed(&self) -> usize {
        self.timers.len()
    }
}

impl<M> Drop for TimeoutScheduler<M> {
    fn drop(&mut self) {
        for (_, task) in self.timers.drain() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use core::time::Duration;

    use basaltbft_core_types::TimeoutKind;

    fn test_config() -> TimeoutConfig {
        TimeoutConfig::uniform(Duration::from_millis(50), Duration::from_millis(10))
    }

    #[tokio::test(start_paused = true)]
    async fn timers_fire_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel::<Timeout>();
        let mut scheduler = TimeoutScheduler::new(test_config(), tx);

        let t0 = Timeout::propose(Round::new(0));
        let t1 = Timeout::prevote(Round::new(1));
        let t2 = Timeout::precommit(Round::new(2));

        // Armed out of order; longer rounds wait longer.
        scheduler.schedule(t1);
        scheduler.schedule(t0);
        scheduler.schedule(t2);
        assert_eq!(scheduler.armed(), 3);

        assert_eq!(rx.recv().await, Some(t0));
        assert!(scheduler.try_finish(&t0));

        assert_eq!(rx.recv().await, Some(t1));
        assert!(scheduler.try_finish(&t1));

        assert_eq!(rx.recv().await, Some(t2));
        assert!(scheduler.try_finish(&t2));

        assert_eq!(scheduler.armed(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn arming_twice_is_a_no_op() {
        let (tx, mut rx) = mpsc::unbounded_channel::<Timeout>();
        let mut scheduler = TimeoutScheduler::new(test_config(), tx);

        let t0 = Timeout::propose(Round::new(0));

        scheduler.schedule(t0);
        scheduler.schedule(t0);
        assert_eq!(scheduler.armed(), 1);

        assert_eq!(rx.recv().await, Some(t0));
        assert!(scheduler.try_finish(&t0));

        // Only one fire was ever queued.
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_does_not_fire() {
        let (tx, mut rx) = mpsc::unbounded_channel::<Timeout>();
        let mut scheduler = TimeoutScheduler::new(test_config(), tx);

        let t0 = Timeout::propose(Round::new(0));
        let t1 = Timeout::prevote(Round::new(0));

        scheduler.schedule(t0);
        scheduler.schedule(t1);
        scheduler.cancel(&t0);
        assert_eq!(scheduler.armed(), 1);

        assert_eq!(rx.recv().await, Some(t1));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn entering_a_round_cancels_lower_rounds() {
        let (tx, mut rx) = mpsc::unbounded_channel::<Timeout>();
        let mut scheduler = TimeoutScheduler::new(test_config(), tx);

        scheduler.schedule(Timeout::propose(Round::new(0)));
        scheduler.schedule(Timeout::prevote(Round::new(0)));
        scheduler.schedule(Timeout::propose(Round::new(2)));

        scheduler.cancel_below(Round::new(2));
        assert_eq!(scheduler.armed(), 1);

        assert_eq!(rx.recv().await, Some(Timeout::propose(Round::new(2))));
    }

    #[tokio::test(start_paused = true)]
    async fn fire_after_cancel_is_detected() {
        let (tx, mut rx) = mpsc::unbounded_channel::<Timeout>();
        let mut scheduler = TimeoutScheduler::new(test_config(), tx);

        let t0 = Timeout::new(Round::new(0), TimeoutKind::Propose);
        scheduler.schedule(t0);

        // The fire lands in the queue before anyone looks at it.
        assert_eq!(rx.recv().await, Some(t0));

        // A cancellation that races the fire wins at acknowledgement time.
        scheduler.cancel(&t0);
        assert!(!scheduler.try_finish(&t0));
    }
}
