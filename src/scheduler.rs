/*!
 * Coalescing scheduler.
 *
 * Keyed debounce over explicit time: every `schedule` call for a key pushes
 * that key's deadline to `now + delay`, and `take_due` hands each key back
 * exactly once after its quiet period has elapsed. The scheduler never reads
 * a clock itself, so callers drive it with real or virtual instants.
 */

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Source of the instants a host feeds its schedulers
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Keyed "last call wins" debouncer
#[derive(Debug, Clone)]
pub struct CoalescingScheduler<K> {
    /// Default quiet period
    quiet_period: Duration,
    /// Pending keys and their deadlines
    pending: HashMap<K, Instant>,
}

impl<K> CoalescingScheduler<K>
where
    K: Eq + Hash + Clone,
{
    /// Create a scheduler with the given default quiet period
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            pending: HashMap::new(),
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// Schedule `key` with the default quiet period
    pub fn schedule(&mut self, key: K, now: Instant) {
        let delay = self.quiet_period;
        self.schedule_after(key, now, delay);
    }

    /// Schedule `key` to run once `delay` has passed without another trigger
    pub fn schedule_after(&mut self, key: K, now: Instant, delay: Duration) {
        self.pending.insert(key, now + delay);
    }

    /// Drop a pending key without running it
    pub fn cancel(&mut self, key: &K) -> bool {
        self.pending.remove(key).is_some()
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Earliest pending deadline, for hosts that sleep until the next tick
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().min().copied()
    }

    /// Remove and return every key whose deadline is at or before `now`,
    /// ordered by deadline
    pub fn take_due(&mut self, now: Instant) -> Vec<K> {
        let mut due: Vec<(K, Instant)> = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, deadline)| (key.clone(), *deadline))
            .collect();

        due.sort_by_key(|(_, deadline)| *deadline);

        for (key, _) in &due {
            self.pending.remove(key);
        }

        due.into_iter().map(|(key, _)| key).collect()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
