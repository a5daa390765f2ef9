// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;
use std::time::Duration;

use crate::ControlName;

pub const TOAST_VISIBLE_FOR: Duration = Duration::from_millis(3000);
pub const SUCCESS_FLASH_FOR: Duration = Duration::from_millis(1000);
pub const RESTORE_RETRY_AFTER: Duration = Duration::from_millis(200);
pub const CAPTURE_SETTLE_AFTER: Duration = Duration::from_millis(300);
pub const CLOCK_REFRESH_EVERY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimerKey {
    HideToast,
    ClearFlash(ControlName),
    RestoreSections,
    CaptureSections,
    RefreshClock,
}

/// Keyed one-shot timers on a caller-driven monotonic clock.
///
/// At most one deadline exists per key: scheduling a key that is already
/// armed replaces its deadline, so the superseded firing never happens.
#[derive(Debug, Default)]
pub struct Timers {
    now: Duration,
    deadlines: BTreeMap<TimerKey, Duration>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Returns true when an armed deadline for `key` was replaced.
    pub fn schedule(&mut self, key: TimerKey, delay: Duration) -> bool {
        self.deadlines.insert(key, self.now + delay).is_some()
    }

    pub fn cancel(&mut self, key: &TimerKey) -> bool {
        self.deadlines.remove(key).is_some()
    }

    pub fn is_armed(&self, key: &TimerKey) -> bool {
        self.deadlines.contains_key(key)
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.deadlines.values().min().copied()
    }

    /// Moves the clock to `now` and returns the keys that came due, earliest
    /// deadline first. The clock never moves backwards.
    pub fn advance(&mut self, now: Duration) -> Vec<TimerKey> {
        self.now = self.now.max(now);
        let mut due = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= self.now)
            .map(|(key, deadline)| (*deadline, key.clone()))
            .collect::<Vec<_>>();
        due.sort();
        for (_, key) in &due {
            self.deadlines.remove(key);
        }
        due.into_iter().map(|(_, key)| key).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{TimerKey, Timers};
    use std::time::Duration;

    #[test]
    fn timers_fire_once_in_deadline_order() {
        let mut timers = Timers::new();
        timers.schedule(TimerKey::HideToast, Duration::from_millis(300));
        timers.schedule(TimerKey::RestoreSections, Duration::from_millis(200));

        assert!(timers.advance(Duration::from_millis(100)).is_empty());
        assert_eq!(
            timers.advance(Duration::from_millis(500)),
            vec![TimerKey::RestoreSections, TimerKey::HideToast]
        );
        assert!(timers.advance(Duration::from_millis(900)).is_empty());
    }

    #[test]
    fn rescheduling_supersedes_the_earlier_deadline() {
        let mut timers = Timers::new();
        timers.schedule(TimerKey::CaptureSections, Duration::from_millis(300));
        timers.advance(Duration::from_millis(200));
        assert!(timers.schedule(TimerKey::CaptureSections, Duration::from_millis(300)));

        assert!(timers.advance(Duration::from_millis(350)).is_empty());
        assert_eq!(
            timers.advance(Duration::from_millis(500)),
            vec![TimerKey::CaptureSections]
        );
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let mut timers = Timers::new();
        timers.schedule(TimerKey::HideToast, Duration::from_millis(10));
        assert!(timers.cancel(&TimerKey::HideToast));
        assert!(!timers.is_armed(&TimerKey::HideToast));
        assert!(timers.advance(Duration::from_secs(1)).is_empty());
        assert_eq!(timers.next_deadline(), None);
    }

    #[test]
    fn clock_does_not_run_backwards() {
        let mut timers = Timers::new();
        timers.advance(Duration::from_millis(500));
        timers.advance(Duration::from_millis(100));
        assert_eq!(timers.now(), Duration::from_millis(500));
    }
}
