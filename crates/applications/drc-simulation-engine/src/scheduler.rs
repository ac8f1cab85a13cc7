//! Virtual-clock scheduler
//!
//! Deterministic [`Scheduler`] for tests and offline runs. Timers live in a
//! min-heap keyed by (due time, insertion sequence); popping a periodic timer
//! re-arms it one interval later. Cancellation is lazy: a cancelled timer's
//! heap entry is discarded when it surfaces.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use drc_core::{CancelToken, Scheduler};

/// Timers shorter than this are stretched to it, so a zero interval cannot
/// stall the clock
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Heap entry for one armed timer
#[derive(Debug, Clone)]
struct TimedEvent<E> {
    due: Duration,
    seq: u64,
    token: CancelToken,
    interval: Duration,
    event: E,
}

// Earliest due first, ties broken by insertion order
impl<E> Ord for TimedEvent<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<E> PartialOrd for TimedEvent<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Eq for TimedEvent<E> {}

impl<E> PartialEq for TimedEvent<E> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

#[derive(Debug)]
pub struct VirtualScheduler<E> {
    epoch: DateTime<Utc>,
    clock: Duration,
    queue: BinaryHeap<TimedEvent<E>>,
    armed: HashSet<CancelToken>,
    next_seq: u64,
    next_token: u64,
}

impl<E: Clone> VirtualScheduler<E> {
    /// Clock starts at `epoch` and only moves when driven
    pub fn new(epoch: DateTime<Utc>) -> Self {
        Self {
            epoch,
            clock: Duration::ZERO,
            queue: BinaryHeap::new(),
            armed: HashSet::new(),
            next_seq: 0,
            next_token: 0,
        }
    }

    /// Time elapsed since the epoch
    pub fn elapsed(&self) -> Duration {
        self.clock
    }

    /// Number of armed timers
    pub fn pending(&self) -> usize {
        self.armed.len()
    }

    fn push(&mut self, due: Duration, token: CancelToken, interval: Duration, event: E) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(TimedEvent {
            due,
            seq,
            token,
            interval,
            event,
        });
    }

    /// Pop the next timer due at or before `until`, moving the clock to its
    /// due time and re-arming it.
    pub fn pop_due(&mut self, until: Duration) -> Option<(CancelToken, E)> {
        loop {
            let next = self.queue.peek()?;
            if !self.armed.contains(&next.token) {
                self.queue.pop();
                continue;
            }
            if next.due > until {
                return None;
            }

            let timed = self.queue.pop()?;
            self.clock = self.clock.max(timed.due);
            self.push(
                timed.due + timed.interval,
                timed.token,
                timed.interval,
                timed.event.clone(),
            );
            return Some((timed.token, timed.event));
        }
    }

    /// Move the clock forward to `to` without firing anything. Never moves
    /// backwards.
    pub fn advance_clock(&mut self, to: Duration) {
        self.clock = self.clock.max(to);
    }
}

impl<E: Clone> Scheduler<E> for VirtualScheduler<E> {
    fn schedule(&mut self, interval: Duration, event: E) -> CancelToken {
        let interval = interval.max(MIN_INTERVAL);
        let token = CancelToken(self.next_token);
        self.next_token += 1;

        self.armed.insert(token);
        self.push(self.clock + interval, token, interval, event);
        token
    }

    fn cancel(&mut self, token: CancelToken) -> bool {
        self.armed.remove(&token)
    }

    fn now(&self) -> DateTime<Utc> {
        let offset = ChronoDuration::from_std(self.clock).unwrap_or(ChronoDuration::zero());
        self.epoch + offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epoch() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn drain(
        s: &mut VirtualScheduler<&'static str>,
        until: Duration,
    ) -> Vec<(Duration, &'static str)> {
        let mut fired = Vec::new();
        while let Some((_, event)) = s.pop_due(until) {
            fired.push((s.elapsed(), event));
        }
        s.advance_clock(until);
        fired
    }

    #[test]
    fn test_periodic_ordering() {
        let mut s = VirtualScheduler::new(epoch());
        s.schedule(secs(2), "fleet");
        s.schedule(secs(5), "sensor");

        let fired = drain(&mut s, secs(10));
        assert_eq!(
            fired,
            vec![
                (secs(2), "fleet"),
                (secs(4), "fleet"),
                (secs(5), "sensor"),
                (secs(6), "fleet"),
                (secs(8), "fleet"),
                // Sensor re-armed at 5s, before fleet re-armed at 8s
                (secs(10), "sensor"),
                (secs(10), "fleet"),
            ]
        );
        assert_eq!(s.now(), epoch() + ChronoDuration::seconds(10));
    }

    #[test]
    fn test_ties_fire_in_insertion_order() {
        let mut s = VirtualScheduler::new(epoch());
        s.schedule(secs(1), "a");
        s.schedule(secs(1), "b");
        let fired: Vec<_> = drain(&mut s, secs(1)).into_iter().map(|(_, e)| e).collect();
        assert_eq!(fired, vec!["a", "b"]);
    }

    #[test]
    fn test_cancel_stops_timer() {
        let mut s = VirtualScheduler::new(epoch());
        let fleet = s.schedule(secs(2), "fleet");
        s.schedule(secs(5), "sensor");

        assert_eq!(drain(&mut s, secs(3)).len(), 1);
        assert!(s.cancel(fleet));
        assert!(!s.cancel(fleet));
        assert!(!s.cancel(CancelToken(99)));
        assert_eq!(s.pending(), 1);

        let fired = drain(&mut s, secs(10));
        assert!(fired.iter().all(|(_, e)| *e == "sensor"));
        assert_eq!(fired.len(), 2);
    }

    #[test]
    fn test_schedule_is_relative_to_clock() {
        let mut s = VirtualScheduler::new(epoch());
        s.advance_clock(secs(7));
        s.schedule(secs(1), "progress");
        assert!(s.pop_due(secs(7)).is_none());
        assert!(s.pop_due(secs(8)).is_some());
        assert_eq!(s.elapsed(), secs(8));

        // Clock never runs backwards
        s.advance_clock(secs(3));
        assert_eq!(s.elapsed(), secs(8));
    }
}
