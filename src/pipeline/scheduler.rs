//! Timer scheduling and clocks
//!
//! The piano core never sleeps. Delayed work is queued in a `Scheduler` as a
//! task with a due time in milliseconds, and the host drains due tasks by
//! calling `Piano::tick`. Tasks fire in order of due time, ties broken by
//! insertion order. Every timer is individually cancellable and carries the
//! `Owner` mode that created it so a mode can drop all of its own timers at
//! once.

use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::time::Instant;

/// Source of the current time in milliseconds
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Monotonic wall clock, zero at construction
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Hand-driven clock; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Rc<Cell<u64>>);

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, ms: u64) {
        self.0.set(ms);
    }

    pub fn advance(&self, ms: u64) {
        self.0.set(self.0.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.0.get()
    }
}

/// Handle to a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Mode that owns a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    Playback,
    Song,
    Teaching,
}

/// A task that came due
#[derive(Debug, Clone, PartialEq)]
pub struct Due<T> {
    pub id: TimerId,
    pub owner: Owner,
    /// Time the task was scheduled for (may be earlier than now)
    pub at_ms: u64,
    pub task: T,
}

/// Ordered, cancellable list of pending tasks
#[derive(Debug)]
pub struct Scheduler<T> {
    queue: BTreeMap<(u64, TimerId), (Owner, T)>,
    due_times: HashMap<TimerId, u64>,
    next_id: u64,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            queue: BTreeMap::new(),
            due_times: HashMap::new(),
            next_id: 0,
        }
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `task` to fire at absolute time `at_ms`
    pub fn schedule_at(&mut self, owner: Owner, at_ms: u64, task: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.queue.insert((at_ms, id), (owner, task));
        self.due_times.insert(id, at_ms);
        id
    }

    /// Schedule `task` to fire `delay_ms` after `now_ms`
    pub fn schedule_in(&mut self, owner: Owner, now_ms: u64, delay_ms: u64, task: T) -> TimerId {
        self.schedule_at(owner, now_ms.saturating_add(delay_ms), task)
    }

    /// Cancel one timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.due_times.remove(&id) {
            Some(at_ms) => self.queue.remove(&(at_ms, id)).is_some(),
            None => false,
        }
    }

    /// Cancel every timer belonging to `owner`, returning how many were dropped
    pub fn cancel_owner(&mut self, owner: Owner) -> usize {
        let before = self.queue.len();
        let due_times = &mut self.due_times;
        self.queue.retain(|&(_, id), (o, _)| {
            if *o == owner {
                due_times.remove(&id);
                false
            } else {
                true
            }
        });
        before - self.queue.len()
    }

    /// Take the earliest task due at or before `now_ms`
    pub fn pop_due(&mut self, now_ms: u64) -> Option<Due<T>> {
        let (&(at_ms, _), _) = self.queue.first_key_value()?;
        if at_ms > now_ms {
            return None;
        }
        let ((at_ms, id), (owner, task)) = self.queue.pop_first()?;
        self.due_times.remove(&id);
        Some(Due {
            id,
            owner,
            at_ms,
            task,
        })
    }

    /// Due time of the earliest pending task
    pub fn next_deadline(&self) -> Option<u64> {
        self.queue.keys().next().map(|&(at_ms, _)| at_ms)
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.due_times.contains_key(&id)
    }

    /// Number of pending timers owned by `owner`
    pub fn pending(&self, owner: Owner) -> usize {
        self.queue.values().filter(|(o, _)| *o == owner).count()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
