//! Shared state behind a [`Writer`](crate::Writer) and its [`Reader`](crate::Reader)s.
//!
//! All fields live behind one mutex. Blocked readers park on a single condition
//! variable and re-check their own predicate after every wake-up; async readers
//! leave a [`Waker`] in their slot instead.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::task::Waker;

use crate::config::Config;
use crate::trace::trace;

/// Compaction never shrinks the buffer below this many slots.
const MIN_SHRUNK_CAPACITY: usize = 16;

/// Reference-counted core jointly owned by the writer and every reader.
pub(crate) struct Shared<T> {
    state: Mutex<State<T>>,
    ready: Condvar,
}

impl<T> Shared<T> {
    pub(crate) fn new(empty: T, config: Config) -> Self {
        Self {
            state: Mutex::new(State::new(empty, config)),
            ready: Condvar::new(),
        }
    }

    /// Locks the state. The only foreign code run under the lock is item
    /// `clone` and `drop`, neither of which can leave the state half-updated,
    /// so a poisoned mutex is recovered.
    pub(crate) fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Suspends on the wake condition, atomically releasing the lock.
    pub(crate) fn wait<'a>(&self, guard: MutexGuard<'a, State<T>>) -> MutexGuard<'a, State<T>> {
        self.ready.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }

    /// Wakes every blocked reader and every parked task.
    ///
    /// Must be called after the guard that performed the mutation is released.
    pub(crate) fn broadcast(&self, wakers: Vec<Waker>) {
        self.ready.notify_all();
        for waker in wakers {
            waker.wake();
        }
    }

    /// Wakes blocked readers without mutating anything.
    ///
    /// Taking the lock first orders this after any reader that is between
    /// checking its predicate and parking.
    pub(crate) fn nudge(&self) {
        let _guard = self.lock();
        self.ready.notify_all();
    }
}

enum Slot {
    Active {
        /// Bookkeeping cursor: the lowest global position this reader may
        /// still need. Mirrors, but is kept apart from, the reader's own cursor.
        cursor: u64,
        waker: Option<Waker>,
    },
    Vacant,
}

pub(crate) struct State<T> {
    /// Items at global positions `[base, base + buffer.len())`.
    buffer: VecDeque<T>,
    base: u64,
    closed: bool,
    slots: Vec<Slot>,
    vacant: Vec<usize>,
    active: usize,
    empty: T,
    min_capacity: usize,
    shrink: bool,
    #[cfg(feature = "stats")]
    stats: crate::stats::Stats,
}

impl<T> State<T> {
    fn new(empty: T, config: Config) -> Self {
        Self {
            buffer: VecDeque::with_capacity(config.min_capacity()),
            base: 0,
            closed: false,
            slots: Vec::new(),
            vacant: Vec::new(),
            active: 0,
            empty,
            min_capacity: config.min_capacity(),
            shrink: config.shrinks(),
            #[cfg(feature = "stats")]
            stats: crate::stats::Stats::new(),
        }
    }

    /// Global position one past the last written item.
    pub(crate) fn end(&self) -> u64 {
        self.base + self.buffer.len() as u64
    }

    #[cfg(test)]
    pub(crate) fn base(&self) -> u64 {
        self.base
    }

    pub(crate) fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn active_readers(&self) -> usize {
        self.active
    }

    #[cfg(feature = "stats")]
    pub(crate) fn stats(&self) -> crate::stats::Stats {
        self.stats.clone()
    }

    /// Appends `item` at the end of the sequence and compacts.
    ///
    /// # Panics
    ///
    /// Panics if the stream has already been closed.
    pub(crate) fn push(&mut self, item: T) -> Vec<Waker> {
        assert!(!self.closed, "write to a closed stream");
        self.buffer.push_back(item);
        #[cfg(feature = "stats")]
        self.stats.record_write();
        self.compact();
        self.take_wakers()
    }

    /// Marks end-of-stream. Idempotent apart from re-signaling waiters.
    pub(crate) fn close(&mut self) -> Vec<Waker> {
        if !self.closed {
            trace!(end = self.end(), "stream closed");
        }
        self.closed = true;
        self.take_wakers()
    }

    /// Registers a new reader and returns its slot id and starting position.
    ///
    /// The reader starts at `base`: it sees every item still retained, never
    /// one already discarded. Its bookkeeping cursor starts there too, so an
    /// idle reader holds back exactly what it could still read.
    pub(crate) fn attach(&mut self) -> (usize, u64) {
        let start = self.base;
        let slot = Slot::Active {
            cursor: start,
            waker: None,
        };
        let id = match self.vacant.pop() {
            Some(id) => {
                self.slots[id] = slot;
                id
            }
            None => {
                self.slots.push(slot);
                self.slots.len() - 1
            }
        };
        self.active += 1;
        #[cfg(feature = "stats")]
        self.stats.record_attach();
        trace!(id, start, "reader attached");
        (id, start)
    }

    /// Retires slot `id` from all further accounting and compacts.
    pub(crate) fn detach(&mut self, id: usize) {
        if let Slot::Active { .. } = self.slots[id] {
            self.slots[id] = Slot::Vacant;
            self.vacant.push(id);
            self.active -= 1;
            #[cfg(feature = "stats")]
            self.stats.record_detach();
            trace!(id, "reader detached");
            self.compact();
        }
    }

    /// Consumes the item at `pos` on behalf of slot `id`.
    ///
    /// The caller guarantees `base <= pos < end`.
    pub(crate) fn take(&mut self, id: usize, pos: u64) -> T
    where
        T: Clone,
    {
        debug_assert!(pos >= self.base && pos < self.end());
        let item = self.buffer[(pos - self.base) as usize].clone();
        if let Slot::Active { cursor, .. } = &mut self.slots[id] {
            *cursor = pos + 1;
        }
        self.compact();
        item
    }

    pub(crate) fn empty(&self) -> T
    where
        T: Clone,
    {
        self.empty.clone()
    }

    pub(crate) fn park(&mut self, id: usize, waker: &Waker) {
        if let Slot::Active { waker: slot, .. } = &mut self.slots[id] {
            let stale = slot
                .as_ref()
                .map_or(true, |current| !current.will_wake(waker));
            if stale {
                *slot = Some(waker.clone());
            }
        }
    }

    /// Drops every item no active reader still needs.
    fn compact(&mut self) {
        let end = self.end();
        let min = self
            .slots
            .iter()
            .filter_map(|slot| match slot {
                Slot::Active { cursor, .. } => Some(*cursor),
                Slot::Vacant => None,
            })
            .fold(end, u64::min);
        if min > self.base {
            let discard = (min - self.base) as usize;
            self.base = min;
            self.buffer.drain(..discard);
            #[cfg(feature = "stats")]
            self.stats.record_discard(discard as u64);
            trace!(discard, base = self.base, "compacted");
            self.release_spare();
        }
        #[cfg(feature = "stats")]
        self.stats.set_retained(self.buffer.len() as u64);
    }

    /// Returns unused buffer memory once occupancy falls below a quarter.
    fn release_spare(&mut self) {
        let floor = self
            .min_capacity
            .max(self.buffer.len() * 2)
            .max(MIN_SHRUNK_CAPACITY);
        if self.shrink && self.buffer.capacity() >= floor * 2 {
            self.buffer.shrink_to(floor);
        }
    }

    fn take_wakers(&mut self) -> Vec<Waker> {
        self.slots
            .iter_mut()
            .filter_map(|slot| match slot {
                Slot::Active { waker, .. } => waker.take(),
                Slot::Vacant => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> State<i32> {
        State::new(0, Config::default())
    }

    #[test]
    fn test_push_without_readers_discards_immediately() {
        let mut state = state();
        state.push(1);
        state.push(2);
        assert_eq!(state.buffered(), 0);
        assert_eq!(state.base(), 2);
        assert_eq!(state.end(), 2);
    }

    #[test]
    fn test_reader_pins_unread_items() {
        let mut state = state();
        let (id, start) = state.attach();
        assert_eq!(start, 0);

        state.push(10);
        state.push(20);
        assert_eq!(state.buffered(), 2);

        assert_eq!(state.take(id, 0), 10);
        assert_eq!(state.base(), 1);
        assert_eq!(state.buffered(), 1);
    }

    #[test]
    fn test_slowest_reader_bounds_the_buffer() {
        let mut state = state();
        let (fast, _) = state.attach();
        let (slow, _) = state.attach();
        for i in 0..5 {
            state.push(i);
        }
        for pos in 0..5 {
            state.take(fast, pos);
        }
        assert_eq!(state.buffered(), 5);

        state.take(slow, 0);
        state.take(slow, 1);
        assert_eq!(state.base(), 2);
        assert_eq!(state.buffered(), 3);

        state.detach(slow);
        assert_eq!(state.buffered(), 0);
        assert_eq!(state.base(), 5);
    }

    #[test]
    fn test_late_reader_holds_only_what_it_can_read() {
        let mut state = state();
        let (first, _) = state.attach();
        state.push(1);
        state.take(first, 0);
        let (late, start) = state.attach();
        assert_eq!(start, 1);

        state.push(2);
        state.take(first, 1);
        assert_eq!(state.buffered(), 1);
        assert_eq!(state.base(), 1);

        assert_eq!(state.take(late, 1), 2);
        assert_eq!(state.buffered(), 0);
        assert_eq!(state.base(), 2);
    }

    #[test]
    fn test_compaction_releases_spare_capacity() {
        let mut state = state();
        let (id, _) = state.attach();
        for i in 0..1024 {
            state.push(i);
        }
        let grown = state.buffer.capacity();
        for pos in 0..1024 {
            state.take(id, pos);
        }
        assert!(state.buffer.capacity() < grown);
        assert!(state.buffer.capacity() < 2 * MIN_SHRUNK_CAPACITY);
    }

    #[test]
    fn test_shrink_respects_configured_floor() {
        let mut state = State::new(0, Config::new().capacity(256));
        let (id, _) = state.attach();
        for i in 0..1024 {
            state.push(i);
        }
        for pos in 0..1024 {
            state.take(id, pos);
        }
        assert!(state.buffer.capacity() >= 256);
    }

    #[test]
    fn test_shrink_disabled_keeps_allocation() {
        let mut state = State::new(0, Config::new().shrink(false));
        let (id, _) = state.attach();
        for i in 0..1024 {
            state.push(i);
        }
        let grown = state.buffer.capacity();
        for pos in 0..1024 {
            state.take(id, pos);
        }
        assert_eq!(state.buffer.capacity(), grown);
    }

    #[test]
    fn test_detached_slots_are_reused() {
        let mut state = state();
        let (a, _) = state.attach();
        let (b, _) = state.attach();
        state.detach(a);
        assert_eq!(state.active_readers(), 1);

        let (c, _) = state.attach();
        assert_eq!(c, a);
        assert_ne!(c, b);
        assert_eq!(state.active_readers(), 2);
    }

    #[test]
    fn test_detach_twice_is_harmless() {
        let mut state = state();
        let (a, _) = state.attach();
        state.detach(a);
        state.detach(a);
        assert_eq!(state.active_readers(), 0);
        assert_eq!(state.vacant.len(), 1);
    }

    #[test]
    #[should_panic(expected = "write to a closed stream")]
    fn test_push_after_close_panics() {
        let mut state = state();
        state.close();
        state.push(1);
    }
}
