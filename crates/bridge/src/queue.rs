use crate::errors::QueueError;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// How far the read cursor moves on a successful `get`.
///
/// `OneSlot` is the capture behavior: a window of `k` frames is copied but
/// only the oldest frame leaves the queue, so successive reads see
/// overlapping windows. `Window` consumes the whole window per read and has
/// to be asked for explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorAdvance {
    #[default]
    OneSlot,
    Window,
}

impl CursorAdvance {
    /// Number of records a successful read of `window` records removes.
    pub fn consumed(&self, window: usize) -> usize {
        match self {
            CursorAdvance::OneSlot => 1,
            CursorAdvance::Window => window,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Empty,
    Partial,
    Full,
}

/// Point-in-time counters, taken under the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStats {
    /// Every `put` attempt, accepted or rejected
    pub produced: u64,
    /// `put` attempts rejected with `Full`
    pub rejected: u64,
    /// Records currently stored
    pub stored: usize,
}

struct Ring<T> {
    slots: Box<[T]>,
    read: usize,
    write: usize,
    produced: u64,
    rejected: u64,
}

impl<T> Ring<T> {
    #[inline]
    fn next(&self, index: usize, step: usize) -> usize {
        (index + step) % self.slots.len()
    }

    #[inline]
    fn stored(&self) -> usize {
        (self.write + self.slots.len() - self.read) % self.slots.len()
    }
}

/// Fixed-capacity circular buffer of frame records shared by one producer
/// and one consumer.
///
/// Storage holds `capacity + 1` slots: the slot ahead of the write cursor
/// is always vacant, so `read == write` means empty and
/// `next(write) == read` means full. All state sits behind a single mutex
/// and neither `put` nor `get` ever waits for space or data.
///
/// Records are copied in and out by value. The queue never interprets
/// them and never releases whatever payload they reference, including on
/// drop.
pub struct FrameQueue<T> {
    ring: Mutex<Ring<T>>,
    capacity: usize,
    advance: CursorAdvance,
}

impl<T: Copy + Default> FrameQueue<T> {
    pub fn new(capacity: usize) -> Result<Self, QueueError> {
        Self::with_advance(capacity, CursorAdvance::OneSlot)
    }

    pub fn with_advance(capacity: usize, advance: CursorAdvance) -> Result<Self, QueueError> {
        if capacity == 0 {
            return Err(QueueError::InvalidCapacity);
        }

        let slots = vec![T::default(); capacity + 1].into_boxed_slice();

        Ok(Self {
            ring: Mutex::new(Ring {
                slots,
                read: 0,
                write: 0,
                produced: 0,
                rejected: 0,
            }),
            capacity,
            advance,
        })
    }
}

impl<T: Copy> FrameQueue<T> {
    // No code path panics between two index updates, so a poisoned lock
    // still guards consistent state.
    #[inline]
    fn lock(&self) -> MutexGuard<'_, Ring<T>> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store one record, or reject it with `Full` leaving storage untouched.
    ///
    /// The generation counter is bumped in both cases so that a reader can
    /// tell how many frames were attempted between two reads.
    pub fn put(&self, item: T) -> Result<(), QueueError> {
        let mut ring = self.lock();
        ring.produced += 1;

        let next = ring.next(ring.write, 1);
        if next == ring.read {
            ring.rejected += 1;
            return Err(QueueError::Full);
        }

        let write = ring.write;
        ring.slots[write] = item;
        ring.write = next;
        Ok(())
    }

    /// Copy `out.len()` consecutive records starting at the oldest one.
    ///
    /// Returns the generation counter observed under the same lock. The
    /// read cursor moves by one slot (or by the whole window with
    /// `CursorAdvance::Window`), independent of the window size.
    pub fn get(&self, out: &mut [T]) -> Result<u64, QueueError> {
        let window = out.len();
        if window == 0 || window > self.capacity {
            return Err(QueueError::InvalidWindow {
                window,
                capacity: self.capacity,
            });
        }

        let mut ring = self.lock();
        if ring.stored() < window {
            return Err(QueueError::Empty);
        }

        tracing::trace!(read_index = ring.read, window, "queue read");

        let mut index = ring.read;
        for slot in out.iter_mut() {
            *slot = ring.slots[index];
            index = ring.next(index, 1);
        }

        ring.read = ring.next(ring.read, self.advance.consumed(window));
        Ok(ring.produced)
    }

    /// Move every stored record into `out`, oldest first, leaving the queue empty.
    ///
    /// Used at shutdown so the owner can release frames nobody will read.
    /// The generation counter is not affected.
    pub fn drain(&self, out: &mut Vec<T>) -> usize {
        let mut ring = self.lock();
        let count = ring.stored();
        out.reserve(count);

        while ring.read != ring.write {
            out.push(ring.slots[ring.read]);
            ring.read = ring.next(ring.read, 1);
        }
        count
    }

    pub fn len(&self) -> usize {
        self.lock().stored()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn advance(&self) -> CursorAdvance {
        self.advance
    }

    pub fn produced_count(&self) -> u64 {
        self.lock().produced
    }

    pub fn state(&self) -> QueueState {
        match self.len() {
            0 => QueueState::Empty,
            n if n == self.capacity => QueueState::Full,
            _ => QueueState::Partial,
        }
    }

    pub fn stats(&self) -> QueueStats {
        let ring = self.lock();
        QueueStats {
            produced: ring.produced,
            rejected: ring.rejected,
            stored: ring.stored(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(capacity: usize, items: &[u32]) -> FrameQueue<u32> {
        let queue = FrameQueue::new(capacity).unwrap();
        for &item in items {
            queue.put(item).unwrap();
        }
        queue
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            FrameQueue::<u32>::new(0),
            Err(QueueError::InvalidCapacity)
        ));
    }

    #[test]
    fn test_new_queue_is_empty() {
        let queue = FrameQueue::<u32>::new(4).unwrap();
        assert_eq!(queue.state(), QueueState::Empty);
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.capacity(), 4);
        assert_eq!(queue.produced_count(), 0);

        let mut out = [0u32; 1];
        assert_eq!(queue.get(&mut out), Err(QueueError::Empty));
    }

    #[test]
    fn test_capacity_plus_one_put_is_rejected() {
        let queue = filled(3, &[1, 2, 3]);
        assert_eq!(queue.state(), QueueState::Full);
        assert!(queue.is_full());

        assert_eq!(queue.put(4), Err(QueueError::Full));
        assert_eq!(queue.len(), 3, "Rejected put must not store anything");
        assert_eq!(queue.produced_count(), 4, "Rejected put is still counted");
    }

    #[test]
    fn test_full_put_leaves_contents_untouched() {
        let queue = filled(2, &[10, 20]);
        assert_eq!(queue.put(30), Err(QueueError::Full));

        let mut out = [0u32; 2];
        queue.get(&mut out).unwrap();
        assert_eq!(out, [10, 20]);
    }

    #[test]
    fn test_fifo_order_with_unit_window() {
        let queue = filled(5, &[1, 2, 3, 4]);
        let mut out = [0u32; 1];
        let mut seen = Vec::new();

        while queue.get(&mut out).is_ok() {
            seen.push(out[0]);
        }

        assert_eq!(seen, vec![1, 2, 3, 4]);
        assert_eq!(queue.state(), QueueState::Empty);
    }

    #[test]
    fn test_fifo_order_across_wraparound() {
        let queue = FrameQueue::<u32>::new(3).unwrap();
        let mut out = [0u32; 1];
        let mut seen = Vec::new();

        // Interleave so the cursors lap the 4 physical slots several times.
        for round in 0..10u32 {
            queue.put(round * 2).unwrap();
            queue.put(round * 2 + 1).unwrap();
            queue.get(&mut out).unwrap();
            seen.push(out[0]);
            queue.get(&mut out).unwrap();
            seen.push(out[0]);
        }

        assert_eq!(seen, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_sliding_window_advances_one_record_per_read() {
        let queue = filled(5, &[1, 2, 3, 4, 5]);
        let mut out = [0u32; 3];

        assert_eq!(queue.get(&mut out), Ok(5));
        assert_eq!(out, [1, 2, 3]);
        assert_eq!(queue.len(), 4, "Only one record leaves per read");

        queue.get(&mut out).unwrap();
        assert_eq!(out, [2, 3, 4], "Next window starts one record later");

        queue.get(&mut out).unwrap();
        assert_eq!(out, [3, 4, 5]);

        // Two records left, a window of three cannot be served.
        assert_eq!(queue.get(&mut out), Err(QueueError::Empty));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_window_advance_consumes_whole_window() {
        let queue = FrameQueue::with_advance(4, CursorAdvance::Window).unwrap();
        for i in 1..=4u32 {
            queue.put(i).unwrap();
        }

        let mut out = [0u32; 2];
        queue.get(&mut out).unwrap();
        assert_eq!(out, [1, 2]);
        queue.get(&mut out).unwrap();
        assert_eq!(out, [3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_invalid_windows() {
        let queue = filled(3, &[1, 2, 3]);

        let mut none: [u32; 0] = [];
        assert_eq!(
            queue.get(&mut none),
            Err(QueueError::InvalidWindow {
                window: 0,
                capacity: 3
            })
        );

        let mut too_big = [0u32; 4];
        assert_eq!(
            queue.get(&mut too_big),
            Err(QueueError::InvalidWindow {
                window: 4,
                capacity: 3
            })
        );
        assert_eq!(queue.len(), 3, "Invalid reads must not move the cursor");
    }

    #[test]
    fn test_window_equal_to_capacity() {
        let queue = filled(3, &[7, 8, 9]);
        let mut out = [0u32; 3];
        queue.get(&mut out).unwrap();
        assert_eq!(out, [7, 8, 9]);
        assert_eq!(queue.state(), QueueState::Partial);
    }

    #[test]
    fn test_drop_accounting() {
        // 2 free slots, 5 attempts: exactly 2 stored, 3 rejected.
        let queue = filled(4, &[1, 2]);
        let before = queue.produced_count();

        let results: Vec<_> = (0..5u32).map(|i| queue.put(100 + i)).collect();
        let accepted = results.iter().filter(|r| r.is_ok()).count();
        let rejected = results
            .iter()
            .filter(|r| matches!(r, Err(QueueError::Full)))
            .count();

        assert_eq!(accepted, 2);
        assert_eq!(rejected, 3);
        assert_eq!(queue.produced_count() - before, 5);

        let stats = queue.stats();
        assert_eq!(stats.rejected, 3);
        assert_eq!(stats.stored, 4);
        assert_eq!(stats.produced, 7);
    }

    #[test]
    fn test_generation_delta_counts_attempts() {
        let queue = FrameQueue::<u32>::new(2).unwrap();
        let mut out = [0u32; 1];

        queue.put(1).unwrap();
        let g1 = queue.get(&mut out).unwrap();

        // Three attempts: two stored, one rejected.
        queue.put(2).unwrap();
        queue.put(3).unwrap();
        assert_eq!(queue.put(4), Err(QueueError::Full));

        let g2 = queue.get(&mut out).unwrap();
        assert_eq!(g2 - g1, 3);
        assert_eq!(out, [2]);
    }

    #[test]
    fn test_end_to_end_scenario() {
        let queue = FrameQueue::<char>::new(3).unwrap();

        assert_eq!(queue.put('A'), Ok(()));
        assert_eq!(queue.put('B'), Ok(()));
        assert_eq!(queue.put('C'), Ok(()));
        assert_eq!(queue.put('D'), Err(QueueError::Full));
        assert_eq!(queue.produced_count(), 4);

        let mut one = ['\0'; 1];
        assert_eq!(queue.get(&mut one), Ok(4));
        assert_eq!(one, ['A']);

        assert_eq!(queue.put('D'), Ok(()));

        let mut two = ['\0'; 2];
        assert_eq!(queue.get(&mut two), Ok(5));
        assert_eq!(two, ['B', 'C']);
    }

    #[test]
    fn test_drain_returns_fifo_and_empties() {
        let queue = filled(4, &[1, 2, 3]);
        let mut out = [0u32; 1];
        queue.get(&mut out).unwrap();
        queue.put(4).unwrap();

        let mut drained = Vec::new();
        assert_eq!(queue.drain(&mut drained), 3);
        assert_eq!(drained, vec![2, 3, 4]);
        assert!(queue.is_empty());
        assert_eq!(queue.produced_count(), 4, "Drain does not touch the generation");
    }

    #[test]
    fn test_state_transitions() {
        let queue = FrameQueue::<u32>::new(2).unwrap();
        let mut out = [0u32; 1];

        assert_eq!(queue.state(), QueueState::Empty);
        queue.put(1).unwrap();
        assert_eq!(queue.state(), QueueState::Partial);
        queue.put(2).unwrap();
        assert_eq!(queue.state(), QueueState::Full);
        queue.get(&mut out).unwrap();
        assert_eq!(queue.state(), QueueState::Partial);
        queue.get(&mut out).unwrap();
        assert_eq!(queue.state(), QueueState::Empty);
    }

    #[test]
    fn test_stored_count_never_exceeds_capacity() {
        let queue = FrameQueue::<u32>::new(3).unwrap();
        let mut out = [0u32; 1];

        // Deterministic mixed sequence: mostly puts, occasional reads.
        for step in 0..200u32 {
            if step % 5 == 4 {
                let _ = queue.get(&mut out);
            } else {
                let _ = queue.put(step);
            }
            assert!(queue.len() <= queue.capacity());
        }
    }
}
