//! Monotonic event queue with lazy invalidation.
//!
//! The heap is a 33-bucket radix structure over cyclic `u32` timestamps:
//! an event lands in the bucket indexed by the highest bit in which its
//! time differs from `cur_time`, so bucket 0 holds events due right now.
//! Popping from an empty bucket 0 advances `cur_time` to the earliest time
//! in the first non-empty bucket and redistributes it downward. `cur_time`
//! only moves forward.
//!
//! Invalidation never touches the heap. Each event owner carries an
//! `EventTracker` remembering the time it currently wants an event at
//! (`desired`) and the earliest time it has actually queued (`queued`);
//! `resolve` reconciles the two when an event pops out, discarding stale
//! entries or requeueing at the newer desired time.

use crate::ints::{CyclicTime, Time};

/// Implemented by event types stored in the radix heap.
pub trait QueuedEvent {
    fn time(&self) -> CyclicTime;
    /// The "queue drained" marker value.
    fn sentinel() -> Self;
    fn is_sentinel(&self) -> bool;
}

#[derive(Debug)]
pub struct RadixHeap<E> {
    buckets: [Vec<E>; 33],
    pub cur_time: Time,
    len: usize,
}

impl<E: QueuedEvent> RadixHeap<E> {
    pub fn new() -> Self {
        RadixHeap {
            buckets: std::array::from_fn(|_| Vec::new()),
            cur_time: 0,
            len: 0,
        }
    }

    #[inline]
    fn bucket_of(&self, time: CyclicTime) -> usize {
        let diff = time.0 ^ self.cur_time as u32;
        (32 - diff.leading_zeros()) as usize
    }

    /// Enqueue an event. Its time must not precede `cur_time`.
    pub fn push(&mut self, event: E) {
        let bucket = self.bucket_of(event.time());
        self.buckets[bucket].push(event);
        self.len += 1;
    }

    /// Dequeue the earliest event, or the sentinel when empty.
    pub fn pop(&mut self) -> E {
        if self.len == 0 {
            return E::sentinel();
        }

        if let Some(event) = self.buckets[0].pop() {
            self.len -= 1;
            return event;
        }

        let bi = match self.buckets[1..].iter().position(|b| !b.is_empty()) {
            Some(i) => i + 1,
            None => return E::sentinel(),
        };

        let min_time = self.buckets[bi]
            .iter()
            .map(|e| e.time().0)
            .min()
            .expect("bucket is non-empty");
        self.cur_time = min_time as Time;

        let drained: Vec<E> = self.buckets[bi].drain(..).collect();
        for event in drained {
            let bucket = self.bucket_of(event.time());
            debug_assert!(bucket < bi);
            self.buckets[bucket].push(event);
        }

        self.len -= 1;
        self.buckets[0].pop().expect("bucket 0 holds the minimum")
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.len = 0;
    }

    pub fn reset(&mut self) {
        self.clear();
        self.cur_time = 0;
    }
}

impl<E: QueuedEvent> Default for RadixHeap<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-owner scheduling state for lazy invalidation.
#[derive(Debug, Clone, Default)]
pub struct EventTracker {
    desired: Option<CyclicTime>,
    queued: Option<CyclicTime>,
}

impl EventTracker {
    /// Ask for an event at `event.time()`. Enqueues only when nothing at
    /// least as early is already in flight.
    pub fn schedule<E: QueuedEvent>(&mut self, event: E, queue: &mut RadixHeap<E>) {
        let time = event.time();
        self.desired = Some(time);
        match self.queued {
            Some(queued) if queued.0 <= time.0 => {}
            _ => {
                self.queued = Some(time);
                queue.push(event);
            }
        }
    }

    /// Withdraw the desire for an event. Anything already queued will be
    /// discarded when it pops.
    pub fn cancel(&mut self) {
        self.desired = None;
    }

    /// Decide what to do with a popped event. Returns true when the event
    /// is live and should be processed. When the owner now wants a later
    /// time, a replacement is queued via `remake` and false is returned.
    pub fn resolve<E: QueuedEvent>(
        &mut self,
        event: &E,
        queue: &mut RadixHeap<E>,
        remake: impl FnOnce(CyclicTime) -> E,
    ) -> bool {
        if self.queued != Some(event.time()) {
            return false;
        }
        self.queued = None;

        let desired = match self.desired {
            Some(d) => d,
            None => return false,
        };
        if desired != event.time() {
            self.queued = Some(desired);
            queue.push(remake(desired));
            return false;
        }

        self.desired = None;
        true
    }

    pub fn clear(&mut self) {
        self.desired = None;
        self.queued = None;
    }
}
