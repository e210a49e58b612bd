//! Bounded FIFO between the decode thread and the display loop.
//!
//! The buffer never blocks the consumer: `enqueue` and `dequeue` return
//! immediately. Producers that want to wait for space do so explicitly with
//! [`RingBuffer::wait_for_space`], which is a bounded condition-variable wait.

use parking_lot::{Condvar, MappedMutexGuard, Mutex, MutexGuard};
use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

/// Rejected buffer operation. Enqueue failures hand the item back.
#[derive(Debug, PartialEq, Eq)]
pub enum BufferError<T> {
    /// The buffer holds `capacity` items.
    Full(T),
    /// Nothing to dequeue.
    Empty,
    /// The buffer was closed; no further items are accepted.
    Closed(T),
}

impl<T> BufferError<T> {
    /// Recover the rejected item, if any.
    pub fn into_inner(self) -> Option<T> {
        match self {
            Self::Full(item) | Self::Closed(item) => Some(item),
            Self::Empty => None,
        }
    }
}

impl<T> fmt::Display for BufferError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(_) => f.write_str("ring buffer is full"),
            Self::Empty => f.write_str("ring buffer is empty"),
            Self::Closed(_) => f.write_str("ring buffer is closed"),
        }
    }
}

impl<T: fmt::Debug> std::error::Error for BufferError<T> {}

struct Slots<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Fixed-capacity FIFO, safe for any number of producers and consumers.
pub struct RingBuffer<T> {
    slots: Mutex<Slots<T>>,
    capacity: usize,
    item_available: Condvar,
    space_available: Condvar,
}

impl<T> RingBuffer<T> {
    /// Create an empty buffer. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Mutex::new(Slots {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            capacity,
            item_available: Condvar::new(),
            space_available: Condvar::new(),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.slots.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.slots.lock().closed
    }

    /// Append at the tail. Never overwrites the head.
    pub fn enqueue(&self, item: T) -> Result<(), BufferError<T>> {
        let mut slots = self.slots.lock();
        if slots.closed {
            return Err(BufferError::Closed(item));
        }
        if slots.items.len() >= self.capacity {
            return Err(BufferError::Full(item));
        }
        slots.items.push_back(item);
        drop(slots);
        self.item_available.notify_all();
        Ok(())
    }

    /// Remove the head.
    pub fn dequeue(&self) -> Result<T, BufferError<T>> {
        let item = self.slots.lock().items.pop_front();
        match item {
            Some(item) => {
                self.space_available.notify_one();
                Ok(item)
            }
            None => Err(BufferError::Empty),
        }
    }

    /// Borrow the head without removing it.
    ///
    /// The buffer stays locked while the guard lives; keep it short.
    pub fn peek(&self) -> Option<MappedMutexGuard<'_, T>> {
        MutexGuard::try_map(self.slots.lock(), |slots| slots.items.front_mut()).ok()
    }

    /// Run `f` on the head without removing it.
    pub fn peek_with<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.slots.lock().items.front().map(f)
    }

    /// Drop every buffered item. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let dropped = {
            let mut slots = self.slots.lock();
            let count = slots.items.len();
            slots.items.clear();
            count
        };
        self.space_available.notify_all();
        dropped
    }

    /// Reject all further enqueues and wake every waiter.
    pub fn close(&self) {
        self.slots.lock().closed = true;
        self.space_available.notify_all();
        self.item_available.notify_all();
    }

    /// Wait up to `timeout` until an enqueue could succeed.
    ///
    /// Returns `false` on timeout or when the buffer is closed.
    pub fn wait_for_space(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut slots = self.slots.lock();
        while slots.items.len() >= self.capacity && !slots.closed {
            if self
                .space_available
                .wait_until(&mut slots, deadline)
                .timed_out()
            {
                break;
            }
        }
        !slots.closed && slots.items.len() < self.capacity
    }

    /// Wait up to `timeout` until at least `n` items are buffered.
    ///
    /// Returns `false` on timeout or when the buffer is closed first.
    pub fn wait_for_len(&self, n: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut slots = self.slots.lock();
        while slots.items.len() < n && !slots.closed {
            if self
                .item_available
                .wait_until(&mut slots, deadline)
                .timed_out()
            {
                break;
            }
        }
        slots.items.len() >= n
    }
}

impl<T> fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.slots.lock();
        f.debug_struct("RingBuffer")
            .field("len", &slots.items.len())
            .field("capacity", &self.capacity)
            .field("closed", &slots.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_fifo_order() {
        let rb = RingBuffer::new(4);
        for i in 0..4 {
            rb.enqueue(i).unwrap();
        }
        assert!(rb.is_full());
        for i in 0..4 {
            assert_eq!(rb.dequeue().unwrap(), i);
        }
        assert_eq!(rb.dequeue(), Err(BufferError::Empty));
    }

    #[test]
    fn test_full_hands_item_back() {
        let rb = RingBuffer::new(1);
        rb.enqueue("a").unwrap();
        let err = rb.enqueue("b").unwrap_err();
        assert_eq!(err, BufferError::Full("b"));
        assert_eq!(err.into_inner(), Some("b"));
        // Head untouched
        assert_eq!(rb.peek_with(|s| *s), Some("a"));
    }

    #[test]
    fn test_peek() {
        let rb = RingBuffer::new(2);
        assert!(rb.peek().is_none());
        rb.enqueue(7).unwrap();
        rb.enqueue(8).unwrap();
        assert_eq!(rb.peek().map(|g| *g), Some(7));
        assert_eq!(rb.len(), 2);
    }

    #[test]
    fn test_close_rejects_enqueue() {
        let rb = RingBuffer::new(2);
        rb.enqueue(1).unwrap();
        rb.close();
        assert_eq!(rb.enqueue(2), Err(BufferError::Closed(2)));
        // Remaining items can still be drained
        assert_eq!(rb.dequeue(), Ok(1));
        assert!(!rb.wait_for_space(Duration::from_millis(1)));
    }

    #[test]
    fn test_clear() {
        let rb = RingBuffer::new(3);
        rb.enqueue(1).unwrap();
        rb.enqueue(2).unwrap();
        assert_eq!(rb.clear(), 2);
        assert!(rb.is_empty());
    }

    #[test]
    fn test_zero_capacity_raised() {
        let rb: RingBuffer<u8> = RingBuffer::new(0);
        assert_eq!(rb.capacity(), 1);
    }

    #[test]
    fn test_wait_for_space_wakes_on_dequeue() {
        let rb = Arc::new(RingBuffer::new(1));
        rb.enqueue(0).unwrap();

        let consumer = {
            let rb = Arc::clone(&rb);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                rb.dequeue().unwrap()
            })
        };

        assert!(rb.wait_for_space(Duration::from_secs(5)));
        assert_eq!(consumer.join().unwrap(), 0);
    }

    #[test]
    fn test_wait_for_space_times_out() {
        let rb = RingBuffer::new(1);
        rb.enqueue(0).unwrap();
        let start = Instant::now();
        assert!(!rb.wait_for_space(Duration::from_millis(15)));
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn test_wait_for_len() {
        let rb = Arc::new(RingBuffer::new(8));
        let producer = {
            let rb = Arc::clone(&rb);
            thread::spawn(move || {
                for i in 0..5 {
                    rb.enqueue(i).unwrap();
                }
            })
        };
        assert!(rb.wait_for_len(5, Duration::from_secs(5)));
        producer.join().unwrap();
        assert!(!rb.wait_for_len(6, Duration::from_millis(5)));
    }

    #[test]
    fn test_multiple_producers_keep_bound() {
        let rb = Arc::new(RingBuffer::new(4));
        let producers: Vec<_> = (0..4)
            .map(|p| {
                let rb = Arc::clone(&rb);
                thread::spawn(move || {
                    let mut pending = Some(p * 100);
                    let mut sent = 0;
                    while sent < 25 {
                        let item = pending.take().unwrap_or(p * 100 + sent);
                        match rb.enqueue(item) {
                            Ok(()) => sent += 1,
                            Err(e) => {
                                pending = e.into_inner();
                                rb.wait_for_space(Duration::from_millis(5));
                            }
                        }
                    }
                })
            })
            .collect();

        let mut received = 0;
        while received < 100 {
            assert!(rb.len() <= 4);
            if rb.dequeue().is_ok() {
                received += 1;
            } else {
                rb.wait_for_len(1, Duration::from_millis(5));
            }
        }
        for p in producers {
            p.join().unwrap();
        }
        assert!(rb.is_empty());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Enqueue(u32),
            Dequeue,
            Peek,
            Clear,
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                4 => any::<u32>().prop_map(Op::Enqueue),
                3 => Just(Op::Dequeue),
                1 => Just(Op::Peek),
                1 => Just(Op::Clear),
            ]
        }

        proptest! {
            #[test]
            fn matches_bounded_fifo_model(capacity in 1usize..32, ops in prop::collection::vec(op(), 0..200)) {
                let rb = RingBuffer::new(capacity);
                let mut model: VecDeque<u32> = VecDeque::new();

                for op in ops {
                    match op {
                        Op::Enqueue(v) => {
                            let result = rb.enqueue(v);
                            if model.len() < capacity {
                                prop_assert!(result.is_ok());
                                model.push_back(v);
                            } else {
                                prop_assert_eq!(result, Err(BufferError::Full(v)));
                            }
                        }
                        Op::Dequeue => {
                            match model.pop_front() {
                                Some(v) => prop_assert_eq!(rb.dequeue(), Ok(v)),
                                None => prop_assert_eq!(rb.dequeue(), Err(BufferError::Empty)),
                            }
                        }
                        Op::Peek => {
                            prop_assert_eq!(rb.peek_with(|v| *v), model.front().copied());
                        }
                        Op::Clear => {
                            prop_assert_eq!(rb.clear(), model.len());
                            model.clear();
                        }
                    }
                    prop_assert!(rb.len() <= capacity);
                    prop_assert_eq!(rb.len(), model.len());
                }
            }
        }
    }
}
