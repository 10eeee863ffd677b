//! Bounded multi-producer signal queue
//!
//! Transport callbacks push from any thread; the consumer loop drains in
//! batches. A full queue drops new samples instead of blocking the
//! transport, and counts what it dropped.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::signal::SignalSample;

/// Bounded FIFO between the transport and the consumer loop.
#[derive(Debug)]
pub struct SignalQueue {
    inner: Mutex<VecDeque<SignalSample>>,
    capacity: usize,
    dropped: AtomicU64,
}

impl SignalQueue {
    /// Create a queue bounded to `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    /// Push a sample; returns false when the queue was full and the
    /// sample was dropped.
    pub fn push(&self, sample: SignalSample) -> bool {
        let mut queue = self.inner.lock();
        if queue.len() >= self.capacity {
            drop(queue);
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        queue.push_back(sample);
        true
    }

    /// Move up to `max` samples into `out`, oldest first. Returns the
    /// number moved; never blocks.
    pub fn drain_into(&self, out: &mut Vec<SignalSample>, max: usize) -> usize {
        let mut queue = self.inner.lock();
        let count = max.min(queue.len());
        out.extend(queue.drain(..count));
        count
    }

    /// Samples currently queued.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total samples dropped at a full queue since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Discard everything queued.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn sample(i: usize) -> SignalSample {
        SignalSample::float(format!("Leash_Stretch_{i}"), i as f32)
    }

    #[test]
    fn test_fifo_order() {
        let queue = SignalQueue::new(10);
        for i in 0..5 {
            assert!(queue.push(sample(i)));
        }
        let mut out = Vec::new();
        assert_eq!(queue.drain_into(&mut out, 10), 5);
        assert_eq!(out[0], sample(0));
        assert_eq!(out[4], sample(4));
    }

    #[test]
    fn test_overflow_drops_exactly_one() {
        let queue = SignalQueue::new(1000);
        let mut accepted = 0;
        for i in 0..1001 {
            if queue.push(sample(i)) {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 1000);
        assert_eq!(queue.len(), 1000);
        assert_eq!(queue.dropped(), 1);
    }

    #[test]
    fn test_drain_respects_batch_limit() {
        let queue = SignalQueue::new(100);
        for i in 0..30 {
            queue.push(sample(i));
        }
        let mut out = Vec::new();
        assert_eq!(queue.drain_into(&mut out, 10), 10);
        assert_eq!(queue.len(), 20);
        // Oldest first.
        assert_eq!(out[0], sample(0));
    }

    #[test]
    fn test_clear() {
        let queue = SignalQueue::new(10);
        queue.push(sample(1));
        queue.push(sample(2));
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.dropped(), 0);
    }

    #[test]
    fn test_concurrent_producers() {
        let queue = Arc::new(SignalQueue::new(500));
        let mut handles = Vec::new();
        for t in 0..8 {
            let queue = Arc::clone(&queue);
            handles.push(std::thread::spawn(move || {
                for i in 0..100 {
                    queue.push(sample(t * 100 + i));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        // 800 pushes against capacity 500: everything is either queued
        // or counted as dropped.
        assert_eq!(queue.len() as u64 + queue.dropped(), 800);
        assert_eq!(queue.len(), 500);
    }
}
