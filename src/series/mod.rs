//! Bounded time-series buffer.
//!
//! Keeps the most recent `capacity` samples of a stream in insertion order.
//! A single receive loop writes, any number of readers take snapshots.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock};

/// A decoded payload stamped with the moment it was received.
#[derive(Debug, Clone, PartialEq)]
pub struct TimestampedSample<T> {
    pub payload: T,
    pub observed_at: DateTime<Utc>,
}

impl<T> TimestampedSample<T> {
    /// Stamp a payload with the current time.
    pub fn now(payload: T) -> Self {
        Self {
            payload,
            observed_at: Utc::now(),
        }
    }

    pub fn at(payload: T, observed_at: DateTime<Utc>) -> Self {
        Self {
            payload,
            observed_at,
        }
    }
}

/// Point-in-time copy of a series, oldest sample first.
pub type Snapshot<T> = Vec<Arc<TimestampedSample<T>>>;

/// Fixed-capacity ring of samples (oldest evicted first).
///
/// Samples are stored behind `Arc` so that snapshots are cheap and never
/// observe a partially written entry.
#[derive(Debug)]
pub struct BoundedSeries<T> {
    entries: RwLock<VecDeque<Arc<TimestampedSample<T>>>>,
    capacity: usize,
}

impl<T> BoundedSeries<T> {
    /// Creates an empty series. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends a payload stamped with the current time.
    pub fn push(&self, payload: T) {
        self.push_sample(TimestampedSample::now(payload));
    }

    /// Appends a sample, evicting the oldest entry if at capacity.
    pub fn push_sample(&self, sample: TimestampedSample<T>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(Arc::new(sample));
    }

    /// Returns all samples in insertion order (oldest first).
    ///
    /// Each call takes a fresh snapshot; appends made after the call are
    /// not visible in the returned vector.
    pub fn snapshot(&self) -> Snapshot<T> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Most recently appended sample.
    pub fn latest(&self) -> Option<Arc<TimestampedSample<T>>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .back()
            .cloned()
    }

    /// Returns up to `n` of the newest samples, oldest first.
    pub fn tail(&self, n: usize) -> Snapshot<T> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let skip = entries.len().saturating_sub(n);
        entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    /// Drops every sample. The next read observes an empty series.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
