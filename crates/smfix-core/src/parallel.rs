//! Index-strided parallel scans
//!
//! Work over a slice is split into lanes: lane `k` of `n` owns indices
//! `k, k + n, k + 2n, ...`. Each lane folds into its own accumulator and the
//! caller merges the returned accumulators after every lane has joined.
//! Only use this where lines are independent of each other.

use std::num::NonZeroUsize;
use std::thread;

/// Number of lanes used for a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lanes(NonZeroUsize);

impl Lanes {
    /// One lane per available hardware thread
    pub fn available() -> Self {
        Self(thread::available_parallelism().unwrap_or(NonZeroUsize::MIN))
    }

    /// A fixed lane count; zero means [`Lanes::available`]
    pub fn new(count: usize) -> Self {
        NonZeroUsize::new(count).map_or_else(Self::available, Self)
    }

    pub fn count(&self) -> usize {
        self.0.get()
    }

    /// Read-only scan. `work(acc, index, item)` runs once per item.
    pub fn scan<T, A, F>(&self, items: &[T], work: F) -> Vec<A>
    where
        T: Sync,
        A: Default + Send,
        F: Fn(&mut A, usize, &T) + Sync,
    {
        let lanes = self.count().min(items.len()).max(1);
        if lanes == 1 {
            let mut acc = A::default();
            for (index, item) in items.iter().enumerate() {
                work(&mut acc, index, item);
            }
            return vec![acc];
        }

        let work = &work;
        thread::scope(|scope| {
            let handles: Vec<_> = (0..lanes)
                .map(|lane| {
                    scope.spawn(move || {
                        let mut acc = A::default();
                        for index in (lane..items.len()).step_by(lanes) {
                            work(&mut acc, index, &items[index]);
                        }
                        acc
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(acc) => acc,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        })
    }

    /// Scan that may rewrite each item in place; lanes never touch each other's items.
    pub fn scan_mut<T, A, F>(&self, items: &mut [T], work: F) -> Vec<A>
    where
        T: Send,
        A: Default + Send,
        F: Fn(&mut A, usize, &mut T) + Sync,
    {
        let lanes = self.count().min(items.len()).max(1);
        if lanes == 1 {
            let mut acc = A::default();
            for (index, item) in items.iter_mut().enumerate() {
                work(&mut acc, index, item);
            }
            return vec![acc];
        }

        let mut buckets: Vec<Vec<(usize, &mut T)>> = (0..lanes)
            .map(|_| Vec::with_capacity(items.len() / lanes + 1))
            .collect();
        for (index, item) in items.iter_mut().enumerate() {
            buckets[index % lanes].push((index, item));
        }

        let work = &work;
        thread::scope(|scope| {
            let handles: Vec<_> = buckets
                .into_iter()
                .map(|bucket| {
                    scope.spawn(move || {
                        let mut acc = A::default();
                        for (index, item) in bucket {
                            work(&mut acc, index, item);
                        }
                        acc
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(acc) => acc,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        })
    }
}

impl Default for Lanes {
    fn default() -> Self {
        Self::available()
    }
}
