//! Completion counter for a batch of asynchronous units.
//!
//! Every unit takes a [`UnitGuard`] before it is dispatched and drops it when
//! it finishes, whatever the outcome. The batch is complete when the counter
//! has been [sealed](CompletionCounter::seal) (no more units will be
//! dispatched) and the outstanding count is zero. Without the seal, a unit
//! that finishes inside the dispatch loop could bring the count to zero while
//! later units are still waiting to be dispatched.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::watch;

#[derive(Debug)]
struct Inner {
    outstanding: AtomicUsize,
    dispatched: AtomicUsize,
    sealed: AtomicBool,
    fired: AtomicBool,
    signals: AtomicUsize,
    done: watch::Sender<bool>,
}

impl Inner {
    fn try_fire(&self) {
        if !self.sealed.load(Ordering::Acquire) || self.outstanding.load(Ordering::Acquire) != 0 {
            return;
        }
        if self
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.signals.fetch_add(1, Ordering::AcqRel);
            self.done.send_replace(true);
        }
    }
}

/// Cheaply cloneable handle; clones share the same batch.
#[derive(Debug, Clone)]
pub struct CompletionCounter {
    inner: Arc<Inner>,
}

impl Default for CompletionCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionCounter {
    pub fn new() -> Self {
        let (done, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                outstanding: AtomicUsize::new(0),
                dispatched: AtomicUsize::new(0),
                sealed: AtomicBool::new(false),
                fired: AtomicBool::new(false),
                signals: AtomicUsize::new(0),
                done,
            }),
        }
    }

    /// Register one unit of work. The unit completes when the guard drops.
    pub fn increment(&self) -> UnitGuard {
        debug_assert!(
            !self.inner.sealed.load(Ordering::Acquire),
            "unit dispatched after the batch was sealed"
        );
        self.inner.outstanding.fetch_add(1, Ordering::AcqRel);
        self.inner.dispatched.fetch_add(1, Ordering::AcqRel);
        UnitGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Declare that no further units will be dispatched.
    pub fn seal(&self) {
        self.inner.sealed.store(true, Ordering::Release);
        self.inner.try_fire();
    }

    /// Wait until the batch is sealed and every unit has completed.
    pub async fn wait(&self) {
        let mut rx = self.inner.done.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|done| *done).await;
    }

    pub fn is_complete(&self) -> bool {
        *self.inner.done.borrow()
    }

    pub fn is_sealed(&self) -> bool {
        self.inner.sealed.load(Ordering::Acquire)
    }

    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::Acquire)
    }

    /// Total number of units registered so far.
    pub fn dispatched(&self) -> usize {
        self.inner.dispatched.load(Ordering::Acquire)
    }

    /// How many times the completion signal fired (0 or 1).
    pub fn signals(&self) -> usize {
        self.inner.signals.load(Ordering::Acquire)
    }
}

/// Outstanding unit of work. Dropping it marks the unit complete.
#[derive(Debug)]
#[must_use = "dropping the guard completes the unit immediately"]
pub struct UnitGuard {
    inner: Arc<Inner>,
}

impl UnitGuard {
    /// Complete the unit explicitly.
    pub fn complete(self) {}
}

impl Drop for UnitGuard {
    fn drop(&mut self) {
        if self.inner.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.try_fire();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn zero_count_before_seal_does_not_fire() {
        let counter = CompletionCounter::new();
        let first = counter.increment();
        first.complete();

        assert_eq!(counter.outstanding(), 0);
        assert!(!counter.is_complete());

        let second = counter.increment();
        counter.seal();
        assert!(!counter.is_complete());

        drop(second);
        assert!(counter.is_complete());
        assert_eq!(counter.signals(), 1);
    }

    #[test]
    fn empty_batch_completes_on_seal() {
        let counter = CompletionCounter::new();
        counter.seal();
        assert!(counter.is_complete());
        counter.seal();
        assert_eq!(counter.signals(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn fires_once_for_any_completion_order() {
        for round in 0..20u64 {
            let counter = CompletionCounter::new();
            let finished = Arc::new(AtomicUsize::new(0));
            let n = 64;

            for i in 0..n {
                let guard = counter.increment();
                let finished = Arc::clone(&finished);
                // Mix of synchronous completions and delayed ones.
                if (i + round) % 3 == 0 {
                    finished.fetch_add(1, Ordering::SeqCst);
                    drop(guard);
                } else {
                    let delay = Duration::from_micros(((i * 37 + round * 11) % 500) as u64);
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        finished.fetch_add(1, Ordering::SeqCst);
                        drop(guard);
                    });
                }
            }
            counter.seal();
            counter.wait().await;

            assert_eq!(finished.load(Ordering::SeqCst), n as usize);
            assert_eq!(counter.dispatched(), n as usize);
            assert_eq!(counter.signals(), 1);
        }
    }

    #[tokio::test]
    async fn late_waiter_sees_completion() {
        let counter = CompletionCounter::new();
        let guard = counter.increment();
        counter.seal();
        drop(guard);

        tokio::time::timeout(Duration::from_secs(1), counter.wait())
            .await
            .expect("completed batch must not block");
    }
}
