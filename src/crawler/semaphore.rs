//! Counting semaphore with explicit, idempotently released permits
//!
//! Unlike `tokio::sync::Semaphore`, every grant is a distinct [`Permit`] whose
//! release is tracked in a held set, so releasing the same permit twice is a
//! no-op. A released unit goes straight to the longest-waiting acquirer
//! instead of back into the pool, which keeps queued downloads from being
//! starved by fresh arrivals.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;

/// Identifier of a granted permit
pub type PermitId = u64;

#[derive(Debug)]
struct Inner {
    permits: usize,
    waiters: VecDeque<oneshot::Sender<PermitId>>,
    held: HashSet<PermitId>,
    next_id: PermitId,
}

impl Inner {
    fn grant(&mut self) -> PermitId {
        let id = self.next_id;
        self.next_id += 1;
        self.held.insert(id);
        id
    }
}

/// Counting lock bounding how many downloads run at once
#[derive(Debug)]
pub struct Semaphore {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl Semaphore {
    /// Creates a semaphore with `capacity` permits
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(Inner {
                permits: capacity,
                waiters: VecDeque::new(),
                held: HashSet::new(),
                next_id: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Acquires a permit, waiting in FIFO order if none is free
    ///
    /// Returns immediately when a permit is available. Cancelling the returned
    /// future while it waits never loses a unit.
    pub async fn acquire(self: &Arc<Self>) -> Permit {
        loop {
            let receiver = {
                let mut inner = self.lock();
                if inner.permits > 0 {
                    inner.permits -= 1;
                    let id = inner.grant();
                    return Permit::new(Arc::clone(self), id);
                }

                let (sender, receiver) = oneshot::channel();
                inner.waiters.push_back(sender);
                receiver
            };

            let mut waiter = Waiter {
                semaphore: self.as_ref(),
                receiver: Some(receiver),
            };

            if let Some(id) = waiter.wait().await {
                return Permit::new(Arc::clone(self), id);
            }
        }
    }

    /// Returns a free permit without waiting, or None if all are taken
    pub fn try_acquire(self: &Arc<Self>) -> Option<Permit> {
        let mut inner = self.lock();
        if inner.permits == 0 {
            return None;
        }
        inner.permits -= 1;
        let id = inner.grant();
        Some(Permit::new(Arc::clone(self), id))
    }

    /// Releases a permit
    ///
    /// Returns false if the permit was already released. Otherwise the unit is
    /// handed to the front waiter, or returned to the pool if nobody waits.
    pub fn release(&self, permit: &Permit) -> bool {
        self.release_id(permit.id)
    }

    fn release_id(&self, id: PermitId) -> bool {
        let mut inner = self.lock();
        if !inner.held.remove(&id) {
            return false;
        }

        while let Some(waiter) = inner.waiters.pop_front() {
            let next = inner.grant();
            match waiter.send(next) {
                Ok(()) => return true,
                // The acquirer went away before the hand-off
                Err(_) => {
                    inner.held.remove(&next);
                }
            }
        }

        inner.permits += 1;
        true
    }

    /// Total number of permits
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of permits currently free
    pub fn available_permits(&self) -> usize {
        self.lock().permits
    }

    /// Number of permits granted and not yet released
    pub fn held(&self) -> usize {
        self.lock().held.len()
    }

    /// Number of acquirers waiting for a permit
    pub fn waiting(&self) -> usize {
        self.lock().waiters.iter().filter(|w| !w.is_closed()).count()
    }
}

/// Pending acquisition; gives back a unit that arrives after cancellation
struct Waiter<'a> {
    semaphore: &'a Semaphore,
    receiver: Option<oneshot::Receiver<PermitId>>,
}

impl Waiter<'_> {
    async fn wait(&mut self) -> Option<PermitId> {
        let receiver = self.receiver.as_mut()?;
        let result = receiver.await;
        self.receiver = None;
        result.ok()
    }
}

impl Drop for Waiter<'_> {
    fn drop(&mut self) {
        if let Some(mut receiver) = self.receiver.take() {
            receiver.close();
            if let Ok(id) = receiver.try_recv() {
                self.semaphore.release_id(id);
            }
        }
    }
}

/// The right to run one download
///
/// Released explicitly with [`Permit::release`] or implicitly on drop;
/// whichever happens first counts, later releases do nothing.
#[derive(Debug)]
pub struct Permit {
    semaphore: Arc<Semaphore>,
    id: PermitId,
}

impl Permit {
    fn new(semaphore: Arc<Semaphore>, id: PermitId) -> Self {
        Self { semaphore, id }
    }

    /// Identifier of this grant
    pub fn id(&self) -> PermitId {
        self.id
    }

    /// Releases the permit; returns false if it was already released
    pub fn release(&self) -> bool {
        self.semaphore.release_id(self.id)
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.semaphore.release_id(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_acquire_within_capacity_is_immediate() {
        let semaphore = Arc::new(Semaphore::new(2));
        let a = semaphore.acquire().await;
        let b = semaphore.acquire().await;

        assert_ne!(a.id(), b.id());
        assert_eq!(semaphore.available_permits(), 0);
        assert_eq!(semaphore.held(), 2);
        assert!(semaphore.try_acquire().is_none());
    }

    #[tokio::test]
    async fn test_double_release_is_noop() {
        let semaphore = Arc::new(Semaphore::new(1));
        let permit = semaphore.acquire().await;

        assert!(semaphore.release(&permit));
        assert!(!semaphore.release(&permit));
        assert!(!permit.release());
        assert_eq!(semaphore.available_permits(), 1);

        drop(permit);
        assert_eq!(semaphore.available_permits(), 1);
        assert_eq!(semaphore.held(), 0);
    }

    #[tokio::test]
    async fn test_drop_releases() {
        let semaphore = Arc::new(Semaphore::new(1));
        {
            let _permit = semaphore.acquire().await;
            assert_eq!(semaphore.available_permits(), 0);
        }
        assert_eq!(semaphore.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_release_hands_unit_to_waiter() {
        let semaphore = Arc::new(Semaphore::new(1));
        let first = semaphore.acquire().await;

        let sem = Arc::clone(&semaphore);
        let waiter = tokio::spawn(async move { sem.acquire().await.id() });

        while semaphore.waiting() == 0 {
            tokio::task::yield_now().await;
        }

        first.release();
        // The unit went to the waiter, not back to the pool
        assert_eq!(semaphore.available_permits(), 0);
        assert_eq!(semaphore.held(), 1);

        let id = waiter.await.unwrap();
        assert_ne!(id, first.id());
        assert_eq!(semaphore.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_waiters_served_fifo() {
        let semaphore = Arc::new(Semaphore::new(1));
        let gate = semaphore.acquire().await;
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..4 {
            let sem = Arc::clone(&semaphore);
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                let permit = sem.acquire().await;
                order.lock().unwrap().push(i);
                drop(permit);
            }));
            // Make sure waiter i is queued before waiter i + 1
            while semaphore.waiting() < i + 1 {
                tokio::task::yield_now().await;
            }
        }

        drop(gate);
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(semaphore.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_holders_never_exceed_capacity() {
        let semaphore = Arc::new(Semaphore::new(3));
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let sem = Arc::clone(&semaphore);
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                let permit = sem.acquire().await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                permit.release();
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(semaphore.available_permits(), 3);
        assert_eq!(semaphore.held(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_waiter_does_not_leak() {
        let semaphore = Arc::new(Semaphore::new(1));
        let permit = semaphore.acquire().await;

        let pending = tokio::time::timeout(Duration::from_millis(20), semaphore.acquire()).await;
        assert!(pending.is_err());

        permit.release();
        assert_eq!(semaphore.available_permits(), 1);
        assert_eq!(semaphore.held(), 0);
    }
}
