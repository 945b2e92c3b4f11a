//! Copy-on-write state container with replay-latest subscription.
//!
//! Every publication replaces the whole snapshot. Readers hold an `Arc` to an
//! immutable value, so a snapshot never changes underneath them. Updates run
//! under the channel's write lock: read-current, compute-next and publish are
//! one atomic step and concurrent writers cannot both start from the same
//! snapshot.

use std::sync::Arc;

use tokio::sync::watch;

/// Single-writer publisher of immutable `S` snapshots.
#[derive(Debug)]
pub struct StateContainer<S> {
    tx: Arc<watch::Sender<Arc<S>>>,
}

impl<S> Clone for StateContainer<S> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<S> StateContainer<S> {
    #[must_use]
    pub fn new(initial: S) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Self { tx: Arc::new(tx) }
    }

    /// The latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<S> {
        Arc::clone(&self.tx.borrow())
    }

    /// New subscribers see the current snapshot immediately, then every later
    /// publication they have not yet observed.
    #[must_use]
    pub fn subscribe(&self) -> Subscription<S> {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Unconditionally publish `next`.
    pub fn replace(&self, next: S) {
        self.tx.send_replace(Arc::new(next));
    }

    /// Derive the next snapshot from the current one.
    ///
    /// `f` returning `None` leaves the state untouched and wakes nobody.
    /// Returns whether a new snapshot was published.
    pub fn update(&self, f: impl FnOnce(&S) -> Option<S>) -> bool {
        self.tx.send_if_modified(|current| match f(&**current) {
            Some(next) => {
                *current = Arc::new(next);
                true
            }
            None => false,
        })
    }
}

/// Receiving half of a [`StateContainer`].
///
/// Latest-value semantics: a slow subscriber may skip intermediate snapshots
/// but never observes them out of order.
#[derive(Debug)]
pub struct Subscription<S> {
    rx: watch::Receiver<Arc<S>>,
}

impl<S> Clone for Subscription<S> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

impl<S> Subscription<S> {
    /// The latest snapshot, marking it as seen.
    pub fn current(&mut self) -> Arc<S> {
        Arc::clone(&self.rx.borrow_and_update())
    }

    /// Wait for the next unseen snapshot.
    ///
    /// Returns `None` once the publisher is gone and nothing new is pending.
    pub async fn changed(&mut self) -> Option<Arc<S>> {
        self.rx.changed().await.ok()?;
        Some(self.current())
    }

    /// Wait until a snapshot satisfies `predicate`, checking the current one first.
    pub async fn wait_for(&mut self, mut predicate: impl FnMut(&S) -> bool) -> Option<Arc<S>> {
        let guard = self.rx.wait_for(|state| predicate(&**state)).await.ok()?;
        Some(Arc::clone(&guard))
    }

    /// Whether a snapshot newer than the last observed one has been published.
    #[must_use]
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriber_replays_latest_snapshot() {
        let container = StateContainer::new(1_u32);
        container.replace(2);
        container.replace(3);

        let mut sub = container.subscribe();
        assert_eq!(*sub.current(), 3);
        assert!(!sub.has_changed());
    }

    #[test]
    fn update_returning_none_publishes_nothing() {
        let container = StateContainer::new(String::from("a"));
        let sub = container.subscribe();

        assert!(!container.update(|_| None));
        assert!(!sub.has_changed());

        assert!(container.update(|s| Some(format!("{s}b"))));
        assert!(sub.has_changed());
        assert_eq!(container.snapshot().as_str(), "ab");
    }

    #[test]
    fn old_snapshots_are_never_mutated() {
        let container = StateContainer::new(vec![1, 2]);
        let before = container.snapshot();
        container.update(|v| {
            let mut next = v.clone();
            next.push(3);
            Some(next)
        });
        assert_eq!(*before, vec![1, 2]);
        assert_eq!(*container.snapshot(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn changed_returns_none_after_publisher_dropped() {
        let container = StateContainer::new(0_u8);
        let mut sub = container.subscribe();
        container.replace(1);
        drop(container);

        assert_eq!(sub.changed().await.as_deref(), Some(&1));
        assert!(sub.changed().await.is_none());
    }

    #[tokio::test]
    async fn concurrent_updates_are_not_lost() {
        let container = StateContainer::new(0_u32);
        let mut handles = Vec::new();
        for _ in 0..16 {
            let container = container.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    container.update(|n| Some(n + 1));
                    tokio::task::yield_now().await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(*container.snapshot(), 1600);
    }
}
