//! Presentation-facing reminder feed with a "while subscribed" lifetime.
//!
//! The feed starts out empty. The first subscriber makes it follow the
//! store's observed sequence; when the last subscriber leaves, the upstream
//! subscription is kept for a grace window and only then torn down. A
//! subscriber arriving inside the window cancels the teardown. Because the
//! upstream mirrors committed storage, resuming after a teardown loses
//! nothing.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use quickremind_core::Reminder;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::store::ReminderStore;

#[derive(Default)]
struct Lifecycle {
    subscribers: usize,
    upstream: Option<JoinHandle<()>>,
    teardown: Option<JoinHandle<()>>,
    /// Bumped on every subscribe so a stale teardown timer can tell it lost.
    generation: u64,
}

struct FeedShared {
    store: ReminderStore,
    grace: Duration,
    state_tx: Arc<watch::Sender<Vec<Reminder>>>,
    lifecycle: Mutex<Lifecycle>,
}

impl FeedShared {
    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        // Only counters and task handles live here; a poisoned guard is still usable.
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Shared, lazily-started view over [`ReminderStore::observe_all`].
#[derive(Clone)]
pub struct ReminderFeed {
    shared: Arc<FeedShared>,
}

impl ReminderFeed {
    pub fn new(store: ReminderStore, grace: Duration) -> Self {
        let (state_tx, _) = watch::channel(Vec::new());
        Self {
            shared: Arc::new(FeedShared {
                store,
                grace,
                state_tx: Arc::new(state_tx),
                lifecycle: Mutex::new(Lifecycle::default()),
            }),
        }
    }

    /// Register a subscriber. Must be called from within a Tokio runtime.
    ///
    /// Dropping the returned guard unsubscribes.
    pub fn subscribe(&self) -> FeedSubscription {
        let mut life = self.shared.lifecycle();
        life.subscribers += 1;
        life.generation += 1;

        if let Some(pending) = life.teardown.take() {
            pending.abort();
            debug!("pending feed teardown cancelled");
        }
        if life.upstream.is_none() {
            life.upstream = Some(spawn_upstream(
                self.shared.store.watch(),
                Arc::clone(&self.shared.state_tx),
            ));
            info!("reminder feed following store");
        }

        FeedSubscription {
            rx: self.shared.state_tx.subscribe(),
            shared: Arc::clone(&self.shared),
        }
    }

    /// Whether the upstream store subscription is currently alive.
    pub fn is_following(&self) -> bool {
        self.shared.lifecycle().upstream.is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.lifecycle().subscribers
    }

    /// Latest state held by the feed (empty before the first subscription).
    pub fn current(&self) -> Vec<Reminder> {
        self.shared.state_tx.borrow().clone()
    }
}

/// A live subscription to a [`ReminderFeed`].
pub struct FeedSubscription {
    rx: watch::Receiver<Vec<Reminder>>,
    shared: Arc<FeedShared>,
}

impl FeedSubscription {
    /// The most recent list, marking it as seen.
    pub fn current(&mut self) -> Vec<Reminder> {
        self.rx.borrow_and_update().clone()
    }

    /// Wait for the next list. Never returns `None` while the feed exists.
    pub async fn changed(&mut self) -> Option<Vec<Reminder>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        release(&self.shared);
    }
}

fn spawn_upstream(
    mut store_rx: watch::Receiver<Vec<Reminder>>,
    state_tx: Arc<watch::Sender<Vec<Reminder>>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let snapshot = store_rx.borrow_and_update().clone();
            state_tx.send_replace(snapshot);
            if store_rx.changed().await.is_err() {
                break;
            }
        }
    })
}

fn release(shared: &Arc<FeedShared>) {
    let mut life = shared.lifecycle();
    life.subscribers = life.subscribers.saturating_sub(1);
    if life.subscribers > 0 {
        return;
    }

    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        // No runtime to run the grace timer on: stop right away.
        if let Some(upstream) = life.upstream.take() {
            upstream.abort();
        }
        return;
    };

    let generation = life.generation;
    let grace = shared.grace;
    let shared = Arc::clone(shared);
    life.teardown = Some(runtime.spawn(async move {
        tokio::time::sleep(grace).await;
        let mut life = shared.lifecycle();
        if life.generation != generation || life.subscribers > 0 {
            return;
        }
        if let Some(upstream) = life.upstream.take() {
            upstream.abort();
            info!(grace_ms = grace.as_millis() as u64, "reminder feed stopped after grace window");
        }
        life.teardown = None;
    }));
    debug!(grace_ms = grace.as_millis() as u64, "last feed subscriber left");
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickremind_core::NewReminder;

    const GRACE: Duration = Duration::from_millis(50);
    const PAST_GRACE: Duration = Duration::from_millis(200);

    async fn wait_for(sub: &mut FeedSubscription, pred: impl Fn(&[Reminder]) -> bool) -> Vec<Reminder> {
        let current = sub.current();
        if pred(current.as_slice()) {
            return current;
        }
        loop {
            let next = tokio::time::timeout(Duration::from_secs(2), sub.changed())
                .await
                .expect("feed did not update in time")
                .expect("feed closed");
            if pred(next.as_slice()) {
                return next;
            }
        }
    }

    #[tokio::test]
    async fn starts_empty_then_mirrors_store() {
        let store = ReminderStore::open_in_memory().unwrap();
        store.insert(NewReminder::new("a", 1)).await.unwrap();
        let feed = ReminderFeed::new(store.clone(), GRACE);
        assert!(feed.current().is_empty());
        assert!(!feed.is_following());

        let mut sub = feed.subscribe();
        let list = wait_for(&mut sub, |l| l.len() == 1).await;
        assert_eq!(list[0].title, "a");

        store.insert(NewReminder::new("b", 0)).await.unwrap();
        let list = wait_for(&mut sub, |l| l.len() == 2).await;
        assert_eq!(list[0].title, "b");
    }

    #[tokio::test]
    async fn upstream_stops_after_grace_window() {
        let store = ReminderStore::open_in_memory().unwrap();
        let feed = ReminderFeed::new(store, GRACE);

        let sub = feed.subscribe();
        drop(sub);
        assert!(feed.is_following());
        assert_eq!(feed.subscriber_count(), 0);

        tokio::time::sleep(PAST_GRACE).await;
        assert!(!feed.is_following());
    }

    #[tokio::test]
    async fn resubscribe_inside_grace_keeps_upstream() {
        let store = ReminderStore::open_in_memory().unwrap();
        let feed = ReminderFeed::new(store.clone(), GRACE);

        drop(feed.subscribe());
        tokio::time::sleep(Duration::from_millis(10)).await;
        let mut sub = feed.subscribe();

        tokio::time::sleep(PAST_GRACE).await;
        assert!(feed.is_following());

        store.insert(NewReminder::new("kept alive", 5)).await.unwrap();
        wait_for(&mut sub, |l| l.len() == 1).await;
    }

    #[tokio::test]
    async fn resume_after_teardown_reflects_committed_state() {
        let store = ReminderStore::open_in_memory().unwrap();
        let feed = ReminderFeed::new(store.clone(), GRACE);

        drop(feed.subscribe());
        tokio::time::sleep(PAST_GRACE).await;
        assert!(!feed.is_following());

        store.insert(NewReminder::new("while hidden", 7)).await.unwrap();

        let mut sub = feed.subscribe();
        let list = wait_for(&mut sub, |l| l.len() == 1).await;
        assert_eq!(list[0].title, "while hidden");
    }
}
