//! Shared, ref-counted status pollers keyed by resource name.
//!
//! Every view that needs the connection status subscribes here instead of
//! mounting its own poller, so one resource is polled once no matter how
//! many views watch it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use propdash_api::StatusSource;
use propdash_core::ConnectionStatus;
use tokio::sync::watch;

use crate::error::CacheError;
use crate::poller::{PollerConfig, StatusPoller};
use crate::scheduler::Scheduler;
use crate::tracker::PollerView;

/// Authenticated status of the signed-in user.
pub const MY_STATUS: &str = "my-status";
/// Unauthenticated service status.
pub const PUBLIC_STATUS: &str = "public-status";

struct Resource {
    source: Arc<dyn StatusSource>,
    config: PollerConfig,
}

struct Entry {
    poller: Arc<StatusPoller>,
    subscribers: usize,
}

type Entries = Arc<Mutex<HashMap<String, Entry>>>;

fn lock(entries: &Entries) -> MutexGuard<'_, HashMap<String, Entry>> {
    entries.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct StatusCache {
    scheduler: Arc<dyn Scheduler>,
    resources: HashMap<String, Resource>,
    entries: Entries,
}

impl StatusCache {
    pub fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            resources: HashMap::new(),
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register the source behind `key`.
    pub fn register<S>(&mut self, key: &str, source: S, config: PollerConfig)
    where
        S: StatusSource + 'static,
    {
        self.resources.insert(
            key.to_string(),
            Resource {
                source: Arc::new(source),
                config,
            },
        );
    }

    /// Subscribe to `key`, mounting its poller if nobody watches it yet.
    pub fn subscribe(&self, key: &str) -> Result<StatusSubscription, CacheError> {
        let resource = self
            .resources
            .get(key)
            .ok_or_else(|| CacheError::UnknownResource(key.to_string()))?;

        let mut entries = lock(&self.entries);
        let entry = entries.entry(key.to_string()).or_insert_with(|| {
            tracing::debug!(key, "mounting shared status poller");
            Entry {
                poller: Arc::new(StatusPoller::mount(
                    Arc::clone(&resource.source),
                    Arc::clone(&self.scheduler),
                    resource.config,
                )),
                subscribers: 0,
            }
        });
        entry.subscribers += 1;

        Ok(StatusSubscription {
            key: key.to_string(),
            rx: entry.poller.subscribe(),
            poller: Arc::clone(&entry.poller),
            entries: Arc::clone(&self.entries),
        })
    }

    /// Number of subscribers currently sharing `key`.
    pub fn subscriber_count(&self, key: &str) -> usize {
        lock(&self.entries)
            .get(key)
            .map(|e| e.subscribers)
            .unwrap_or(0)
    }
}

/// A live view of one cached resource. Dropping the last one unmounts the
/// poller.
pub struct StatusSubscription {
    key: String,
    rx: watch::Receiver<PollerView>,
    poller: Arc<StatusPoller>,
    entries: Entries,
}

impl StatusSubscription {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn view(&self) -> PollerView {
        self.rx.borrow().clone()
    }

    /// Wait for the next published view. `None` once the poller is gone.
    pub async fn changed(&mut self) -> Option<PollerView> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Refresh the shared poller now.
    pub async fn refresh(&self) -> Result<ConnectionStatus, CacheError> {
        Ok(self.poller.refresh().await?)
    }
}

impl Drop for StatusSubscription {
    fn drop(&mut self) {
        let mut entries = lock(&self.entries);
        let Some(entry) = entries.get_mut(&self.key) else {
            return;
        };
        entry.subscribers = entry.subscribers.saturating_sub(1);
        if entry.subscribers == 0 {
            entry.poller.unmount();
            entries.remove(&self.key);
            tracing::debug!(key = %self.key, "last subscriber gone, poller unmounted");
        }
    }
}
