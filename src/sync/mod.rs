//! Client-side view synchronization.
//!
//! One consumer reads the relay feed and, through a single table-to-views
//! registry, marks cached views stale so they are refetched before next use.

pub mod cache;
pub mod registry;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::relay::{ChangeEvent, ChangeRelay};

pub use cache::{MutationId, ViewCache};
pub use registry::{ViewKey, ViewRegistry};

#[derive(Clone)]
pub struct ViewSynchronizer {
    registry: Arc<ViewRegistry>,
    cache: Arc<Mutex<ViewCache>>,
}

impl ViewSynchronizer {
    pub fn new(registry: ViewRegistry, cache: Arc<Mutex<ViewCache>>) -> Self {
        Self {
            registry: Arc::new(registry),
            cache,
        }
    }

    pub fn cache(&self) -> Arc<Mutex<ViewCache>> {
        Arc::clone(&self.cache)
    }

    /// Marks every view that reads `event.table` stale.
    pub fn handle(&self, event: &ChangeEvent) -> usize {
        let marked = self
            .cache
            .lock()
            .invalidate(self.registry.views_for(event.table));
        log::debug!("sync: {} changed, {} view(s) stale", event.table, marked);
        marked
    }

    /// Consumes the relay feed until it closes. Missed events invalidate
    /// everything since we cannot tell which tables they touched.
    pub async fn run(self, mut rx: broadcast::Receiver<ChangeEvent>) {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    self.handle(&event);
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    log::warn!("sync: missed {} change event(s), invalidating all views", n);
                    self.cache.lock().invalidate_all();
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    pub fn spawn(self, relay: &ChangeRelay) -> JoinHandle<()> {
        let rx = relay.subscribe_all();
        tokio::spawn(self.run(rx))
    }
}
