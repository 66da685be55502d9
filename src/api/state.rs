use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::observability::Metrics;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Store,
    /// One dispatcher per registered executor kind.
    pub dispatchers: Arc<BTreeMap<String, Arc<Dispatcher>>>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Store,
        dispatchers: BTreeMap<String, Arc<Dispatcher>>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            dispatchers: Arc::new(dispatchers),
            metrics,
        }
    }

    pub fn dispatcher_for(&self, kind: &str) -> Option<&Arc<Dispatcher>> {
        self.dispatchers.get(kind)
    }
}
