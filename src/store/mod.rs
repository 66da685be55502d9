//! Key-value-backed persistence for jobs and execution instances.
//!
//! One [`Store`] owns both halves of the persistence layer:
//!
//! - job specifications under `${keyspace}/jobs/${namespace}/${name}`
//! - execution instances under
//!   `${keyspace}/instances/${namespace}/${name}/${instanceId}`
//! - the leader marker at `${keyspace}/leader`
//!
//! The two subtrees never overlap. Every call is a direct backend round
//! trip; there is no local caching. The stat merge in `set_job` is a plain
//! read-modify-write without a compare-and-swap guard, accepted under a
//! single-writer-per-job operating assumption.

pub mod error;
pub mod executions;
pub mod jobs;
pub mod keys;
pub mod leader;

pub use error::{Result, StoreError};
pub use executions::MAX_EXECUTIONS;

use std::sync::Arc;

use tracing::debug;

use crate::kv::{KvBackend, KvError};

#[derive(Clone)]
pub struct Store {
    kv: Arc<dyn KvBackend>,
    keyspace: String,
}

impl Store {
    /// Wraps a backend under the given keyspace prefix. Probes the backend
    /// once; an unreachable backend is a construction error and the caller
    /// should treat it as fatal rather than serve degraded.
    pub fn open(kv: Arc<dyn KvBackend>, keyspace: &str) -> Result<Self> {
        let store = Self {
            kv,
            keyspace: keyspace.trim_end_matches('/').to_string(),
        };

        match store.kv.list(&keys::jobs_prefix(&store.keyspace)) {
            Ok(_) | Err(KvError::NotFound(_)) => {}
            Err(e) => return Err(StoreError::Storage(e.to_string())),
        }
        debug!(keyspace = %store.keyspace, "store backend reachable");
        Ok(store)
    }

    pub(crate) fn kv(&self) -> &dyn KvBackend {
        self.kv.as_ref()
    }

    pub(crate) fn keyspace(&self) -> &str {
        &self.keyspace
    }
}
