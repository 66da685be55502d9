//! Leader marker primitive.
//!
//! A single read of the reserved leader key. This is not an election
//! protocol; anything built on top must add contention resolution, renewal,
//! and failure detection itself.

use tracing::{debug, error};

use crate::kv::KvError;

use super::keys;
use super::Store;

impl Store {
    /// Reads the leader marker. Absent key and unreachable backend both
    /// yield `None`; the latter is logged at error level.
    pub fn get_leader(&self) -> Option<Vec<u8>> {
        match self.kv().get(&self.leader_key()) {
            Ok(value) => {
                debug!(node = %String::from_utf8_lossy(&value), "retrieved leader");
                Some(value)
            }
            Err(KvError::NotFound(_)) => {
                debug!("no leader key present");
                None
            }
            Err(e) => {
                error!(error = %e, "failed to read leader key");
                None
            }
        }
    }

    pub fn leader_key(&self) -> String {
        keys::leader_key(self.keyspace())
    }
}
