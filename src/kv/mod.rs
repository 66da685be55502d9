//! Key-value backend abstraction
//!
//! Everything flowd persists (jobs, execution instances, the leader marker)
//! lives in a shared key-value store under a configured keyspace prefix.
//! The store code only depends on this small capability: get/put/list by
//! prefix/delete/delete-subtree, with "not found" and "unreachable" as
//! distinguishable failures.
//!
//! The shipped backend is embedded Fjall ([`FjallKv`]). A remote backend
//! (etcd, consul) would implement the same trait.

pub mod fjall;

pub use self::fjall::FjallKv;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("backend unreachable: {0}")]
    Unreachable(String),

    #[error("backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, KvError>;

impl KvError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, KvError::NotFound(_))
    }
}

/// A key and its stored value, as returned by prefix listing.
#[derive(Debug, Clone)]
pub struct KvPair {
    pub key: String,
    pub value: Vec<u8>,
}

/// Blocking key-value capability. All operations are direct backend round
/// trips; callers see `NotFound` for absent keys and empty list prefixes.
pub trait KvBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Vec<u8>>;

    fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Lists every pair under `prefix` in lexicographic key order.
    /// An empty result is reported as `NotFound`, matching the behavior
    /// of the wire backends this trait abstracts over.
    fn list(&self, prefix: &str) -> Result<Vec<KvPair>>;

    fn delete(&self, key: &str) -> Result<()>;

    /// Removes every key under `prefix`.
    fn delete_tree(&self, prefix: &str) -> Result<()>;
}
