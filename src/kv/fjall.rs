use std::path::Path;

use ::fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use tracing::info;

use super::{KvBackend, KvError, KvPair, Result};

/// Embedded Fjall implementation of the key-value capability.
///
/// A single partition holds all entries keyed by their full path string,
/// so prefix listing and subtree deletion map directly onto range scans.
#[derive(Clone)]
pub struct FjallKv {
    keyspace: Keyspace,
    data: PartitionHandle,
}

impl FjallKv {
    /// Open or create a Fjall-backed store at the given path. An open
    /// failure here means the process has no backend and cannot serve.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "opening fjall backend");

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| KvError::Unreachable(e.to_string()))?;
        }

        let keyspace = Config::new(path)
            .open()
            .map_err(|e| KvError::Unreachable(e.to_string()))?;
        let data = keyspace
            .open_partition("kv", PartitionCreateOptions::default())
            .map_err(|e| KvError::Unreachable(e.to_string()))?;

        Ok(Self { keyspace, data })
    }

    /// Flush pending writes to disk.
    pub fn persist(&self) -> Result<()> {
        self.keyspace
            .persist(::fjall::PersistMode::SyncAll)
            .map_err(backend_err)
    }
}

fn backend_err(e: ::fjall::Error) -> KvError {
    KvError::Backend(e.to_string())
}

impl KvBackend for FjallKv {
    fn get(&self, key: &str) -> Result<Vec<u8>> {
        match self.data.get(key.as_bytes()).map_err(backend_err)? {
            Some(value) => Ok(value.to_vec()),
            None => Err(KvError::NotFound(key.to_string())),
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.data.insert(key.as_bytes(), value).map_err(backend_err)
    }

    fn list(&self, prefix: &str) -> Result<Vec<KvPair>> {
        let mut pairs = Vec::new();
        for item in self.data.prefix(prefix.as_bytes()) {
            let (key, value) = item.map_err(backend_err)?;
            let key = String::from_utf8_lossy(&key).into_owned();
            pairs.push(KvPair {
                key,
                value: value.to_vec(),
            });
        }
        if pairs.is_empty() {
            return Err(KvError::NotFound(prefix.to_string()));
        }
        Ok(pairs)
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.data.remove(key.as_bytes()).map_err(backend_err)
    }

    fn delete_tree(&self, prefix: &str) -> Result<()> {
        let keys: Vec<Vec<u8>> = self
            .data
            .prefix(prefix.as_bytes())
            .map(|item| item.map(|(k, _)| k.to_vec()).map_err(backend_err))
            .collect::<Result<_>>()?;
        for key in keys {
            self.data.remove(key).map_err(backend_err)?;
        }
        Ok(())
    }
}
