//! Execution instance ledger: per-job run records with retention.

use std::collections::BTreeMap;

use tracing::{debug, error};

use crate::execution::ExecutionInstance;
use crate::job::JobId;
use crate::kv::KvError;

use super::error::Result;
use super::keys;
use super::Store;

/// How many execution instances to retain per job.
pub const MAX_EXECUTIONS: usize = 100;

impl Store {
    /// Persists an execution instance under its job's subtree, then evicts
    /// the oldest activation groups if the job now holds more than
    /// [`MAX_EXECUTIONS`] instances. Eviction failures are logged and never
    /// invalidate the write; only the initial write itself can fail.
    pub fn set_execution(&self, instance: &ExecutionInstance) -> Result<()> {
        let key = keys::instance_key(
            self.keyspace(),
            &instance.job,
            &instance.id.to_string(),
        );
        let payload = serde_json::to_vec(instance)?;
        self.kv().put(&key, &payload)?;
        debug!(
            job = %instance.job,
            instance = %instance.id,
            group = instance.group,
            attempt = instance.attempt,
            "stored execution"
        );

        if let Err(e) = self.evict_overflow(&instance.job) {
            error!(job = %instance.job, error = %e, "retention eviction failed");
        }
        Ok(())
    }

    /// Deletes whole groups oldest-first (strictly ascending by group
    /// identifier) until at most MAX_EXECUTIONS instances remain.
    fn evict_overflow(&self, id: &JobId) -> Result<()> {
        let mut instances = self.get_executions(id)?;
        if instances.len() <= MAX_EXECUTIONS {
            return Ok(());
        }

        instances.sort_by_key(|e| e.group);
        let overflow = instances.len() - MAX_EXECUTIONS;

        let mut evicted = 0;
        let mut cursor = 0;
        while evicted < overflow && cursor < instances.len() {
            let group = instances[cursor].group;
            while cursor < instances.len() && instances[cursor].group == group {
                let victim = &instances[cursor];
                let key = keys::instance_key(
                    self.keyspace(),
                    &victim.job,
                    &victim.id.to_string(),
                );
                if let Err(e) = self.kv().delete(&key) {
                    error!(
                        job = %id,
                        instance = %victim.id,
                        error = %e,
                        "failed to delete overflowed execution"
                    );
                }
                evicted += 1;
                cursor += 1;
            }
        }
        debug!(job = %id, evicted, "evicted overflowed executions");
        Ok(())
    }

    /// All instances recorded for a job. Backends whose list operation can
    /// leak sibling entries are guarded by verifying the trailing path
    /// segments match the job exactly.
    pub fn get_executions(&self, id: &JobId) -> Result<Vec<ExecutionInstance>> {
        let prefix = keys::instances_prefix(self.keyspace(), id);
        let pairs = match self.kv().list(&prefix) {
            Ok(pairs) => pairs,
            Err(KvError::NotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut instances = Vec::with_capacity(pairs.len());
        for pair in pairs {
            let segments = keys::split_key(&pair.key);
            if segments.len() < 3 {
                continue;
            }
            let (ns, name) = (segments[segments.len() - 3], segments[segments.len() - 2]);
            if ns != id.namespace || name != id.name {
                continue;
            }
            instances.push(serde_json::from_slice(&pair.value)?);
        }
        Ok(instances)
    }

    /// Every instance sharing `instance`'s activation group.
    pub fn get_execution_group(
        &self,
        instance: &ExecutionInstance,
    ) -> Result<Vec<ExecutionInstance>> {
        Ok(self
            .get_executions(&instance.job)?
            .into_iter()
            .filter(|e| e.group == instance.group)
            .collect())
    }

    /// The group of the most recent activation, or empty when the job has
    /// no recorded executions.
    pub fn get_last_execution_group(&self, id: &JobId) -> Result<Vec<ExecutionInstance>> {
        let executions = self.get_executions(id)?;
        match executions.iter().max_by_key(|e| e.group) {
            Some(latest) => self.get_execution_group(&latest.clone()),
            None => Ok(Vec::new()),
        }
    }

    /// Instances grouped by activation, plus the group identifiers sorted
    /// most-recent-first for reverse-chronological display.
    pub fn get_grouped_executions(
        &self,
        id: &JobId,
    ) -> Result<(BTreeMap<i64, Vec<ExecutionInstance>>, Vec<i64>)> {
        let mut groups: BTreeMap<i64, Vec<ExecutionInstance>> = BTreeMap::new();
        for instance in self.get_executions(id)? {
            groups.entry(instance.group).or_default().push(instance);
        }

        let mut by_group: Vec<i64> = groups.keys().copied().collect();
        by_group.sort_unstable_by(|a, b| b.cmp(a));
        Ok((groups, by_group))
    }

    /// Removes every execution instance of a job.
    pub fn delete_executions(&self, id: &JobId) -> Result<()> {
        let prefix = keys::instances_prefix(self.keyspace(), id);
        self.kv().delete_tree(&prefix)?;
        Ok(())
    }
}
