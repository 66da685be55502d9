//! Job specification CRUD.

use tracing::debug;

use crate::job::{slugify, JobId, JobSpec};
use crate::kv::KvError;

use super::error::{Result, StoreError};
use super::keys;
use super::Store;

impl Store {
    /// Validates and persists a job spec, returning the stored form.
    ///
    /// The name is sanitized into a path-safe slug first. If a prior
    /// version exists at the same key its stat fields are merged
    /// monotonically: the later of the two timestamps and the larger of the
    /// two counters win, so a stale snapshot cannot regress counters
    /// already advanced by a run.
    pub fn set_job(&self, mut spec: JobSpec) -> Result<JobSpec> {
        spec.id.name = slugify(&spec.id.name);
        spec.validate()?;

        match self.get_job(&spec.id) {
            Ok(prior) => {
                spec.last_error = spec.last_error.max(prior.last_error);
                spec.last_success = spec.last_success.max(prior.last_success);
                spec.success_count = spec.success_count.max(prior.success_count);
                spec.error_count = spec.error_count.max(prior.error_count);
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let key = keys::job_key(self.keyspace(), &spec.id);
        let payload = serde_json::to_vec(&spec)?;
        self.kv().put(&key, &payload)?;
        debug!(job = %spec.id, "stored job");
        Ok(spec)
    }

    pub fn get_job(&self, id: &JobId) -> Result<JobSpec> {
        let key = keys::job_key(self.keyspace(), id);
        let payload = self
            .kv()
            .get(&key)
            .map_err(|e| match e {
                KvError::NotFound(_) => StoreError::NotFound(format!("job {id}")),
                other => other.into(),
            })?;
        Ok(serde_json::from_slice(&payload)?)
    }

    /// All jobs in the keyspace. An absent jobs subtree is an empty
    /// collection, not an error.
    pub fn get_jobs(&self) -> Result<Vec<JobSpec>> {
        let prefix = keys::jobs_prefix(self.keyspace());
        let pairs = match self.kv().list(&prefix) {
            Ok(pairs) => pairs,
            Err(KvError::NotFound(_)) => {
                debug!("no jobs found");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        pairs
            .iter()
            .map(|pair| serde_json::from_slice(&pair.value).map_err(Into::into))
            .collect()
    }

    /// Deletes a job and all of its execution instances, returning the
    /// deleted spec. NotFound if the job does not exist.
    pub fn delete_job(&self, id: &JobId) -> Result<JobSpec> {
        let spec = self.get_job(id)?;

        match self.delete_executions(id) {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        self.kv().delete(&keys::job_key(self.keyspace(), id))?;
        debug!(job = %id, "deleted job");
        Ok(spec)
    }
}
