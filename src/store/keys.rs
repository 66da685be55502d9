//! Storage path layout.
//!
//! - job: `${keyspace}/jobs/${namespace}/${name}`
//! - instance: `${keyspace}/instances/${namespace}/${name}/${instanceId}`
//! - leader: `${keyspace}/leader`
//!
//! The keyspace prefix is stored with its trailing slash trimmed, so a
//! configured prefix of `/` yields keys like `/jobs/ops/backup`.

use crate::job::JobId;

pub const JOBS_PATH: &str = "jobs";
pub const INSTANCES_PATH: &str = "instances";
pub const LEADER_PATH: &str = "leader";

pub fn job_key(keyspace: &str, id: &JobId) -> String {
    format!("{keyspace}/{JOBS_PATH}/{}/{}", id.namespace, id.name)
}

pub fn jobs_prefix(keyspace: &str) -> String {
    format!("{keyspace}/{JOBS_PATH}/")
}

pub fn instance_key(keyspace: &str, id: &JobId, instance_id: &str) -> String {
    format!(
        "{keyspace}/{INSTANCES_PATH}/{}/{}/{}",
        id.namespace, id.name, instance_id
    )
}

pub fn instances_prefix(keyspace: &str, id: &JobId) -> String {
    format!("{keyspace}/{INSTANCES_PATH}/{}/{}/", id.namespace, id.name)
}

pub fn leader_key(keyspace: &str) -> String {
    format!("{keyspace}/{LEADER_PATH}")
}

/// Splits a stored key into its path segments, dropping empty ones.
pub fn split_key(key: &str) -> Vec<&str> {
    key.split('/').filter(|s| !s.is_empty()).collect()
}
