//! Execution instances: one record per concrete run attempt of a job.
//!
//! Instances sharing a group are retries of the same logical scheduled
//! activation; the group identifier is the unix-nanosecond time the first
//! attempt started.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::job::JobId;

/// A single run attempt. Created when dispatch invokes an executor and
/// mutated as the run progresses; only ever removed in bulk (retention or
/// cascading job deletion).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionInstance {
    pub job: JobId,

    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub success: bool,

    /// Partial output captured by the executor.
    #[serde(default)]
    pub output: Vec<u8>,

    /// Attributes filled in by the executor (node name, etc).
    #[serde(default)]
    pub executor_attributes: std::collections::BTreeMap<String, String>,

    /// Ties together all attempts of one logical activation.
    pub group: i64,

    /// Increments on each retry within a group.
    pub attempt: u32,

    /// Globally unique instance identifier.
    pub id: Uuid,
}

impl ExecutionInstance {
    /// First attempt of a fresh activation group.
    pub fn new(job: JobId) -> Self {
        Self {
            job,
            started_at: None,
            finished_at: None,
            success: false,
            output: Vec::new(),
            executor_attributes: Default::default(),
            group: Utc::now().timestamp_nanos_opt().unwrap_or_default(),
            attempt: 1,
            id: Uuid::new_v4(),
        }
    }

    /// A fresh instance for the next attempt of this instance's group.
    pub fn retry(&self) -> Self {
        Self {
            job: self.job.clone(),
            started_at: None,
            finished_at: None,
            success: false,
            output: Vec::new(),
            executor_attributes: Default::default(),
            group: self.group,
            attempt: self.attempt + 1,
            id: Uuid::new_v4(),
        }
    }
}
