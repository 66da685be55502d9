//! Job data model: identity, persisted specification, validation rules.
//!
//! The serialized form is the external contract (API bodies and stored
//! values use the same camelCase schema). Run-state never appears here;
//! per-job run exclusivity lives in the dispatcher's in-flight table.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schedule::{Schedule, ScheduleError};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("job requires either a parent job or a schedule")]
    MissingSchedule,

    #[error("job cannot be its own parent")]
    SelfParent,

    #[error("must specify an explicit executor")]
    MissingExecutor,

    #[error(transparent)]
    InvalidSchedule(#[from] ScheduleError),
}

/// Identifies a job; doubles as a storage path segment pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId {
    pub name: String,
    pub namespace: String,
}

impl JobId {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Collapses a job name into a path-safe slug: lowercase alphanumerics and
/// dashes, runs of anything else folded into a single dash.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// A job specification as provided via the API and persisted in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSpec {
    pub id: JobId,

    /// Arbitrary tags associated with the job.
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,

    /// Disabled jobs stay registered but are never run.
    #[serde(default)]
    pub disabled: bool,

    /// Extra env vars injected into the job's execution.
    #[serde(default)]
    pub env_vars: BTreeMap<String, String>,

    #[serde(default)]
    pub owner: String,

    #[serde(default)]
    pub success_count: u64,

    #[serde(default)]
    pub error_count: u64,

    #[serde(default)]
    pub last_success: Option<DateTime<Utc>>,

    #[serde(default)]
    pub last_error: Option<DateTime<Utc>>,

    /// Jobs run after this one completes successfully.
    #[serde(default)]
    pub dependent_jobs: Vec<JobId>,

    /// Set iff this job is triggered by another job instead of a schedule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_job: Option<JobId>,

    /// Absent iff a parent is present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,

    /// Which executor kind runs this job.
    pub executor: String,

    /// Opaque parameters interpreted by the chosen executor kind
    /// (image, entrypoint, memory limits, ...).
    #[serde(default)]
    pub executor_parameters: BTreeMap<String, String>,

    /// Labels an executor must satisfy to run this job.
    #[serde(default)]
    pub executor_constraints: BTreeMap<String, String>,

    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl JobSpec {
    /// Minimal spec with a schedule; maps and counters start empty.
    pub fn new(id: JobId, schedule: Schedule, executor: impl Into<String>) -> Self {
        Self {
            id,
            annotations: BTreeMap::new(),
            disabled: false,
            env_vars: BTreeMap::new(),
            owner: String::new(),
            success_count: 0,
            error_count: 0,
            last_success: None,
            last_error: None,
            dependent_jobs: Vec::new(),
            parent_job: None,
            schedule: Some(schedule),
            executor: executor.into(),
            executor_parameters: BTreeMap::new(),
            executor_constraints: BTreeMap::new(),
            labels: BTreeMap::new(),
        }
    }

    /// Checks the spec invariants: a parentless job must carry a valid
    /// schedule, a job cannot be its own parent, and the executor kind must
    /// be set explicitly.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(parent) = &self.parent_job {
            if *parent == self.id {
                return Err(ValidationError::SelfParent);
            }
        } else {
            match &self.schedule {
                None => return Err(ValidationError::MissingSchedule),
                Some(schedule) => schedule.validate()?,
            }
        }

        if self.executor.is_empty() {
            return Err(ValidationError::MissingExecutor);
        }
        Ok(())
    }
}

impl fmt::Display for JobSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cadence = match &self.schedule {
            Some(schedule) => schedule.describe(),
            None => match &self.parent_job {
                Some(parent) => format!("after {parent}"),
                None => "unscheduled".to_string(),
            },
        };
        write!(
            f,
            "job {} ({}) with executor {}",
            self.id, cadence, self.executor
        )
    }
}
