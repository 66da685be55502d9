use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::execution::ExecutionInstance;
use crate::job::JobSpec;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("unknown executor kind: {0}")]
    UnknownKind(String),

    #[error("execution failed: {0}")]
    Failed(String),
}

/// Outcome of one run attempt, reported back to the dispatcher which folds
/// it into the stored [`ExecutionInstance`] and the job's counters.
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    pub success: bool,
    /// Partial output captured during the run.
    pub output: Vec<u8>,
    /// Executor-supplied attributes (node name, etc).
    pub attributes: BTreeMap<String, String>,
}

/// The capability performing a job's actual work. Implementations interpret
/// `executor_parameters` from the spec; the dispatch loop owns instance
/// bookkeeping and counter updates.
#[async_trait]
pub trait Executor: Send + Sync {
    /// The kind tag this executor serves.
    fn kind(&self) -> &str;

    async fn execute(
        &self,
        spec: &JobSpec,
        instance: &ExecutionInstance,
    ) -> Result<ExecutionReport, ExecutorError>;
}
