//! Shell executor. Honors the dispatch contract only: it records what it
//! would run and reports success, without actually spawning a process.
//! Mostly useful for wiring tests and local debugging.

use async_trait::async_trait;

use tracing::info;

use crate::execution::ExecutionInstance;
use crate::job::JobSpec;

use super::traits::{ExecutionReport, Executor, ExecutorError};
use super::KIND_SHELL;

/// Parameter key holding the command line to run.
pub const PARAM_COMMAND: &str = "command";

#[derive(Debug, Default)]
pub struct ShellExecutor;

impl ShellExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Executor for ShellExecutor {
    fn kind(&self) -> &str {
        KIND_SHELL
    }

    async fn execute(
        &self,
        spec: &JobSpec,
        instance: &ExecutionInstance,
    ) -> Result<ExecutionReport, ExecutorError> {
        let command = spec
            .executor_parameters
            .get(PARAM_COMMAND)
            .map(String::as_str)
            .unwrap_or_default();

        info!(
            job = %spec.id,
            instance = %instance.id,
            attempt = instance.attempt,
            command,
            "shell executor run"
        );

        let mut report = ExecutionReport {
            success: true,
            output: format!("ran: {command}").into_bytes(),
            ..Default::default()
        };
        report
            .attributes
            .insert("executor".to_string(), KIND_SHELL.to_string());
        Ok(report)
    }
}
