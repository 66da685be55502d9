use std::collections::BTreeMap;
use std::sync::Arc;

use super::shell::ShellExecutor;
use super::traits::{Executor, ExecutorError};
use super::KIND_SHELL;

type ExecutorFactory = Arc<dyn Fn() -> Arc<dyn Executor> + Send + Sync>;

/// Maps executor kind tags to factories. Resolution of an unregistered
/// kind is an explicit error.
#[derive(Clone, Default)]
pub struct ExecutorRegistry {
    factories: BTreeMap<String, ExecutorFactory>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn Executor> + Send + Sync + 'static,
    {
        self.factories.insert(kind.into(), Arc::new(factory));
    }

    pub fn resolve(&self, kind: &str) -> Result<Arc<dyn Executor>, ExecutorError> {
        self.factories
            .get(kind)
            .map(|factory| factory())
            .ok_or_else(|| ExecutorError::UnknownKind(kind.to_string()))
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Registry with the built-in executors.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let shell: Arc<dyn Executor> = Arc::new(ShellExecutor::new());
        registry.register(KIND_SHELL, move || shell.clone());
        registry
    }
}
