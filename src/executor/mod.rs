//! Pluggable executors.
//!
//! An executor kind is a string tag on the job spec; the registry maps each
//! kind to a factory producing the executor capability. Unregistered kinds
//! fail explicitly, never default silently.

pub mod registry;
pub mod shell;
pub mod traits;

pub use registry::ExecutorRegistry;
pub use shell::ShellExecutor;
pub use traits::{ExecutionReport, Executor, ExecutorError};

/// Kind tag served by the built-in shell executor.
pub const KIND_SHELL: &str = "shell";
