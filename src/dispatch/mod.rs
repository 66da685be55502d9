//! Dispatch loop: decides when registered jobs are due and invokes their
//! executor, with at most one in-flight run per job.

pub mod dispatcher;

pub use dispatcher::{DispatchError, Dispatcher, RetryPolicy};
