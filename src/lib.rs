pub mod api;
pub mod config;
pub mod dispatch;
pub mod execution;
pub mod executor;
pub mod job;
pub mod kv;
pub mod observability;
pub mod schedule;
pub mod server;
pub mod store;
