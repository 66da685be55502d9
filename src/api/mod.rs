//! HTTP control plane: thin CRUD over the job store.
//!
//! Each endpoint translates a request into store calls and maps the store
//! error kind to a status code; no scheduling logic lives here.

mod error;
pub mod models;
mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::router;
