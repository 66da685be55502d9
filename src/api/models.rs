//! Wire models specific to the control plane. Job specs and execution
//! instances go over the wire in their stored serialized form.

use serde::{Deserialize, Serialize};

use crate::execution::ExecutionInstance;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct JobsQuery {
    pub namespace: Option<String>,
}

/// One activation group and its attempts, newest groups first in the
/// surrounding list.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExecutionGroup {
    pub group: i64,
    pub instances: Vec<ExecutionInstance>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExecutionGroupsResponse {
    pub groups: Vec<ExecutionGroup>,
}
