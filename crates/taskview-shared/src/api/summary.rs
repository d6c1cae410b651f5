use serde::{Deserialize, Serialize};

use crate::models::Task;

/// Tasks the user plans to finish today, split by whether they belong to a project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryRequest {
    pub project_tasks: Vec<Task>,
    pub other_tasks: Vec<Task>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub summary: String,
}
