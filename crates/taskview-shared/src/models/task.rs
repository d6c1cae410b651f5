use serde::{Deserialize, Serialize};

/// Shown instead of a project id that has no matching project.
pub const NO_PROJECT: &str = "No Project";
/// Shown instead of a section id that has no matching section.
pub const NO_SECTION: &str = "No Section";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Due {
    /// `YYYY-MM-DD`, or a full datetime for timed tasks.
    pub date: String,
    #[serde(default)]
    pub is_recurring: bool,
    /// Human readable form, e.g. "every monday".
    #[serde(rename = "string", default)]
    pub display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

impl Due {
    pub fn on(date: impl Into<String>) -> Self {
        let date = date.into();
        Self {
            display: date.clone(),
            date,
            is_recurring: false,
            datetime: None,
            timezone: None,
            lang: None,
        }
    }

    /// The calendar day part of `date`.
    pub fn day(&self) -> &str {
        self.date.get(..10).unwrap_or(&self.date)
    }
}

/// A task as returned by the Todoist REST API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTask {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub description: String,
    pub project_id: String,
    #[serde(default)]
    pub section_id: Option<String>,
    #[serde(default)]
    pub due: Option<Due>,
    #[serde(default = "default_priority")]
    pub priority: u8,
    pub created_at: String,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub url: String,
}

/// A task enriched with its resolved project and section names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub content: String,
    pub description: String,
    pub project_id: String,
    pub project_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
    pub section_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<Due>,
    pub priority: u8,
    pub created_at: String,
    pub is_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    pub labels: Vec<String>,
    pub url: String,
}

impl Task {
    /// Builds a display task. Empty names fall back to the sentinels.
    pub fn from_raw(raw: RawTask, project_name: &str, section_name: &str) -> Self {
        Self {
            id: raw.id,
            content: raw.content,
            description: raw.description,
            project_id: raw.project_id,
            project_name: non_empty_or(project_name, NO_PROJECT),
            section_id: raw.section_id,
            section_name: non_empty_or(section_name, NO_SECTION),
            due: raw.due,
            priority: raw.priority,
            created_at: raw.created_at,
            is_completed: raw.is_completed,
            completed_at: None,
            labels: raw.labels,
            url: raw.url,
        }
    }

    pub fn due_day(&self) -> Option<&str> {
        self.due.as_ref().map(Due::day)
    }
}

/// An entry of the completed-tasks endpoint. Shares no shape with [`Task`]:
/// `task_id` points at the original task and there is no due date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedTask {
    pub id: String,
    pub task_id: String,
    pub content: String,
    pub project_id: String,
    #[serde(default)]
    pub section_id: Option<String>,
    pub completed_at: String,
    #[serde(default)]
    pub note_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v2_task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v2_project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v2_section_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TaskRecord {
    Active(Task),
    Completed(CompletedTask),
}

impl TaskRecord {
    pub fn content(&self) -> &str {
        match self {
            Self::Active(task) => &task.content,
            Self::Completed(task) => &task.content,
        }
    }

    pub fn project_id(&self) -> &str {
        match self {
            Self::Active(task) => &task.project_id,
            Self::Completed(task) => &task.project_id,
        }
    }

    pub fn section_id(&self) -> Option<&str> {
        match self {
            Self::Active(task) => task.section_id.as_deref(),
            Self::Completed(task) => task.section_id.as_deref(),
        }
    }

    pub fn due_day(&self) -> Option<&str> {
        match self {
            Self::Active(task) => task.due_day(),
            Self::Completed(_) => None,
        }
    }
}

fn default_priority() -> u8 {
    1
}

fn non_empty_or(name: &str, fallback: &str) -> String {
    if name.is_empty() {
        fallback.to_string()
    } else {
        name.to_string()
    }
}
