use serde::{Deserialize, Serialize};

use crate::models::CompletedTask;

/// `due_string` value Todoist interprets as "remove the due date".
pub const CLEAR_DUE: &str = "no date";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Task ID is required")]
    MissingTaskId,
    #[error("Task ID may only contain letters, digits, '-' and '_'")]
    InvalidTaskId,
    #[error("Only one of due_string, due_date and due_datetime may be set")]
    ConflictingDueFields,
    #[error("duration_unit is required when duration is specified")]
    DurationWithoutUnit,
    #[error("duration is required when duration_unit is specified")]
    UnitWithoutDuration,
    #[error("duration must be a positive number")]
    NonPositiveDuration,
}

/// A task id is used as one segment of an upstream URL path.
pub fn validate_task_id(task_id: &str) -> Result<(), ValidationError> {
    if task_id.trim().is_empty() {
        return Err(ValidationError::MissingTaskId);
    }
    if !task_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidTaskId);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Minute,
    Day,
}

/// Sparse patch for `POST /rest/v2/tasks/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_datetime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_unit: Option<DurationUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_lang: Option<String>,
}

impl TaskUpdate {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn priority(priority: u8) -> Self {
        Self {
            priority: Some(priority),
            ..Default::default()
        }
    }

    pub fn due_date(date: impl Into<String>) -> Self {
        Self {
            due_date: Some(date.into()),
            ..Default::default()
        }
    }

    pub fn clear_due() -> Self {
        Self {
            due_string: Some(CLEAR_DUE.to_string()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn clears_due(&self) -> bool {
        self.due_string.as_deref() == Some(CLEAR_DUE)
    }

    /// Fields set in `other` replace the ones set here.
    pub fn merge(&mut self, other: TaskUpdate) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        take!(
            content,
            description,
            labels,
            priority,
            due_lang,
            duration,
            duration_unit,
            deadline_date,
            deadline_lang
        );
        // A new due value replaces whichever due field was queued before.
        if other.due_string.is_some() || other.due_date.is_some() || other.due_datetime.is_some() {
            self.due_string = other.due_string;
            self.due_date = other.due_date;
            self.due_datetime = other.due_datetime;
        }
    }

    /// Checks the preconditions Todoist enforces on an update.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let due_fields = [&self.due_string, &self.due_date, &self.due_datetime]
            .iter()
            .filter(|field| field.is_some())
            .count();
        if due_fields > 1 {
            return Err(ValidationError::ConflictingDueFields);
        }

        match (self.duration, self.duration_unit) {
            (Some(_), None) => Err(ValidationError::DurationWithoutUnit),
            (None, Some(_)) => Err(ValidationError::UnitWithoutDuration),
            (Some(duration), Some(_)) if duration <= 0 => {
                Err(ValidationError::NonPositiveDuration)
            }
            _ => Ok(()),
        }
    }
}

/// Body of `PUT /api/todoist/tasks`: the task id next to the patch fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTaskRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub update: TaskUpdate,
}

impl UpdateTaskRequest {
    pub fn into_parts(self) -> Result<(String, TaskUpdate), ValidationError> {
        match self.id {
            Some(id) if !id.trim().is_empty() => Ok((id, self.update)),
            _ => Err(ValidationError::MissingTaskId),
        }
    }
}

/// Response of the Sync API's `completed/get_all`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletedTasksResponse {
    #[serde(default)]
    pub items: Vec<CompletedTask>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
