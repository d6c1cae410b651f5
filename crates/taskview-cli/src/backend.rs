use std::sync::Arc;

use async_trait::async_trait;
use taskview_shared::{
    api::{CompletedTasksResponse, SummaryRequest, TaskUpdate},
    Project, RawTask, Section,
};

use crate::api::{ApiClient, ApiError};

/// The remote operations the task cache depends on.
#[async_trait]
pub trait TaskBackend: Send + Sync {
    async fn projects(&self) -> Result<Vec<Project>, ApiError>;
    async fn sections(&self) -> Result<Vec<Section>, ApiError>;
    async fn tasks(&self) -> Result<Vec<RawTask>, ApiError>;
    async fn completed_tasks(&self) -> Result<CompletedTasksResponse, ApiError>;
    async fn update_task(&self, task_id: &str, update: &TaskUpdate) -> Result<(), ApiError>;
    async fn close_task(&self, task_id: &str) -> Result<(), ApiError>;
    async fn reopen_task(&self, task_id: &str) -> Result<(), ApiError>;
    async fn delete_task(&self, task_id: &str) -> Result<(), ApiError>;
    async fn summarize(&self, request: &SummaryRequest) -> Result<String, ApiError>;
}

#[async_trait]
impl TaskBackend for ApiClient {
    async fn projects(&self) -> Result<Vec<Project>, ApiError> {
        ApiClient::projects(self).await
    }

    async fn sections(&self) -> Result<Vec<Section>, ApiError> {
        ApiClient::sections(self).await
    }

    async fn tasks(&self) -> Result<Vec<RawTask>, ApiError> {
        ApiClient::tasks(self).await
    }

    async fn completed_tasks(&self) -> Result<CompletedTasksResponse, ApiError> {
        ApiClient::completed_tasks(self).await
    }

    async fn update_task(&self, task_id: &str, update: &TaskUpdate) -> Result<(), ApiError> {
        ApiClient::update_task(self, task_id, update).await
    }

    async fn close_task(&self, task_id: &str) -> Result<(), ApiError> {
        ApiClient::close_task(self, task_id).await
    }

    async fn reopen_task(&self, task_id: &str) -> Result<(), ApiError> {
        ApiClient::reopen_task(self, task_id).await
    }

    async fn delete_task(&self, task_id: &str) -> Result<(), ApiError> {
        ApiClient::delete_task(self, task_id).await
    }

    async fn summarize(&self, request: &SummaryRequest) -> Result<String, ApiError> {
        ApiClient::summarize(self, request).await
    }
}

#[async_trait]
impl<T: TaskBackend + ?Sized> TaskBackend for Arc<T> {
    async fn projects(&self) -> Result<Vec<Project>, ApiError> {
        (**self).projects().await
    }

    async fn sections(&self) -> Result<Vec<Section>, ApiError> {
        (**self).sections().await
    }

    async fn tasks(&self) -> Result<Vec<RawTask>, ApiError> {
        (**self).tasks().await
    }

    async fn completed_tasks(&self) -> Result<CompletedTasksResponse, ApiError> {
        (**self).completed_tasks().await
    }

    async fn update_task(&self, task_id: &str, update: &TaskUpdate) -> Result<(), ApiError> {
        (**self).update_task(task_id, update).await
    }

    async fn close_task(&self, task_id: &str) -> Result<(), ApiError> {
        (**self).close_task(task_id).await
    }

    async fn reopen_task(&self, task_id: &str) -> Result<(), ApiError> {
        (**self).reopen_task(task_id).await
    }

    async fn delete_task(&self, task_id: &str) -> Result<(), ApiError> {
        (**self).delete_task(task_id).await
    }

    async fn summarize(&self, request: &SummaryRequest) -> Result<String, ApiError> {
        (**self).summarize(request).await
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Duration;

    use taskview_shared::{CompletedTask, Due};

    use super::*;

    /// In-memory backend recording every call it receives.
    #[derive(Default)]
    pub struct FakeBackend {
        pub projects: Mutex<Vec<Project>>,
        pub sections: Mutex<Vec<Section>>,
        pub tasks: Mutex<Vec<RawTask>>,
        pub completed: Mutex<Vec<CompletedTask>>,
        pub calls: Mutex<Vec<String>>,
        pub updates: Mutex<Vec<(String, TaskUpdate)>>,
        pub fail_tasks: Mutex<bool>,
        pub fail_updates_for: Mutex<HashSet<String>>,
        pub fail_summary: Mutex<bool>,
        pub summary_delay: Mutex<Option<Duration>>,
    }

    impl FakeBackend {
        pub fn with_tasks(tasks: Vec<RawTask>) -> Self {
            let backend = Self::default();
            *backend.tasks.lock().unwrap() = tasks;
            *backend.projects.lock().unwrap() = vec![Project {
                id: "p1".into(),
                name: "Work".into(),
            }];
            *backend.sections.lock().unwrap() = vec![Section {
                id: "s1".into(),
                name: "Reports".into(),
                project_id: Some("p1".into()),
            }];
            backend
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn count(&self, prefix: &str) -> usize {
            self.calls().iter().filter(|c| c.starts_with(prefix)).count()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    pub fn raw(id: &str, due: Option<&str>) -> RawTask {
        RawTask {
            id: id.into(),
            content: format!("task {id}"),
            description: String::new(),
            project_id: "p1".into(),
            section_id: Some("s1".into()),
            due: due.map(Due::on),
            priority: 1,
            created_at: "2024-01-01T00:00:00Z".into(),
            is_completed: false,
            labels: vec![],
            url: String::new(),
        }
    }

    fn remote_failure() -> ApiError {
        ApiError::Remote {
            status: 500,
            message: "boom".into(),
        }
    }

    #[async_trait]
    impl TaskBackend for FakeBackend {
        async fn projects(&self) -> Result<Vec<Project>, ApiError> {
            self.record("projects".into());
            Ok(self.projects.lock().unwrap().clone())
        }

        async fn sections(&self) -> Result<Vec<Section>, ApiError> {
            self.record("sections".into());
            Ok(self.sections.lock().unwrap().clone())
        }

        async fn tasks(&self) -> Result<Vec<RawTask>, ApiError> {
            self.record("tasks".into());
            if *self.fail_tasks.lock().unwrap() {
                return Err(remote_failure());
            }
            Ok(self.tasks.lock().unwrap().clone())
        }

        async fn completed_tasks(&self) -> Result<CompletedTasksResponse, ApiError> {
            self.record("completed".into());
            Ok(CompletedTasksResponse {
                items: self.completed.lock().unwrap().clone(),
            })
        }

        async fn update_task(&self, task_id: &str, update: &TaskUpdate) -> Result<(), ApiError> {
            self.record(format!("update {task_id}"));
            if self.fail_updates_for.lock().unwrap().contains(task_id) {
                return Err(remote_failure());
            }
            self.updates
                .lock()
                .unwrap()
                .push((task_id.to_string(), update.clone()));
            Ok(())
        }

        async fn close_task(&self, task_id: &str) -> Result<(), ApiError> {
            self.record(format!("close {task_id}"));
            Ok(())
        }

        async fn reopen_task(&self, task_id: &str) -> Result<(), ApiError> {
            self.record(format!("reopen {task_id}"));
            Ok(())
        }

        async fn delete_task(&self, task_id: &str) -> Result<(), ApiError> {
            self.record(format!("delete {task_id}"));
            Ok(())
        }

        async fn summarize(&self, request: &SummaryRequest) -> Result<String, ApiError> {
            let ids: Vec<&str> = request
                .project_tasks
                .iter()
                .chain(&request.other_tasks)
                .map(|t| t.id.as_str())
                .collect();
            let ids = ids.join(",");
            self.record(format!("summarize {ids}"));

            let delay = *self.summary_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if *self.fail_summary.lock().unwrap() {
                return Err(remote_failure());
            }
            Ok(format!("summary of {ids}"))
        }
    }
}
