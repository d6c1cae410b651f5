use chrono::NaiveDate;
use futures::future::join_all;
use taskview_shared::{
    api::TaskUpdate,
    util::{day_string, is_overdue},
    Due, Task,
};

use crate::api::ApiError;
use crate::backend::TaskBackend;
use crate::cache::TaskCache;

impl<B: TaskBackend> TaskCache<B> {
    /// Sends `update` to Todoist, then mirrors it in the cached copies.
    pub async fn update_task(
        &mut self,
        task_id: &str,
        update: &TaskUpdate,
    ) -> Result<(), ApiError> {
        update.validate()?;
        self.backend().update_task(task_id, update).await.map_err(|e| {
            tracing::error!(task_id, "Failed to update task: {}", e);
            e
        })?;

        for task in self.tasks.iter_mut().chain(self.filtered.iter_mut()) {
            if task.id == task_id {
                apply_update(task, update);
            }
        }
        Ok(())
    }

    /// Closes the task remotely and drops it from the active lists.
    pub async fn complete_task(&mut self, task_id: &str) -> Result<(), ApiError> {
        self.backend().close_task(task_id).await.map_err(|e| {
            tracing::error!(task_id, "Failed to complete task: {}", e);
            e
        })?;
        self.remove_local(task_id);
        self.load_completed_tasks().await
    }

    pub async fn reopen_task(&mut self, task_id: &str) -> Result<(), ApiError> {
        self.backend().reopen_task(task_id).await.map_err(|e| {
            tracing::error!(task_id, "Failed to reopen task: {}", e);
            e
        })?;
        self.load_tasks().await?;
        self.load_completed_tasks().await
    }

    pub async fn delete_task(&mut self, task_id: &str) -> Result<(), ApiError> {
        self.backend().delete_task(task_id).await.map_err(|e| {
            tracing::error!(task_id, "Failed to delete task: {}", e);
            e
        })?;
        self.remove_local(task_id);
        Ok(())
    }

    /// Moves every overdue task to `today`.
    ///
    /// The cache changes first and one patch per task goes out concurrently.
    /// If any patch fails the list is reloaded from Todoist. If that reload
    /// fails too, the optimistic state stays, the cache is marked out of
    /// sync and the reload error is returned.
    pub async fn reschedule_overdue_tasks(&mut self, today: NaiveDate) -> Result<usize, ApiError> {
        let ids: Vec<String> = self
            .tasks
            .iter()
            .filter(|task| is_overdue(task, today))
            .map(|task| task.id.clone())
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }

        let today = day_string(today);
        for task in self.tasks.iter_mut().chain(self.filtered.iter_mut()) {
            if ids.contains(&task.id) {
                move_due(task, &today);
            }
        }

        let update = TaskUpdate::due_date(today.as_str());
        let backend = self.backend();
        let results = join_all(ids.iter().map(|id| backend.update_task(id, &update))).await;
        let failed = results.iter().filter(|result| result.is_err()).count();
        if failed == 0 {
            tracing::info!(count = ids.len(), "Rescheduled overdue tasks");
            return Ok(ids.len());
        }

        tracing::warn!(failed, total = ids.len(), "Reschedule failed, reloading tasks");
        if let Err(e) = self.load_tasks().await {
            tracing::error!("Reload after failed reschedule failed: {}", e);
            self.out_of_sync = true;
            return Err(e);
        }
        Ok(ids.len() - failed)
    }

    /// Starts a batch of edits to one task.
    pub fn editor(&mut self, task: Task) -> TaskEditor<'_, B> {
        TaskEditor {
            cache: self,
            task,
            pending: TaskUpdate::default(),
        }
    }

    fn remove_local(&mut self, task_id: &str) {
        self.tasks.retain(|task| task.id != task_id);
        self.filtered.retain(|task| task.id != task_id);
    }
}

fn apply_update(task: &mut Task, update: &TaskUpdate) {
    if let Some(content) = &update.content {
        task.content = content.clone();
    }
    if let Some(description) = &update.description {
        task.description = description.clone();
    }
    if let Some(labels) = &update.labels {
        task.labels = labels.clone();
    }
    if let Some(priority) = update.priority {
        task.priority = priority;
    }

    if update.clears_due() {
        task.due = None;
    } else if let Some(date) = &update.due_date {
        move_due(task, date);
    } else if let Some(datetime) = &update.due_datetime {
        let due = task.due.get_or_insert_with(|| Due::on(datetime.as_str()));
        due.date = datetime.clone();
        due.datetime = Some(datetime.clone());
    } else if let (Some(display), Some(due)) = (&update.due_string, task.due.as_mut()) {
        due.display = display.clone();
    }
}

fn move_due(task: &mut Task, date: &str) {
    match task.due.as_mut() {
        Some(due) => {
            due.date = date.to_string();
            due.datetime = None;
        }
        None => task.due = Some(Due::on(date)),
    }
}

/// Edits to a single task, applied either one at a time or queued and
/// committed together.
pub struct TaskEditor<'a, B> {
    cache: &'a mut TaskCache<B>,
    task: Task,
    pending: TaskUpdate,
}

impl<B: TaskBackend> TaskEditor<'_, B> {
    pub fn pending(&self) -> &TaskUpdate {
        &self.pending
    }

    /// Adds fields to the next commit. Later values win.
    pub fn queue(&mut self, update: TaskUpdate) {
        self.pending.merge(update);
    }

    pub async fn commit(&mut self) -> Result<(), ApiError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let update = self.pending.clone();
        self.cache.update_task(&self.task.id, &update).await?;
        self.pending = TaskUpdate::default();
        Ok(())
    }

    pub async fn update_content(&mut self, content: &str) -> Result<(), ApiError> {
        if content == self.task.content {
            return Ok(());
        }
        self.cache
            .update_task(&self.task.id, &TaskUpdate::content(content))
            .await
    }

    pub async fn update_priority(&mut self, priority: u8) -> Result<(), ApiError> {
        if priority == self.task.priority {
            return Ok(());
        }
        self.cache
            .update_task(&self.task.id, &TaskUpdate::priority(priority))
            .await
    }

    /// `None` removes the due date.
    pub async fn update_due_date(&mut self, date: Option<&str>) -> Result<(), ApiError> {
        let update = match date {
            Some(date) => TaskUpdate::due_date(date),
            None => TaskUpdate::clear_due(),
        };
        self.cache.update_task(&self.task.id, &update).await
    }
}
