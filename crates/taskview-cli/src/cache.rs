use std::collections::HashMap;

use chrono::NaiveDate;
use taskview_shared::{
    filter::{self, FilterSettings},
    CompletedTask, Task, TaskRecord, NO_PROJECT,
};

use crate::api::ApiError;
use crate::backend::TaskBackend;

/// Client-side copy of the user's tasks plus the project and section names
/// needed to display them.
///
/// `filtered` is the search result over `tasks`; filters and sorting are
/// applied on top of it by [`TaskCache::view`].
pub struct TaskCache<B> {
    backend: B,
    pub(crate) tasks: Vec<Task>,
    pub(crate) filtered: Vec<Task>,
    completed: Vec<CompletedTask>,
    projects: HashMap<String, String>,
    sections: HashMap<String, String>,
    lookups_loaded: bool,
    loading: bool,
    search_query: String,
    settings: FilterSettings,
    pub(crate) out_of_sync: bool,
}

impl<B: TaskBackend> TaskCache<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            tasks: Vec::new(),
            filtered: Vec::new(),
            completed: Vec::new(),
            projects: HashMap::new(),
            sections: HashMap::new(),
            lookups_loaded: false,
            loading: false,
            search_query: String::new(),
            settings: FilterSettings::default(),
            out_of_sync: false,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn filtered(&self) -> &[Task] {
        &self.filtered
    }

    pub fn completed(&self) -> &[CompletedTask] {
        &self.completed
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn settings(&self) -> &FilterSettings {
        &self.settings
    }

    /// Set when a failed reschedule could not be corrected by a reload; the
    /// local list may disagree with Todoist until the next successful load.
    pub fn is_out_of_sync(&self) -> bool {
        self.out_of_sync
    }

    /// Replaces the task list with a fresh copy from the backend.
    ///
    /// Projects and sections are fetched on the first call only. On error
    /// the cache keeps its previous contents.
    pub async fn load_tasks(&mut self) -> Result<(), ApiError> {
        self.loading = true;
        let result = self.fetch_tasks().await;
        self.loading = false;

        let tasks = result?;
        tracing::debug!(count = tasks.len(), "Loaded tasks");
        self.filtered = tasks.clone();
        self.tasks = tasks;
        self.search_query.clear();
        self.out_of_sync = false;
        Ok(())
    }

    async fn fetch_tasks(&mut self) -> Result<Vec<Task>, ApiError> {
        if !self.lookups_loaded {
            let (projects, sections) =
                tokio::try_join!(self.backend.projects(), self.backend.sections())?;
            self.projects = projects.into_iter().map(|p| (p.id, p.name)).collect();
            self.sections = sections.into_iter().map(|s| (s.id, s.name)).collect();
            self.lookups_loaded = true;
        }

        let raw = self.backend.tasks().await?;
        Ok(raw
            .into_iter()
            .map(|task| {
                let project = self.projects.get(&task.project_id).cloned().unwrap_or_default();
                let section = task
                    .section_id
                    .as_ref()
                    .and_then(|id| self.sections.get(id))
                    .cloned()
                    .unwrap_or_default();
                Task::from_raw(task, &project, &section)
            })
            .collect())
    }

    pub async fn load_completed_tasks(&mut self) -> Result<(), ApiError> {
        let response = self.backend.completed_tasks().await?;
        tracing::debug!(count = response.items.len(), "Loaded completed tasks");
        self.completed = response.items;
        Ok(())
    }

    /// Narrows `filtered` to tasks matching `query`, always starting from the
    /// full list.
    pub fn search(&mut self, query: &str) {
        self.search_query = query.to_string();
        self.filtered = filter::search_tasks(&self.tasks, query);
    }

    pub fn clear_search(&mut self) {
        self.search_query.clear();
        self.filtered = self.tasks.clone();
    }

    pub fn set_filters(&mut self, settings: FilterSettings) {
        self.settings = settings;
    }

    /// The search result with the current filters and sort applied.
    pub fn view(&self, predicate: Option<&dyn Fn(&Task) -> bool>, today: NaiveDate) -> Vec<Task> {
        filter::apply(&self.filtered, &self.settings, predicate, today)
    }

    pub fn project_name(&self, id: &str) -> &str {
        self.projects.get(id).map_or(NO_PROJECT, String::as_str)
    }

    pub fn section_name(&self, id: &str) -> Option<&str> {
        self.sections.get(id).map(String::as_str)
    }

    /// One line per record: `Project / Section - content (Due: date)`.
    /// Completed records never show a due date; unknown sections are left out.
    /// A limit of zero means no limit.
    pub fn export_lines(&self, records: &[TaskRecord], limit: Option<usize>) -> String {
        let limit = limit.filter(|&n| n > 0).unwrap_or(records.len());
        records
            .iter()
            .take(limit)
            .map(|record| {
                let due = match record.due_day() {
                    Some(day) => format!("Due: {day}"),
                    None => "No due date specified".to_string(),
                };
                let section = record
                    .section_id()
                    .and_then(|id| self.section_name(id))
                    .map(|name| format!(" / {name}"))
                    .unwrap_or_default();
                format!(
                    "{}{} - {} ({})",
                    self.project_name(record.project_id()),
                    section,
                    record.content(),
                    due
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use taskview_shared::{DueFilter, NO_SECTION};

    use super::*;
    use crate::backend::fake::{raw, FakeBackend};

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn load_projects_names_once() {
        let mut orphan = raw("2", None);
        orphan.project_id = "gone".into();
        orphan.section_id = None;
        let backend = Arc::new(FakeBackend::with_tasks(vec![raw("1", None), orphan]));
        let mut cache = TaskCache::new(backend.clone());

        cache.load_tasks().await.unwrap();
        cache.load_tasks().await.unwrap();

        assert_eq!(backend.count("projects"), 1);
        assert_eq!(backend.count("sections"), 1);
        assert_eq!(backend.count("tasks"), 2);

        let names: Vec<(&str, &str)> = cache
            .tasks()
            .iter()
            .map(|t| (t.project_name.as_str(), t.section_name.as_str()))
            .collect();
        assert_eq!(names, vec![("Work", "Reports"), (NO_PROJECT, NO_SECTION)]);
        assert_eq!(cache.filtered(), cache.tasks());
        assert!(!cache.is_loading());
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_tasks() {
        let backend = Arc::new(FakeBackend::with_tasks(vec![raw("1", None)]));
        let mut cache = TaskCache::new(backend.clone());
        cache.load_tasks().await.unwrap();
        cache.search("task");

        *backend.fail_tasks.lock().unwrap() = true;
        assert!(cache.load_tasks().await.is_err());
        assert_eq!(cache.tasks().len(), 1);
        assert_eq!(cache.search_query(), "task");
        assert!(!cache.is_loading());
    }

    #[tokio::test]
    async fn search_always_starts_from_full_list() {
        let backend = FakeBackend::with_tasks(vec![raw("1", None), raw("22", Some("2024-03-01"))]);
        let mut cache = TaskCache::new(backend);
        cache.load_tasks().await.unwrap();

        cache.search("task 1");
        assert_eq!(cache.filtered().len(), 1);
        cache.search("2024-03");
        assert_eq!(cache.filtered()[0].id, "22");
        cache.search("REPORTS");
        assert_eq!(cache.filtered().len(), 2);

        cache.clear_search();
        assert_eq!(cache.filtered().len(), 2);
        assert_eq!(cache.search_query(), "");
    }

    #[tokio::test]
    async fn view_applies_filters_to_search_result() {
        let backend = FakeBackend::with_tasks(vec![
            raw("1", Some("2024-03-01")),
            raw("2", None),
            raw("3", Some("2024-03-09")),
        ]);
        let mut cache = TaskCache::new(backend);
        cache.load_tasks().await.unwrap();
        cache.set_filters(FilterSettings {
            due_filter: DueFilter::Today,
            ..Default::default()
        });

        let ids: Vec<String> = cache
            .view(None, day("2024-03-05"))
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["1"]);

        let not_three = |t: &Task| t.id != "3";
        assert_eq!(cache.view(Some(&not_three), day("2024-03-10")).len(), 1);
    }

    #[tokio::test]
    async fn completed_tasks_are_replaced() {
        let backend = FakeBackend::with_tasks(vec![]);
        *backend.completed.lock().unwrap() = vec![completed("c1")];
        let mut cache = TaskCache::new(backend);

        cache.load_completed_tasks().await.unwrap();
        assert_eq!(cache.completed().len(), 1);
    }

    #[tokio::test]
    async fn export_lines_match_each_record_kind() {
        let backend = FakeBackend::with_tasks(vec![raw("1", Some("2024-03-01")), raw("2", None)]);
        let mut cache = TaskCache::new(backend);
        cache.load_tasks().await.unwrap();

        let mut done = completed("c1");
        done.section_id = Some("unknown".into());
        let mut records: Vec<TaskRecord> =
            cache.tasks().iter().cloned().map(TaskRecord::Active).collect();
        records.push(TaskRecord::Completed(done));

        assert_eq!(
            cache.export_lines(&records, None),
            "Work / Reports - task 1 (Due: 2024-03-01)\n\
             Work / Reports - task 2 (No due date specified)\n\
             Work - finished (No due date specified)"
        );
        assert_eq!(
            cache.export_lines(&records, Some(1)),
            "Work / Reports - task 1 (Due: 2024-03-01)"
        );
        assert_eq!(
            cache.export_lines(&records, Some(0)),
            cache.export_lines(&records, None)
        );
    }

    fn completed(id: &str) -> CompletedTask {
        CompletedTask {
            id: id.into(),
            task_id: "1".into(),
            content: "finished".into(),
            project_id: "p1".into(),
            section_id: None,
            completed_at: "2024-03-01T10:00:00Z".into(),
            note_count: 0,
            user_id: None,
            v2_task_id: None,
            v2_project_id: None,
            v2_section_id: None,
            meta_data: None,
        }
    }
}
