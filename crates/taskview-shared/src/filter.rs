//! Client-side filtering and ordering of the task list.
//!
//! Everything here is pure: the functions borrow the task list and return a
//! fresh vector, so the cache that owns the tasks is never touched.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::Task;
use crate::util::day_string;

/// Separator between project and section in a path filter.
pub const PATH_SEPARATOR: &str = " > ";

/// Stand-in due date for undated tasks under the `due_*` orders.
const UNDATED: &str = "9999";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DueFilter {
    #[default]
    All,
    /// Due today or earlier.
    Today,
    HasDue,
    NoDue,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    DueAsc,
    DueDesc,
    CreatedAsc,
    #[default]
    CreatedDesc,
    Project,
    Content,
    /// Priority, then overdue, then due date, then newest first.
    Priority,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseFilterError {
    kind: &'static str,
    value: String,
}

impl FromStr for DueFilter {
    type Err = ParseFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "today" => Ok(Self::Today),
            "has_due" => Ok(Self::HasDue),
            "no_due" => Ok(Self::NoDue),
            other => Err(ParseFilterError {
                kind: "due filter",
                value: other.to_string(),
            }),
        }
    }
}

impl FromStr for SortKey {
    type Err = ParseFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "due_asc" => Ok(Self::DueAsc),
            "due_desc" => Ok(Self::DueDesc),
            "created_asc" => Ok(Self::CreatedAsc),
            "created_desc" => Ok(Self::CreatedDesc),
            "project" => Ok(Self::Project),
            "content" => Ok(Self::Content),
            "priority" => Ok(Self::Priority),
            other => Err(ParseFilterError {
                kind: "sort key",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DueAsc => "due_asc",
            Self::DueDesc => "due_desc",
            Self::CreatedAsc => "created_asc",
            Self::CreatedDesc => "created_desc",
            Self::Project => "project",
            Self::Content => "content",
            Self::Priority => "priority",
        };
        f.write_str(name)
    }
}

/// Filter panel state. Always replaced as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSettings {
    #[serde(default)]
    pub due_filter: DueFilter,
    /// Empty means no label filter.
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub sort: SortKey,
    /// `"<project>"` or `"<project> > <section>"`; empty means no filter.
    #[serde(default)]
    pub project_section: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
}

/// Narrows `tasks` by `settings` (and an optional extra predicate) and sorts
/// the result.
///
/// Steps run in a fixed order: priority, project/section path, due bucket,
/// label, custom predicate. The sort is stable, so tasks that compare equal
/// keep their relative input order.
pub fn apply(
    tasks: &[Task],
    settings: &FilterSettings,
    predicate: Option<&dyn Fn(&Task) -> bool>,
    today: NaiveDate,
) -> Vec<Task> {
    let today = day_string(today);
    let path = parse_path(&settings.project_section);

    let mut view: Vec<Task> = tasks
        .iter()
        .filter(|task| settings.priority.map_or(true, |p| task.priority == p))
        .filter(|task| path.map_or(true, |path| path.matches(task)))
        .filter(|task| matches_due(task, settings.due_filter, &today))
        .filter(|task| settings.label.is_empty() || task.labels.contains(&settings.label))
        .filter(|task| predicate.map_or(true, |keep| keep(task)))
        .cloned()
        .collect();

    view.sort_by(|a, b| compare(a, b, settings.sort, &today));
    view
}

/// Case-insensitive substring search over content, project name, section
/// name and due date.
pub fn search_tasks(tasks: &[Task], query: &str) -> Vec<Task> {
    let query = query.to_lowercase();
    tasks
        .iter()
        .filter(|task| {
            task.content.to_lowercase().contains(&query)
                || task.project_name.to_lowercase().contains(&query)
                || task.section_name.to_lowercase().contains(&query)
                || task.due.as_ref().map_or(false, |due| due.date.contains(&query))
        })
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct PathFilter<'a> {
    project: &'a str,
    section: Option<&'a str>,
}

impl PathFilter<'_> {
    fn matches(&self, task: &Task) -> bool {
        task.project_name == self.project
            && self.section.map_or(true, |section| task.section_name == section)
    }
}

fn parse_path(path: &str) -> Option<PathFilter<'_>> {
    if path.is_empty() {
        return None;
    }
    let mut parts = path.splitn(2, PATH_SEPARATOR);
    let project = parts.next().unwrap_or_default();
    let section = parts.next().filter(|section| !section.is_empty());
    Some(PathFilter { project, section })
}

fn matches_due(task: &Task, filter: DueFilter, today: &str) -> bool {
    match filter {
        DueFilter::All => true,
        DueFilter::Today => task.due_day().map_or(false, |day| day <= today),
        DueFilter::HasDue => task.due.is_some(),
        DueFilter::NoDue => task.due.is_none(),
    }
}

fn compare(a: &Task, b: &Task, sort: SortKey, today: &str) -> Ordering {
    match sort {
        SortKey::DueAsc => due_or_undated(a).cmp(due_or_undated(b)),
        SortKey::DueDesc => due_or_undated(b).cmp(due_or_undated(a)),
        SortKey::CreatedAsc => a.created_at.cmp(&b.created_at),
        SortKey::CreatedDesc => b.created_at.cmp(&a.created_at),
        SortKey::Project => collate(&a.project_name, &b.project_name),
        SortKey::Content => collate(&a.content, &b.content),
        SortKey::Priority => compare_by_priority(a, b, today),
    }
}

fn compare_by_priority(a: &Task, b: &Task, today: &str) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| overdue_on(b, today).cmp(&overdue_on(a, today)))
        .then_with(|| match (due_date(a), due_date(b)) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| b.created_at.cmp(&a.created_at))
}

fn overdue_on(task: &Task, today: &str) -> bool {
    task.due_day().map_or(false, |day| day < today)
}

/// The full due value, so timed tasks on one day order by time.
fn due_date(task: &Task) -> Option<&str> {
    task.due.as_ref().map(|due| due.date.as_str())
}

fn due_or_undated(task: &Task) -> &str {
    due_date(task).unwrap_or(UNDATED)
}

/// Dictionary-style ordering: letters compare without regard to case first,
/// case only breaks ties.
fn collate(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}
