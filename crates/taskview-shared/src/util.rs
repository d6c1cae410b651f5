use chrono::{Local, NaiveDate};

use crate::models::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueStatus {
    Overdue,
    Due,
    NoDate,
}

/// The current day in the local timezone.
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn day_string(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Due strictly before the start of `today`.
pub fn is_overdue(task: &Task, today: NaiveDate) -> bool {
    let today = day_string(today);
    task.due_day().map_or(false, |day| day < today.as_str())
}

pub fn due_status(task: &Task, today: NaiveDate) -> DueStatus {
    match task.due_day() {
        None => DueStatus::NoDate,
        Some(_) if is_overdue(task, today) => DueStatus::Overdue,
        Some(_) => DueStatus::Due,
    }
}

/// `"!"` per priority level above the default, e.g. `"!!!"` for priority 4.
pub fn priority_indicator(priority: u8) -> String {
    "!".repeat(priority.saturating_sub(1) as usize)
}

/// Formats `YYYY-MM-DD` (optionally followed by a time) as `MM/DD/YY`.
pub fn format_task_date(date: &str) -> String {
    let day = date.split('T').next().unwrap_or_default();
    let mut parts = day.splitn(3, '-');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(year), Some(month), Some(day)) if year.len() >= 2 => {
            format!("{month}/{day}/{}", &year[year.len() - 2..])
        }
        _ => String::new(),
    }
}
