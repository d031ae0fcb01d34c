//! View models and Tera page rendering.
//!
//! Templates are embedded at compile time; there is no on-disk template
//! lookup at runtime.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::Serialize;
use tera::{Context, Tera};

use crate::error::Result;
use crate::store::models::{Status, Task};
use crate::timefmt;

/// Embedded page templates.
static TEMPLATES: Lazy<Tera> = Lazy::new(|| {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        ("index.html", include_str!("../../templates/index.html.tera")),
        ("archive.html", include_str!("../../templates/archive.html.tera")),
    ])
    .expect("embedded templates must parse");
    tera
});

/// A task prepared for rendering and for API/SSE payloads.
#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    /// Task id.
    pub id: i64,
    /// Task title.
    pub title: String,
    /// Task description.
    pub description: String,
    /// Whether the task is done.
    pub done: bool,
    /// Whether the task is archived.
    pub archived: bool,
    /// Creation time in the form wire format.
    pub created: String,
    /// Due time in the form wire format, empty if none.
    pub due: String,
    /// Human-readable due label ("due in 2d", "due now", ...), empty if
    /// the task has no due date.
    pub due_label: String,
}

impl TaskView {
    /// Build a view of `task`, formatting its due date relative to `now`.
    #[must_use]
    pub fn from_task(now: DateTime<Utc>, task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            description: task.description.clone(),
            done: task.status == Status::Done,
            archived: task.archived,
            created: timefmt::date_time_str(Some(task.created)),
            due: timefmt::date_time_str(task.due),
            due_label: task.due.map_or_else(String::new, |d| timefmt::due(now, d)),
        }
    }
}

/// Render the index page listing active tasks.
///
/// # Errors
///
/// Returns an error if template rendering fails.
pub fn page_index(tasks: &[TaskView]) -> Result<String> {
    render_page("index.html", tasks)
}

/// Render the archive page listing archived tasks.
///
/// # Errors
///
/// Returns an error if template rendering fails.
pub fn page_archive(tasks: &[TaskView]) -> Result<String> {
    render_page("archive.html", tasks)
}

fn render_page(template: &str, tasks: &[TaskView]) -> Result<String> {
    let mut ctx = Context::new();
    ctx.insert("tasks", tasks);
    Ok(TEMPLATES.render(template, &ctx)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task() -> Task {
        Task {
            id: 1,
            title: "Water the plants".to_string(),
            description: "Especially the fern".to_string(),
            status: Status::Open,
            archived: false,
            created: Utc::now(),
            due: Some(Utc::now() + chrono::Duration::days(1)),
        }
    }

    #[test]
    fn test_task_view_formats_due() {
        let task = sample_task();
        let view = TaskView::from_task(Utc::now(), &task);
        assert_eq!(view.id, 1);
        assert!(!view.done);
        assert!(!view.due.is_empty());
        assert!(view.due_label.starts_with("due in"));
    }

    #[test]
    fn test_task_view_without_due() {
        let mut task = sample_task();
        task.due = None;
        let view = TaskView::from_task(Utc::now(), &task);
        assert!(view.due.is_empty());
        assert!(view.due_label.is_empty());
    }

    #[test]
    fn test_pages_render() {
        let views = vec![TaskView::from_task(Utc::now(), &sample_task())];
        let index = page_index(&views).unwrap();
        assert!(index.contains("Water the plants"));
        let archive = page_archive(&[]).unwrap();
        assert!(archive.contains("Archive"));
    }
}
