use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Completed,
    Delayed,
}

impl TaskStatus {
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "not_started" => Some(TaskStatus::NotStarted),
            "in_progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            "delayed" => Some(TaskStatus::Delayed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not_started",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Delayed => "delayed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "لم تبدأ",
            TaskStatus::InProgress => "قيد التنفيذ",
            TaskStatus::Completed => "مكتملة",
            TaskStatus::Delayed => "متأخرة",
        }
    }

    /// Position in status-sorted lists; delayed work sorts ahead of finished work
    fn sort_rank(&self) -> u8 {
        match self {
            TaskStatus::NotStarted => 0,
            TaskStatus::InProgress => 1,
            TaskStatus::Delayed => 2,
            TaskStatus::Completed => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "low" => Some(TaskPriority::Low),
            "medium" => Some(TaskPriority::Medium),
            "high" => Some(TaskPriority::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskPriority::Low => "منخفضة",
            TaskPriority::Medium => "متوسطة",
            TaskPriority::High => "عالية",
        }
    }

    fn sort_rank(&self) -> u8 {
        match self {
            TaskPriority::High => 0,
            TaskPriority::Medium => 1,
            TaskPriority::Low => 2,
        }
    }
}

/// Display label for a raw status value; unknown values are shown as-is.
pub fn status_label(raw: &str) -> String {
    TaskStatus::from_str(raw)
        .map(|status| status.label().to_string())
        .unwrap_or_else(|| raw.to_string())
}

/// Display label for a raw priority value; unknown values read as medium.
pub fn priority_label(raw: &str) -> &'static str {
    TaskPriority::from_str(raw)
        .unwrap_or(TaskPriority::Medium)
        .label()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Task {
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,
    #[schema(value_type = String, format = "uuid")]
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub assigned_to: Option<Uuid>,
    #[schema(value_type = String, format = "uuid")]
    pub created_by: Uuid,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub due_date: Option<DateTime<Utc>>,
    pub completion_percentage: i32,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskSort {
    #[default]
    DueDate,
    Priority,
    Status,
}

/// Query string for task lists; absent filters mean "all"
#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
pub struct TaskListQuery {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub sort: TaskSort,
}

/// Filter by status and priority, then sort. The sort is stable, so ties keep
/// the order the rows were fetched in.
pub fn filter_and_sort(tasks: Vec<Task>, query: &TaskListQuery) -> Vec<Task> {
    let mut result: Vec<Task> = tasks
        .into_iter()
        .filter(|task| query.status.map_or(true, |status| task.status == status))
        .filter(|task| query.priority.map_or(true, |priority| task.priority == priority))
        .collect();

    match query.sort {
        TaskSort::DueDate => result.sort_by(|a, b| match (a.due_date, b.due_date) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }),
        TaskSort::Priority => result.sort_by_key(|task| task.priority.sort_rank()),
        TaskSort::Status => result.sort_by_key(|task| task.status.sort_rank()),
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn task(title: &str, status: TaskStatus, priority: TaskPriority, due_in: Option<i64>) -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            project_id: Uuid::nil(),
            title: title.to_string(),
            description: None,
            status,
            priority,
            assigned_to: None,
            created_by: Uuid::nil(),
            due_date: due_in.map(|days| now + Duration::days(days)),
            completion_percentage: 0,
            created_at: now,
        }
    }

    fn titles(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(status_label("in_progress"), "قيد التنفيذ");
        assert_eq!(status_label("completed"), "مكتملة");
        assert_eq!(status_label("archived"), "archived");
    }

    #[test]
    fn test_priority_labels_default_to_medium() {
        assert_eq!(priority_label("high"), "عالية");
        assert_eq!(priority_label("low"), "منخفضة");
        assert_eq!(priority_label("urgent"), "متوسطة");
    }

    #[test]
    fn test_due_date_sort_puts_undated_last() {
        let tasks = vec![
            task("undated", TaskStatus::NotStarted, TaskPriority::Low, None),
            task("later", TaskStatus::NotStarted, TaskPriority::Low, Some(5)),
            task("sooner", TaskStatus::NotStarted, TaskPriority::Low, Some(1)),
        ];
        let sorted = filter_and_sort(tasks, &TaskListQuery::default());
        assert_eq!(titles(&sorted), vec!["sooner", "later", "undated"]);
    }

    #[test]
    fn test_priority_and_status_sorts() {
        let tasks = vec![
            task("a", TaskStatus::Completed, TaskPriority::Low, None),
            task("b", TaskStatus::Delayed, TaskPriority::High, None),
            task("c", TaskStatus::NotStarted, TaskPriority::Medium, None),
        ];

        let by_priority = filter_and_sort(
            tasks.clone(),
            &TaskListQuery {
                sort: TaskSort::Priority,
                ..Default::default()
            },
        );
        assert_eq!(titles(&by_priority), vec!["b", "c", "a"]);

        let by_status = filter_and_sort(
            tasks,
            &TaskListQuery {
                sort: TaskSort::Status,
                ..Default::default()
            },
        );
        assert_eq!(titles(&by_status), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_filters_combine() {
        let tasks = vec![
            task("keep", TaskStatus::InProgress, TaskPriority::High, None),
            task("wrong-priority", TaskStatus::InProgress, TaskPriority::Low, None),
            task("wrong-status", TaskStatus::Completed, TaskPriority::High, None),
        ];
        let query = TaskListQuery {
            status: Some(TaskStatus::InProgress),
            priority: Some(TaskPriority::High),
            sort: TaskSort::DueDate,
        };
        assert_eq!(titles(&filter_and_sort(tasks, &query)), vec!["keep"]);
    }
}
