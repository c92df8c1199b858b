use crate::db::repository::ProjectRepository;
use crate::task::model::{filter_and_sort, Task, TaskListQuery};
use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct TaskErrorResponse {
    pub error: String,
}

/// List a project's tasks
///
/// Filters by status and priority, then sorts by due date (undated last),
/// priority or status.
#[utoipa::path(
    get,
    path = "/api/projects/{id}/tasks",
    tag = "tasks",
    params(
        ("id" = String, Path, description = "Project id"),
        TaskListQuery
    ),
    responses(
        (status = 200, description = "Filtered and sorted tasks", body = [Task]),
        (status = 500, description = "Internal server error", body = TaskErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_project_tasks(
    Path(project_id): Path<Uuid>,
    Extension(projects): Extension<Arc<dyn ProjectRepository>>,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<Vec<Task>>, (StatusCode, Json<TaskErrorResponse>)> {
    let tasks = projects.project_tasks(project_id).await.map_err(|e| {
        error!("Failed to load tasks of project {}: {}", project_id, e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(TaskErrorResponse {
                error: "حدث خطأ أثناء جلب المهام".to_string(),
            }),
        )
    })?;

    Ok(Json(filter_and_sort(tasks, &query)))
}
