use crate::auth::middleware::auth_middleware;
use crate::db::repository::ProjectRepository;
use crate::task::controller::list_project_tasks;
use axum::{middleware, routing::get, Router};
use std::sync::Arc;

/// Create a router for task list views
pub fn routes(projects: Arc<dyn ProjectRepository>) -> Router {
    Router::new()
        .route("/api/projects/:id/tasks", get(list_project_tasks))
        .route_layer(middleware::from_fn(auth_middleware))
        .layer(axum::extract::Extension(projects))
}
