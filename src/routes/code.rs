use crate::auth::middleware::auth_middleware;
use crate::code::controller::{delete_snippet, get_snippet, save_snippet, update_snippet};
use crate::code::service::CodeSnippetStore;
use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;

/// Create a router for code snippet routes
pub fn routes(code_store: Arc<CodeSnippetStore>) -> Router {
    Router::new()
        // Reading a snippet is public, like reading the post it belongs to
        .route("/api/code/get", get(get_snippet))
        .route(
            "/api/code/save",
            post(save_snippet).route_layer(middleware::from_fn(auth_middleware)),
        )
        .route(
            "/api/code/delete",
            delete(delete_snippet).route_layer(middleware::from_fn(auth_middleware)),
        )
        .route(
            "/api/code/:id",
            patch(update_snippet).route_layer(middleware::from_fn(auth_middleware)),
        )
        .layer(axum::extract::Extension(code_store))
}
