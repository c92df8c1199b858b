use crate::auth::middleware::auth_middleware;
use crate::notification::controller::{
    delete_notification, delete_notifications, dispatch_event, list_notifications, mark_all_read,
    mark_read, send_test_notification, unread_count,
};
use crate::notification::service::NotificationService;
use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;

/// Create a router for the notification inbox and event dispatch.
/// Every route requires authentication.
pub fn routes(notification_service: Arc<NotificationService>) -> Router {
    Router::new()
        .route(
            "/api/notifications",
            get(list_notifications).delete(delete_notifications),
        )
        .route("/api/notifications/unread-count", get(unread_count))
        .route("/api/notifications/read-all", post(mark_all_read))
        .route("/api/notifications/events", post(dispatch_event))
        .route("/api/notifications/test", post(send_test_notification))
        .route("/api/notifications/:id/read", patch(mark_read))
        .route("/api/notifications/:id", delete(delete_notification))
        .route_layer(middleware::from_fn(auth_middleware))
        .layer(axum::extract::Extension(notification_service))
}
