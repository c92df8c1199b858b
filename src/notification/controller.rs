use crate::auth::middleware::AuthUser;
use crate::notification::model::{
    AffectedResponse, DispatchResponse, InboxQuery, Notification, NotificationError,
    NotificationErrorResponse, NotificationEvent, NotificationListResponse, UnreadCountResponse,
};
use crate::notification::service::NotificationService;
use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

// Helper function to convert NotificationError to HTTP response
fn notification_error_to_response(
    err: NotificationError,
) -> (StatusCode, Json<NotificationErrorResponse>) {
    let status = match &err {
        NotificationError::DatabaseError(e) => {
            error!("Database error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
        NotificationError::NotFound
        | NotificationError::ProjectNotFound
        | NotificationError::PostNotFound => StatusCode::NOT_FOUND,
        NotificationError::MissingUserInformation => StatusCode::BAD_REQUEST,
    };

    (status, Json(NotificationErrorResponse::from(err)))
}

/// List the caller's notifications
///
/// Newest first, filtered by read state. The unread count always covers the
/// whole inbox.
#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "notifications",
    params(InboxQuery),
    responses(
        (status = 200, description = "Inbox listing", body = NotificationListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error", body = NotificationErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_notifications(
    Extension(user): Extension<AuthUser>,
    Extension(notification_service): Extension<Arc<NotificationService>>,
    Query(query): Query<InboxQuery>,
) -> impl IntoResponse {
    match notification_service.list(user.user_id, query.filter).await {
        Ok((notifications, unread_count)) => (
            StatusCode::OK,
            Json(NotificationListResponse {
                notifications,
                unread_count,
            }),
        )
            .into_response(),
        Err(e) => notification_error_to_response(e).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/notifications/unread-count",
    tag = "notifications",
    responses(
        (status = 200, description = "Number of unread notifications", body = UnreadCountResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn unread_count(
    Extension(user): Extension<AuthUser>,
    Extension(notification_service): Extension<Arc<NotificationService>>,
) -> Result<Json<UnreadCountResponse>, (StatusCode, Json<NotificationErrorResponse>)> {
    notification_service
        .unread_count(user.user_id)
        .await
        .map(|unread_count| Json(UnreadCountResponse { unread_count }))
        .map_err(notification_error_to_response)
}

#[utoipa::path(
    patch,
    path = "/api/notifications/{id}/read",
    tag = "notifications",
    params(
        ("id" = String, Path, description = "Notification id")
    ),
    responses(
        (status = 204, description = "Marked as read"),
        (status = 404, description = "Notification not found", body = NotificationErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn mark_read(
    Path(notification_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
    Extension(notification_service): Extension<Arc<NotificationService>>,
) -> impl IntoResponse {
    match notification_service
        .mark_read(notification_id, user.user_id)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => notification_error_to_response(e).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/notifications/read-all",
    tag = "notifications",
    responses(
        (status = 200, description = "Unread notifications marked read", body = AffectedResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn mark_all_read(
    Extension(user): Extension<AuthUser>,
    Extension(notification_service): Extension<Arc<NotificationService>>,
) -> Result<Json<AffectedResponse>, (StatusCode, Json<NotificationErrorResponse>)> {
    notification_service
        .mark_all_read(user.user_id)
        .await
        .map(|affected| Json(AffectedResponse { affected }))
        .map_err(notification_error_to_response)
}

#[utoipa::path(
    delete,
    path = "/api/notifications/{id}",
    tag = "notifications",
    params(
        ("id" = String, Path, description = "Notification id")
    ),
    responses(
        (status = 204, description = "Notification deleted"),
        (status = 404, description = "Notification not found", body = NotificationErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_notification(
    Path(notification_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
    Extension(notification_service): Extension<Arc<NotificationService>>,
) -> impl IntoResponse {
    match notification_service
        .delete(notification_id, user.user_id)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => notification_error_to_response(e).into_response(),
    }
}

/// Delete every notification matching the filter
#[utoipa::path(
    delete,
    path = "/api/notifications",
    tag = "notifications",
    params(InboxQuery),
    responses(
        (status = 200, description = "Notifications deleted", body = AffectedResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_notifications(
    Extension(user): Extension<AuthUser>,
    Extension(notification_service): Extension<Arc<NotificationService>>,
    Query(query): Query<InboxQuery>,
) -> Result<Json<AffectedResponse>, (StatusCode, Json<NotificationErrorResponse>)> {
    notification_service
        .delete_matching(user.user_id, query.filter)
        .await
        .map(|affected| Json(AffectedResponse { affected }))
        .map_err(notification_error_to_response)
}

/// Report a task or comment event
///
/// Fans the event out to the project. The caller is treated as the actor and
/// receives nothing.
#[utoipa::path(
    post,
    path = "/api/notifications/events",
    tag = "notifications",
    request_body = NotificationEvent,
    responses(
        (status = 201, description = "Notifications written", body = DispatchResponse),
        (status = 404, description = "Project or post not found", body = NotificationErrorResponse),
        (status = 500, description = "Internal server error", body = NotificationErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn dispatch_event(
    Extension(user): Extension<AuthUser>,
    Extension(notification_service): Extension<Arc<NotificationService>>,
    Json(event): Json<NotificationEvent>,
) -> impl IntoResponse {
    match notification_service.dispatch(event, user.user_id).await {
        Ok(written) => {
            info!(
                "Event from {} produced {} notification(s)",
                user.user_id,
                written.len()
            );
            (
                StatusCode::CREATED,
                Json(DispatchResponse {
                    delivered: written.len(),
                }),
            )
                .into_response()
        }
        Err(e) => notification_error_to_response(e).into_response(),
    }
}

/// Send the caller a test notification
#[utoipa::path(
    post,
    path = "/api/notifications/test",
    tag = "notifications",
    responses(
        (status = 201, description = "Test notification written", body = Notification)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn send_test_notification(
    Extension(user): Extension<AuthUser>,
    Extension(notification_service): Extension<Arc<NotificationService>>,
) -> impl IntoResponse {
    match notification_service.send_test_notification(user.user_id).await {
        Ok(notification) => (StatusCode::CREATED, Json(notification)).into_response(),
        Err(e) => notification_error_to_response(e).into_response(),
    }
}
