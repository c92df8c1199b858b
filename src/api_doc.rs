use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Security scheme configuration for OpenAPI
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        // Get or create components section
        let components = openapi.components.get_or_insert_with(Default::default);

        // Bearer tokens are issued by the identity provider
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

/// API documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "GradTrack Backend API",
        version = "0.1.0",
        description = "Notifications, code snippets, supervisors and media for GradTrack projects"
    ),
    paths(
        crate::routes::health::health_check,
        crate::routes::health::protected_health_check,
        // Notification endpoints
        crate::notification::controller::list_notifications,
        crate::notification::controller::unread_count,
        crate::notification::controller::mark_read,
        crate::notification::controller::mark_all_read,
        crate::notification::controller::delete_notification,
        crate::notification::controller::delete_notifications,
        crate::notification::controller::dispatch_event,
        crate::notification::controller::send_test_notification,
        // Code snippet endpoints
        crate::code::controller::save_snippet,
        crate::code::controller::get_snippet,
        crate::code::controller::delete_snippet,
        crate::code::controller::update_snippet,
        // Supervisor endpoints
        crate::invitation::controller::search_supervisors,
        crate::invitation::controller::invite_supervisor,
        crate::invitation::controller::demote_supervisor,
        // Media endpoints
        crate::media::controller::upload_image,
        crate::media::controller::delete_image,
        // Task endpoints
        crate::task::controller::list_project_tasks
    ),
    components(
        schemas(
            crate::routes::health::HealthResponse,
            // Notification schemas
            crate::notification::model::Notification,
            crate::notification::model::NotificationType,
            crate::notification::model::NotificationEvent,
            crate::notification::model::NotificationListResponse,
            crate::notification::model::NotificationErrorResponse,
            crate::notification::model::ReadFilter,
            crate::notification::model::AffectedResponse,
            crate::notification::model::DispatchResponse,
            crate::notification::model::UnreadCountResponse,
            // Code schemas
            crate::code::model::CodeSnippet,
            crate::code::model::SnippetRecord,
            crate::code::model::OwnerType,
            crate::code::model::SaveSnippetRequest,
            crate::code::model::SaveSnippetResponse,
            crate::code::model::SnippetPatch,
            crate::code::model::CodeErrorResponse,
            // Supervisor schemas
            crate::invitation::model::InviteSupervisorRequest,
            crate::invitation::model::DemoteSupervisorRequest,
            crate::invitation::model::WorkflowOutcome,
            crate::invitation::model::UserSummary,
            crate::invitation::model::MemberRole,
            // Media schemas
            crate::media::UploadedImage,
            crate::media::DestroyResult,
            crate::media::controller::UploadImageRequest,
            crate::media::controller::DeleteImageRequest,
            crate::media::controller::MediaErrorResponse,
            // Task schemas
            crate::task::model::Task,
            crate::task::model::TaskStatus,
            crate::task::model::TaskPriority,
            crate::task::model::TaskSort,
            crate::task::controller::TaskErrorResponse
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "notifications", description = "Notification inbox and event dispatch"),
        (name = "code", description = "Code snippets attached to posts and comments"),
        (name = "supervisors", description = "Supervisor search, invitation and demotion"),
        (name = "media", description = "Image upload proxy"),
        (name = "tasks", description = "Project task lists")
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;
