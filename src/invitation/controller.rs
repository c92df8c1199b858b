use crate::auth::middleware::AuthUser;
use crate::invitation::model::{
    DemoteSupervisorRequest, InviteSupervisorRequest, SearchQuery, SupervisorCandidate,
    WorkflowOutcome,
};
use crate::invitation::service::InvitationService;
use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Search accounts that could become supervisors
///
/// Queries under two characters return an empty list. When the query is an
/// email address with no exact account match, the last entry is an
/// `invitation` candidate for that address.
#[utoipa::path(
    get,
    path = "/api/supervisors/search",
    tag = "supervisors",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching accounts, then an optional invitation entry")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn search_supervisors(
    Extension(invitation_service): Extension<Arc<InvitationService>>,
    Query(query): Query<SearchQuery>,
) -> Json<Vec<SupervisorCandidate>> {
    Json(
        invitation_service
            .search_potential_supervisors(&query.q)
            .await,
    )
}

/// Add, promote or invite a supervisor
///
/// Business-rule refusals such as an existing supervisor come back with
/// `success: false` and a display message.
#[utoipa::path(
    post,
    path = "/api/supervisors",
    tag = "supervisors",
    request_body = InviteSupervisorRequest,
    responses(
        (status = 200, description = "Workflow outcome", body = WorkflowOutcome)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn invite_supervisor(
    Extension(user): Extension<AuthUser>,
    Extension(invitation_service): Extension<Arc<InvitationService>>,
    Json(request): Json<InviteSupervisorRequest>,
) -> Json<WorkflowOutcome> {
    info!(
        "User {} requested supervisor {} for project {}",
        user.user_id,
        request.selection.email(),
        request.project_id
    );

    Json(
        invitation_service
            .handle_supervisor_invitation(request.project_id, &request.selection, user.user_id)
            .await,
    )
}

#[utoipa::path(
    post,
    path = "/api/supervisors/{membership_id}/demote",
    tag = "supervisors",
    params(
        ("membership_id" = String, Path, description = "Membership to demote")
    ),
    request_body = DemoteSupervisorRequest,
    responses(
        (status = 200, description = "Workflow outcome", body = WorkflowOutcome)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn demote_supervisor(
    Path(membership_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
    Extension(invitation_service): Extension<Arc<InvitationService>>,
    Json(request): Json<DemoteSupervisorRequest>,
) -> Json<WorkflowOutcome> {
    info!(
        "User {} demoting membership {} in project {}",
        user.user_id, membership_id, request.project_id
    );

    Json(
        invitation_service
            .demote_supervisor(membership_id, &request.email, request.project_id)
            .await,
    )
}
