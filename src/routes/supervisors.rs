use crate::auth::middleware::auth_middleware;
use crate::invitation::controller::{demote_supervisor, invite_supervisor, search_supervisors};
use crate::invitation::service::InvitationService;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Create a router for supervisor search, invitation and demotion
pub fn routes(invitation_service: Arc<InvitationService>) -> Router {
    Router::new()
        .route("/api/supervisors/search", get(search_supervisors))
        .route("/api/supervisors", post(invite_supervisor))
        .route(
            "/api/supervisors/:membership_id/demote",
            post(demote_supervisor),
        )
        .route_layer(middleware::from_fn(auth_middleware))
        .layer(axum::extract::Extension(invitation_service))
}
