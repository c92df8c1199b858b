use crate::auth::middleware::auth_middleware;
use crate::media::controller::{delete_image, upload_image};
use crate::media::MediaClient;
use axum::{middleware, routing::post, Router};
use std::sync::Arc;

/// Create a router for the image proxy endpoints
pub fn routes(media: Arc<dyn MediaClient>) -> Router {
    Router::new()
        .route("/api/cloudinary/images", post(upload_image))
        .route("/api/cloudinary/delete", post(delete_image))
        .route_layer(middleware::from_fn(auth_middleware))
        .layer(axum::extract::Extension(media))
}
