mod api_doc;
mod auth;
mod code;
mod config;
mod db;
mod docstore;
mod email;
mod ids;
mod invitation;
mod media;
mod notification;
mod retry;
mod routes;
mod task;

use axum::{extract::Extension, routing::get, Router};
use dotenv::dotenv;
use redis::Client;
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api_doc::ApiDoc;
use crate::auth::jwt::JwtVerifier;
use crate::code::service::CodeSnippetStore;
use crate::config::AppConfig;
use crate::db::postgres::PgRepository;
use crate::db::repository::{
    MembershipRepository, NotificationRepository, ProjectRepository, UserRepository,
};
use crate::docstore::redis::RedisDocumentStore;
use crate::docstore::DocumentStore;
use crate::email::{EmailSender, HttpEmailSender};
use crate::invitation::service::InvitationService;
use crate::media::cloudinary::CloudinaryClient;
use crate::media::MediaClient;
use crate::notification::service::NotificationService;
use crate::routes::health::HealthState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    tracing_subscriber::fmt::init();

    // Load .env file if it exists
    dotenv().ok();

    let config = AppConfig::from_env()?;

    // Create connection pool
    let pool = db::connect(&config.database_url).await?;

    // Check if the database is initialized
    if !db::check_db_initialized(&pool).await {
        db::init_db(&pool).await?;
    }

    // Document store for code snippets
    info!("Connecting document store at {}", config.redis_url);
    let documents = Arc::new(RedisDocumentStore::new(
        Client::open(config.redis_url.clone())?,
        None,
    ));
    if let Err(e) = documents.ping().await {
        warn!("Document store is not reachable yet: {}", e);
    }

    // Backend collaborators
    let repository = Arc::new(PgRepository::new(pool.clone()));
    let notification_repo: Arc<dyn NotificationRepository> = repository.clone();
    let project_repo: Arc<dyn ProjectRepository> = repository.clone();
    let membership_repo: Arc<dyn MembershipRepository> = repository.clone();
    let user_repo: Arc<dyn UserRepository> = repository;
    let document_store: Arc<dyn DocumentStore> = documents.clone();
    let email_sender: Arc<dyn EmailSender> = Arc::new(HttpEmailSender::new(config.email.clone()));
    let media_client: Arc<dyn MediaClient> =
        Arc::new(CloudinaryClient::new(config.cloudinary.clone()));

    // Services
    let notification_service = Arc::new(NotificationService::new(
        notification_repo,
        project_repo.clone(),
        user_repo.clone(),
    ));
    let code_store = Arc::new(CodeSnippetStore::new(
        document_store,
        config.code_save_retry.clone(),
    ));
    let invitation_service = Arc::new(InvitationService::new(
        membership_repo,
        project_repo.clone(),
        user_repo,
        email_sender,
        config.app_url.clone(),
    ));

    // Build the router
    let app = Router::new()
        // API documentation
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(routes::health::routes(HealthState {
            pool: pool.clone(),
            documents,
        }))
        .merge(routes::notifications::routes(notification_service))
        .merge(routes::code::routes(code_store))
        .merge(routes::supervisors::routes(invitation_service))
        .merge(routes::media::routes(media_client))
        .merge(routes::tasks::routes(project_repo))
        .route("/", get(|| async { "Welcome to GradTrack Backend API" }))
        .layer(Extension(JwtVerifier::new(&config.jwt_secret)))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    // Try different ports
    let mut port = config.port;
    let max_tries = 5;
    for attempt in 1..=max_tries {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        match axum::Server::try_bind(&addr) {
            Ok(server) => {
                info!("Server started at http://localhost:{}", port);
                info!("API Documentation: http://localhost:{}/docs", port);
                return server
                    .serve(app.into_make_service())
                    .await
                    .map_err(|e| e.into());
            }
            Err(e) => {
                warn!("Port {} unavailable: {}", port, e);
                if attempt == max_tries {
                    return Err("Failed to bind to any port".into());
                }
                port += 1;
            }
        }
    }

    Err("Failed to bind to any port".into())
}
