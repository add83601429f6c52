//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, GeminiAdapter, InMemoryAdapter, LocalBlobStore},
    config::Config,
    error::ApiError,
    web::{self, rest::ApiDoc, state::AppState},
};
use axum::http::{header::CONTENT_TYPE, Method};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use testgen_core::ports::DatabaseService;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Choose the Persistence Store ---
    let db: Arc<dyn DatabaseService> = match &config.database_url {
        Some(database_url) => {
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            let db_adapter = DbAdapter::new(db_pool);
            info!("Running database migrations...");
            db_adapter.run_migrations().await?;
            info!("Database migrations complete.");
            Arc::new(db_adapter)
        }
        None => {
            warn!("DATABASE_URL is not set; records are kept in memory and lost on restart.");
            Arc::new(InMemoryAdapter::new())
        }
    };

    // --- 3. Initialize Service Adapters ---
    let blobs = Arc::new(LocalBlobStore::new(config.upload_dir.clone()));
    let llm = Arc::new(GeminiAdapter::new(
        config.gemini_api_key.clone(),
        config.gemini_base_url.clone(),
        config.gemini_model.clone(),
    ));
    if !llm.is_configured() {
        warn!("GEMINI_API_KEY is not set; test case generation will fail until it is provided.");
    }

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(config.clone(), db, blobs, llm));

    // --- 5. Create the Web Router ---
    let mut api_router = web::router(app_state).layer(TraceLayer::new_for_http());
    if let Some(origin) = &config.cors_allowed_origin {
        let cors = CorsLayer::new()
            .allow_origin(origin.clone())
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
            .allow_headers([CONTENT_TYPE]);
        api_router = api_router.layer(cors);
    }

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
