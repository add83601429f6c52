pub mod error;
pub mod files;
pub mod rest;
pub mod state;
pub mod test_cases;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;
use testgen_core::domain::{MAX_FILES_PER_UPLOAD, MAX_FILE_SIZE_BYTES};

use state::AppState;

/// Room for a full batch of maximum-size files plus multipart framing.
const BODY_LIMIT_BYTES: usize = MAX_FILES_PER_UPLOAD * MAX_FILE_SIZE_BYTES as usize + 1024 * 1024;

/// Builds the `/api` router over the shared state.
pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(rest::health_handler))
        .route("/api/files/upload", post(files::upload_files_handler))
        .route("/api/files", get(files::list_files_handler))
        .route("/api/files/{id}", delete(files::delete_file_handler))
        .route(
            "/api/test-cases/generate",
            post(test_cases::generate_test_cases_handler),
        )
        .route(
            "/api/test-cases/export-csv",
            post(test_cases::export_csv_handler),
        )
        .route("/api/test-cases", get(test_cases::list_test_cases_handler))
        .route("/api/test-cases/{id}", get(test_cases::get_test_case_handler))
        .route(
            "/api/test-cases/{id}/select",
            patch(test_cases::select_test_case_handler),
        )
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .with_state(app_state)
}
