//! services/api/src/web/rest.rs
//!
//! Contains the shared REST payload types, the health endpoint and the master
//! definition for the OpenAPI specification.

use crate::web::{error::ErrorBody, files, state::AppState, test_cases};
use axum::{extract::State, response::Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use testgen_core::domain::{File, TestCase};
use utoipa::{OpenApi, ToSchema};

use super::error::HttpError;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        files::upload_files_handler,
        files::list_files_handler,
        files::delete_file_handler,
        test_cases::generate_test_cases_handler,
        test_cases::list_test_cases_handler,
        test_cases::get_test_case_handler,
        test_cases::select_test_case_handler,
        test_cases::export_csv_handler,
    ),
    components(
        schemas(
            FileResponse,
            TestCaseResponse,
            MessageResponse,
            HealthResponse,
            ErrorBody,
            test_cases::GenerateTestCasesRequest,
            test_cases::SelectTestCaseRequest,
            test_cases::ExportCsvRequest,
        )
    ),
    tags(
        (name = "Test Case Generator API", description = "Upload specifications, generate test cases and export them as CSV.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response Structs
//=========================================================================================

/// A stored file as returned to clients.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    pub id: i32,
    pub name: String,
    /// Size in bytes.
    pub size: i64,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
}

impl From<File> for FileResponse {
    fn from(file: File) -> Self {
        Self {
            id: file.id,
            name: file.name,
            size: file.size,
            mime_type: file.mime_type,
            uploaded_at: file.uploaded_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseResponse {
    pub id: i32,
    pub test_id: String,
    pub description: String,
    pub prerequisites: Option<String>,
    pub steps: Vec<String>,
    pub expected_results: String,
    /// One of `High`, `Medium`, `Low`.
    pub priority: String,
    /// One of `Functional`, `Non-functional`, `Integration`.
    #[serde(rename = "type")]
    pub test_type: String,
    pub file_ids: Vec<i32>,
    pub created_at: DateTime<Utc>,
    pub selected: bool,
}

impl From<TestCase> for TestCaseResponse {
    fn from(test_case: TestCase) -> Self {
        Self {
            id: test_case.id,
            test_id: test_case.test_id,
            description: test_case.description,
            prerequisites: test_case.prerequisites,
            steps: test_case.steps,
            expected_results: test_case.expected_results,
            priority: test_case.priority.to_string(),
            test_type: test_case.test_type.to_string(),
            file_ids: test_case.file_ids,
            created_at: test_case.created_at,
            selected: test_case.selected,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    /// `postgres` or `memory`.
    pub storage: String,
    pub generator_configured: bool,
}

/// Parses a path id, answering 400 with `message` when it is not an integer.
pub fn parse_id(raw: &str, message: &str) -> Result<i32, HttpError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| HttpError::bad_request(message))
}

//=========================================================================================
// Health
//=========================================================================================

/// Report liveness and which backends are wired in.
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health_handler(State(app_state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let storage = if app_state.config.database_url.is_some() {
        "postgres"
    } else {
        "memory"
    };
    Json(HealthResponse {
        status: "ok".to_string(),
        storage: storage.to_string(),
        generator_configured: app_state.config.gemini_api_key.is_some(),
    })
}
