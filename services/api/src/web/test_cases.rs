//! services/api/src/web/test_cases.rs
//!
//! Generation, browsing, selection and CSV export of test cases.

use crate::export::render_csv;
use crate::web::{
    error::{ErrorBody, HttpError},
    rest::{parse_id, TestCaseResponse},
    state::AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::header,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use std::sync::Arc;
use testgen_core::domain::{File, TestCase, TestCaseFilter};
use testgen_core::ports::PortError;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

//=========================================================================================
// Request Structs
//=========================================================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTestCasesRequest {
    /// Ids of previously uploaded files to generate from.
    pub file_ids: Option<Vec<i32>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SelectTestCaseRequest {
    pub selected: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExportCsvRequest {
    pub test_case_ids: Option<Vec<i32>>,
}

/// Optional filters for the test case listing. `all` disables a filter.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct TestCaseQuery {
    /// `Functional`, `Non-functional` or `Integration`, compared case-insensitively.
    #[serde(rename = "type")]
    pub test_type: Option<String>,
    /// `High`, `Medium` or `Low`, compared case-insensitively.
    pub priority: Option<String>,
}

//=========================================================================================
// Handlers
//=========================================================================================

#[utoipa::path(
    post,
    path = "/api/test-cases/generate",
    request_body = GenerateTestCasesRequest,
    responses(
        (status = 200, description = "The generated and stored test cases", body = [TestCaseResponse]),
        (status = 400, description = "No file ids supplied", body = ErrorBody),
        (status = 404, description = "None of the ids match a stored file", body = ErrorBody),
        (status = 500, description = "Generation failed", body = ErrorBody)
    )
)]
pub async fn generate_test_cases_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<GenerateTestCasesRequest>, JsonRejection>,
) -> Result<Json<Vec<TestCaseResponse>>, HttpError> {
    let Json(request) = payload?;
    let file_ids = request.file_ids.unwrap_or_default();
    if file_ids.is_empty() {
        return Err(HttpError::bad_request("No file IDs provided"));
    }

    let mut files: Vec<File> = Vec::new();
    for id in file_ids {
        if files.iter().any(|f| f.id == id) {
            continue;
        }
        let found = app_state
            .db
            .get_file(id)
            .await
            .map_err(|e| HttpError::internal("Failed to generate test cases", e))?;
        files.extend(found);
    }
    if files.is_empty() {
        return Err(HttpError::not_found("No valid files found for the provided IDs"));
    }

    let generated = app_state
        .generator
        .generate(&files)
        .await
        .map_err(|e| HttpError::internal("Failed to generate test cases", e))?;

    let mut saved = Vec::with_capacity(generated.len());
    for new_test_case in generated {
        let test_case = app_state
            .db
            .create_test_case(new_test_case)
            .await
            .map_err(|e| HttpError::internal("Failed to generate test cases", e))?;
        saved.push(TestCaseResponse::from(test_case));
    }

    info!(files = files.len(), test_cases = saved.len(), "Generated test cases");
    Ok(Json(saved))
}

#[utoipa::path(
    get,
    path = "/api/test-cases",
    params(TestCaseQuery),
    responses(
        (status = 200, description = "Test cases matching the filters", body = [TestCaseResponse]),
        (status = 500, description = "Storage failure", body = ErrorBody)
    )
)]
pub async fn list_test_cases_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<TestCaseQuery>,
) -> Result<Json<Vec<TestCaseResponse>>, HttpError> {
    let filter = TestCaseFilter {
        test_type: query.test_type,
        priority: query.priority,
    };
    let test_cases = app_state
        .db
        .get_all_test_cases()
        .await
        .map_err(|e| HttpError::internal("Failed to fetch test cases", e))?;
    Ok(Json(
        test_cases
            .into_iter()
            .filter(|tc| filter.matches(tc))
            .map(TestCaseResponse::from)
            .collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/test-cases/{id}",
    params(("id" = i32, Path, description = "Test case id")),
    responses(
        (status = 200, description = "The test case", body = TestCaseResponse),
        (status = 400, description = "Id is not an integer", body = ErrorBody),
        (status = 404, description = "No such test case", body = ErrorBody)
    )
)]
pub async fn get_test_case_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TestCaseResponse>, HttpError> {
    let id = parse_id(&id, "Invalid test case ID")?;
    app_state
        .db
        .get_test_case(id)
        .await
        .map_err(|e| HttpError::internal("Failed to fetch test case", e))?
        .map(|tc| Json(TestCaseResponse::from(tc)))
        .ok_or_else(|| HttpError::not_found("Test case not found"))
}

#[utoipa::path(
    patch,
    path = "/api/test-cases/{id}/select",
    params(("id" = i32, Path, description = "Test case id")),
    request_body = SelectTestCaseRequest,
    responses(
        (status = 200, description = "The updated test case", body = TestCaseResponse),
        (status = 400, description = "Invalid id or body", body = ErrorBody),
        (status = 404, description = "No such test case", body = ErrorBody)
    )
)]
pub async fn select_test_case_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<SelectTestCaseRequest>, JsonRejection>,
) -> Result<Json<TestCaseResponse>, HttpError> {
    let id = parse_id(&id, "Invalid test case ID")?;
    let Json(request) = payload?;
    match app_state
        .db
        .update_test_case_selection(id, request.selected)
        .await
    {
        Ok(test_case) => Ok(Json(TestCaseResponse::from(test_case))),
        Err(PortError::NotFound(message)) => Err(HttpError::not_found(message)),
        Err(e) => Err(HttpError::internal(
            "Failed to update test case selection",
            e,
        )),
    }
}

#[utoipa::path(
    post,
    path = "/api/test-cases/export-csv",
    request_body = ExportCsvRequest,
    responses(
        (status = 200, description = "CSV attachment, one row per test step", content_type = "text/csv", body = String),
        (status = 400, description = "No ids supplied", body = ErrorBody),
        (status = 404, description = "None of the ids match a test case", body = ErrorBody),
        (status = 500, description = "Export failed", body = ErrorBody)
    )
)]
pub async fn export_csv_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<ExportCsvRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let Json(request) = payload?;
    let ids = request
        .test_case_ids
        .ok_or_else(|| HttpError::bad_request("No test case IDs provided"))?;

    let mut test_cases: Vec<TestCase> = Vec::with_capacity(ids.len());
    for id in ids {
        let found = app_state
            .db
            .get_test_case(id)
            .await
            .map_err(|e| HttpError::internal("Failed to export test cases", e))?;
        test_cases.extend(found);
    }
    if test_cases.is_empty() {
        return Err(HttpError::not_found("No test cases found for the provided IDs"));
    }

    let csv = render_csv(&test_cases)
        .map_err(|e| HttpError::internal("Failed to export test cases", e))?;
    info!(count = test_cases.len(), "Exported test cases to CSV");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"test_cases.csv\"",
            ),
        ],
        csv,
    ))
}
