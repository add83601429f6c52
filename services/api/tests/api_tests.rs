//! End-to-end tests of the REST API over the in-memory store, a temporary upload
//! directory and a scripted generation service.
//!
//! Run with: `cargo test -p api --test api_tests`

use api_lib::adapters::{InMemoryAdapter, LocalBlobStore};
use api_lib::config::Config;
use api_lib::web::{self, state::AppState};
use async_trait::async_trait;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use testgen_core::domain::MAX_FILE_SIZE_BYTES;
use testgen_core::ports::{PortError, PortResult, TextGenerationService};

const MODEL_OUTPUT: &str = r#"Sure! Here are the test cases:
[
  {
    "testId": "TC-001",
    "description": "D",
    "prerequisites": "App installed",
    "steps": ["Open app", "Click X"],
    "expectedResults": "E",
    "priority": "High",
    "type": "Functional"
  },
  {
    "testId": "TC-002",
    "description": "Search responds quickly",
    "steps": ["Type a query"],
    "expectedResults": "Results within 2s",
    "priority": "Low",
    "type": "Non-functional",
  },
]"#;

/// A generation service that replays a fixed reply and counts its calls.
struct ScriptedLlm {
    reply: Option<String>,
    calls: AtomicUsize,
}

#[async_trait]
impl TextGenerationService for ScriptedLlm {
    async fn generate_text(&self, _prompt: &str) -> PortResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply
            .clone()
            .ok_or_else(|| PortError::GenerationUnavailable("model offline".to_string()))
    }
}

struct TestApp {
    server: TestServer,
    llm: Arc<ScriptedLlm>,
    upload_dir: PathBuf,
    _temp_dir: TempDir,
}

impl TestApp {
    fn llm_calls(&self) -> usize {
        self.llm.calls.load(Ordering::SeqCst)
    }

    fn blob_count(&self) -> usize {
        std::fs::read_dir(&self.upload_dir)
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

fn setup_with_reply(reply: Option<&str>) -> TestApp {
    let temp_dir = tempfile::tempdir().unwrap();
    let upload_dir = temp_dir.path().join("uploads");

    let mut config = Config::from_lookup(|_| None).unwrap();
    config.upload_dir = upload_dir.clone();

    let llm = Arc::new(ScriptedLlm {
        reply: reply.map(str::to_string),
        calls: AtomicUsize::new(0),
    });
    let app_state = Arc::new(AppState::new(
        Arc::new(config),
        Arc::new(InMemoryAdapter::new()),
        Arc::new(LocalBlobStore::new(upload_dir.clone())),
        llm.clone(),
    ));

    TestApp {
        server: TestServer::new(web::router(app_state)).unwrap(),
        llm,
        upload_dir,
        _temp_dir: temp_dir,
    }
}

fn setup() -> TestApp {
    setup_with_reply(Some(MODEL_OUTPUT))
}

fn text_part(name: &str, mime: &str, body: &[u8]) -> Part {
    Part::bytes(body.to_vec()).file_name(name).mime_type(mime)
}

async fn upload_one(app: &TestApp, name: &str, mime: &str, body: &[u8]) -> Value {
    let form = MultipartForm::new().add_part("files", text_part(name, mime, body));
    let response = app.server.post("/api/files/upload").multipart(form).await;
    assert_eq!(response.status_code(), 201);
    let files: Vec<Value> = response.json();
    assert_eq!(files.len(), 1);
    files.into_iter().next().unwrap()
}

async fn generate(app: &TestApp, file_ids: Value) -> Vec<Value> {
    let response = app
        .server
        .post("/api/test-cases/generate")
        .json(&json!({ "fileIds": file_ids }))
        .await;
    assert_eq!(response.status_code(), 200);
    response.json()
}

//=========================================================================================
// Files
//=========================================================================================

#[tokio::test]
async fn health_reports_memory_storage() {
    let app = setup();
    let response = app.server.get("/api/health").await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(
        response.json::<Value>(),
        json!({ "status": "ok", "storage": "memory", "generatorConfigured": false })
    );
}

#[tokio::test]
async fn uploaded_files_are_listed() {
    let app = setup();
    let form = MultipartForm::new()
        .add_part("files", text_part("login.txt", "text/plain", b"Users can log in."))
        .add_part("files", text_part("search.md", "text/markdown", b"# Search"));
    let response = app.server.post("/api/files/upload").multipart(form).await;
    assert_eq!(response.status_code(), 201);
    let uploaded: Vec<Value> = response.json();
    assert_eq!(uploaded.len(), 2);
    assert!(uploaded[0].get("storageKey").is_none());

    let listed: Vec<Value> = app.server.get("/api/files").await.json();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["name"], "login.txt");
    assert_eq!(listed[0]["size"], 17);
    assert_eq!(listed[0]["type"], "text/plain");
    assert_eq!(listed[1]["name"], "search.md");
    assert_eq!(listed[1]["type"], "text/markdown");
    assert!(listed[0]["uploadedAt"].is_string());
    assert_eq!(app.blob_count(), 2);
}

#[tokio::test]
async fn rejected_files_do_not_undo_accepted_ones() {
    let app = setup();
    let form = MultipartForm::new()
        .add_part("files", text_part("notes.txt", "text/plain", b"fine"))
        .add_part("files", text_part("logo.png", "image/png", &[0x89, 0x50]));
    let response = app.server.post("/api/files/upload").multipart(form).await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("logo.png: File type not supported"));
    assert!(!message.contains("notes.txt"));

    let listed: Vec<Value> = app.server.get("/api/files").await.json();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["name"], "notes.txt");
    assert_eq!(app.blob_count(), 1);
}

#[tokio::test]
async fn oversized_files_are_rejected() {
    let app = setup();
    let big = vec![b'a'; MAX_FILE_SIZE_BYTES as usize + 1];
    let form = MultipartForm::new().add_part("files", text_part("big.txt", "text/plain", &big));
    let response = app.server.post("/api/files/upload").multipart(form).await;

    assert_eq!(response.status_code(), 400);
    let listed: Vec<Value> = app.server.get("/api/files").await.json();
    assert!(listed.is_empty());
    assert_eq!(app.blob_count(), 0);
}

#[tokio::test]
async fn more_than_ten_files_are_refused() {
    let app = setup();
    let mut form = MultipartForm::new();
    for i in 0..11 {
        form = form.add_part("files", text_part(&format!("f{}.txt", i), "text/plain", b"x"));
    }
    let response = app.server.post("/api/files/upload").multipart(form).await;

    assert_eq!(response.status_code(), 400);
    let listed: Vec<Value> = app.server.get("/api/files").await.json();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn a_form_without_files_is_a_bad_request() {
    let app = setup();
    let form = MultipartForm::new().add_text("comment", "no attachments");
    let response = app.server.post("/api/files/upload").multipart(form).await;

    assert_eq!(response.status_code(), 400);
    assert_eq!(response.json::<Value>(), json!({ "message": "No files uploaded" }));
}

#[tokio::test]
async fn deleting_files() {
    let app = setup();
    let file = upload_one(&app, "spec.txt", "text/plain", b"spec").await;
    let id = file["id"].as_i64().unwrap();

    let response = app.server.delete(&format!("/api/files/{}", id)).await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(
        response.json::<Value>(),
        json!({ "message": "File deleted successfully" })
    );
    let listed: Vec<Value> = app.server.get("/api/files").await.json();
    assert!(listed.is_empty());
    assert_eq!(app.blob_count(), 0);

    // Unknown ids are not an error.
    let again = app.server.delete(&format!("/api/files/{}", id)).await;
    assert_eq!(again.status_code(), 200);

    let invalid = app.server.delete("/api/files/abc").await;
    assert_eq!(invalid.status_code(), 400);
    assert_eq!(invalid.json::<Value>()["message"], "Invalid file ID");
}

//=========================================================================================
// Generation
//=========================================================================================

#[tokio::test]
async fn generation_needs_file_ids() {
    let app = setup();

    for body in [json!({ "fileIds": [] }), json!({})] {
        let response = app.server.post("/api/test-cases/generate").json(&body).await;
        assert_eq!(response.status_code(), 400);
        assert_eq!(response.json::<Value>()["message"], "No file IDs provided");
    }

    let unknown = app
        .server
        .post("/api/test-cases/generate")
        .json(&json!({ "fileIds": [41, 42] }))
        .await;
    assert_eq!(unknown.status_code(), 404);
    assert_eq!(
        unknown.json::<Value>()["message"],
        "No valid files found for the provided IDs"
    );

    assert_eq!(app.llm_calls(), 0);
    let listed: Vec<Value> = app.server.get("/api/test-cases").await.json();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn generated_test_cases_round_trip() {
    let app = setup();
    let file = upload_one(&app, "app.md", "text/markdown", b"# App\nPress X.").await;
    let file_id = file["id"].clone();

    let generated = generate(&app, json!([file_id, 999])).await;
    assert_eq!(generated.len(), 2);
    assert_eq!(app.llm_calls(), 1);

    let first = &generated[0];
    assert_eq!(first["testId"], "TC-001");
    assert_eq!(first["steps"], json!(["Open app", "Click X"]));
    assert_eq!(first["prerequisites"], "App installed");
    assert_eq!(first["selected"], false);
    assert_eq!(first["fileIds"], json!([file_id]));
    assert_eq!(generated[1]["type"], "Non-functional");
    assert_eq!(generated[1]["prerequisites"], Value::Null);

    for test_case in &generated {
        let fetched: Value = app
            .server
            .get(&format!("/api/test-cases/{}", test_case["id"]))
            .await
            .json();
        assert_eq!(&fetched, test_case);
    }
}

#[tokio::test]
async fn generation_failures_store_nothing() {
    let app = setup_with_reply(None);
    let file = upload_one(&app, "app.txt", "text/plain", b"spec").await;

    let response = app
        .server
        .post("/api/test-cases/generate")
        .json(&json!({ "fileIds": [file["id"]] }))
        .await;
    assert_eq!(response.status_code(), 500);
    let body: Value = response.json();
    assert_eq!(body["message"], "Failed to generate test cases");
    assert!(body["error"].as_str().unwrap().contains("model offline"));

    let listed: Vec<Value> = app.server.get("/api/test-cases").await.json();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn unparseable_model_output_is_a_server_error() {
    let app = setup_with_reply(Some("I could not think of any test cases."));
    let file = upload_one(&app, "app.txt", "text/plain", b"spec").await;

    let response = app
        .server
        .post("/api/test-cases/generate")
        .json(&json!({ "fileIds": [file["id"]] }))
        .await;
    assert_eq!(response.status_code(), 500);
    assert_eq!(app.llm_calls(), 1);
}

//=========================================================================================
// Browsing and selection
//=========================================================================================

#[tokio::test]
async fn test_cases_are_filtered_case_insensitively() {
    let app = setup();
    let file = upload_one(&app, "app.txt", "text/plain", b"spec").await;
    generate(&app, json!([file["id"]])).await;

    let functional: Vec<Value> = app
        .server
        .get("/api/test-cases")
        .add_query_param("type", "functional")
        .await
        .json();
    assert_eq!(functional.len(), 1);
    assert_eq!(functional[0]["testId"], "TC-001");

    let low: Vec<Value> = app
        .server
        .get("/api/test-cases")
        .add_query_param("type", "all")
        .add_query_param("priority", "LOW")
        .await
        .json();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0]["testId"], "TC-002");

    let none: Vec<Value> = app
        .server
        .get("/api/test-cases")
        .add_query_param("type", "Integration")
        .await
        .json();
    assert!(none.is_empty());

    let all: Vec<Value> = app.server.get("/api/test-cases").await.json();
    assert_eq!(all.len(), 2);

    let blank: Vec<Value> = app.server.get("/api/test-cases?type=&priority=").await.json();
    assert_eq!(blank.len(), 2);
}

#[tokio::test]
async fn getting_unknown_or_invalid_test_cases() {
    let app = setup();

    let missing = app.server.get("/api/test-cases/7").await;
    assert_eq!(missing.status_code(), 404);
    assert_eq!(missing.json::<Value>()["message"], "Test case not found");

    let invalid = app.server.get("/api/test-cases/seven").await;
    assert_eq!(invalid.status_code(), 400);
    assert_eq!(invalid.json::<Value>()["message"], "Invalid test case ID");
}

#[tokio::test]
async fn selection_toggles_only_the_flag() {
    let app = setup();
    let file = upload_one(&app, "app.txt", "text/plain", b"spec").await;
    let generated = generate(&app, json!([file["id"]])).await;
    let id = generated[0]["id"].as_i64().unwrap();

    let response = app
        .server
        .patch(&format!("/api/test-cases/{}/select", id))
        .json(&json!({ "selected": true }))
        .await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.json::<Value>()["selected"], true);

    let mut expected = generated[0].clone();
    expected["selected"] = json!(true);
    let fetched: Value = app
        .server
        .get(&format!("/api/test-cases/{}", id))
        .await
        .json();
    assert_eq!(fetched, expected);

    let unknown = app
        .server
        .patch("/api/test-cases/999/select")
        .json(&json!({ "selected": true }))
        .await;
    assert_eq!(unknown.status_code(), 404);

    let malformed = app
        .server
        .patch(&format!("/api/test-cases/{}/select", id))
        .json(&json!({ "selected": "yes" }))
        .await;
    assert_eq!(malformed.status_code(), 400);
}

//=========================================================================================
// CSV export
//=========================================================================================

#[tokio::test]
async fn export_flattens_steps_into_rows() {
    let app = setup();
    let file = upload_one(&app, "app.txt", "text/plain", b"spec").await;
    let generated = generate(&app, json!([file["id"]])).await;

    let response = app
        .server
        .post("/api/test-cases/export-csv")
        .json(&json!({ "testCaseIds": [generated[0]["id"], 12345] }))
        .await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.header("content-type"), "text/csv");
    assert_eq!(
        response.header("content-disposition"),
        "attachment; filename=\"test_cases.csv\""
    );
    assert_eq!(
        response.text(),
        "ID,Work Item Type,Title,Test Step,Step Action,Step Expected\n\
         ,Test Case,D,1,Open app,\n\
         ,Test Case,,2,Click X,E\n"
    );
}

#[tokio::test]
async fn export_requires_known_ids() {
    let app = setup();

    let missing_field = app
        .server
        .post("/api/test-cases/export-csv")
        .json(&json!({}))
        .await;
    assert_eq!(missing_field.status_code(), 400);
    assert_eq!(
        missing_field.json::<Value>()["message"],
        "No test case IDs provided"
    );

    let unknown = app
        .server
        .post("/api/test-cases/export-csv")
        .json(&json!({ "testCaseIds": [1, 2] }))
        .await;
    assert_eq!(unknown.status_code(), 404);
    assert_eq!(
        unknown.json::<Value>()["message"],
        "No test cases found for the provided IDs"
    );
}
