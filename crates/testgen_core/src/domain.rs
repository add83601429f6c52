//! crates/testgen_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

//=========================================================================================
// Upload Limits
//=========================================================================================

/// Largest accepted upload, in bytes (10 MiB).
pub const MAX_FILE_SIZE_BYTES: i64 = 10 * 1024 * 1024;

/// Maximum number of files accepted by a single upload request.
pub const MAX_FILES_PER_UPLOAD: usize = 10;

/// MIME types accepted for specification documents: PDF, DOCX, TXT and MD.
pub const ALLOWED_MIME_TYPES: [&str; 4] = [
    "application/pdf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
    "text/markdown",
];

/// Why an uploaded file was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FileRejection {
    #[error("File name must not be empty")]
    EmptyName,
    #[error("File is {size} bytes, which exceeds the 10 MB limit")]
    TooLarge { size: i64 },
    #[error("File type not supported. Please upload PDF, DOCX, TXT, or MD files.")]
    UnsupportedType(String),
}

/// Checks an upload's metadata against the accepted size and MIME types.
pub fn validate_upload(name: &str, size: i64, mime_type: &str) -> Result<(), FileRejection> {
    if name.is_empty() {
        return Err(FileRejection::EmptyName);
    }
    if size > MAX_FILE_SIZE_BYTES {
        return Err(FileRejection::TooLarge { size });
    }
    if !ALLOWED_MIME_TYPES.contains(&mime_type) {
        return Err(FileRejection::UnsupportedType(mime_type.to_string()));
    }
    Ok(())
}

//=========================================================================================
// Files
//=========================================================================================

/// An uploaded specification document.
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    pub id: i32,
    pub name: String,
    pub size: i64,
    pub mime_type: String,
    /// Name of the blob holding the raw content.
    pub storage_key: String,
    pub uploaded_at: DateTime<Utc>,
}

/// A validated file waiting to be recorded.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub name: String,
    pub size: i64,
    pub mime_type: String,
    pub storage_key: String,
}

/// The text of one file as handed to the generator.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub name: String,
    pub content: String,
}

//=========================================================================================
// Test Cases
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestCaseType {
    Functional,
    NonFunctional,
    Integration,
}

impl TestCaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestCaseType::Functional => "Functional",
            TestCaseType::NonFunctional => "Non-functional",
            TestCaseType::Integration => "Integration",
        }
    }
}

/// Returned when a priority or type label is not one of the known values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownLabel {
    pub kind: &'static str,
    pub value: String,
}

/// Lowercases and drops separators so "Non-Functional" and "non_functional" compare equal.
fn normalize_label(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

impl FromStr for Priority {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(UnknownLabel {
                kind: "priority",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for TestCaseType {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "functional" => Ok(TestCaseType::Functional),
            "nonfunctional" => Ok(TestCaseType::NonFunctional),
            "integration" => Ok(TestCaseType::Integration),
            _ => Err(UnknownLabel {
                kind: "test type",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for TestCaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted test case.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    pub id: i32,
    /// Human-facing identifier such as "TC-001".
    pub test_id: String,
    pub description: String,
    pub prerequisites: Option<String>,
    pub steps: Vec<String>,
    pub expected_results: String,
    pub priority: Priority,
    pub test_type: TestCaseType,
    /// Files this test case was derived from.
    pub file_ids: Vec<i32>,
    pub created_at: DateTime<Utc>,
    pub selected: bool,
}

/// A generated test case that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTestCase {
    pub test_id: String,
    pub description: String,
    pub prerequisites: Option<String>,
    pub steps: Vec<String>,
    pub expected_results: String,
    pub priority: Priority,
    pub test_type: TestCaseType,
    pub file_ids: Vec<i32>,
}

/// Optional type/priority criteria for listing test cases.
///
/// Each criterion matches case-insensitively against the canonical label; a missing
/// value or the literal `"all"` disables it.
#[derive(Debug, Clone, Default)]
pub struct TestCaseFilter {
    pub test_type: Option<String>,
    pub priority: Option<String>,
}

impl TestCaseFilter {
    pub fn matches(&self, test_case: &TestCase) -> bool {
        criterion_matches(self.test_type.as_deref(), test_case.test_type.as_str())
            && criterion_matches(self.priority.as_deref(), test_case.priority.as_str())
    }
}

fn criterion_matches(wanted: Option<&str>, actual: &str) -> bool {
    match wanted {
        None => true,
        Some(wanted) => {
            let wanted = wanted.trim();
            wanted.is_empty() || wanted == "all" || wanted.eq_ignore_ascii_case(actual)
        }
    }
}

//=========================================================================================
// Test Plans and Users (storage only)
//=========================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct TestPlan {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub test_case_ids: Vec<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTestPlan {
    pub name: String,
    pub description: Option<String>,
    pub test_case_ids: Vec<i32>,
}

// Only used by the store; no endpoint exposes users.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String,
}
