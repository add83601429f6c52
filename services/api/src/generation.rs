//! services/api/src/generation.rs
//!
//! The test case generator: reads the stored documents, builds a single prompt,
//! asks the text generation service for a JSON array of test cases and converts
//! the answer into unsaved `NewTestCase` values.

use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, OnceLock};
use testgen_core::domain::{
    File, NewTestCase, Priority, SourceDocument, TestCaseType, UnknownLabel,
};
use testgen_core::ports::{BlobStorage, PortError, PortResult, TextGenerationService};
use tracing::{info, warn};

/// How much of each document is embedded in the prompt, in characters.
pub const EXCERPT_CHARS: usize = 500;

const INSTRUCTIONS: &str = r#"
Create test cases covering:
1. Functional testing
2. Non-functional testing
3. Integration testing

For each test case, provide:
- A unique test ID (format: TC-XXX)
- Description
- Prerequisites
- Test steps (as a list)
- Expected results
- Priority (High, Medium, or Low)
- Test type (Functional, Non-functional, or Integration)

Format the response as JSON with the following structure:
[
  {
    "testId": "TC-001",
    "description": "Test description",
    "prerequisites": "Test prerequisites",
    "steps": ["Step 1", "Step 2", "..."],
    "expectedResults": "Expected result",
    "priority": "High | Medium | Low",
    "type": "Functional | Non-functional | Integration"
  },
  ...
]
"#;

//=========================================================================================
// Prompt Construction
//=========================================================================================

/// Builds the prompt: one line per document with its name and leading excerpt,
/// followed by the fixed schema instructions.
pub fn build_prompt(documents: &[SourceDocument]) -> String {
    let listing = documents
        .iter()
        .map(|doc| {
            let excerpt: String = doc.content.chars().take(EXCERPT_CHARS).collect();
            format!("\n- {}: {}... (truncated)", doc.name, excerpt)
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "\nGenerate a comprehensive test plan based on the following files:\n{}\n{}",
        listing, INSTRUCTIONS
    )
}

//=========================================================================================
// Response Extraction
//=========================================================================================

fn trailing_comma_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r",\s*([\]}])").expect("valid trailing comma regex"))
}

fn json_array_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[\s*\{[\s\S]*\}\s*\]").expect("valid JSON array regex"))
}

/// Drops commas that directly precede a closing bracket or brace.
pub fn strip_trailing_commas(text: &str) -> String {
    trailing_comma_pattern().replace_all(text, "$1").into_owned()
}

/// One test case as the model writes it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedTestCase {
    pub test_id: String,
    pub description: String,
    #[serde(default)]
    pub prerequisites: Option<String>,
    pub steps: Vec<String>,
    pub expected_results: String,
    pub priority: String,
    #[serde(rename = "type")]
    pub test_type: String,
}

impl GeneratedTestCase {
    /// Converts the payload, stamping it with the files it was generated from.
    pub fn into_new_test_case(self, file_ids: Vec<i32>) -> PortResult<NewTestCase> {
        let malformed = |e: UnknownLabel| {
            PortError::GenerationUnavailable(format!("{} in {}", e, self.test_id))
        };
        let priority: Priority = self.priority.parse().map_err(malformed)?;
        let test_type: TestCaseType = self.test_type.parse().map_err(malformed)?;
        Ok(NewTestCase {
            test_id: self.test_id,
            description: self.description,
            prerequisites: self.prerequisites,
            steps: self.steps,
            expected_results: self.expected_results,
            priority,
            test_type,
            file_ids,
        })
    }
}

/// Finds the JSON array of test cases inside free-form model output.
pub fn extract_test_cases(text: &str) -> PortResult<Vec<GeneratedTestCase>> {
    let sanitized = strip_trailing_commas(text);
    let array = json_array_pattern().find(&sanitized).ok_or_else(|| {
        PortError::GenerationUnavailable(
            "Failed to extract JSON from Gemini response".to_string(),
        )
    })?;
    serde_json::from_str(array.as_str()).map_err(|e| {
        PortError::GenerationUnavailable(format!("Failed to parse generated test cases: {}", e))
    })
}

//=========================================================================================
// The Generator Service
//=========================================================================================

#[derive(Clone)]
pub struct TestCaseGenerator {
    blobs: Arc<dyn BlobStorage>,
    llm: Arc<dyn TextGenerationService>,
}

impl TestCaseGenerator {
    pub fn new(blobs: Arc<dyn BlobStorage>, llm: Arc<dyn TextGenerationService>) -> Self {
        Self { blobs, llm }
    }

    /// Reads a file's blob as text, substituting a placeholder when it cannot be read.
    async fn load_document(&self, file: &File) -> SourceDocument {
        let content = match self.blobs.read(&file.storage_key).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                warn!(file_id = file.id, "Error reading file content: {}", e);
                format!("[Failed to read file content: {}]", file.name)
            }
        };
        SourceDocument {
            name: file.name.clone(),
            content,
        }
    }

    /// Generates unsaved test cases for `files`. Any failure of the generation
    /// service or of its output surfaces as `PortError::GenerationUnavailable`.
    pub async fn generate(&self, files: &[File]) -> PortResult<Vec<NewTestCase>> {
        let mut documents = Vec::with_capacity(files.len());
        for file in files {
            documents.push(self.load_document(file).await);
        }

        let prompt = build_prompt(&documents);
        let text = self.llm.generate_text(&prompt).await?;
        let generated = extract_test_cases(&text)?;
        info!(count = generated.len(), "Parsed generated test cases");

        let file_ids: Vec<i32> = files.iter().map(|f| f.id).collect();
        generated
            .into_iter()
            .map(|payload| payload.into_new_test_case(file_ids.clone()))
            .collect()
    }
}
