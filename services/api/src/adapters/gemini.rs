//! services/api/src/adapters/gemini.rs
//!
//! This module contains the adapter for Google's Gemini `generateContent` API.
//! It implements the `TextGenerationService` port from the `core` crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use testgen_core::ports::{PortError, PortResult, TextGenerationService};
use tracing::{debug, warn};

// Fixed sampling parameters for test case generation.
const TEMPERATURE: f32 = 0.4;
const TOP_K: u32 = 32;
const TOP_P: f32 = 0.8;
const MAX_OUTPUT_TOKENS: u32 = 8192;

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize, Debug)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize, Debug)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

fn build_request(prompt: &str) -> GenerateContentRequest<'_> {
    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![Part { text: prompt }],
        }],
        generation_config: GenerationConfig {
            temperature: TEMPERATURE,
            top_k: TOP_K,
            top_p: TOP_P,
            max_output_tokens: MAX_OUTPUT_TOKENS,
        },
    }
}

/// Pulls the text of the first part of the first candidate out of a response body.
fn extract_text(body: &str) -> PortResult<String> {
    let response: GenerateContentResponse = serde_json::from_str(body).map_err(|e| {
        PortError::GenerationUnavailable(format!("Malformed Gemini response: {}", e))
    })?;

    let candidate = response.candidates.into_iter().next().ok_or_else(|| {
        PortError::GenerationUnavailable("No response from Gemini API".to_string())
    })?;

    candidate
        .content
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .ok_or_else(|| {
            PortError::GenerationUnavailable("Gemini response contained no text".to_string())
        })
}

/// Prefers the API's own `error.message` over the bare status text.
fn describe_failure(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => format!("Gemini API error: {}", envelope.error.message),
        Err(_) => format!("Gemini API error: {}", status),
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `TextGenerationService` with a single, unretried call.
#[derive(Clone)]
pub struct GeminiAdapter {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl GeminiAdapter {
    /// Creates a new `GeminiAdapter`. A missing key is reported per request.
    pub fn new(api_key: Option<String>, base_url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
            model,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

//=========================================================================================
// `TextGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl TextGenerationService for GeminiAdapter {
    async fn generate_text(&self, prompt: &str) -> PortResult<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            PortError::GenerationUnavailable(
                "GEMINI_API_KEY environment variable is not set".to_string(),
            )
        })?;

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&build_request(prompt))
            .send()
            .await
            .map_err(|e| PortError::GenerationUnavailable(format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            PortError::GenerationUnavailable(format!("Failed to read Gemini response: {}", e))
        })?;

        if !status.is_success() {
            let message = describe_failure(status, &body);
            warn!("{}", message);
            return Err(PortError::GenerationUnavailable(message));
        }

        debug!(bytes = body.len(), "Received Gemini response");
        extract_text(&body)
    }
}
