//! crates/testgen_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use crate::domain::{
    File, NewFile, NewTestCase, NewTestPlan, NewUser, TestCase, TestPlan, User,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    /// The generative-text collaborator could not produce usable output.
    #[error("Test case generation unavailable: {0}")]
    GenerationUnavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The persistence store for users, files, test cases and test plans.
///
/// Lookups by id return `Ok(None)` for unknown ids. Only
/// `update_test_case_selection` reports a missing record as `PortError::NotFound`.
#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Users ---
    async fn create_user(&self, user: NewUser) -> PortResult<User>;

    async fn get_user(&self, id: i32) -> PortResult<Option<User>>;

    async fn get_user_by_username(&self, username: &str) -> PortResult<Option<User>>;

    // --- Files ---
    async fn create_file(&self, file: NewFile) -> PortResult<File>;

    async fn get_file(&self, id: i32) -> PortResult<Option<File>>;

    async fn get_all_files(&self) -> PortResult<Vec<File>>;

    /// Removes a file record, returning it if it existed.
    async fn delete_file(&self, id: i32) -> PortResult<Option<File>>;

    // --- Test Cases ---
    async fn create_test_case(&self, test_case: NewTestCase) -> PortResult<TestCase>;

    async fn get_test_case(&self, id: i32) -> PortResult<Option<TestCase>>;

    async fn get_all_test_cases(&self) -> PortResult<Vec<TestCase>>;

    async fn update_test_case_selection(&self, id: i32, selected: bool) -> PortResult<TestCase>;

    // --- Test Plans ---
    async fn create_test_plan(&self, test_plan: NewTestPlan) -> PortResult<TestPlan>;

    async fn get_test_plan(&self, id: i32) -> PortResult<Option<TestPlan>>;

    async fn get_all_test_plans(&self) -> PortResult<Vec<TestPlan>>;
}

/// Durable storage for raw uploaded content, addressed by a generated key.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Stores `data` under a fresh key derived from `original_name` and returns the key.
    async fn save(&self, original_name: &str, data: &[u8]) -> PortResult<String>;

    async fn read(&self, key: &str) -> PortResult<Vec<u8>>;

    /// Deletes a blob. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> PortResult<()>;
}

#[async_trait]
pub trait TextGenerationService: Send + Sync {
    /// Sends a single prompt to the model and returns the generated text.
    async fn generate_text(&self, prompt: &str) -> PortResult<String>;
}
