//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::generation::TestCaseGenerator;
use crate::ingestion::FileIngestor;
use std::sync::Arc;
use testgen_core::ports::{BlobStorage, DatabaseService, TextGenerationService};

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub ingestor: FileIngestor,
    pub generator: TestCaseGenerator,
}

impl AppState {
    /// Wires the ingestion and generation services onto the given adapters.
    pub fn new(
        config: Arc<Config>,
        db: Arc<dyn DatabaseService>,
        blobs: Arc<dyn BlobStorage>,
        llm: Arc<dyn TextGenerationService>,
    ) -> Self {
        Self {
            ingestor: FileIngestor::new(db.clone(), blobs.clone()),
            generator: TestCaseGenerator::new(blobs, llm),
            db,
            config,
        }
    }
}
