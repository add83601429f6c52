//! services/api/src/lib.rs
//!
//! The test case generator HTTP service: adapters for the core ports, the
//! ingestion, generation and export services, and the axum web layer.

pub mod adapters;
pub mod config;
pub mod error;
pub mod export;
pub mod generation;
pub mod ingestion;
pub mod web;
