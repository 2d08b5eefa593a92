//! Catalog Engine Library
//!
//! Answers free-text questions about a course schedule: the model extracts
//! fields, the engine turns them into store filters, and the results are fed
//! back until the model can answer. Used by the `catalog` binary and the
//! integration tests.

/// Configuration management module
pub mod config;

/// Secret management module
pub mod secrets;

/// Database persistence module
pub mod db;

/// LLM provider abstraction layer
pub mod llm;

/// Vector store client
pub mod store;

/// Canonicalization, filter building and result projection
pub mod query;

/// Tools the model can call
pub mod tools;

/// Dialogue orchestration
pub mod dialogue;

/// Schedule CSV ingestion
pub mod ingest;

/// Platform-specific utilities module
pub mod platform;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
