//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - chat: Interactive question loop
//! - ingest: Load the schedule CSV into the store
//! - history: Show recent chat sessions
//! - doctor: Validate configuration and check dependencies

use anyhow::{Context, Result};
use serde_json::json;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::Config;
use crate::db::Database;
use crate::dialogue::{DialogueOrchestrator, TurnOutcome};
use crate::ingest;
use crate::llm::openai::OpenAIProvider;
use crate::platform::{compose_command, platform_name, SystemMailLauncher};
use crate::query::FilterBuilder;
use crate::secrets::{SecretCache, SecretManager, OPENAI_API_KEY};
use crate::store::{CatalogCollections, ChromaStore, OpenAIEmbedder, RecordStore};
use crate::tools::{CourseTool, EmailTool, ToolRegistry};
use sdk::errors::CatalogErrorExt;

/// Keychain service name
const SERVICE_NAME: &str = "catalog";

/// Prompt shown before each question
const PROMPT: &str = "Search> ";

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

fn secret_cache(interactive: bool) -> Arc<SecretCache> {
    let manager = if interactive {
        SecretManager::new(SERVICE_NAME)
    } else {
        SecretManager::non_interactive(SERVICE_NAME)
    };
    Arc::new(SecretCache::new(Arc::new(manager)))
}

/// Chroma-backed collections with OpenAI embeddings
fn catalog_collections(config: &Config, secrets: Arc<SecretCache>) -> CatalogCollections {
    let embedder = Arc::new(OpenAIEmbedder::new(&config.llm.openai, secrets));
    let store: Arc<dyn RecordStore> = Arc::new(ChromaStore::new(&config.store.base_url, embedder));
    CatalogCollections::new(store, &config.store)
}

/// Fails on a non-recoverable heartbeat error; anything else is only logged
async fn ensure_store_reachable(collections: &CatalogCollections, base_url: &str) -> Result<()> {
    match collections.store().heartbeat().await {
        Ok(()) => Ok(()),
        Err(e) if e.is_recoverable() => {
            tracing::warn!("Vector store heartbeat failed: {} ({})", e, e.user_hint());
            Ok(())
        }
        Err(e) => Err(e).with_context(|| format!("Vector store at {} is unreachable", base_url)),
    }
}

/// Run the interactive chat loop
pub async fn handle_chat(config: &Config, format: OutputFormat) -> Result<()> {
    let secrets = secret_cache(true);
    secrets
        .preload(&[OPENAI_API_KEY])
        .context("OpenAI API key is required")?;

    let collections = catalog_collections(config, secrets.clone());
    ensure_store_reachable(&collections, &config.store.base_url).await?;

    let filter = FilterBuilder::new(collections, &config.filter);
    let tools = Arc::new(ToolRegistry::new(
        CourseTool::new(filter, config.store.query_limit),
        EmailTool::new(Arc::new(SystemMailLauncher)),
    ));

    let provider = Arc::new(OpenAIProvider::new(config.llm.openai.clone(), secrets));
    let mut orchestrator = DialogueOrchestrator::new(provider, tools, &config.llm);

    let database = match Database::new(&config.database_path()).await {
        Ok(db) => Some(db),
        Err(e) => {
            tracing::warn!("Transcripts will not be saved: {:#}", e);
            None
        }
    };
    if let Some(db) = database.as_ref() {
        orchestrator = orchestrator
            .with_transcript(db.transcripts(), &config.llm.openai.model)
            .await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{}", PROMPT);
        std::io::stdout().flush().ok();

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };

        match orchestrator.submit(&line).await {
            TurnOutcome::Terminated => break,
            TurnOutcome::Answered(Some(answer)) => match format {
                OutputFormat::Text => println!("{}", answer),
                OutputFormat::Json => println!("{}", json!({ "answer": answer })),
            },
            TurnOutcome::Answered(None) if line.trim().is_empty() => {}
            TurnOutcome::Answered(None) => match format {
                OutputFormat::Text => println!("No answer this time. Please try again."),
                OutputFormat::Json => println!("{}", json!({ "answer": null })),
            },
        }
    }

    orchestrator.finish().await;

    if let Some(db) = database {
        db.close().await.ok();
    }

    Ok(())
}

/// Load the schedule CSV into the store
pub async fn handle_ingest(
    config: &Config,
    csv: Option<PathBuf>,
    reset: bool,
    format: OutputFormat,
) -> Result<()> {
    let path = csv.unwrap_or_else(|| config.ingest.csv_path.clone());
    let collections = catalog_collections(config, secret_cache(true));

    let report = ingest::ingest_csv(&collections, &path, reset, config.store.batch_size)
        .await
        .with_context(|| format!("Failed to ingest {}", path.display()))?;

    match format {
        OutputFormat::Text => {
            println!("Successfully added {} courses to the courses collection.", report.courses);
            println!(
                "Successfully added {} instructors to the instructors collection.",
                report.instructors
            );
            println!(
                "Successfully added {} subjects to the subjects collection.",
                report.subjects
            );
            if report.skipped_rows > 0 {
                println!("Skipped {} incomplete rows.", report.skipped_rows);
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "csv": path,
                "reset": reset,
                "courses": report.courses,
                "instructors": report.instructors,
                "subjects": report.subjects,
                "skipped_rows": report.skipped_rows,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Show recent chat sessions
pub async fn handle_history(limit: usize, config: &Config, format: OutputFormat) -> Result<()> {
    let database = Database::new(&config.database_path())
        .await
        .context("Failed to open database")?;

    let sessions = database
        .transcripts()
        .list_sessions(limit as i64)
        .await
        .context("Failed to fetch session history")?;

    match format {
        OutputFormat::Text => {
            if sessions.is_empty() {
                println!("No chat sessions in history");
            } else {
                println!("Chat History (last {} sessions):", limit);
                println!();

                for session in &sessions {
                    println!("Session ID: {}", session.id);
                    println!("  Model: {}", session.model);
                    println!("  Started: {}", format_timestamp(session.started_at));
                    if let Some(ended) = session.ended_at {
                        println!("  Ended: {}", format_timestamp(ended));
                    }
                    println!("  Turns: {}", session.turn_count);
                    if let Some(question) = &session.first_question {
                        println!("  First question: {}", question);
                    }
                    println!();
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "sessions": sessions,
                "count": sessions.len(),
                "limit": limit
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    database.close().await?;
    Ok(())
}

fn format_timestamp(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Validate configuration and check dependencies
pub async fn handle_doctor(config: &Config, config_path: &Path, format: OutputFormat) -> Result<()> {
    let mut issues = Vec::new();
    let mut checks: Vec<(&str, String)> = Vec::new();

    // Config is already validated when loaded
    checks.push(("Configuration", config_path.display().to_string()));

    let db_path = config.database_path();
    match Database::new(&db_path).await {
        Ok(db) => {
            checks.push(("Database", "OK".to_string()));
            db.close().await.ok();
        }
        Err(e) => {
            checks.push(("Database", "Failed".to_string()));
            issues.push(format!("Cannot open database {}: {:#}", db_path.display(), e));
        }
    }

    let manager = SecretManager::non_interactive(SERVICE_NAME);
    let has_key = manager.has_secret(OPENAI_API_KEY);
    if has_key {
        checks.push(("OpenAI API key", "Configured".to_string()));
    } else {
        checks.push(("OpenAI API key", "Not configured".to_string()));
        issues.push("Set OPENAI_API_KEY or run 'catalog chat' to store a key.".to_string());
    }

    let collections = catalog_collections(config, secret_cache(false));
    match collections.store().heartbeat().await {
        Ok(()) => checks.push(("Vector store", format!("Reachable ({})", config.store.base_url))),
        Err(e) => {
            checks.push(("Vector store", "Unreachable".to_string()));
            issues.push(format!("{} ({})", e.user_hint(), e));
        }
    }

    if compose_command(platform_name(), "mailto:").is_some() {
        checks.push(("Email drafts", "Supported".to_string()));
    } else {
        checks.push(("Email drafts", format!("Unsupported on {}", platform_name())));
    }

    match format {
        OutputFormat::Text => {
            println!("Catalog Diagnostics");
            println!("===================");
            println!();

            println!("System Checks:");
            for (check, status) in &checks {
                println!("  {:<20} {}", format!("{}:", check), status);
            }

            println!();

            if issues.is_empty() {
                println!("✓ All checks passed!");
            } else {
                println!("⚠ Issues found:");
                println!();
                for (i, issue) in issues.iter().enumerate() {
                    println!("  {}. {}", i + 1, issue);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "checks": checks.iter().map(|(name, status)| {
                    json!({ "name": name, "status": status })
                }).collect::<Vec<_>>(),
                "issues": issues,
                "healthy": issues.is_empty(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
