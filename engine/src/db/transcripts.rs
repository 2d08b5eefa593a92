/// Transcript persistence operations
///
/// Every turn the dialogue orchestrator appends is mirrored here, so a chat
/// session can be reviewed with `catalog history` after the process exits.
/// All queries are parameterized.
use crate::llm::{Message, MessageRole};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use std::time::{SystemTime, UNIX_EPOCH};

/// One persisted turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turn {
    pub session_id: String,
    pub seq: i64,
    pub role: String,
    pub content: String,
    pub tool_call_id: Option<String>,
    pub created_at: i64,
}

/// A session row with its turn count and opening question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub model: String,
    pub started_at: i64,
    pub ended_at: Option<i64>,
    pub turn_count: i64,
    pub first_question: Option<String>,
}

/// Transcript repository for database operations
#[derive(Clone)]
pub struct TranscriptRepository {
    pool: SqlitePool,
}

fn now_secs() -> Result<i64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as i64)
}

/// Text stored for a message. Assistant tool-call turns keep their calls as JSON.
fn stored_content(message: &Message) -> Result<String> {
    if message.role == MessageRole::Assistant && !message.tool_calls.is_empty() {
        serde_json::to_string(&message.tool_calls).context("Failed to encode tool calls")
    } else {
        Ok(message.content.clone())
    }
}

impl TranscriptRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a new session
    pub async fn create_session(&self, id: &str, model: &str) -> Result<()> {
        let now = now_secs()?;

        sqlx::query("INSERT INTO sessions (id, model, started_at) VALUES (?, ?, ?)")
            .bind(id)
            .bind(model)
            .bind(now)
            .execute(&self.pool)
            .await
            .context("Failed to create session")?;

        Ok(())
    }

    /// Append one message at position `seq`
    pub async fn add_turn(&self, session_id: &str, seq: i64, message: &Message) -> Result<Turn> {
        let now = now_secs()?;
        let content = stored_content(message)?;

        sqlx::query(
            "INSERT INTO turns (session_id, seq, role, content, tool_call_id, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(session_id)
        .bind(seq)
        .bind(message.role.as_str())
        .bind(&content)
        .bind(&message.tool_call_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to add turn")?;

        Ok(Turn {
            session_id: session_id.to_string(),
            seq,
            role: message.role.as_str().to_string(),
            content,
            tool_call_id: message.tool_call_id.clone(),
            created_at: now,
        })
    }

    /// Stamp the session's end time
    pub async fn end_session(&self, session_id: &str) -> Result<()> {
        let now = now_secs()?;

        sqlx::query("UPDATE sessions SET ended_at = ? WHERE id = ?")
            .bind(now)
            .bind(session_id)
            .execute(&self.pool)
            .await
            .context("Failed to end session")?;

        Ok(())
    }

    /// All turns of a session in order
    pub async fn get_turns(&self, session_id: &str) -> Result<Vec<Turn>> {
        let rows = sqlx::query(
            "SELECT session_id, seq, role, content, tool_call_id, created_at FROM turns WHERE session_id = ? ORDER BY seq ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch turns")?;

        Ok(rows
            .into_iter()
            .map(|r| Turn {
                session_id: r.get("session_id"),
                seq: r.get("seq"),
                role: r.get("role"),
                content: r.get("content"),
                tool_call_id: r.get("tool_call_id"),
                created_at: r.get("created_at"),
            })
            .collect())
    }

    /// Most recent sessions, newest first
    pub async fn list_sessions(&self, limit: i64) -> Result<Vec<SessionSummary>> {
        let rows = sqlx::query(
            r#"SELECT s.id, s.model, s.started_at, s.ended_at,
                      (SELECT COUNT(*) FROM turns t WHERE t.session_id = s.id) AS turn_count,
                      (SELECT t.content FROM turns t
                         WHERE t.session_id = s.id AND t.role = 'user'
                         ORDER BY t.seq ASC LIMIT 1) AS first_question
               FROM sessions s
               ORDER BY s.started_at DESC, s.rowid DESC
               LIMIT ?"#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list sessions")?;

        Ok(rows
            .into_iter()
            .map(|r| SessionSummary {
                id: r.get("id"),
                model: r.get("model"),
                started_at: r.get("started_at"),
                ended_at: r.get("ended_at"),
                turn_count: r.get("turn_count"),
                first_question: r.get("first_question"),
            })
            .collect())
    }
}
