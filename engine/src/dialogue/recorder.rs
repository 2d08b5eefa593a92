use crate::db::TranscriptRepository;
use crate::llm::Message;
use tracing::{debug, warn};
use uuid::Uuid;

/// Mirrors appended turns into the transcript database.
///
/// Every failure is logged and swallowed; a broken database never costs the
/// user an answer.
pub struct TranscriptRecorder {
    repo: TranscriptRepository,
    session_id: String,
    next_seq: i64,
}

impl TranscriptRecorder {
    /// Opens a new session row. Returns `None` if the row cannot be written.
    pub async fn start(repo: TranscriptRepository, model: &str) -> Option<Self> {
        let session_id = Uuid::new_v4().to_string();
        match repo.create_session(&session_id, model).await {
            Ok(()) => {
                debug!("Recording transcript for session {}", session_id);
                Some(Self {
                    repo,
                    session_id,
                    next_seq: 0,
                })
            }
            Err(e) => {
                warn!("Transcript disabled, could not create session: {:#}", e);
                None
            }
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn record(&mut self, message: &Message) {
        let seq = self.next_seq;
        self.next_seq += 1;
        if let Err(e) = self.repo.add_turn(&self.session_id, seq, message).await {
            warn!("Failed to record turn {} of {}: {:#}", seq, self.session_id, e);
        }
    }

    pub async fn finish(&self) {
        if let Err(e) = self.repo.end_session(&self.session_id).await {
            warn!("Failed to close session {}: {:#}", self.session_id, e);
        }
    }
}
