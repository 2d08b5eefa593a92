//! Dialogue Orchestrator
//!
//! Drives one chat session with the model:
//!
//! 1. Append the user turn and request a completion (with both tool definitions)
//! 2. No tool calls: the content is the answer
//! 3. Tool calls: append the assistant turn, run each call in order, append one
//!    tool-result turn per call, then request a follow-up completion
//! 4. Stop after `max_tool_rounds` rounds of tool dispatch with a give-up answer
//!
//! # Failure handling
//!
//! - A failed or timed-out completion request aborts the current turn only;
//!   turns already appended stay in the state
//! - Tool failures become `ERROR: ...` tool results, so every call is answered

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::config::LLMConfig;
use crate::db::TranscriptRepository;
use crate::llm::{LLMProvider, LLMResponse, Message, ToolCall, ToolDefinition};
use crate::tools::ToolRegistry;
use sdk::errors::EngineError;

use super::recorder::TranscriptRecorder;
use super::state::DialogueState;
use super::SYSTEM_PROMPT;

/// Input that ends the session
pub const QUIT_COMMAND: &str = "q";

/// Answer given when the model keeps asking for tools past the round limit
pub const GIVE_UP_ANSWER: &str =
    "Sorry, I could not find an answer to that question. Try asking it a different way.";

/// Tool-result content for calls left unanswered at the round limit
pub const ROUND_LIMIT_RESULT: &str = "ERROR: tool round limit reached";

/// Where the orchestrator is within a user turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialoguePhase {
    AwaitingUserInput,
    ModelRequested,
    ToolsPending,
    Answered,
    Terminated,
}

/// What `submit` produced for one line of input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The user asked to quit
    Terminated,
    /// The turn finished; `None` when it was blank or aborted
    Answered(Option<String>),
}

pub struct DialogueOrchestrator {
    provider: Arc<dyn LLMProvider>,
    tools: Arc<ToolRegistry>,
    definitions: Vec<ToolDefinition>,
    state: DialogueState,
    phase: DialoguePhase,
    max_tool_rounds: usize,
    request_timeout: Duration,
    recorder: Option<TranscriptRecorder>,
}

impl DialogueOrchestrator {
    pub fn new(provider: Arc<dyn LLMProvider>, tools: Arc<ToolRegistry>, config: &LLMConfig) -> Self {
        let definitions = tools.definitions();
        Self {
            provider,
            tools,
            definitions,
            state: DialogueState::new(SYSTEM_PROMPT),
            phase: DialoguePhase::AwaitingUserInput,
            max_tool_rounds: config.max_tool_rounds.max(1),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            recorder: None,
        }
    }

    /// Record every turn of this session, starting with the system turn
    pub async fn with_transcript(mut self, repo: TranscriptRepository, model: &str) -> Self {
        self.recorder = TranscriptRecorder::start(repo, model).await;
        if let Some(recorder) = self.recorder.as_mut() {
            for message in self.state.messages() {
                recorder.record(message).await;
            }
        }
        self
    }

    pub fn phase(&self) -> DialoguePhase {
        self.phase
    }

    pub fn state(&self) -> &DialogueState {
        &self.state
    }

    pub fn session_id(&self) -> Option<&str> {
        self.recorder.as_ref().map(TranscriptRecorder::session_id)
    }

    /// Processes one line of user input to completion
    pub async fn submit(&mut self, line: &str) -> TurnOutcome {
        if line == QUIT_COMMAND {
            self.finish().await;
            return TurnOutcome::Terminated;
        }

        if line.trim().is_empty() {
            return TurnOutcome::Answered(None);
        }

        self.append(Message::user(line)).await;

        let outcome = match self.run_turn().await {
            Ok(answer) => {
                self.phase = DialoguePhase::Answered;
                TurnOutcome::Answered(Some(answer))
            }
            Err(e) => {
                error!("Turn aborted: {}", e);
                TurnOutcome::Answered(None)
            }
        };

        self.phase = DialoguePhase::AwaitingUserInput;
        outcome
    }

    /// Marks the session ended. Safe to call more than once.
    pub async fn finish(&mut self) {
        if self.phase == DialoguePhase::Terminated {
            return;
        }
        self.phase = DialoguePhase::Terminated;
        if let Some(recorder) = self.recorder.as_ref() {
            recorder.finish().await;
        }
        info!("Dialogue session ended after {} turns", self.state.len());
    }

    async fn run_turn(&mut self) -> Result<String, EngineError> {
        let mut rounds = 0;

        loop {
            self.phase = DialoguePhase::ModelRequested;
            let response = self.request_completion().await?;

            let (content, calls) = match response {
                LLMResponse::FinalAnswer(answer) => {
                    self.append(Message::assistant(answer.content.clone())).await;
                    return Ok(answer.content);
                }
                LLMResponse::ToolCalls { content, calls } => (content, calls),
            };

            self.append(Message::assistant_tool_calls(content, calls.clone()))
                .await;

            if rounds >= self.max_tool_rounds {
                warn!(
                    "Model requested {} more tool calls after {} rounds, giving up",
                    calls.len(),
                    rounds
                );
                for call in &calls {
                    self.append(Message::tool_result(ROUND_LIMIT_RESULT, call))
                        .await;
                }
                self.append(Message::assistant(GIVE_UP_ANSWER)).await;
                return Ok(GIVE_UP_ANSWER.to_string());
            }

            rounds += 1;
            self.phase = DialoguePhase::ToolsPending;
            self.dispatch_all(&calls).await;
        }
    }

    /// Runs tool calls sequentially, in the order the model emitted them
    async fn dispatch_all(&mut self, calls: &[ToolCall]) {
        for call in calls {
            debug!("Tool call: {} ({})", call.name, call.id);
            let content = self.tools.dispatch(call).await;
            self.append(Message::tool_result(content, call)).await;
        }
    }

    async fn request_completion(&self) -> Result<LLMResponse, EngineError> {
        debug!(
            "Requesting completion from {} with {} turns",
            self.provider.name(),
            self.state.len()
        );

        match timeout(
            self.request_timeout,
            self.provider
                .generate(self.state.messages(), &self.definitions),
        )
        .await
        {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(EngineError::ModelTransport(format!(
                "completion request timed out after {}s",
                self.request_timeout.as_secs()
            ))),
        }
    }

    async fn append(&mut self, message: Message) {
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.record(&message).await;
        }
        self.state.append(message);
    }
}
