//! End-to-end dialogue turns with scripted model responses

mod common;

use async_trait::async_trait;
use catalog_engine::config::{LLMConfig, OpenAIConfig};
use catalog_engine::db::Database;
use catalog_engine::dialogue::{
    DialogueOrchestrator, DialoguePhase, TurnOutcome, GIVE_UP_ANSWER, ROUND_LIMIT_RESULT,
};
use catalog_engine::llm::openai::OpenAIProvider;
use catalog_engine::llm::{
    LLMError, LLMProvider, LLMResponse, Message, MessageRole, ToolCall, ToolDefinition,
};
use catalog_engine::secrets::{SecretCache, OPENAI_API_KEY};
use catalog_engine::tools::courses::follow_up_content;
use catalog_engine::tools::email::CONFIRMATION;
use common::{answer, calls, llm_config, registry, seeded_collections, RecordingLauncher, ScriptedProvider};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn orchestrator(
    provider: Arc<dyn LLMProvider>,
    config: &LLMConfig,
) -> (DialogueOrchestrator, Arc<RecordingLauncher>) {
    let (_store, collections) = seeded_collections().await;
    let launcher = Arc::new(RecordingLauncher::default());
    let tools = Arc::new(registry(collections, Arc::clone(&launcher)));
    (DialogueOrchestrator::new(provider, tools, config), launcher)
}

fn tool_results(messages: &[Message]) -> Vec<&Message> {
    messages
        .iter()
        .filter(|m| m.role == MessageRole::Tool)
        .collect()
}

#[tokio::test]
async fn test_plain_answer_appends_two_turns() {
    let provider = ScriptedProvider::new(vec![answer("There are three sections.")]);
    let (mut dialogue, _) = orchestrator(provider.clone(), &llm_config(3)).await;
    let before = dialogue.state().len();

    let outcome = dialogue.submit("How many CS sections are there?").await;

    assert_eq!(
        outcome,
        TurnOutcome::Answered(Some("There are three sections.".to_string()))
    );
    assert_eq!(dialogue.state().len(), before + 2);
    assert_eq!(provider.request_count(), 1);
    assert_eq!(dialogue.phase(), DialoguePhase::AwaitingUserInput);

    let messages = dialogue.state().messages();
    assert_eq!(messages[0].role, MessageRole::System);
    assert_eq!(messages[1], Message::user("How many CS sections are there?"));
    assert_eq!(messages[2], Message::assistant("There are three sections."));
}

#[tokio::test]
async fn test_email_call_opens_one_draft() {
    let provider = ScriptedProvider::new(vec![
        calls(vec![ToolCall::new(
            "call_1",
            "email_instructor",
            r#"{"email":"ada@usf.edu"}"#,
        )]),
        answer("I opened a draft to Ada Lovelace."),
    ]);
    let (mut dialogue, launcher) = orchestrator(provider.clone(), &llm_config(3)).await;

    let outcome = dialogue.submit("Email Ada Lovelace for me").await;

    assert_eq!(
        outcome,
        TurnOutcome::Answered(Some("I opened a draft to Ada Lovelace.".to_string()))
    );
    assert_eq!(launcher.launches(), vec!["ada@usf.edu".to_string()]);

    let messages = dialogue.state().messages();
    let results = tool_results(messages);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].content, CONFIRMATION);
    assert_eq!(results[0].tool_call_id.as_deref(), Some("call_1"));

    // The assistant tool-call turn precedes its result
    let assistant_idx = messages
        .iter()
        .position(|m| !m.tool_calls.is_empty())
        .unwrap();
    assert_eq!(messages[assistant_idx + 1].role, MessageRole::Tool);

    // The follow-up request carries the tool result
    assert_eq!(provider.request_count(), 2);
    assert_eq!(
        provider.last_request().last().map(|m| m.role),
        Some(MessageRole::Tool)
    );
}

#[tokio::test]
async fn test_course_call_projects_matching_sections() {
    let provider = ScriptedProvider::new(vec![
        calls(vec![ToolCall::new(
            "call_1",
            "get_relevant_courses",
            r#"{"Subject":"MATH"}"#,
        )]),
        answer("Calculus meets MWF."),
    ]);
    let (mut dialogue, _) = orchestrator(provider, &llm_config(3)).await;

    dialogue.submit("What math classes are offered?").await;

    let results = tool_results(dialogue.state().messages());
    assert_eq!(results.len(), 1);
    let content = &results[0].content;
    assert!(content.contains("\"Title Short Desc\": \"Calculus\""));
    assert!(!content.contains("Software Development"));
    assert!(content.starts_with("If you believe you have enough information"));
}

#[tokio::test]
async fn test_empty_hit_set_still_gets_follow_up_instruction() {
    let provider = ScriptedProvider::new(vec![
        calls(vec![ToolCall::new(
            "call_1",
            "get_relevant_courses",
            r#"{"CRN":"99999"}"#,
        )]),
        answer("I could not find that section."),
    ]);
    let (mut dialogue, _) = orchestrator(provider, &llm_config(3)).await;

    dialogue.submit("Tell me about CRN 99999").await;

    let results = tool_results(dialogue.state().messages());
    assert_eq!(results[0].content, follow_up_content(""));
}

#[tokio::test]
async fn test_every_call_in_a_round_gets_a_result_in_order() {
    let provider = ScriptedProvider::new(vec![
        calls(vec![
            ToolCall::new("call_a", "get_relevant_courses", r#"{"Subject":"CS"}"#),
            ToolCall::new("call_b", "email_instructor", r#"{"email":"alan@usf.edu"}"#),
        ]),
        answer("Done."),
    ]);
    let (mut dialogue, launcher) = orchestrator(provider, &llm_config(3)).await;

    dialogue.submit("Find CS courses and email Alan").await;

    let ids: Vec<_> = tool_results(dialogue.state().messages())
        .iter()
        .map(|m| m.tool_call_id.clone().unwrap_or_default())
        .collect();
    assert_eq!(ids, vec!["call_a".to_string(), "call_b".to_string()]);
    assert_eq!(launcher.launches().len(), 1);
}

#[tokio::test]
async fn test_unknown_tool_and_bad_arguments_become_error_results() {
    let provider = ScriptedProvider::new(vec![
        calls(vec![
            ToolCall::new("call_1", "drop_course", "{}"),
            ToolCall::new("call_2", "get_relevant_courses", "not json"),
            ToolCall::new("call_3", "get_relevant_courses", r#"{"Semester":"Fall"}"#),
        ]),
        answer("Sorry."),
    ]);
    let (mut dialogue, _) = orchestrator(provider, &llm_config(3)).await;

    let outcome = dialogue.submit("Drop my course").await;
    assert_eq!(outcome, TurnOutcome::Answered(Some("Sorry.".to_string())));

    let results = tool_results(dialogue.state().messages());
    assert_eq!(results.len(), 3);
    assert!(results[0].content.starts_with("ERROR: Unknown tool 'drop_course'"));
    assert!(results[0].content.contains("get_relevant_courses"));
    assert!(results[0].content.contains("email_instructor"));
    assert!(results[1].content.starts_with("ERROR:"));
    assert!(results[2].content.starts_with("ERROR:"));
    assert!(results[2].content.contains("Semester"));
}

#[tokio::test]
async fn test_round_limit_gives_up() {
    let course_call = || {
        calls(vec![ToolCall::new(
            "call_x",
            "get_relevant_courses",
            r#"{"Subject":"CS"}"#,
        )])
    };
    let provider = ScriptedProvider::new(vec![course_call(), course_call(), course_call()]);
    let (mut dialogue, _) = orchestrator(provider.clone(), &llm_config(2)).await;

    let outcome = dialogue.submit("Keep looking").await;

    assert_eq!(outcome, TurnOutcome::Answered(Some(GIVE_UP_ANSWER.to_string())));
    assert_eq!(provider.request_count(), 3);

    let messages = dialogue.state().messages();
    let n = messages.len();
    assert_eq!(messages[n - 1], Message::assistant(GIVE_UP_ANSWER));
    assert_eq!(messages[n - 2].role, MessageRole::Tool);
    assert_eq!(messages[n - 2].content, ROUND_LIMIT_RESULT);
    assert_eq!(tool_results(messages).len(), 3);
}

#[tokio::test]
async fn test_transport_error_aborts_turn_but_keeps_user_message() {
    let provider = ScriptedProvider::new(vec![
        Err(LLMError::NetworkError("connection reset".to_string())),
        answer("Back online."),
    ]);
    let (mut dialogue, _) = orchestrator(provider, &llm_config(3)).await;

    let outcome = dialogue.submit("Is CS 272 full?").await;
    assert_eq!(outcome, TurnOutcome::Answered(None));
    assert_eq!(dialogue.state().len(), 2);
    assert_eq!(dialogue.state().last(), Some(&Message::user("Is CS 272 full?")));
    assert_eq!(dialogue.phase(), DialoguePhase::AwaitingUserInput);

    let outcome = dialogue.submit("Is CS 272 full?").await;
    assert_eq!(outcome, TurnOutcome::Answered(Some("Back online.".to_string())));
    assert_eq!(dialogue.state().len(), 4);
}

#[tokio::test]
async fn test_follow_up_transport_error_keeps_tool_turns() {
    let provider = ScriptedProvider::new(vec![
        calls(vec![ToolCall::new(
            "call_1",
            "get_relevant_courses",
            r#"{"Subject":"CS"}"#,
        )]),
        Err(LLMError::NetworkError("connection reset".to_string())),
        answer("CS 272 and CS 245 are offered."),
    ]);
    let (mut dialogue, _) = orchestrator(provider.clone(), &llm_config(3)).await;

    let outcome = dialogue.submit("Which CS courses are offered?").await;

    assert_eq!(outcome, TurnOutcome::Answered(None));
    assert_eq!(provider.request_count(), 2);
    assert_eq!(dialogue.phase(), DialoguePhase::AwaitingUserInput);
    let roles: Vec<MessageRole> = dialogue.state().messages().iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![
            MessageRole::System,
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::Tool
        ]
    );

    let outcome = dialogue.submit("Which CS courses are offered?").await;
    assert_eq!(
        outcome,
        TurnOutcome::Answered(Some("CS 272 and CS 245 are offered.".to_string()))
    );
    assert_eq!(dialogue.state().len(), 6);
}

struct StalledProvider;

#[async_trait]
impl LLMProvider for StalledProvider {
    fn name(&self) -> &str {
        "stalled"
    }

    async fn generate(
        &self,
        _messages: &[Message],
        _tools: &[ToolDefinition],
    ) -> Result<LLMResponse, LLMError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Err(LLMError::Timeout)
    }
}

#[tokio::test]
async fn test_request_timeout_aborts_turn() {
    let config = LLMConfig {
        request_timeout_secs: 1,
        ..LLMConfig::default()
    };
    let (mut dialogue, _) = orchestrator(Arc::new(StalledProvider), &config).await;

    let outcome = dialogue.submit("Anything?").await;
    assert_eq!(outcome, TurnOutcome::Answered(None));
    assert_eq!(dialogue.state().len(), 2);
}

#[tokio::test]
async fn test_blank_line_and_quit() {
    let provider = ScriptedProvider::new(vec![]);
    let (mut dialogue, _) = orchestrator(provider.clone(), &llm_config(3)).await;

    assert_eq!(dialogue.submit("   ").await, TurnOutcome::Answered(None));
    assert_eq!(dialogue.submit("").await, TurnOutcome::Answered(None));
    assert_eq!(dialogue.state().len(), 1);
    assert_eq!(provider.request_count(), 0);

    assert_eq!(dialogue.submit("q").await, TurnOutcome::Terminated);
    assert_eq!(dialogue.phase(), DialoguePhase::Terminated);
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn test_transcript_is_recorded() {
    let dir = TempDir::new().unwrap();
    let db = Database::new(&dir.path().join("catalog.db")).await.unwrap();

    let provider = ScriptedProvider::new(vec![
        calls(vec![ToolCall::new(
            "call_1",
            "email_instructor",
            r#"{"email":"grace@usf.edu"}"#,
        )]),
        answer("Draft opened."),
    ]);
    let (dialogue, _) = orchestrator(provider, &llm_config(3)).await;
    let mut dialogue = dialogue.with_transcript(db.transcripts(), "gpt-test").await;
    let session_id = dialogue.session_id().unwrap().to_string();

    dialogue.submit("Email Grace Hopper").await;
    dialogue.submit("q").await;

    let turns = db.transcripts().get_turns(&session_id).await.unwrap();
    let roles: Vec<&str> = turns.iter().map(|t| t.role.as_str()).collect();
    assert_eq!(roles, vec!["system", "user", "assistant", "tool", "assistant"]);
    assert!(turns[2].content.contains("email_instructor"));
    assert_eq!(turns[3].tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(turns[4].content, "Draft opened.");

    let sessions = db.transcripts().list_sessions(5).await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].model, "gpt-test");
    assert_eq!(sessions[0].turn_count, 5);
    assert_eq!(sessions[0].first_question.as_deref(), Some("Email Grace Hopper"));
    assert!(sessions[0].ended_at.is_some());

    db.close().await.unwrap();
}

#[tokio::test]
async fn test_openai_round_trip_through_tools() {
    let server = MockServer::start().await;

    // Follow-up request: it carries the tool result
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("\"tool_call_id\":\"call_1\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {"role": "assistant", "content": "CS 272 is taught by Ada Lovelace."}
            }]
        })))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "get_relevant_courses",
                            "arguments": "{\"Subject\":\"CS\",\"CourseNumber\":\"272\"}"
                        }
                    }]
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = Arc::new(OpenAIProvider::new(
        OpenAIConfig {
            base_url: server.uri(),
            ..OpenAIConfig::default()
        },
        Arc::new(SecretCache::with_static(OPENAI_API_KEY, "sk-test")),
    ));
    let (mut dialogue, _) = orchestrator(provider, &llm_config(3)).await;

    let outcome = dialogue.submit("Who teaches CS 272?").await;
    assert_eq!(
        outcome,
        TurnOutcome::Answered(Some("CS 272 is taught by Ada Lovelace.".to_string()))
    );

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let first: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let tool_names: Vec<_> = first["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["function"]["name"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(tool_names, vec!["get_relevant_courses", "email_instructor"]);

    let follow_up: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
    let messages = follow_up["messages"].as_array().unwrap();
    let tool_message = messages.last().unwrap();
    assert_eq!(tool_message["role"], "tool");
    assert!(tool_message["content"]
        .as_str()
        .unwrap()
        .contains("Software Development"));
}
