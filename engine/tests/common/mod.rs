//! Shared fixtures for the engine integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use catalog_engine::config::{FilterConfig, LLMConfig, StoreConfig};
use catalog_engine::ingest::{self, Schedule};
use catalog_engine::llm::{
    FinalAnswer, LLMError, LLMProvider, LLMResponse, Message, ToolCall, ToolDefinition,
};
use catalog_engine::platform::MailLauncher;
use catalog_engine::query::FilterBuilder;
use catalog_engine::store::{CatalogCollections, MemoryStore, RecordStore};
use catalog_engine::tools::{CourseTool, EmailTool, ToolRegistry};
use sdk::errors::EngineError;
use sdk::CourseRecord;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Three sections; "Software Development" is the first subject title ingested
pub fn sample_courses() -> Vec<CourseRecord> {
    [
        ["CS", "272", "01", "40646", "Software Development", "Ada", "Lovelace", "LS", "G12"],
        ["CS", "245", "02", "40700", "Data Structures", "Alan", "Turing", "HR", "148"],
        ["MATH", "201", "01", "41000", "Calculus", "Grace", "Hopper", "KA", "311"],
    ]
    .iter()
    .map(|[subj, num, sec, crn, title, first, last, bldg, rm]| {
        let email = format!("{}@usf.edu", first.to_lowercase());
        let row = [
            *subj, *num, *sec, *crn, "LEC", "M", *title, "In-Person", "CLAS", "MWF",
            "09:00 AM", "10:15 AM", "08/26/2024", "12/13/2024", *bldg, *rm, "30", *first,
            *last, email.as_str(), "Arts and Sciences",
        ];
        CourseRecord::from_row(&row).unwrap()
    })
    .collect()
}

/// In-memory store with the sample schedule loaded
pub async fn seeded_collections() -> (Arc<MemoryStore>, CatalogCollections) {
    let store = Arc::new(MemoryStore::new());
    let collections = CatalogCollections::new(Arc::clone(&store) as Arc<dyn RecordStore>, &StoreConfig::default());
    ingest::create_collections(&collections).await.unwrap();
    ingest::load_schedule(
        &collections,
        &Schedule {
            courses: sample_courses(),
            skipped_rows: 0,
        },
        500,
    )
    .await
    .unwrap();
    (store, collections)
}

pub fn filter_builder(collections: CatalogCollections) -> FilterBuilder {
    FilterBuilder::new(collections, &FilterConfig::default())
}

/// Records every address it is asked to open
#[derive(Default)]
pub struct RecordingLauncher {
    pub addresses: Mutex<Vec<String>>,
}

impl RecordingLauncher {
    pub fn launches(&self) -> Vec<String> {
        self.addresses.lock().unwrap().clone()
    }
}

impl MailLauncher for RecordingLauncher {
    fn open_draft(&self, address: &str) -> Result<(), EngineError> {
        self.addresses.lock().unwrap().push(address.to_string());
        Ok(())
    }
}

pub fn registry(collections: CatalogCollections, launcher: Arc<RecordingLauncher>) -> ToolRegistry {
    ToolRegistry::new(
        CourseTool::new(filter_builder(collections), 50),
        EmailTool::new(launcher),
    )
}

/// Replays canned responses and keeps every request it saw
#[derive(Default)]
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<LLMResponse, LLMError>>>,
    pub requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<Result<LLMResponse, LLMError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Vec<Message> {
        self.requests.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        messages: &[Message],
        _tools: &[ToolDefinition],
    ) -> Result<LLMResponse, LLMError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LLMError::InvalidRequest("script exhausted".to_string())))
    }
}

pub fn answer(text: &str) -> Result<LLMResponse, LLMError> {
    Ok(LLMResponse::FinalAnswer(FinalAnswer::new(text)))
}

pub fn calls(calls: Vec<ToolCall>) -> Result<LLMResponse, LLMError> {
    Ok(LLMResponse::ToolCalls {
        content: String::new(),
        calls,
    })
}

pub fn llm_config(max_tool_rounds: usize) -> LLMConfig {
    LLMConfig {
        max_tool_rounds,
        ..LLMConfig::default()
    }
}
