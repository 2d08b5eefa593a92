//! `get_relevant_courses`
//!
//! Builds a predicate from the model's field map, queries the course
//! collection with it and hands the projected sections back together with an
//! instruction to either answer or keep calling tools.

use crate::llm::ToolDefinition;
use crate::query::{project, FieldMap, FilterBuilder};
use sdk::errors::EngineError;
use sdk::FieldKey;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

pub const NAME: &str = "get_relevant_courses";

/// Query text for filtered lookups; ranking is irrelevant once the filter applies
const QUERY_TEXT: &str = ".";

const ANSWER_PREFIX: &str = "If you believe you have enough information to answer the original user question with the information attached below, then answer it. Be sure to include all options to the user's question: ";
const ANSWER_SUFFIX: &str = "\n\nHowever, if you do not think you have enough information, then feel free to make another tool call.";

/// Wraps projected results in the follow-up instruction
pub fn follow_up_content(results: &str) -> String {
    format!("{}{}{}", ANSWER_PREFIX, results, ANSWER_SUFFIX)
}

pub struct CourseTool {
    filter: FilterBuilder,
    query_limit: usize,
}

impl CourseTool {
    pub fn new(filter: FilterBuilder, query_limit: usize) -> Self {
        Self {
            filter,
            query_limit,
        }
    }

    pub fn definition() -> ToolDefinition {
        let properties: Map<String, Value> = FieldKey::ALL
            .iter()
            .map(|key| {
                (
                    key.as_str().to_string(),
                    json!({"type": "string", "description": key.description()}),
                )
            })
            .collect();

        ToolDefinition {
            name: NAME.to_string(),
            description: "Get the relevant metadata from the user's question regarding course information.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": properties,
            }),
        }
    }

    /// Runs one call and returns the tool-result content
    pub async fn run(&self, arguments: &str) -> Result<String, EngineError> {
        let fields = FieldMap::from_arguments(arguments)?;
        let predicate = self.filter.build(&fields).await?;

        if predicate.is_empty() {
            return Err(EngineError::Decode(
                "no usable course fields were supplied".to_string(),
            ));
        }

        let collections = self.filter.collections();
        let hits = collections
            .store()
            .query_similar(
                &collections.courses,
                &[QUERY_TEXT.to_string()],
                self.query_limit,
                Some(&predicate),
            )
            .await
            .map_err(|e| match e {
                EngineError::Lookup(_) => e,
                other => EngineError::Lookup(other.to_string()),
            })?;

        let results = project(&hits);
        info!(
            "Course query matched {} documents",
            hits.all_documents().count()
        );
        debug!("Projected results: {} bytes", results.len());

        Ok(follow_up_content(&results))
    }
}
