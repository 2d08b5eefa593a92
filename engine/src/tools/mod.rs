pub mod courses;
pub mod email;

pub use courses::CourseTool;
pub use email::EmailTool;

use crate::llm::{ToolCall, ToolDefinition};
use sdk::errors::CatalogErrorExt;
use tracing::{debug, warn};

/// Registry of the tools the model may call during a dialogue.
pub struct ToolRegistry {
    pub courses: CourseTool,
    pub email: EmailTool,
}

impl ToolRegistry {
    pub fn new(courses: CourseTool, email: EmailTool) -> Self {
        Self { courses, email }
    }

    /// Definitions advertised with every completion request.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        vec![CourseTool::definition(), EmailTool::definition()]
    }

    /// Dispatch a tool call by name.
    ///
    /// Returns the tool-result content. Errors are returned as `ERROR: ...`
    /// strings so every call gets an answer the model can see.
    pub async fn dispatch(&self, call: &ToolCall) -> String {
        debug!("Dispatching tool '{}' with args: {}", call.name, call.arguments);

        let result = match call.name.as_str() {
            courses::NAME => self.courses.run(&call.arguments).await,
            email::NAME => self.email.run(&call.arguments),
            _ => {
                warn!("Unknown tool requested: {}", call.name);
                return format!(
                    "ERROR: Unknown tool '{}'. Available tools: {}",
                    call.name,
                    self.available_tool_names().join(", ")
                );
            }
        };

        match result {
            Ok(content) => content,
            Err(e) => {
                warn!("Tool '{}' (call {}) failed: {}", call.name, call.id, e);
                format!("ERROR: {}. {}", e, e.user_hint())
            }
        }
    }

    /// Return the names of all tools.
    fn available_tool_names(&self) -> Vec<&'static str> {
        vec![courses::NAME, email::NAME]
    }
}
