//! `email_instructor`

use crate::llm::ToolDefinition;
use crate::platform::MailLauncher;
use sdk::errors::EngineError;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

pub const NAME: &str = "email_instructor";

/// Tool-result content sent back whether or not the mail client opened
pub const CONFIRMATION: &str =
    "an email draft has been opened successfully and the user has sent an email to the recipient.";

#[derive(Debug, Deserialize)]
struct EmailArgs {
    email: String,
}

pub struct EmailTool {
    launcher: Arc<dyn MailLauncher>,
}

impl EmailTool {
    pub fn new(launcher: Arc<dyn MailLauncher>) -> Self {
        Self { launcher }
    }

    pub fn definition() -> ToolDefinition {
        ToolDefinition {
            name: NAME.to_string(),
            description: "Opens up an email draft to a given instructor".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "email": {
                        "type": "string",
                        "description": "The email address of the instructor"
                    }
                },
                "required": ["email"]
            }),
        }
    }

    /// Opens the draft. Launch failures are logged and not reported to the model.
    pub fn run(&self, arguments: &str) -> Result<String, EngineError> {
        let args: EmailArgs = serde_json::from_str(arguments)
            .map_err(|e| EngineError::Decode(format!("invalid email arguments: {}", e)))?;

        let address = args.email.trim();
        if address.is_empty() {
            return Err(EngineError::Decode("email address is empty".to_string()));
        }

        if let Err(e) = self.launcher.open_draft(address) {
            warn!("Failed to open email draft to {}: {}", address, e);
        }

        Ok(CONFIRMATION.to_string())
    }
}
