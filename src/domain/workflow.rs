//! Workflow definitions as loaded from configuration.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Workflow id -> ordered steps
pub type WorkflowDefs = BTreeMap<String, Vec<WorkflowStep>>;

/// A single step in a workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Step label (used in diagnostics)
    pub step: String,

    /// Registered action to invoke
    pub action: String,

    /// Payload key holding the action input
    pub input: String,

    /// Payload key receiving the action output
    pub output: String,
}

impl WorkflowStep {
    pub fn new(
        step: impl Into<String>,
        action: impl Into<String>,
        input: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            step: step.into(),
            action: action.into(),
            input: input.into(),
            output: output.into(),
        }
    }
}

/// Load workflow definitions (a JSON object of id -> steps)
pub fn load_workflow_defs(path: &Path) -> Result<WorkflowDefs> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read workflows file: {}", path.display()))?;

    parse_workflow_defs(&content)
        .with_context(|| format!("Failed to parse workflows file: {}", path.display()))
}

/// Parse workflow definitions from JSON content
pub fn parse_workflow_defs(content: &str) -> Result<WorkflowDefs> {
    serde_json::from_str(content).context("Invalid workflows JSON")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_defs_parsing() {
        let json = r#"{
            "phishing-email": [
                {"step": "get body", "action": "email_get_body", "input": "email-id", "output": "body"},
                {"step": "extract", "action": "str_extract_url", "input": "body", "output": "url"}
            ],
            "dummy": [
                {"step": "noop", "action": "dummy", "input": "alert", "output": "dummy"}
            ]
        }"#;

        let defs = parse_workflow_defs(json).unwrap();
        assert_eq!(defs.len(), 2);

        let steps = &defs["phishing-email"];
        assert_eq!(steps[0], WorkflowStep::new("get body", "email_get_body", "email-id", "body"));
        assert_eq!(steps[1].output, "url");
    }

    #[test]
    fn test_step_missing_field_rejected() {
        let json = r#"{"w": [{"step": "s", "action": "a", "input": "i"}]}"#;
        assert!(parse_workflow_defs(json).is_err());
    }
}
