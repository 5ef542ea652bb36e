//! Email body lookup backed by a reference data file.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use super::Action;

/// Looks up an email body by email id
#[derive(Debug, Clone)]
pub struct EmailBodyLookup {
    /// Reference file, read during `init` (None when bodies are supplied directly)
    source: Option<PathBuf>,

    /// email-id -> body
    bodies: HashMap<String, String>,
}

impl EmailBodyLookup {
    /// Load bodies from a JSON object file (`{"<email-id>": "<body>"}`)
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Some(path.into()),
            bodies: HashMap::new(),
        }
    }

    /// Use an in-memory table
    pub fn from_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            source: None,
            bodies: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[async_trait]
impl Action for EmailBodyLookup {
    fn name(&self) -> &str {
        "email_get_body"
    }

    async fn init(&mut self) -> Result<()> {
        let Some(path) = &self.source else {
            return Ok(());
        };

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read email bodies file: {}", path.display()))?;

        let bodies: HashMap<String, String> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse email bodies file: {}", path.display()))?;

        debug!(count = bodies.len(), path = %path.display(), "Loaded email bodies");
        self.bodies.extend(bodies);
        Ok(())
    }

    async fn run(&self, input: &str) -> Result<String> {
        self.bodies
            .get(input)
            .cloned()
            .with_context(|| format!("No email body for id '{}'", input))
    }
}
