//! Actions and the registry that dispatches them by name.
//!
//! An action is a named operation turning one string into another. Actions
//! are initialized once when the registry is built; after that the registry is
//! read-only and shared across concurrent workflow runs.

pub mod dummy;
pub mod email;
pub mod extract;
pub mod reputation;

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

pub use dummy::DummyAction;
pub use email::EmailBodyLookup;
pub use extract::UrlExtractor;
pub use reputation::{ReputationConfig, UrlReputationCheck};

/// Trait for workflow actions
#[async_trait]
pub trait Action: Send + Sync {
    /// Name workflows use to reference this action
    fn name(&self) -> &str;

    /// One-time setup, called before any `run`
    async fn init(&mut self) -> Result<()> {
        Ok(())
    }

    /// Transform one input into one output
    async fn run(&self, input: &str) -> Result<String>;
}

/// Errors raised by the registry
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("action '{0}' not found")]
    NotFound(String),

    #[error("action '{0}' is registered more than once")]
    Duplicate(String),

    #[error("action '{action}' failed to initialize: {message}")]
    Init { action: String, message: String },

    #[error("action '{action}' failed: {message}")]
    Failed { action: String, message: String },
}

/// Collects actions before initializing them
#[derive(Default)]
pub struct ActionRegistryBuilder {
    actions: Vec<Box<dyn Action>>,
}

impl ActionRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an action
    pub fn register(self, action: impl Action + 'static) -> Self {
        self.register_boxed(Box::new(action))
    }

    /// Add an already boxed action
    pub fn register_boxed(mut self, action: Box<dyn Action>) -> Self {
        self.actions.push(action);
        self
    }

    /// Initialize every action and freeze the registry
    ///
    /// Fails on the first duplicate name or failed `init`; no partially
    /// initialized registry is ever returned.
    pub async fn build(self) -> Result<ActionRegistry, ActionError> {
        let mut actions: HashMap<String, Box<dyn Action>> = HashMap::new();

        for mut action in self.actions {
            let name = action.name().to_string();
            if actions.contains_key(&name) {
                return Err(ActionError::Duplicate(name));
            }

            action.init().await.map_err(|e| ActionError::Init {
                action: name.clone(),
                message: format!("{e:#}"),
            })?;
            debug!(action = %name, "Action initialized");

            actions.insert(name, action);
        }

        info!(count = actions.len(), "Action registry ready");
        Ok(ActionRegistry { actions })
    }
}

/// Name-keyed catalog of initialized actions
pub struct ActionRegistry {
    actions: HashMap<String, Box<dyn Action>>,
}

impl ActionRegistry {
    pub fn builder() -> ActionRegistryBuilder {
        ActionRegistryBuilder::new()
    }

    /// Builder preloaded with the built-in actions
    pub fn standard(email_bodies: EmailBodyLookup, reputation: ReputationConfig) -> ActionRegistryBuilder {
        ActionRegistryBuilder::new()
            .register(email_bodies)
            .register(UrlExtractor::new())
            .register(UrlReputationCheck::new(reputation))
            .register(DummyAction)
    }

    /// Check whether an action is registered
    pub fn action_exists(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Run a registered action
    pub async fn run_action(&self, name: &str, input: &str) -> Result<String, ActionError> {
        let action = self
            .actions
            .get(name)
            .ok_or_else(|| ActionError::NotFound(name.to_string()))?;

        action.run(input).await.map_err(|e| ActionError::Failed {
            action: name.to_string(),
            message: format!("{e:#}"),
        })
    }

    /// Registered action names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.names())
            .finish()
    }
}
