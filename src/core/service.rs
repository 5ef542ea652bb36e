//! Startup wiring: configuration in, ready-to-use executor out.
//!
//! Order matters and every step is fatal: rules, workflow definitions, action
//! registry (with `init`), engine validation, executor.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::actions::{ActionRegistry, EmailBodyLookup};
use crate::config::{ExecutorSettings, ResolvedConfig};
use crate::domain::{load_rules, load_workflow_defs, Rule, WorkflowDefs};

use super::engine::SimpleWorkflowEngine;
use super::executor::{Executor, ParallelExecutor, SimpleExecutor};
use super::matcher::BasicRuleMatcher;

/// Fully constructed enrichment pipeline
pub struct EnrichmentService {
    matcher: Arc<BasicRuleMatcher>,
    registry: Arc<ActionRegistry>,
    engine: Arc<SimpleWorkflowEngine>,
    executor: SimpleExecutor,
    parallel: bool,
}

impl EnrichmentService {
    /// Load every configured input and build the service
    pub async fn from_config(config: &ResolvedConfig) -> Result<Self> {
        let rules = load_rules(&config.rules_path)?;
        let defs = load_workflow_defs(&config.workflows_path)?;

        let registry = ActionRegistry::standard(
            EmailBodyLookup::from_file(&config.email_bodies_path),
            config.reputation.clone(),
        )
        .build()
        .await
        .context("Failed to initialize actions")?;

        Self::build(rules, defs, registry, &config.executor)
    }

    /// Build from already loaded parts
    pub fn build(
        rules: Vec<Rule>,
        defs: WorkflowDefs,
        registry: ActionRegistry,
        settings: &ExecutorSettings,
    ) -> Result<Self> {
        let registry = Arc::new(registry);
        let engine = Arc::new(
            SimpleWorkflowEngine::new(defs, Arc::clone(&registry))
                .context("Failed to create workflow engine")?,
        );
        let matcher = Arc::new(BasicRuleMatcher::new(rules));

        let executor = SimpleExecutor::new(matcher.clone(), engine.clone())
            .with_max_parallel(settings.max_parallel);

        info!(
            rules = matcher.rules().len(),
            workflows = engine.workflow_ids().len(),
            actions = registry.len(),
            parallel = settings.parallel,
            "Enrichment service ready"
        );

        Ok(Self {
            matcher,
            registry,
            engine,
            executor,
            parallel: settings.parallel,
        })
    }

    pub fn matcher(&self) -> &BasicRuleMatcher {
        &self.matcher
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn engine(&self) -> &SimpleWorkflowEngine {
        &self.engine
    }

    /// The executor itself, for callers choosing the path per call
    pub fn simple_executor(&self) -> &SimpleExecutor {
        &self.executor
    }

    /// The configured executor (serial or parallel)
    pub fn executor(&self) -> Arc<dyn Executor> {
        if self.parallel {
            Arc::new(ParallelExecutor::new(self.executor.clone()))
        } else {
            Arc::new(self.executor.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::DummyAction;
    use crate::domain::{parse_rules, parse_workflow_defs};

    #[tokio::test]
    async fn test_build_rejects_unknown_action() {
        let registry = ActionRegistry::builder().register(DummyAction).build().await.unwrap();
        let defs = parse_workflow_defs(
            r#"{"w": [{"step": "s", "action": "missing", "input": "a", "output": "b"}]}"#,
        )
        .unwrap();

        let result = EnrichmentService::build(vec![], defs, registry, &ExecutorSettings::default());
        let message = format!("{:#}", result.err().unwrap());
        assert!(message.contains("missing"));
    }

    #[tokio::test]
    async fn test_configured_executor_enriches() {
        let rules = parse_rules(
            r#"[{"name": "all", "match": {"key": "alert", "value": "Test"}, "workflow": "w"}]"#,
        )
        .unwrap();
        let defs = parse_workflow_defs(
            r#"{"w": [{"step": "s", "action": "dummy", "input": "alert", "output": "d"}]}"#,
        )
        .unwrap();

        for parallel in [false, true] {
            let registry = ActionRegistry::builder().register(DummyAction).build().await.unwrap();
            let settings = ExecutorSettings {
                parallel,
                max_parallel: 2,
            };
            let service = EnrichmentService::build(rules.clone(), defs.clone(), registry, &settings).unwrap();
            let alert = [("alert", "Test")].into_iter().collect();

            let enriched = service.executor().enrich(vec![alert]).await.unwrap();
            assert_eq!(enriched[0].get("d"), Some("Dummy"));
        }
    }
}
