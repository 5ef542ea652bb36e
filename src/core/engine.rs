//! Workflow engine: runs batches of chained workflow requests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error, info, instrument};

use crate::actions::ActionRegistry;
use crate::domain::{Payload, WorkflowDefs};

use super::workflow::{StepViolation, Workflow, WorkflowError, WorkflowFailure};

/// One alert's enrichment task: workflows to chain over a payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRequest {
    /// Workflows to run, in order
    pub workflow_ids: Vec<String>,

    /// Initial payload
    pub payload: Payload,
}

impl WorkflowRequest {
    pub fn new(workflow_ids: Vec<String>, payload: Payload) -> Self {
        Self {
            workflow_ids,
            payload,
        }
    }
}

/// A batch aborted by one failing request
#[derive(Debug, Error)]
#[error("request {index} failed: {error}")]
pub struct BatchFailure {
    /// Results of the requests that finished before the failure
    pub completed: Vec<Payload>,

    /// Position of the failing request in the batch
    pub index: usize,

    /// The failing request's payload when it stopped
    pub payload: Payload,

    pub error: WorkflowError,
}

/// Runs batches of workflow requests
#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    /// One result payload per request, in request order
    async fn run(&self, requests: Vec<WorkflowRequest>) -> Result<Vec<Payload>, BatchFailure>;
}

/// Engine over a fixed, validated set of workflows
#[derive(Debug)]
pub struct SimpleWorkflowEngine {
    workflows: HashMap<String, Workflow>,
}

impl SimpleWorkflowEngine {
    /// Build and validate every workflow
    ///
    /// Fails if any step of any workflow names an unknown action; the error
    /// lists every such step.
    pub fn new(defs: WorkflowDefs, registry: Arc<ActionRegistry>) -> Result<Self, WorkflowError> {
        let mut workflows = HashMap::with_capacity(defs.len());
        let mut violations: Vec<StepViolation> = Vec::new();

        for (id, steps) in defs {
            let workflow = Workflow::new(id.clone(), steps, Arc::clone(&registry));
            violations.extend(workflow.validate());
            workflows.insert(id, workflow);
        }

        if !violations.is_empty() {
            error!(count = violations.len(), "Workflow validation failed");
            return Err(WorkflowError::Invalid { violations });
        }

        info!(count = workflows.len(), "Workflows validated");
        Ok(Self { workflows })
    }

    /// Look up a workflow by id
    pub fn workflow(&self, id: &str) -> Option<&Workflow> {
        self.workflows.get(id)
    }

    /// Known workflow ids, sorted
    pub fn workflow_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.workflows.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Chain a request's workflows, feeding each output into the next
    pub async fn run_request(&self, request: &WorkflowRequest) -> Result<Payload, WorkflowFailure> {
        let mut payload = request.payload.clone();

        for id in &request.workflow_ids {
            let Some(workflow) = self.workflows.get(id) else {
                error!(workflow = %id, "Workflow not found");
                return Err(WorkflowFailure {
                    payload,
                    error: WorkflowError::NotFound(id.clone()),
                });
            };

            debug!(workflow = %id, "Running workflow");
            payload = workflow.run(&payload).await?;
        }

        Ok(payload)
    }
}

#[async_trait]
impl WorkflowEngine for SimpleWorkflowEngine {
    #[instrument(skip(self, requests), fields(requests = requests.len()))]
    async fn run(&self, requests: Vec<WorkflowRequest>) -> Result<Vec<Payload>, BatchFailure> {
        let mut results = Vec::with_capacity(requests.len());

        for (index, request) in requests.iter().enumerate() {
            match self.run_request(request).await {
                Ok(payload) => results.push(payload),
                Err(failure) => {
                    error!(index, error = %failure.error, "Request failed, aborting batch");
                    return Err(BatchFailure {
                        completed: results,
                        index,
                        payload: failure.payload,
                        error: failure.error,
                    });
                }
            }
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{Action, DummyAction};
    use crate::domain::WorkflowStep;
    use anyhow::Result;

    struct Append(&'static str);

    #[async_trait]
    impl Action for Append {
        fn name(&self) -> &str {
            self.0
        }

        async fn run(&self, input: &str) -> Result<String> {
            Ok(format!("{input}+{}", self.0))
        }
    }

    async fn engine() -> SimpleWorkflowEngine {
        let registry = ActionRegistry::builder()
            .register(Append("a"))
            .register(Append("b"))
            .register(DummyAction)
            .build()
            .await
            .unwrap();

        let mut defs = WorkflowDefs::new();
        defs.insert("first".to_string(), vec![WorkflowStep::new("s1", "a", "in", "mid")]);
        defs.insert("second".to_string(), vec![WorkflowStep::new("s2", "b", "mid", "out")]);
        defs.insert("needs-x".to_string(), vec![WorkflowStep::new("s3", "dummy", "x", "y")]);

        SimpleWorkflowEngine::new(defs, Arc::new(registry)).unwrap()
    }

    fn payload(entries: &[(&str, &str)]) -> Payload {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_chained_workflows() {
        let engine = engine().await;
        let results = engine
            .run(vec![WorkflowRequest::new(ids(&["first", "second"]), payload(&[("in", "x")]))])
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["mid"], "x+a");
        assert_eq!(results[0]["out"], "x+a+b");
    }

    #[tokio::test]
    async fn test_results_keep_request_order() {
        let engine = engine().await;
        let results = engine
            .run(vec![
                WorkflowRequest::new(ids(&["first"]), payload(&[("in", "1")])),
                WorkflowRequest::new(vec![], payload(&[("in", "2")])),
                WorkflowRequest::new(ids(&["first"]), payload(&[("in", "3")])),
            ])
            .await
            .unwrap();

        assert_eq!(results[0]["mid"], "1+a");
        assert_eq!(results[1], payload(&[("in", "2")]));
        assert_eq!(results[2]["mid"], "3+a");
    }

    #[tokio::test]
    async fn test_unknown_workflow_aborts_batch() {
        let engine = engine().await;
        let failure = engine
            .run(vec![
                WorkflowRequest::new(ids(&["first"]), payload(&[("in", "1")])),
                WorkflowRequest::new(ids(&["first", "ghost"]), payload(&[("in", "2")])),
                WorkflowRequest::new(ids(&["first"]), payload(&[("in", "3")])),
            ])
            .await
            .unwrap_err();

        assert!(matches!(failure.error, WorkflowError::NotFound(ref id) if id == "ghost"));
        assert_eq!(failure.index, 1);
        assert_eq!(failure.completed.len(), 1);
        assert_eq!(failure.payload["mid"], "2+a");
    }

    #[tokio::test]
    async fn test_step_failure_aborts_batch() {
        let engine = engine().await;
        let failure = engine
            .run(vec![WorkflowRequest::new(ids(&["needs-x"]), payload(&[("in", "1")]))])
            .await
            .unwrap_err();

        assert!(matches!(failure.error, WorkflowError::InputNotFound { ref key, .. } if key == "x"));
        assert!(failure.completed.is_empty());
    }

    #[tokio::test]
    async fn test_validation_reports_every_missing_action() {
        let registry = Arc::new(ActionRegistry::builder().register(DummyAction).build().await.unwrap());

        let mut defs = WorkflowDefs::new();
        defs.insert(
            "broken".to_string(),
            vec![
                WorkflowStep::new("one", "missing_one", "a", "b"),
                WorkflowStep::new("two", "dummy", "a", "c"),
                WorkflowStep::new("three", "missing_two", "a", "d"),
            ],
        );

        let err = SimpleWorkflowEngine::new(defs, registry).unwrap_err();
        let message = err.to_string();

        match err {
            WorkflowError::Invalid { violations } => assert_eq!(violations.len(), 2),
            other => panic!("Expected Invalid, got {other:?}"),
        }
        assert!(message.contains("missing_one"));
        assert!(message.contains("missing_two"));
    }

    #[tokio::test]
    async fn test_workflow_ids() {
        let engine = engine().await;
        assert_eq!(engine.workflow_ids(), vec!["first", "needs-x", "second"]);
        assert!(engine.workflow("first").is_some());
        assert!(engine.workflow("ghost").is_none());
    }
}
