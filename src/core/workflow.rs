//! Workflow execution.
//!
//! A workflow runs its steps strictly in order over a private copy of the
//! payload. Each step reads one key, invokes one action, and writes one key.
//! Execution stops at the first error, returning the partial payload.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::actions::{ActionError, ActionRegistry};
use crate::domain::{Payload, WorkflowStep};

/// A step referencing an action the registry does not know
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("workflow '{workflow}' step '{step}': action '{action}' not found")]
pub struct StepViolation {
    pub workflow: String,
    pub step: String,
    pub action: String,
}

/// Workflow construction and execution errors
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("step '{step}': input '{key}' not found")]
    InputNotFound { step: String, key: String },

    #[error("step '{step}' failed: {source}")]
    Action {
        step: String,
        #[source]
        source: ActionError,
    },

    #[error("workflow '{0}' not found")]
    NotFound(String),

    #[error("invalid workflow configuration: {}", join_violations(.violations))]
    Invalid { violations: Vec<StepViolation> },
}

fn join_violations(violations: &[StepViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A failed run, with the payload as it stood when the run stopped
#[derive(Debug, Error)]
#[error("{error}")]
pub struct WorkflowFailure {
    pub payload: Payload,
    pub error: WorkflowError,
}

/// How a run ended
#[derive(Debug)]
pub enum WorkflowState {
    Completed,
    ShortCircuited { step: String },
    Failed(WorkflowError),
}

/// Payload and final state of one run
#[derive(Debug)]
pub struct WorkflowOutcome {
    pub payload: Payload,
    pub state: WorkflowState,
}

/// An ordered list of steps bound to an action registry
#[derive(Debug, Clone)]
pub struct Workflow {
    id: String,
    steps: Vec<WorkflowStep>,
    registry: Arc<ActionRegistry>,
}

impl Workflow {
    pub fn new(id: impl Into<String>, steps: Vec<WorkflowStep>, registry: Arc<ActionRegistry>) -> Self {
        Self {
            id: id.into(),
            steps,
            registry,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn steps(&self) -> &[WorkflowStep] {
        &self.steps
    }

    /// Every step whose action is not registered
    pub fn validate(&self) -> Vec<StepViolation> {
        self.steps
            .iter()
            .filter(|step| !self.registry.action_exists(&step.action))
            .map(|step| StepViolation {
                workflow: self.id.clone(),
                step: step.step.clone(),
                action: step.action.clone(),
            })
            .collect()
    }

    /// Run the workflow on a copy of `payload`
    pub async fn run(&self, payload: &Payload) -> Result<Payload, WorkflowFailure> {
        let outcome = self.execute(payload).await;
        match outcome.state {
            WorkflowState::Completed | WorkflowState::ShortCircuited { .. } => Ok(outcome.payload),
            WorkflowState::Failed(error) => Err(WorkflowFailure {
                payload: outcome.payload,
                error,
            }),
        }
    }

    /// Run the workflow, reporting how it ended
    pub async fn execute(&self, payload: &Payload) -> WorkflowOutcome {
        let mut payload = payload.clone();

        for (index, step) in self.steps.iter().enumerate() {
            debug!(workflow = %self.id, step = %step.step, index, "Running step");

            let Some(input) = payload.get(&step.input) else {
                warn!(workflow = %self.id, step = %step.step, key = %step.input, "Step input missing");
                let error = WorkflowError::InputNotFound {
                    step: step.step.clone(),
                    key: step.input.clone(),
                };
                return WorkflowOutcome {
                    payload,
                    state: WorkflowState::Failed(error),
                };
            };

            // Only an empty output key that is already present ends the run early.
            if step.output.is_empty() && payload.contains_key(&step.output) {
                debug!(workflow = %self.id, step = %step.step, "Output already present, done early");
                return WorkflowOutcome {
                    payload,
                    state: WorkflowState::ShortCircuited {
                        step: step.step.clone(),
                    },
                };
            }

            match self.registry.run_action(&step.action, input).await {
                Ok(output) => {
                    payload.insert(step.output.clone(), output);
                }
                Err(source) => {
                    warn!(workflow = %self.id, step = %step.step, error = %source, "Step failed");
                    let error = WorkflowError::Action {
                        step: step.step.clone(),
                        source,
                    };
                    return WorkflowOutcome {
                        payload,
                        state: WorkflowState::Failed(error),
                    };
                }
            }
        }

        debug!(workflow = %self.id, "Workflow completed");
        WorkflowOutcome {
            payload,
            state: WorkflowState::Completed,
        }
    }
}
