//! Core orchestration logic.
//!
//! This module contains:
//! - Matcher: rules -> workflow ids
//! - Workflow: the step execution state machine
//! - Engine: chained workflow batches
//! - Executor: serial and bounded-parallel enrichment
//! - Retry: exponential backoff for unreliable calls
//! - Service: startup wiring from configuration

pub mod engine;
pub mod executor;
pub mod matcher;
pub mod retry;
pub mod service;
pub mod workflow;

// Re-export commonly used types
pub use engine::{BatchFailure, SimpleWorkflowEngine, WorkflowEngine, WorkflowRequest};
pub use executor::{Executor, ExecutorError, ParallelExecutor, SimpleExecutor, DEFAULT_MAX_PARALLEL};
pub use matcher::{BasicRuleMatcher, RuleMatcher};
pub use retry::{RetryError, RetryPolicy, Retryable};
pub use service::EnrichmentService;
pub use workflow::{StepViolation, Workflow, WorkflowError, WorkflowFailure, WorkflowOutcome, WorkflowState};
