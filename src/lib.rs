//! alertflow - Rule-driven security alert enrichment
//!
//! Alerts are flat string maps. Rules route each alert to named workflows,
//! and each workflow is an ordered list of steps that read one payload key,
//! run a registered action on it, and write the result under another key.
//!
//! # Architecture
//!
//! - Rules match on a single key/value pair; every match contributes its
//!   workflow id once, in rule order
//! - Workflows chain: the output payload of one is the input of the next
//! - A step whose output key is empty and already present short-circuits
//!   the rest of its workflow
//! - A batch is all or nothing: the first failing alert fails the call
//!
//! # Modules
//!
//! - `actions`: Action trait, registry and built-in actions
//! - `core`: Matcher, workflow state machine, engine, executor, retry
//! - `domain`: Alerts, rules and workflow definitions
//! - `server`: HTTP enrichment endpoint
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Serve POST /enrich
//! alertflow serve --address 0.0.0.0:8080
//!
//! # Enrich a file of alerts
//! alertflow enrich --input alerts.json --parallel
//!
//! # Run workflows by hand
//! alertflow run phishing-email --payload '{"email-id":"e2"}'
//! ```

pub mod actions;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod server;

// Re-export main types at crate root for convenience
pub use actions::{Action, ActionError, ActionRegistry};
pub use core::{EnrichmentService, Executor, SimpleExecutor, SimpleWorkflowEngine, WorkflowEngine};
pub use domain::{Alert, Payload, Rule, WorkflowDefs, WorkflowStep};
