//! Domain types for alertflow.
//!
//! This module contains the core data structures:
//! - Alert / Payload: the flat string maps being enriched
//! - Rule: alert field conditions selecting workflows
//! - WorkflowStep: configured workflow definitions

pub mod alert;
pub mod rule;
pub mod workflow;

// Re-export commonly used types
pub use alert::{Alert, Payload};
pub use rule::{load_rules, parse_rules, Match, Rule};
pub use workflow::{load_workflow_defs, parse_workflow_defs, WorkflowDefs, WorkflowStep};
