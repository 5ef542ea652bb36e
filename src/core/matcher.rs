//! Rule matching: which workflows should enrich an alert.

use std::collections::HashSet;

use crate::domain::{Alert, Rule};

/// Selects workflows for an alert
pub trait RuleMatcher: Send + Sync {
    /// Workflow ids whose rules fire for `alert`, each at most once
    fn match_alert(&self, alert: &Alert) -> Vec<String>;
}

/// Matches alerts against a static list of equality rules
#[derive(Debug, Clone, Default)]
pub struct BasicRuleMatcher {
    rules: Vec<Rule>,
}

impl BasicRuleMatcher {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}

impl RuleMatcher for BasicRuleMatcher {
    /// Ids come back in the order their first firing rule is declared
    fn match_alert(&self, alert: &Alert) -> Vec<String> {
        let mut seen = HashSet::new();

        self.rules
            .iter()
            .filter(|rule| rule.matches(alert))
            .filter(|rule| seen.insert(rule.workflow.as_str()))
            .map(|rule| rule.workflow.clone())
            .collect()
    }
}
