//! Rules selecting which workflows enrich an alert.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::alert::Alert;

/// A single matching rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Human-readable rule name
    pub name: String,

    /// Field condition the alert must satisfy
    #[serde(rename = "match")]
    pub condition: Match,

    /// Workflow to run when the rule fires
    pub workflow: String,
}

/// Equality condition on one alert field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub key: String,
    pub value: String,
}

impl Rule {
    /// Check whether this rule fires for an alert
    pub fn matches(&self, alert: &Alert) -> bool {
        alert.get(&self.condition.key) == Some(self.condition.value.as_str())
    }
}

/// Load a rules file (a JSON array of rules)
pub fn load_rules(path: &Path) -> Result<Vec<Rule>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read rules file: {}", path.display()))?;

    parse_rules(&content).with_context(|| format!("Failed to parse rules file: {}", path.display()))
}

/// Parse rules from JSON content
pub fn parse_rules(content: &str) -> Result<Vec<Rule>> {
    serde_json::from_str(content).context("Invalid rules JSON")
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES_JSON: &str = r#"[
        {"name": "phishing", "match": {"key": "alert", "value": "Phishing"}, "workflow": "phishing-email"}
    ]"#;

    #[test]
    fn test_rule_parsing() {
        let rules = parse_rules(RULES_JSON).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].condition.key, "alert");
        assert_eq!(rules[0].workflow, "phishing-email");
    }

    #[test]
    fn test_rule_matches_exact_value() {
        let rule = &parse_rules(RULES_JSON).unwrap()[0];

        let hit: Alert = [("alert", "Phishing")].into_iter().collect();
        let miss: Alert = [("alert", "phishing")].into_iter().collect();
        let absent: Alert = [("other", "Phishing")].into_iter().collect();

        assert!(rule.matches(&hit));
        assert!(!rule.matches(&miss));
        assert!(!rule.matches(&absent));
    }

    #[test]
    fn test_missing_rules_file() {
        let result = load_rules(Path::new("/nonexistent/rules.json"));
        assert!(result.is_err());
    }
}
