//! Alerts and the payloads threaded through workflows.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Key/value map threaded through the steps of a workflow
pub type Payload = HashMap<String, String>;

/// A security alert: a flat map of string fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Alert {
    fields: HashMap<String, String>,
}

impl Alert {
    /// Create an empty alert
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a field value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Set a field, returning the previous value if any
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.fields.insert(key.into(), value.into())
    }

    /// Check whether a field is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Borrow the underlying field map
    pub fn fields(&self) -> &HashMap<String, String> {
        &self.fields
    }

    /// Copy the alert's fields into a fresh payload
    pub fn to_payload(&self) -> Payload {
        self.fields.clone()
    }
}

impl From<Payload> for Alert {
    fn from(fields: Payload) -> Self {
        Self { fields }
    }
}

impl From<Alert> for Payload {
    fn from(alert: Alert) -> Self {
        alert.fields
    }
}

impl<K, V> FromIterator<(K, V)> for Alert
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_json_is_flat_object() {
        let alert: Alert = serde_json::from_str(r#"{"alert":"Phishing","email-id":"e2"}"#).unwrap();
        assert_eq!(alert.get("alert"), Some("Phishing"));
        assert_eq!(alert.get("email-id"), Some("e2"));

        let value = serde_json::to_value(&alert).unwrap();
        assert_eq!(value["alert"], "Phishing");
    }

    #[test]
    fn test_alert_rejects_nested_values() {
        let result = serde_json::from_str::<Alert>(r#"{"alert":{"nested":"x"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_payload_copy_is_isolated() {
        let alert: Alert = [("a", "1")].into_iter().collect();
        let mut payload = alert.to_payload();
        payload.insert("b".to_string(), "2".to_string());

        assert!(!alert.contains_key("b"));
        assert_eq!(Alert::from(payload).len(), 2);
    }

    #[test]
    fn test_keys_are_case_sensitive() {
        let alert: Alert = [("Alert", "x")].into_iter().collect();
        assert_eq!(alert.get("alert"), None);
        assert_eq!(alert.get("Alert"), Some("x"));
    }
}
