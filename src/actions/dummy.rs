//! Constant action, handy for wiring and tests.

use anyhow::Result;
use async_trait::async_trait;

use super::Action;

/// Always answers "Dummy"
#[derive(Debug, Clone, Copy, Default)]
pub struct DummyAction;

#[async_trait]
impl Action for DummyAction {
    fn name(&self) -> &str {
        "dummy"
    }

    async fn run(&self, _input: &str) -> Result<String> {
        Ok("Dummy".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dummy_output() {
        assert_eq!(DummyAction.run("anything").await.unwrap(), "Dummy");
    }
}
