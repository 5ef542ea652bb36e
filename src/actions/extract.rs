//! URL extraction from free text.

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;

use super::Action;

const URL_PATTERN: &str = r#"https?://[^\s"'<>]+"#;

/// Returns the first http(s) URL found in the input
#[derive(Debug, Clone, Default)]
pub struct UrlExtractor {
    /// Compiled during `init`
    pattern: Option<Regex>,
}

impl UrlExtractor {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Action for UrlExtractor {
    fn name(&self) -> &str {
        "str_extract_url"
    }

    async fn init(&mut self) -> Result<()> {
        self.pattern = Some(Regex::new(URL_PATTERN).context("Invalid URL pattern")?);
        Ok(())
    }

    async fn run(&self, input: &str) -> Result<String> {
        let pattern = self
            .pattern
            .as_ref()
            .context("URL extractor used before init")?;

        let found = pattern
            .find(input)
            .context("No URL found in input")?
            .as_str()
            .trim_end_matches(['.', ',', ';', ':', ')', ']']);

        Ok(found.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn extractor() -> UrlExtractor {
        let mut action = UrlExtractor::new();
        action.init().await.unwrap();
        action
    }

    #[tokio::test]
    async fn test_extracts_first_url() {
        let action = extractor().await;
        let out = action
            .run("Dear user, visit http://example.com or https://other.example/x")
            .await
            .unwrap();
        assert_eq!(out, "http://example.com");
    }

    #[tokio::test]
    async fn test_strips_trailing_punctuation() {
        let action = extractor().await;
        let out = action.run("Go to https://example.com/login.").await.unwrap();
        assert_eq!(out, "https://example.com/login");
    }

    #[tokio::test]
    async fn test_no_url_is_error() {
        let action = extractor().await;
        assert!(action.run("nothing to see here").await.is_err());
    }

    #[tokio::test]
    async fn test_run_before_init_is_error() {
        let action = UrlExtractor::new();
        assert!(action.run("http://example.com").await.is_err());
    }
}
