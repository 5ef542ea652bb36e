//! URL reputation check against the Safe Browsing v4 lookup API.
//!
//! Rate-limited responses (HTTP 429) are retried through [`RetryPolicy`];
//! any other non-200 status fails immediately.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::Action;
use crate::core::retry::{RetryError, RetryPolicy, Retryable};

pub const DEFAULT_API_URL: &str = "https://safebrowsing.googleapis.com/v4/threatMatches:find";

/// Verdict for a URL with no threat matches
pub const VERDICT_GOOD: &str = "Good";

/// Verdict for a URL with at least one threat match
pub const VERDICT_BAD: &str = "Bad";

/// Settings for the reputation lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationConfig {
    /// Lookup endpoint
    pub api_url: String,

    /// API key sent as the `key` query parameter
    pub api_key: Option<String>,

    /// Client identity reported to the API
    pub client_id: String,
    pub client_version: String,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,

    /// Backoff for rate-limited lookups
    pub retry: RetryPolicy,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            client_id: env!("CARGO_PKG_NAME").to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            timeout_seconds: 10,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThreatLookupRequest<'a> {
    client: ClientInfo<'a>,
    threat_info: ThreatInfo<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClientInfo<'a> {
    client_id: &'a str,
    client_version: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThreatInfo<'a> {
    threat_types: [&'a str; 2],
    platform_types: [&'a str; 1],
    threat_entry_types: [&'a str; 1],
    threat_entries: Vec<ThreatEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct ThreatEntry<'a> {
    url: &'a str,
}

/// Lookup response; an empty object means no matches
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreatLookupResponse {
    #[serde(default)]
    pub matches: Vec<ThreatMatch>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatMatch {
    pub threat_type: String,
    #[serde(default)]
    pub platform_type: String,
    #[serde(default)]
    pub threat_entry_type: String,
    pub threat: ThreatUrl,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThreatUrl {
    pub url: String,
}

/// Failure of a single lookup attempt
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("rate limit exceeded")]
    RateLimited,

    #[error("unexpected status code: {0}")]
    UnexpectedStatus(u16),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("reputation check used before init")]
    NotInitialized,
}

impl Retryable for LookupError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited)
    }
}

/// Checks URL reputation, answering "Good" or "Bad"
pub struct UrlReputationCheck {
    config: ReputationConfig,

    /// Built during `init`
    client: Option<reqwest::Client>,
}

impl UrlReputationCheck {
    pub fn new(config: ReputationConfig) -> Self {
        Self {
            config,
            client: None,
        }
    }

    /// Look up a URL, retrying while rate limited
    pub async fn check_url(&self, url: &str) -> Result<ThreatLookupResponse, RetryError<LookupError>> {
        let client = self
            .client
            .as_ref()
            .ok_or(RetryError::Fatal(LookupError::NotInitialized))?;

        let request = ThreatLookupRequest {
            client: ClientInfo {
                client_id: &self.config.client_id,
                client_version: &self.config.client_version,
            },
            threat_info: ThreatInfo {
                threat_types: ["MALWARE", "SOCIAL_ENGINEERING"],
                platform_types: ["ANY_PLATFORM"],
                threat_entry_types: ["URL"],
                threat_entries: vec![ThreatEntry { url }],
            },
        };

        let endpoint = self.config.api_url.as_str();
        let api_key = self.config.api_key.as_deref();
        let request = &request;

        self.config
            .retry
            .execute(move || async move {
                let mut builder = client.post(endpoint).json(request);
                if let Some(key) = api_key {
                    builder = builder.query(&[("key", key)]);
                }

                let response = builder.send().await?;

                match response.status() {
                    StatusCode::OK => Ok(response.json::<ThreatLookupResponse>().await?),
                    StatusCode::TOO_MANY_REQUESTS => Err(LookupError::RateLimited),
                    other => Err(LookupError::UnexpectedStatus(other.as_u16())),
                }
            })
            .await
    }
}

#[async_trait]
impl Action for UrlReputationCheck {
    fn name(&self) -> &str {
        "url_check_reputation"
    }

    async fn init(&mut self) -> Result<()> {
        if self.config.api_key.is_none() {
            warn!("No Safe Browsing API key configured; lookups will be unauthenticated");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_seconds))
            .build()
            .context("Failed to build HTTP client")?;

        self.client = Some(client);
        Ok(())
    }

    async fn run(&self, input: &str) -> Result<String> {
        let response = self
            .check_url(input)
            .await
            .with_context(|| format!("Reputation lookup failed for '{}'", input))?;

        debug!(url = %input, matches = response.matches.len(), "Reputation lookup complete");

        if response.matches.is_empty() {
            Ok(VERDICT_GOOD.to_string())
        } else {
            Ok(VERDICT_BAD.to_string())
        }
    }
}
