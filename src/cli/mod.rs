//! Command-line interface for alertflow.
//!
//! Provides commands for serving the enrichment API, enriching alert files,
//! running workflow chains by hand, and checking configuration.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config;
use crate::core::{EnrichmentService, Executor, WorkflowEngine, WorkflowRequest};
use crate::domain::{Alert, Payload};
use crate::server;

/// alertflow - Rule-driven security alert enrichment
#[derive(Parser, Debug)]
#[command(name = "alertflow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the enrichment HTTP API
    Serve {
        /// Address to bind to (overrides configuration)
        #[arg(short, long)]
        address: Option<String>,
    },

    /// Enrich a JSON array of alerts and print the result
    Enrich {
        /// Input file (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Enrich alerts concurrently
        #[arg(short, long)]
        parallel: bool,
    },

    /// Run a chain of workflows on a payload
    Run {
        /// Workflow ids, run in the order given
        #[arg(required = true)]
        workflow_ids: Vec<String>,

        /// Initial payload as a JSON object of strings
        #[arg(short, long, default_value = "{}")]
        payload: String,
    },

    /// Load rules and workflows and report problems
    Validate,

    /// List registered actions
    Actions,

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Serve { address } => serve(address).await,
            Commands::Enrich { input, parallel } => enrich(input, parallel).await,
            Commands::Run {
                workflow_ids,
                payload,
            } => run_workflows(workflow_ids, &payload).await,
            Commands::Validate => validate().await,
            Commands::Actions => list_actions().await,
            Commands::Config => show_config(),
        }
    }
}

async fn load_service() -> Result<EnrichmentService> {
    let config = config::config()?;
    EnrichmentService::from_config(config).await
}

/// Start the HTTP server
async fn serve(address: Option<String>) -> Result<()> {
    let config = config::config()?;
    let service = EnrichmentService::from_config(config).await?;
    let address = address.unwrap_or_else(|| config.address.clone());

    server::serve(&address, service.executor())
        .await
        .with_context(|| format!("Server on {} failed", address))
}

/// Enrich alerts from a file or stdin
async fn enrich(input_file: Option<PathBuf>, parallel: bool) -> Result<()> {
    let input = if let Some(path) = input_file {
        std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?
    } else if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        buffer
    } else {
        anyhow::bail!("No input provided. Use --input <file> or pipe to stdin");
    };

    let alerts: Vec<Alert> =
        server::parse_alerts(input.as_bytes()).context("Failed to parse alerts")?;

    let service = load_service().await?;
    let enriched = if parallel {
        service.simple_executor().enrich_parallel(alerts).await?
    } else {
        service.simple_executor().enrich(alerts).await?
    };

    println!("{}", serde_json::to_string_pretty(&enriched)?);
    Ok(())
}

/// Run workflows by id on a payload
async fn run_workflows(workflow_ids: Vec<String>, payload_json: &str) -> Result<()> {
    let payload: Payload =
        serde_json::from_str(payload_json).context("Payload must be a JSON object of strings")?;

    let service = load_service().await?;
    let results = service
        .engine()
        .run(vec![WorkflowRequest::new(workflow_ids, payload)])
        .await;

    match results {
        Ok(results) => {
            for (i, result) in results.iter().enumerate() {
                eprintln!("[Workflow chain {} result]", i);
                println!("{}", serde_json::to_string_pretty(result)?);
            }
            Ok(())
        }
        Err(failure) => {
            eprintln!("[Partial payload]");
            eprintln!("{}", serde_json::to_string_pretty(&failure.payload)?);
            Err(failure).context("Failed to run workflows")
        }
    }
}

/// Load everything once and report what was found
async fn validate() -> Result<()> {
    let service = load_service().await?;

    println!("Rules:     {}", service.matcher().rules().len());
    println!("Workflows: {}", service.engine().workflow_ids().join(", "));
    println!("Actions:   {}", service.registry().names().join(", "));
    println!("\nConfiguration is valid");

    Ok(())
}

/// List registered actions
async fn list_actions() -> Result<()> {
    let service = load_service().await?;

    for name in service.registry().names() {
        println!("{}", name);
    }

    Ok(())
}

/// Show resolved configuration
fn show_config() -> Result<()> {
    let config = config::config()?;

    println!("alertflow Configuration");
    println!("=======================\n");

    if let Some(ref path) = config.config_file {
        println!("Config file: {}", path.display());
    } else {
        println!("Config file: (none found, using defaults)");
    }

    println!("\nPaths:");
    println!("  rules:        {}", config.rules_path.display());
    println!("  workflows:    {}", config.workflows_path.display());
    println!("  email bodies: {}", config.email_bodies_path.display());

    println!("\nServer:");
    println!("  address: {}", config.address);

    println!("\nExecutor:");
    println!("  parallel:     {}", config.executor.parallel);
    println!("  max parallel: {}", config.executor.max_parallel);

    println!("\nReputation:");
    println!("  api url:  {}", config.reputation.api_url);
    println!(
        "  api key:  {}",
        if config.reputation.api_key.is_some() { "(set)" } else { "(not set)" }
    );
    println!(
        "  retry:    {} attempts, {}ms initial delay, x{} backoff",
        config.reputation.retry.max_attempts,
        config.reputation.retry.initial_delay_ms,
        config.reputation.retry.backoff_multiplier
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_command() {
        let cli = Cli::try_parse_from([
            "alertflow",
            "run",
            "phishing-email",
            "dummy",
            "--payload",
            r#"{"email-id":"e2"}"#,
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                workflow_ids,
                payload,
            } => {
                assert_eq!(workflow_ids, vec!["phishing-email", "dummy"]);
                assert!(payload.contains("e2"));
            }
            other => panic!("Expected Run, got {other:?}"),
        }
    }

    #[test]
    fn test_run_requires_workflow() {
        assert!(Cli::try_parse_from(["alertflow", "run"]).is_err());
    }

    #[test]
    fn test_parse_enrich_parallel() {
        let cli = Cli::try_parse_from(["alertflow", "enrich", "--parallel", "-i", "alerts.json"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Enrich { parallel: true, input: Some(_) }
        ));
    }
}
