//! `qamatch`: answer chat questions from a curated Q&A list.
//!
//! ```text
//! qamatch --config qamatch.toml warm
//! qamatch --config qamatch.toml ask "how do I reset my password"
//! qamatch --config qamatch.toml search password
//! qamatch --config qamatch.toml show b5e96206461a8212
//! qamatch --config qamatch.toml run < messages.jsonl
//! ```
//!
//! Logs go to stderr and are filtered through `RUST_LOG` (default `info`).

mod config;
mod transport;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use qamatch_embeddings::HttpEmbeddingProvider;
use qamatch_lifecycle::{HandleOutcome, InboundMessage, MessageHandler, TokioDeletionScheduler};
use qamatch_matcher::{EmbeddingConfig, QaService};

use crate::config::AppConfig;
use crate::transport::JsonLinesTransport;

/// Length of the question-hash prefix shown by `search`.
const SHORT_HASH_LEN: usize = 16;

#[derive(Debug, Parser)]
#[command(
    name = "qamatch",
    version,
    about = "Match questions against a Q&A list by embedding similarity"
)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load the corpus and make sure the embedding cache is current
    Warm,

    /// Match one question and print the answer
    Ask {
        /// Question text
        text: String,
    },

    /// List questions containing the given keywords
    Search {
        /// Case-insensitive substring
        keywords: String,
    },

    /// Print the entry whose question hash starts with the given prefix
    Show {
        /// Hex prefix of the question hash
        hash: String,
    },

    /// Read JSON-lines messages on stdin and write reply/delete events to stdout
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).await?;
    let service = build_service(&config).await?;

    match cli.command {
        Command::Warm => {
            let stats = service.stats();
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Ask { text } => match service.best_match(&text).await {
            Some(result) if result.accepted => {
                if let Some(entry) = service.corpus().get(result.index) {
                    println!("Q#{} ({:.4}): {}", result.index, result.score, entry.question);
                    println!("{}", entry.answer);
                }
            }
            Some(result) => println!(
                "No match above {:.2} (best was Q#{} at {:.4})",
                service.threshold(),
                result.index,
                result.score
            ),
            None => println!("No match"),
        },
        Command::Search { keywords } => {
            let hits = service.search_by_keyword(&keywords);
            if hits.is_empty() {
                println!("No questions contain {keywords:?}");
            }
            for entry in hits {
                let hash = qamatch_matcher::question_hash(&entry.question);
                let short = hash.get(..SHORT_HASH_LEN).unwrap_or(hash.as_str());
                println!("{short}  {}", entry.question);
            }
        }
        Command::Show { hash } => match service.find_by_short_hash(&hash) {
            Some((entry, full)) => {
                println!("{full}");
                println!("Q: {}", entry.question);
                println!("A: {}", entry.answer);
            }
            None => println!("No question hash starts with {hash:?}"),
        },
        Command::Run => run(service, &config).await?,
    }

    Ok(())
}

async fn build_service(config: &AppConfig) -> Result<QaService> {
    let provider = build_provider(&config.matcher.embedding)?;
    if !qamatch_embeddings::EmbeddingProvider::is_available(&provider) {
        warn!(
            "No API key configured (set it in the config file or {}); embedding calls will fail",
            crate::config::API_KEY_ENV
        );
    }

    let service = QaService::from_config(&config.matcher, Arc::new(provider))
        .await
        .context("failed to start Q&A service")?;

    let stats = service.stats();
    info!(
        "Serving {} entries ({} embeddings, source: {:?})",
        stats.entries, stats.embeddings, stats.source
    );
    Ok(service)
}

fn build_provider(config: &EmbeddingConfig) -> Result<HttpEmbeddingProvider> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .context("failed to build HTTP client")?;

    let provider = HttpEmbeddingProvider::new(&config.endpoint, &config.model).with_client(client);
    Ok(match &config.api_key {
        Some(key) => provider.with_api_key(key),
        None => provider,
    })
}

async fn run(service: QaService, config: &AppConfig) -> Result<()> {
    let transport = Arc::new(JsonLinesTransport::new(tokio::io::stdout()));
    let scheduler = Arc::new(TokioDeletionScheduler::new(transport.clone()));
    let handler = MessageHandler::new(Arc::new(service), config.lifecycle.clone(), scheduler);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut handled = 0usize;

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }

        let message: InboundMessage = match serde_json::from_str(&line) {
            Ok(message) => message,
            Err(e) => {
                warn!("Skipping malformed message: {e}");
                continue;
            }
        };

        let outcome = handler.handle(&message, Utc::now(), transport.as_ref()).await;
        if let HandleOutcome::Ignored { reason } = &outcome {
            info!("No reply to message {}: {reason:?}", message.message_id);
        }
        handled += 1;
    }

    info!("Input closed after {handled} messages; pending deletions are dropped");
    Ok(())
}
