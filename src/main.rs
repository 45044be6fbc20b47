use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::AsyncReadExt;
use tracing::{info, warn, Level};

use influence_lens::config::{Granularity, PipelineConfig};
use influence_lens::docs::ingest::ingest_file;
use influence_lens::docs::DocumentSet;
use influence_lens::influence::InfluenceEngine;
use influence_lens::llm::LlmClient;
use influence_lens::query::QueryRequest;

#[derive(Parser, Debug)]
#[command(name = "influence-lens", version, about, long_about = None)]
struct Cli {
    /// JSON request file ({"query", "documents"}); stdin when omitted
    request: Option<PathBuf>,

    /// Ask this question instead of reading a request
    #[arg(short, long)]
    query: Option<String>,

    /// Plain-text file to add as a document (repeatable)
    #[arg(short, long = "doc")]
    docs: Vec<PathBuf>,

    /// Answer from the template fallback without calling the LLM
    #[arg(long)]
    offline: bool,

    /// Seed for reproducible poisoning
    #[arg(long)]
    seed: Option<u64>,

    /// Attribution unit: sentence, token or auto
    #[arg(long)]
    granularity: Option<Granularity>,

    /// Skip sentiment, bias and trust analysis
    #[arg(long)]
    no_analysis: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::from_env();
        if let Some(seed) = self.seed {
            config.poison_seed = Some(seed);
        }
        if let Some(granularity) = self.granularity {
            config.attribution.granularity = granularity;
        }
        if self.no_analysis {
            config.analyze = false;
        }
        config
    }
}

async fn read_request(path: Option<&PathBuf>) -> Result<QueryRequest> {
    let raw = match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read request file {}", path.display()))?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("Failed to read request from stdin")?;
            buf
        }
    };
    serde_json::from_str(&raw).context("Failed to parse request JSON")
}

async fn build_request(cli: &Cli) -> Result<QueryRequest> {
    let (query, mut set) = match &cli.query {
        Some(query) => (query.clone(), DocumentSet::new()),
        None => {
            let request = read_request(cli.request.as_ref()).await?;
            // keep duplicates visible to validation
            if cli.docs.is_empty() {
                return Ok(request);
            }
            (request.query, request.documents.into_iter().collect())
        }
    };

    for path in &cli.docs {
        let (id, size) = ingest_file(&mut set, path).await?;
        info!(doc_id = %id, size, "Added document from {}", path.display());
    }

    Ok(set.to_request(query))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries the JSON response
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level())
        .with_writer(std::io::stderr)
        .init();

    // Load env
    let _ = dotenv::dotenv();

    let config = cli.pipeline_config();
    let request = build_request(&cli).await?;

    let engine = if cli.offline {
        info!("Offline mode, answers come from templates");
        InfluenceEngine::offline(config)
    } else {
        match LlmClient::from_env() {
            Ok(llm) => {
                info!(model = llm.model(), "LLM client initialized");
                InfluenceEngine::new(Arc::new(llm), config)
            }
            Err(e) => {
                warn!("LLM client unavailable, using templates: {:#}", e);
                InfluenceEngine::offline(config)
            }
        }
    };

    let response = engine.respond(&request).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&response).context("Failed to encode response")?
    );

    Ok(())
}
