mod display;

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;
use doclex_core::{AnalyzerConfig, DocumentInput, SourceKind};
use doclex_llm::OllamaClient;
use doclex_pipeline::{Analyzer, CancelToken, PipelineError};

/// Analyze a legal/labor/administrative document with a local LLM.
#[derive(Parser)]
#[command(name = "doclex", version, about)]
struct Cli {
    /// UTF-8 text file to analyze (output of the extraction layer).
    file: PathBuf,

    /// Ollama endpoint (loopback only).
    #[arg(long, env = "DOCLEX_ENDPOINT")]
    endpoint: Option<String>,

    /// Model name, e.g. "llama3.2:3b".
    #[arg(long, env = "DOCLEX_MODEL")]
    model: Option<String>,

    /// Generation temperature.
    #[arg(long)]
    temperature: Option<f64>,

    /// Print the raw analysis as JSON instead of the card view.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    tracing::info!("doclex v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();

    let mut config = AnalyzerConfig::default();
    if let Some(endpoint) = cli.endpoint {
        config.llm.endpoint = endpoint;
    }
    if let Some(model) = cli.model {
        config.llm.model = model;
    }
    if let Some(temperature) = cli.temperature {
        config.llm.temperature = temperature;
    }
    config.validate()?;

    let text = std::fs::read_to_string(&cli.file)
        .with_context(|| format!("failed to read {}", cli.file.display()))?;

    let client = OllamaClient::new(&config.llm);
    if !client.is_healthy().await {
        bail!(
            "model service is not reachable at {}. Start it with: ollama serve",
            config.llm.endpoint
        );
    }

    let input = DocumentInput::new(text, None, SourceKind::PlainText);
    let analyzer = Analyzer::new(config, client);

    match analyzer.analyze(&input, &CancelToken::new()).await {
        Ok(analysis) => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&analysis)?);
            } else {
                print!("{}", display::render_card(&analysis));
            }
            Ok(())
        }
        Err(PipelineError::Cancelled) => bail!("analysis cancelled"),
    }
}
