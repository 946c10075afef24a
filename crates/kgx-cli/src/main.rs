//! KGX CLI - Knowledge graph extraction from documents
//!
//! Usage:
//!   kgx extract <file> [--mode triples|jsonld] [--ontology <path>]
//!   kgx text "<input text>"
//!   kgx ontology <path>
//!
//! Configuration comes from the environment (or `--config <toml>`);
//! command-line flags override individual values. Results are printed
//! as pretty JSON, to stdout or `--output`.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use kgx_core::{ExtractionMode, ModelProvider, PipelineConfig, PipelineOutcome};
use kgx_ontology::Ontology;
use kgx_pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "kgx")]
#[command(about = "LLM-driven knowledge graph extraction")]
#[command(version)]
struct Cli {
    /// Load configuration from a TOML file instead of the environment
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Extraction mode (triples or jsonld)
    #[arg(long, global = true)]
    mode: Option<ExtractionMode>,

    /// Model provider (openai or anthropic)
    #[arg(long, global = true)]
    provider: Option<ModelProvider>,

    /// Model name override
    #[arg(long, global = true)]
    model: Option<String>,

    /// Chunk size in words
    #[arg(long, global = true)]
    chunk_size: Option<usize>,

    /// Chunk overlap in words
    #[arg(long, global = true)]
    chunk_overlap: Option<usize>,

    /// Ontology file for jsonld mode
    #[arg(long, global = true)]
    ontology: Option<PathBuf>,

    /// Skip ontology validation of extracted items
    #[arg(long, global = true)]
    no_validate: bool,

    /// Skip normalization and deduplication
    #[arg(long, global = true)]
    no_normalize: bool,

    /// Write the result JSON to a file instead of stdout
    #[arg(long, short, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract knowledge from a document file (pdf, md, txt)
    Extract {
        /// Path to the document
        file: PathBuf,

        /// 1-based PDF pages to process (e.g. --pages 1,2,5)
        #[arg(long, value_delimiter = ',')]
        pages: Option<Vec<usize>>,
    },
    /// Extract knowledge from text given on the command line
    Text {
        /// Input text
        input: String,
    },
    /// Load an ontology and print its class/property catalogue
    Ontology {
        /// Path to an OWL/RDF-XML file
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(success) => {
            if success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = build_config(&cli)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    match &cli.command {
        Commands::Ontology { path } => {
            let ontology = Ontology::load(path)
                .with_context(|| format!("failed to load ontology from {}", path.display()))?;
            println!(
                "{} classes, {} properties\n",
                ontology.class_count(),
                ontology.property_count()
            );
            print!("{}", ontology.summary().render());
            Ok(true)
        }
        Commands::Extract { file, pages } => {
            let pipeline = Pipeline::new(config)?;
            let outcome = pipeline.process_file(file, pages.as_deref()).await;
            report(&cli, outcome)
        }
        Commands::Text { input } => {
            let pipeline = Pipeline::new(config)?;
            let outcome = pipeline.process_text(input).await;
            report(&cli, outcome)
        }
    }
}

fn build_config(cli: &Cli) -> anyhow::Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::from_env()?,
    };

    if let Some(provider) = cli.provider {
        config.llm.provider = provider;
        config.llm.model = provider.default_model().to_string();
    }
    if let Some(model) = &cli.model {
        config.llm.model = model.clone();
    }
    if let Some(mode) = cli.mode {
        config.extraction.mode = mode;
    }
    if let Some(size) = cli.chunk_size {
        config.chunking.chunk_size = size;
    }
    if let Some(overlap) = cli.chunk_overlap {
        config.chunking.chunk_overlap = overlap;
    }
    if let Some(path) = &cli.ontology {
        config.extraction.ontology_path = Some(path.clone());
    }
    if cli.no_validate {
        config.extraction.enable_validation = false;
    }
    if cli.no_normalize {
        config.extraction.enable_normalization = false;
    }

    config.validate()?;
    Ok(config)
}

/// Print or write the outcome; the process exit code follows `success`
fn report(cli: &Cli, outcome: PipelineOutcome) -> anyhow::Result<bool> {
    let json = serde_json::to_string_pretty(&outcome)?;

    match &cli.output {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            if let Some(result) = &outcome.result {
                println!(
                    "{} items written to {} (run {})",
                    result.statistics.unique_items,
                    path.display(),
                    result.run_id
                );
            }
        }
        None => println!("{json}"),
    }

    if let Some(error) = &outcome.error {
        eprintln!("Extraction failed: {error}");
    }
    Ok(outcome.success)
}
