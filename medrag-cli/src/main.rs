//! medrag CLI - build, query and serve the medical retrieval index
//!
//! # Commands
//!
//! ```bash
//! # Embed the scraped corpus and write the paired index artifacts
//! medrag build data/mayo_disease_data.json
//!
//! # Show the nearest records and their distances
//! medrag search "fever, cough, and difficulty breathing"
//!
//! # Ask the chatbot once / serve it over HTTP
//! medrag ask "I have a sore throat and a headache"
//! medrag serve --bind 0.0.0.0:8000
//!
//! # Score retrieval quality against a query suite
//! medrag eval data/eval_suite.toml -k 3
//! ```

mod serve;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use medrag_lib::{
    chat::{Assistant, OpenAiGenerator},
    config::Settings,
    corpus,
    embed::{self, Embedder},
    eval::{self, EvalSuite, DEFAULT_RELEVANCE_THRESHOLD},
    search::SearchEngine,
    store::persist,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Bins used when printing the recall distribution
const HISTOGRAM_BINS: usize = 5;

#[derive(Parser)]
#[command(name = "medrag")]
#[command(about = "Retrieval-augmented medical reference chatbot")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults are used when it does not exist)
    #[arg(short, long, global = true, default_value = "medrag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed a corpus snapshot and write the index artifacts
    Build {
        /// JSON array of scraped records
        corpus: PathBuf,
    },

    /// Search the index and print labels with distances
    Search {
        /// Query text
        query: String,

        /// Number of results to return
        #[arg(short, long)]
        k: Option<usize>,
    },

    /// Answer one question with retrieved context
    Ask {
        /// Question or symptom description
        query: String,
    },

    /// Serve the chatbot over HTTP
    Serve {
        /// Address to bind
        #[arg(short, long, default_value = "0.0.0.0:8000")]
        bind: String,
    },

    /// Compute Recall@k and MRR for a query suite
    Eval {
        /// TOML suite of categorised queries and expected answers
        suite: PathBuf,

        /// Number of results retrieved per query
        #[arg(short, long, default_value = "3")]
        k: usize,

        /// Cosine similarity above which a chunk counts as relevant
        #[arg(short, long, default_value_t = DEFAULT_RELEVANCE_THRESHOLD)]
        threshold: f32,
    },
}

/// Load the saved index and pair it with the configured embedder.
fn open_engine(settings: &Settings) -> Result<SearchEngine<Box<dyn Embedder>>> {
    let kb = persist::load(&settings.index.vectors, &settings.index.metadata)
        .context("Failed to load index; run `medrag build` first")?;
    let embedder = embed::from_model_name(&settings.embedding.model)
        .context("Failed to load embedding model")?;

    SearchEngine::new(embedder, kb).context("Index does not match the configured embedding model")
}

/// Build the assistant. The API key is checked before anything is loaded.
fn open_assistant(settings: &Settings) -> Result<Assistant<Box<dyn Embedder>, OpenAiGenerator>> {
    let api_key = settings.generator.api_key()?;
    let generator = OpenAiGenerator::new(&settings.generator, api_key)?;
    let engine = open_engine(settings)?;

    Ok(Assistant::new(Arc::new(engine), generator, settings.retrieval.top_k))
}

#[tokio::main]
async fn main() -> Result<()> {
    // logs go to stderr so command output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(&cli.config)
        .with_context(|| format!("Failed to load config {}", cli.config.display()))?;

    match cli.command {
        Commands::Build { corpus: path } => {
            let records = corpus::load_records(&path)?;
            println!("Loaded {} records from '{}'", records.len(), path.display());

            let embedder = embed::from_model_name(&settings.embedding.model)?;
            let engine = SearchEngine::build(embedder, &records, settings.embedding.batch_size)?;
            println!("Indexed {} records", engine.len());

            persist::save(
                engine.knowledge_base(),
                &settings.index.vectors,
                &settings.index.metadata,
            )?;
            println!(
                "Wrote {} and {}",
                settings.index.vectors.display(),
                settings.index.metadata.display()
            );
        }

        Commands::Search { query, k } => {
            let engine = open_engine(&settings)?;
            let k = k.unwrap_or(settings.retrieval.top_k);

            println!("Search results for '{query}' (k={k}):\n");
            for (i, result) in engine.search(&query, k)?.iter().enumerate() {
                println!("#{} {} (distance: {:.4})", i + 1, result.label, result.distance);
            }
        }

        Commands::Ask { query } => {
            let assistant = open_assistant(&settings)?;
            println!("{}", assistant.ask(&query).await);
        }

        Commands::Serve { bind } => {
            let assistant = Arc::new(open_assistant(&settings)?);
            info!(records = assistant.engine().len(), "index loaded");
            serve::serve(assistant, &bind).await?;
        }

        Commands::Eval { suite, k, threshold } => {
            let engine = open_engine(&settings)?;
            let suite = EvalSuite::load(&suite)
                .with_context(|| format!("Failed to load eval suite {}", suite.display()))?;

            let report = eval::evaluate(&engine, &suite, k, threshold)?;

            for score in &report.scores {
                println!("Query: {}\nRecall@{k}: {:.2}\n", score.query, score.recall);
            }
            println!("Average Recall@{k}: {:.2}", report.mean_recall());
            println!("Mean Reciprocal Rank (MRR): {:.2}", report.mrr());

            println!("\n=== Recall@{k} by category ===\n");
            for (category, recall) in report.category_recall() {
                println!("{recall:.2}  {category}");
            }

            println!("\n=== Recall@{k} distribution ===\n");
            for (i, count) in report.recall_histogram(HISTOGRAM_BINS).iter().enumerate() {
                let lo = i as f32 / HISTOGRAM_BINS as f32;
                let hi = (i + 1) as f32 / HISTOGRAM_BINS as f32;
                let close = if i + 1 == HISTOGRAM_BINS { ']' } else { ')' };
                println!("[{lo:.1}, {hi:.1}{close} {:>3} {}", count, "#".repeat(*count));
            }
        }
    }

    Ok(())
}
