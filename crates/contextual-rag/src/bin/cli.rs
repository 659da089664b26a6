//! Command-line client: index PDFs and ask questions without the HTTP server
//!
//! Run with: cargo run -p contextual-rag --features cli --bin contextual-rag -- --help

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use contextual_rag::{
    config::RagConfig, AnswerMode, GeneratedAnswer, QueryRequest, RagPipeline,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "contextual-rag",
    version,
    about = "Index PDFs with contextual chunk descriptions and answer questions from them"
)]
struct Cli {
    /// TOML configuration file (defaults to $CONTEXTUAL_RAG_CONFIG, then built-in defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rebuild the index from the given PDF files
    Index {
        /// PDF files to index
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Ask a question against the current index
    Ask {
        /// The question
        question: String,

        /// Answer shape: answer-only, sources, or citations
        #[arg(long)]
        mode: Option<AnswerMode>,

        /// Number of chunks to retrieve
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// List indexed documents
    Documents,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "contextual_rag=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = RagConfig::load(cli.config.as_deref())?;
    let pipeline = RagPipeline::from_config(config).await?;

    match cli.command {
        Command::Index { paths } => {
            if let Some(missing) = paths.iter().find(|p| !p.exists()) {
                bail!("file not found: {}", missing.display());
            }

            let report = pipeline.index_paths(&paths).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "Indexed {} chunks from {} documents in {}ms",
                    report.chunks_indexed,
                    report.documents.len(),
                    report.processing_time_ms
                );
                if report.chunks_skipped > 0 {
                    println!("Skipped {} chunks that could not be annotated", report.chunks_skipped);
                }
                for doc in &report.documents {
                    println!("  {} ({} pages, {} chunks)", doc.filename, doc.total_pages, doc.total_chunks);
                }
            }
        }
        Command::Ask {
            question,
            mode,
            top_k,
        } => {
            let mut request = QueryRequest::new(question);
            request.mode = mode;
            request.top_k = top_k;

            let response = pipeline.query(&request).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&response)?);
                return Ok(());
            }

            println!("{}\n", response.answer());
            match &response.result {
                GeneratedAnswer::AnswerOnly { .. } => {}
                GeneratedAnswer::AnswerWithSources { sources, .. } => {
                    println!("Sources:");
                    for (i, source) in sources.iter().enumerate() {
                        println!(
                            "  [{}] {}, Page {} (score {:.3})",
                            i + 1,
                            source.title,
                            source.page,
                            source.score
                        );
                    }
                }
                GeneratedAnswer::AnswerWithCitations { citations, .. } => {
                    println!("Citations:");
                    for citation in citations {
                        let marker = if citation.quote_verified { "" } else { " (unverified)" };
                        println!("  {}{}", citation.format_inline(), marker);
                        println!("    \"{}\"", citation.quote);
                    }
                }
            }
        }
        Command::Documents => {
            let documents = pipeline.documents();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&documents)?);
            } else if documents.is_empty() {
                println!("No documents indexed");
            } else {
                for doc in documents {
                    println!("{}  {} ({} pages, {} chunks)", doc.id, doc.filename, doc.total_pages, doc.total_chunks);
                }
            }
        }
    }

    Ok(())
}
