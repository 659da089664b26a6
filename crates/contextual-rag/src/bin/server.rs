//! RAG Server binary
//!
//! Run with: cargo run -p contextual-rag --bin contextual-rag-server [config.toml]

use std::path::PathBuf;

use contextual_rag::{config::RagConfig, server::RagServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "contextual_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                   Contextual RAG System                   ║
║        PDF Q&A with Contextual Chunks and Citations       ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    // Load configuration
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = RagConfig::load(config_path.as_deref())?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Backend: {:?}", config.backend);
    tracing::info!("  - Embedding model: {}", config.embeddings.model);
    tracing::info!("  - Embedding dimensions: {}", config.embeddings.dimensions);
    tracing::info!("  - Chat model: {}", config.llm.chat_model);
    tracing::info!(
        "  - Chunk size/overlap: {}/{}",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );
    tracing::info!("  - Vector store: {}", config.vector_db.database_file().display());

    // Create and start server
    let server = RagServer::new(config).await?;

    let health = server.state().pipeline().health().await;
    if !health.all_healthy() {
        tracing::warn!("Some backends are not reachable: {:?}", health);
    }

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/index     - Upload PDFs and rebuild the index");
    println!("  POST /api/query     - Ask questions");
    println!("  GET  /api/documents - List indexed documents");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}

