use anyhow::{Context, Result};
use clap::Parser;
use grounded_rag::config::RagConfig;
use grounded_rag::ingest;
use grounded_rag::llm::{OpenAiClient, OpenAiConfig};
use grounded_rag::store::SqliteStore;
use grounded_rag::{Mode, Retriever};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "grounded-rag",
    version,
    about = "Answer questions grounded in the closest stored document"
)]
struct Cli {
    /// Rebuild the database from the markdown files in the documents directory
    #[arg(long)]
    populate_db: bool,

    /// Your question
    #[arg(short, long, default_value = "")]
    prompt: String,

    /// Send the prompt without retrieved context
    #[arg(long)]
    raw: bool,

    /// Documents directory (overrides RAG_DOCS_DIR)
    #[arg(long)]
    docs_dir: Option<PathBuf>,

    /// Database path (overrides RAG_DB_PATH)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; the environment may already be set.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "grounded_rag=debug"
    } else {
        "grounded_rag=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let mut config = RagConfig::from_env();
    if let Some(dir) = cli.docs_dir {
        config.docs_dir = dir;
    }
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    let store = Arc::new(
        SqliteStore::open(&config.db_path)
            .with_context(|| format!("failed to open {}", config.db_path.display()))?,
    );
    let client = Arc::new(OpenAiClient::new(OpenAiConfig::from(&config))?);

    if cli.populate_db {
        info!(dir = %config.docs_dir.display(), "Populating database");
        let documents = ingest::load_documents(&config.docs_dir)?;
        ingest::populate(store.as_ref(), client.as_ref(), documents, config.max_tokens)
            .await
            .context("failed to populate database")?;
    }

    let prompt = cli.prompt.trim();
    if prompt.is_empty() {
        println!("you have no question? ok bye");
        return Ok(());
    }

    let mode = if cli.raw { Mode::Raw } else { Mode::Grounded };
    let retriever = Retriever::new(store, client.clone(), client)
        .with_timeout(Duration::from_secs(config.timeout_secs));
    let answer = retriever
        .answer(prompt, mode)
        .await
        .context("failed to answer prompt")?;

    println!("the AI says...");
    println!("{answer}");
    Ok(())
}
