use anyhow::{bail, Context};
use askpdf_core::{
    discover_pdf_files, BatchOptions, ChatModel, ChunkingConfig, DocumentAssistant, Embedder,
    GeminiChat, GeminiEmbedder, HashingEmbedder, QueryError, SessionContext, Settings,
    DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_MODEL, DEFAULT_TOP_K,
};
use chrono::Utc;
use clap::{Parser, Subcommand};
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "askpdf", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Gemini API key. Required unless --offline is set.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Embedding model identifier
    #[arg(long, env = "ASKPDF_EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,

    /// Chat model identifier
    #[arg(long, env = "ASKPDF_CHAT_MODEL", default_value = DEFAULT_CHAT_MODEL)]
    chat_model: String,

    /// Sampling temperature for answer generation
    #[arg(long, env = "ASKPDF_TEMPERATURE", default_value = "0.3")]
    temperature: f32,

    /// Maximum characters per chunk
    #[arg(long, env = "ASKPDF_CHUNK_SIZE", default_value = "1000")]
    chunk_size: usize,

    /// Character overlap between consecutive chunks
    #[arg(long, env = "ASKPDF_CHUNK_OVERLAP", default_value = "200")]
    chunk_overlap: usize,

    /// Where the serialized vector index lives
    #[arg(long, env = "ASKPDF_INDEX_PATH", default_value = "vector_index")]
    index_path: PathBuf,

    /// Use the deterministic local embedder and retrieval-only answers;
    /// no network, no API key needed.
    #[arg(long, default_value_t = false)]
    offline: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Extract, chunk, embed, and index every PDF under a folder.
    Ingest {
        /// Folder searched recursively for PDFs.
        #[arg(long)]
        folder: PathBuf,
    },
    /// Ask a single question against the built index.
    Ask {
        #[arg(long)]
        question: String,
        /// Number of chunks retrieved as context.
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
        /// Print the source chunks the answer was grounded on.
        #[arg(long, default_value_t = false)]
        show_sources: bool,
    },
    /// Interactive question loop over stdin.
    Chat {
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },
}

/// Retrieval-only stand-in for the hosted chat model in --offline runs.
struct OfflineChat;

#[async_trait::async_trait]
impl ChatModel for OfflineChat {
    async fn complete(&self, _prompt: &str) -> Result<String, QueryError> {
        Ok("[offline] retrieval-only mode; see the cited sources below.".to_string())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    let chunking = ChunkingConfig {
        chunk_size: cli.chunk_size,
        chunk_overlap: cli.chunk_overlap,
    };
    chunking
        .validate()
        .map_err(|error| anyhow::anyhow!(error.to_string()))?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        offline = cli.offline,
        "askpdf boot"
    );

    if cli.offline {
        let assistant = DocumentAssistant::new(
            HashingEmbedder::default(),
            OfflineChat,
            chunking,
            BatchOptions::default(),
            cli.index_path.clone(),
        );
        return run(assistant, cli.command).await;
    }

    let Some(api_key) = cli.api_key.as_deref().map(str::trim).filter(|key| !key.is_empty())
    else {
        bail!("GEMINI_API_KEY is not set; export it, add it to .env, or pass --api-key");
    };

    let mut settings = Settings::with_api_key(api_key);
    settings.embedding_model = cli.embedding_model.clone();
    settings.chat_model = cli.chat_model.clone();
    settings.temperature = cli.temperature;
    settings.chunking = chunking;
    settings.index_path = cli.index_path.clone();

    let client = Arc::new(Client::new());
    let assistant = DocumentAssistant::new(
        GeminiEmbedder::new(client.clone(), &settings.api_key, &settings.embedding_model),
        GeminiChat::new(
            client,
            &settings.api_key,
            &settings.chat_model,
            settings.temperature,
            settings.batch.retry,
        ),
        settings.chunking,
        settings.batch,
        settings.index_path,
    );
    run(assistant, cli.command).await
}

async fn run<E, C>(assistant: DocumentAssistant<E, C>, command: Command) -> anyhow::Result<()>
where
    E: Embedder,
    C: ChatModel,
{
    match command {
        Command::Ingest { folder } => {
            let files = discover_pdf_files(&folder);
            if files.is_empty() {
                bail!("no pdf files found under {}", folder.display());
            }
            info!(folder = %folder.display(), files = files.len(), "ingesting");

            let summary = assistant
                .ingest(&files)
                .await
                .with_context(|| format!("ingestion failed for {}", folder.display()))?;

            for skipped in &summary.skipped {
                warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped pdf");
            }
            println!(
                "{} chunks from {} document(s) indexed at {} ({} skipped)",
                summary.chunks,
                summary.documents,
                assistant.index_path().display(),
                summary.skipped.len()
            );
        }
        Command::Ask {
            question,
            top_k,
            show_sources,
        } => {
            let mut session = SessionContext::new();
            let answer = assistant.ask(&mut session, &question, top_k).await?;

            println!("{}", answer.text);
            if show_sources {
                print_sources(&answer.sources);
            }
        }
        Command::Chat { top_k } => {
            let mut session = SessionContext::new();
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            let mut stdout = tokio::io::stdout();

            stdout.write_all(b"> ").await?;
            stdout.flush().await?;

            while let Some(line) = lines.next_line().await? {
                let question = line.trim();
                if question.is_empty() || question.eq_ignore_ascii_case("exit") {
                    break;
                }

                // Errors are displayed; the session and loop survive them.
                match assistant.ask(&mut session, question, top_k).await {
                    Ok(answer) => {
                        println!("{}", answer.text);
                        print_sources(&answer.sources);
                    }
                    Err(error) => println!("error: {error}"),
                }

                stdout.write_all(b"> ").await?;
                stdout.flush().await?;
            }
        }
    }

    Ok(())
}

fn print_sources(sources: &[askpdf_core::SourceRef]) {
    for source in sources {
        match source.page {
            Some(page) => println!("  [{} p.{}] \"...{}...\"", source.document, page, source.excerpt),
            None => println!("  [{}] \"...{}...\"", source.document, source.excerpt),
        }
    }
}
