use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use codeqa_core::config::{Config, ProviderKind, StoreBackend, resolve_config_path};
use codeqa_core::vault::{EnvVaultProvider, Secret};
use codeqa_core::{CliChannel, Session};
use codeqa_index::{Indexer, Pruner, QueryEngine};
use codeqa_llm::any::AnyProvider;
use codeqa_llm::azure::AzureOpenAiProvider;
use codeqa_llm::http::build_client;
use codeqa_llm::openai::OpenAiProvider;
use codeqa_store::{InMemoryVectorStore, QdrantVectorStore, SqliteVectorStore, VectorStore};

#[derive(Debug, Parser)]
#[command(
    name = "codeqa",
    version,
    about = "Ask questions about a source tree using retrieved code as context"
)]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
enum Command {
    /// Embed new chunks of the source tree into the store
    Index {
        /// Directory to index (overrides `index.root`)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Remove records of deleted files afterwards
        #[arg(long)]
        prune: bool,
    },
    /// Answer a single question and exit
    Ask {
        question: String,

        /// Number of chunks used as context
        #[arg(long)]
        top_k: Option<u64>,
    },
    /// Index, then answer questions read from stdin
    Chat {
        /// Start answering without indexing first
        #[arg(long)]
        skip_index: bool,
    },
    /// Remove records whose source file no longer exists
    Prune {
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Print the number of stored chunks
    Stats,
}

impl Default for Command {
    fn default() -> Self {
        Self::Chat { skip_index: false }
    }
}

/// Gateways and store built from the resolved config.
struct Runtime {
    store: Arc<dyn VectorStore>,
    embedder: Arc<AnyProvider>,
    chat: Arc<AnyProvider>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        eprintln!("failed to load .env: {e}");
    }
    init_subscriber();

    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config.as_deref());
    let mut config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    config.validate()?;
    config.resolve_secrets(&EnvVaultProvider).await?;

    let command = cli.command.unwrap_or_default();
    if let Command::Ask {
        top_k: Some(k), ..
    } = &command
    {
        if *k == 0 {
            bail!("--top-k must be greater than 0");
        }
        config.query.top_k = *k;
    }

    let runtime = build_runtime(&config).await?;
    run(command, &config, &runtime).await
}

async fn run(command: Command, config: &Config, runtime: &Runtime) -> anyhow::Result<()> {
    match command {
        Command::Index { root, prune } => {
            let root = root.unwrap_or_else(|| config.index.root.clone());
            index(config, runtime, &root, prune || config.index.prune).await
        }
        Command::Ask { question, .. } => {
            let answer = query_engine(config, runtime).ask(&question).await?;
            println!("{answer}");
            Ok(())
        }
        Command::Chat { skip_index } => {
            if !skip_index {
                index(config, runtime, &config.index.root, config.index.prune).await?;
            }
            let engine = query_engine(config, runtime);
            let mut session = Session::new(CliChannel::new(), &engine);
            let answered = session.run().await?;
            tracing::debug!(answered, "chat finished");
            Ok(())
        }
        Command::Prune { root } => {
            let root = root.unwrap_or_else(|| config.index.root.clone());
            prune(config, runtime, &root).await
        }
        Command::Stats => {
            let count = runtime.store.count(&config.store.collection).await?;
            println!("{}: {count} chunks", config.store.collection);
            Ok(())
        }
    }
}

async fn index(
    config: &Config,
    runtime: &Runtime,
    root: &Path,
    with_prune: bool,
) -> anyhow::Result<()> {
    let indexer = Indexer::new(
        Arc::clone(&runtime.store),
        Arc::clone(&runtime.embedder),
        config.indexer_config(),
    );
    let report = indexer
        .index_directory(root)
        .await
        .with_context(|| format!("indexing {} failed", root.display()))?;
    println!("Indexed: {report}");

    if with_prune {
        prune(config, runtime, root).await?;
    }
    Ok(())
}

async fn prune(config: &Config, runtime: &Runtime, root: &Path) -> anyhow::Result<()> {
    let pruner = Pruner::new(Arc::clone(&runtime.store), config.indexer_config());
    let report = pruner
        .prune(root)
        .await
        .with_context(|| format!("pruning {} failed", root.display()))?;
    println!(
        "Pruned {} of {} records ({} removed sources)",
        report.records_deleted,
        report.records_scanned,
        report.orphaned_sources.len()
    );
    Ok(())
}

fn query_engine(config: &Config, runtime: &Runtime) -> QueryEngine<AnyProvider, AnyProvider> {
    QueryEngine::new(
        Arc::clone(&runtime.store),
        Arc::clone(&runtime.embedder),
        Arc::clone(&runtime.chat),
        config.query_config(),
    )
}

async fn build_runtime(config: &Config) -> anyhow::Result<Runtime> {
    let client =
        build_client(config.timeouts.http_timeouts()).context("failed to build HTTP client")?;
    let embedder = create_embedding_provider(config, client.clone());
    let chat = create_chat_provider(config, client);
    let store = create_store(config).await?;
    Ok(Runtime {
        store,
        embedder: Arc::new(embedder),
        chat: Arc::new(chat),
    })
}

fn api_key(secret: Option<&Secret>, gateway: &str) -> String {
    if let Some(secret) = secret {
        secret.expose().to_owned()
    } else {
        tracing::warn!(gateway, "no API key configured");
        String::new()
    }
}

fn create_embedding_provider(config: &Config, client: reqwest::Client) -> AnyProvider {
    let cfg = &config.embedding;
    let key = api_key(config.secrets.embedding_api_key.as_ref(), "embedding");
    match cfg.provider {
        ProviderKind::OpenAi => {
            OpenAiProvider::new(client, key, cfg.base_url.clone(), cfg.model.clone()).into()
        }
        ProviderKind::Azure => AzureOpenAiProvider::new(
            client,
            key,
            cfg.base_url.clone(),
            cfg.model.clone(),
            cfg.api_version.clone(),
        )
        .into(),
    }
}

fn create_chat_provider(config: &Config, client: reqwest::Client) -> AnyProvider {
    let cfg = &config.chat;
    let key = api_key(config.secrets.chat_api_key.as_ref(), "chat");
    match cfg.provider {
        ProviderKind::OpenAi => {
            OpenAiProvider::new(client, key, cfg.base_url.clone(), cfg.model.clone())
                .with_max_tokens(cfg.max_tokens)
                .into()
        }
        ProviderKind::Azure => AzureOpenAiProvider::new(
            client,
            key,
            cfg.base_url.clone(),
            cfg.model.clone(),
            cfg.api_version.clone(),
        )
        .with_max_tokens(cfg.max_tokens)
        .into(),
    }
}

async fn create_store(config: &Config) -> anyhow::Result<Arc<dyn VectorStore>> {
    let store: Arc<dyn VectorStore> = match config.store.backend {
        StoreBackend::Sqlite => Arc::new(
            SqliteVectorStore::open(&config.store.path)
                .await
                .with_context(|| format!("failed to open store at {}", config.store.path))?,
        ),
        StoreBackend::Qdrant => Arc::new(
            QdrantVectorStore::new(&config.store.qdrant_url)
                .with_context(|| format!("failed to connect to {}", config.store.qdrant_url))?,
        ),
        StoreBackend::Memory => {
            tracing::warn!("in-memory store selected; records are lost on exit");
            Arc::new(InMemoryVectorStore::new())
        }
    };
    tracing::info!(
        backend = ?config.store.backend,
        collection = %config.store.collection,
        "vector store ready"
    );
    Ok(store)
}

fn init_subscriber() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
