use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use log::info;
use policy_rag::api::{self, AppState};
use policy_rag::commands;
use policy_rag::config::{parse_count_arg, AppConfig};
use policy_rag::database::Database;
use policy_rag::document::{DocumentIngestor, FileTextExtractor};
use policy_rag::llm::{
    BruteForceIndex, EmbeddingCodec, ElementWidth, PromptBuilder, PromptTemplates, QueryProcessor,
    VectorCodec,
};
use policy_rag::providers::{build_providers, ProviderKind};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Parser, Debug)]
#[command(author, version, about = "Answer questions over ingested policy documents", long_about = None)]
struct Args {
    /// Remote provider: openai or gemini
    #[arg(long, global = true, env = "RAG_PROVIDER")]
    provider: Option<String>,

    /// SQLite database path
    #[arg(long, global = true, env = "RAG_DATABASE_PATH")]
    database: Option<PathBuf>,

    /// JSON file mapping language codes to prompt templates
    #[arg(long, global = true, env = "RAG_PROMPT_TEMPLATES")]
    templates: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        #[arg(long, env = "RAG_API_PORT")]
        port: Option<u16>,
    },
    /// Extract, chunk and embed one or more files
    Ingest {
        #[arg(required = true)]
        paths: Vec<String>,
        #[arg(long, env = "RAG_CHUNK_SIZE", value_parser = parse_count_arg)]
        chunk_size: Option<usize>,
    },
    /// Ask a question against the ingested documents
    Query {
        query: String,
        #[arg(long, default_value = "en")]
        language: String,
        #[arg(long, env = "RAG_TOP_K", value_parser = parse_count_arg)]
        top_k: Option<usize>,
        /// Print the raw result JSON
        #[arg(long)]
        json: bool,
    },
    /// List ingested documents
    Documents,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = AppConfig::from_env()?;
    if let Some(provider) = args.provider {
        config.provider = provider;
    }
    if let Some(database) = args.database {
        config.database_path = database;
    }
    if let Some(templates) = args.templates {
        config.prompt_templates = Some(templates);
    }

    match args.command {
        Command::Serve { port } => {
            if let Some(port) = port {
                config.api_port = port;
            }
            run_api_server(config).await
        }
        Command::Ingest { paths, chunk_size } => {
            if let Some(chunk_size) = chunk_size {
                config.chunk_size = chunk_size;
            }
            let state = build_state(&config).await?;
            commands::handle_ingest(&state.ingestor, &paths).await
        }
        Command::Query { query, language, top_k, json } => {
            if let Some(top_k) = top_k {
                config.top_k = top_k;
            }
            let state = build_state(&config).await?;
            commands::handle_query(&state.processor, &query, &language, json).await
        }
        Command::Documents => {
            let db = open_database(&config).await?;
            commands::handle_documents(&db).await
        }
    }
}

async fn open_database(config: &AppConfig) -> Result<Database> {
    Database::new(&config.database_path, VectorCodec::new(config.vector_width))
        .await
        .with_context(|| format!("failed to open database {}", config.database_path.display()))
}

async fn build_state(config: &AppConfig) -> Result<AppState> {
    let kind: ProviderKind = config.provider.parse()?;
    let providers = build_providers(kind)?;

    let templates = match &config.prompt_templates {
        Some(path) => PromptTemplates::from_file(path)
            .with_context(|| format!("failed to load prompt templates from {}", path.display()))?,
        None => PromptTemplates::default(),
    };
    let mut languages: Vec<&str> = templates.languages().collect();
    languages.sort_unstable();
    info!("Prompt templates loaded for languages: {}", languages.join(", "));

    let codec = VectorCodec::new(config.vector_width);
    if config.vector_width == ElementWidth::F64 {
        info!("Storing vectors with 8-byte elements");
    }

    let db = Arc::new(open_database(config).await?);
    let embedder = EmbeddingCodec::new(providers.embedder, codec);

    let processor = QueryProcessor::new(
        embedder.clone(),
        providers.model,
        db.clone(),
        Arc::new(BruteForceIndex),
        PromptBuilder::new(templates),
    )
    .with_top_k(config.top_k);

    let ingestor = DocumentIngestor::new(
        Arc::new(FileTextExtractor::new()),
        embedder,
        db.clone(),
        config.chunk_size,
    );

    Ok(AppState {
        processor: Arc::new(processor),
        ingestor: Arc::new(ingestor),
        db,
    })
}

async fn run_api_server(config: AppConfig) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.api_port));
    let state = build_state(&config).await?;
    let app = api::create_api(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .context("server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_top_k_rejected() {
        assert!(Args::try_parse_from(["policy-rag", "query", "Is it covered?", "--top-k", "0"]).is_err());
        assert!(Args::try_parse_from(["policy-rag", "ingest", "a.pdf", "--chunk-size", "0"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "policy-rag", "query", "Is it covered?", "--top-k", "3", "--provider", "openai",
        ])
        .unwrap();
        assert_eq!(args.provider.as_deref(), Some("openai"));
        assert!(matches!(args.command, Command::Query { top_k: Some(3), .. }));
    }
}
