//! `docsearch`: embed a CSV corpus and search it by cosine similarity.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use docsearch_embeddings::{EmbeddingProvider, HttpEmbeddingProvider};
use docsearch_retrieval::table::{read_corpus, read_embedded, write_embedded, write_ranked};
use docsearch_retrieval::{
    AppConfig, FailurePolicy, IngestConfig, Ingestor, RankedRow, Retriever, SkipReason,
    TokenEstimator, TokenizerKind, best_match,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Embed a document corpus and search it by cosine similarity.
#[derive(Parser, Debug)]
#[command(name = "docsearch", version, about)]
struct Cli {
    /// Configuration file (TOML). Defaults to the user config directory.
    #[arg(short, long, global = true, env = "DOCSEARCH_CONFIG")]
    config: Option<PathBuf>,

    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Normalize and embed every row of a corpus CSV with a `text` column.
    Embed {
        /// Corpus CSV file.
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the embedded CSV.
        #[arg(short, long)]
        output: PathBuf,

        /// Embedding requests in flight at once.
        #[arg(long)]
        concurrency: Option<usize>,

        /// Skip rows whose embedding fails instead of aborting.
        #[arg(long)]
        skip_failures: bool,

        /// Drop rows with at least this many tokens.
        #[arg(long)]
        max_tokens: Option<usize>,

        /// Token estimator for the ceiling check.
        #[arg(long, value_enum)]
        tokenizer: Option<TokenizerArg>,
    },

    /// Rank the rows of an embedded CSV against a query.
    ///
    /// The ingestion token ceiling is not applied to the query.
    Search {
        /// Free-text query.
        query: String,

        /// Embedded CSV produced by `embed`.
        #[arg(short, long)]
        embedded: PathBuf,

        /// Number of results.
        #[arg(short = 'n', long)]
        top_n: Option<usize>,

        /// Also write the ranked rows to this CSV file.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only print the best match.
        #[arg(short, long)]
        quiet: bool,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum TokenizerArg {
    Tiktoken,
    Chars,
}

impl From<TokenizerArg> for TokenizerKind {
    fn from(arg: TokenizerArg) -> Self {
        match arg {
            TokenizerArg::Tiktoken => TokenizerKind::Tiktoken,
            TokenizerArg::Chars => TokenizerKind::Chars,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Commands::Embed {
            input,
            output,
            concurrency,
            skip_failures,
            max_tokens,
            tokenizer,
        } => {
            let ingest = apply_embed_overrides(
                config.ingest.clone(),
                concurrency,
                skip_failures,
                max_tokens,
                tokenizer,
            );
            run_embed(&config, ingest, &input, &output).await
        }
        Commands::Search {
            query,
            embedded,
            top_n,
            output,
            quiet,
        } => {
            let top_n = top_n.unwrap_or(config.search.top_n);
            run_search(&config, &query, &embedded, top_n, output.as_deref(), quiet).await
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn apply_embed_overrides(
    mut ingest: IngestConfig,
    concurrency: Option<usize>,
    skip_failures: bool,
    max_tokens: Option<usize>,
    tokenizer: Option<TokenizerArg>,
) -> IngestConfig {
    if let Some(concurrency) = concurrency {
        ingest.concurrency = concurrency;
    }
    if skip_failures {
        ingest.failure_policy = FailurePolicy::Skip;
    }
    if let Some(max_tokens) = max_tokens {
        ingest.max_tokens = max_tokens;
    }
    if let Some(tokenizer) = tokenizer {
        ingest.tokenizer = tokenizer.into();
    }
    ingest
}

fn build_provider(config: &AppConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider = HttpEmbeddingProvider::new(config.service.clone())
        .context("failed to configure the embedding service")?;
    info!(
        "Using {} embeddings ({})",
        provider.name(),
        provider.model()
    );
    Ok(Arc::new(provider))
}

/// Ingestion shares the service's per-call timeout with the HTTP client.
fn build_ingestor(
    config: &AppConfig,
    ingest: IngestConfig,
    provider: Arc<dyn EmbeddingProvider>,
    estimator: Arc<dyn TokenEstimator>,
) -> Ingestor {
    Ingestor::new(provider, estimator)
        .with_config(ingest)
        .with_timeout(config.service.timeout())
}

async fn run_embed(
    config: &AppConfig,
    ingest: IngestConfig,
    input: &std::path::Path,
    output: &std::path::Path,
) -> Result<()> {
    let texts = read_corpus(input, &config.table)
        .with_context(|| format!("failed to read corpus {}", input.display()))?;

    let estimator = ingest
        .tokenizer
        .build()
        .context("failed to load tokenizer")?;
    let ingestor = build_ingestor(config, ingest, build_provider(config)?, Arc::from(estimator));

    let report = ingestor.ingest(&texts).await.context("ingestion failed")?;

    write_embedded(output, &report.store, &config.table)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!(
        "Embedded {} of {} rows into {} ({}ms)",
        report.stats.rows_embedded,
        report.stats.rows_read,
        output.display(),
        report.stats.elapsed_ms
    );
    for skipped in &report.skipped {
        match &skipped.reason {
            SkipReason::TokenLimitExceeded { tokens, limit } => {
                println!("  skipped row {}: {tokens} tokens (limit {limit})", skipped.index);
            }
            SkipReason::EmbeddingFailed { message } => {
                println!("  skipped row {}: {message}", skipped.index);
            }
        }
    }

    Ok(())
}

async fn run_search(
    config: &AppConfig,
    query: &str,
    embedded: &std::path::Path,
    top_n: usize,
    output: Option<&std::path::Path>,
    quiet: bool,
) -> Result<()> {
    let store = read_embedded(embedded, &config.table)
        .with_context(|| format!("failed to load {}", embedded.display()))?;

    let retriever = Retriever::new(build_provider(config)?).with_timeout(config.service.timeout());
    let results = retriever
        .search(&store, query, top_n)
        .await
        .context("search failed")?;

    if !quiet {
        for (rank, result) in results.iter().enumerate() {
            println!("{}", format_result(rank + 1, result));
        }
    }

    if let Some(output) = output {
        write_ranked(output, &results, &config.table)
            .with_context(|| format!("failed to write {}", output.display()))?;
    }

    let best = best_match(&results).context("no rows to search")?;
    println!("Best match:\n{}", format_result(1, best));

    Ok(())
}

fn format_result(rank: usize, result: &RankedRow<'_>) -> String {
    format!(
        "{rank:>3}. [{:.4}] (row {}) {}",
        result.similarity, result.position, result.row.text
    )
}
