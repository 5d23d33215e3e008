//! Prospect main entry point
//!
//! This is the command-line interface for the Prospect discovery crawler.

use clap::{Parser, Subcommand};
use prospect::ai::OpenAiClient;
use prospect::config::{load_config_with_hash, optional_env, Config};
use prospect::crawler::crawl;
use prospect::enrich::enrich;
use prospect::output::{load_statistics, print_statistics};
use prospect::search::{search_with_params, sync_indexes, MeiliClient, SearchIndex};
use prospect::storage::open_storage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Prospect: a polite business-site discovery crawler
///
/// Prospect crawls outward from seed URLs, registers the external domains it
/// finds as properties, enriches them with AI-extracted metadata and keeps a
/// hybrid keyword/vector search index in sync.
#[derive(Parser, Debug)]
#[command(name = "prospect")]
#[command(version)]
#[command(about = "A polite business-site discovery crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process the crawl queue breadth-first from the configured seeds
    Crawl,

    /// Extract metadata for discovered properties
    Enrich,

    /// Set up the search indexes and add new properties and nodes
    Sync,

    /// Query the search index and print the results as JSON
    Search {
        /// Search terms
        query: String,

        /// Index to search: nodes or properties
        #[arg(long = "type", default_value = "nodes")]
        search_type: String,

        #[arg(long)]
        limit: Option<String>,

        #[arg(long)]
        offset: Option<String>,

        /// Blend keyword and vector similarity
        #[arg(long)]
        vector: bool,

        #[arg(long)]
        industry: Option<String>,

        #[arg(long)]
        city: Option<String>,

        #[arg(long)]
        state: Option<String>,

        #[arg(long)]
        country: Option<String>,
    },

    /// Show statistics from the database and the search index
    Stats,

    /// Validate config and show what would run
    Check,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    match cli.command {
        Command::Crawl => handle_crawl(&config).await,
        Command::Enrich => handle_enrich(&config).await,
        Command::Sync => handle_sync(&config).await,
        Command::Search {
            query,
            search_type,
            limit,
            offset,
            vector,
            industry,
            city,
            state,
            country,
        } => {
            let mut params = HashMap::new();
            params.insert("q".to_string(), query);
            params.insert("type".to_string(), search_type);
            if vector {
                params.insert("vector".to_string(), "true".to_string());
            }
            for (name, value) in [
                ("limit", limit),
                ("offset", offset),
                ("industry", industry),
                ("city", city),
                ("state", state),
                ("country", country),
            ] {
                if let Some(value) = value {
                    params.insert(name.to_string(), value);
                }
            }
            handle_search(&config, &params).await
        }
        Command::Stats => handle_stats(&config).await,
        Command::Check => handle_check(&config),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("prospect=info,warn"),
            1 => EnvFilter::new("prospect=debug,info"),
            2 => EnvFilter::new("prospect=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the crawl command: runs the frontier until the queue is drained
async fn handle_crawl(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Seeds: {}, Blacklist: {}, Max depth: {}",
        config.seeds.len(),
        config.blacklist.len(),
        config.crawler.max_depth
    );

    let storage = open_storage(Path::new(&config.storage.database_path))?;

    match crawl(config, storage).await {
        Ok((report, storage)) => {
            drop(storage);
            tracing::info!(
                "Crawl completed: {} completed, {} failed, {} blacklisted",
                report.completed,
                report.failed,
                report.blacklisted
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

/// Handles the enrich command
async fn handle_enrich(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let extractor = OpenAiClient::from_config(&config.openai)?;
    let storage = open_storage(Path::new(&config.storage.database_path))?;

    match enrich(config, storage, extractor).await {
        Ok((report, storage)) => {
            drop(storage);
            tracing::info!(
                "Enrichment completed: {} enriched, {} dropped",
                report.enriched,
                report.dropped
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Enrichment failed: {}", e);
            Err(e.into())
        }
    }
}

/// Handles the sync command; fails if either entity type did not fully sync
async fn handle_sync(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let embedder = OpenAiClient::from_config(&config.openai)?;
    let storage = open_storage(Path::new(&config.storage.database_path))?;

    let result = sync_indexes(config, &storage, embedder).await;
    drop(storage);

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Sync failed: {}", e);
            return Err(e.into());
        }
    };

    for outcome in [&report.properties, &report.nodes] {
        if let Ok(entity) = outcome {
            tracing::info!(
                "{}: {} new documents in {} batches ({} already indexed)",
                entity.entity,
                entity.synced,
                entity.batches,
                entity.existing
            );
        }
    }

    if report.is_complete() {
        tracing::info!("Sync completed");
        Ok(())
    } else {
        Err("sync finished with errors".into())
    }
}

/// Handles the search command: prints the response as JSON
async fn handle_search(
    config: &Config,
    params: &HashMap<String, String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let index = MeiliClient::from_config(&config.search);
    // Keyword searches never call the embedder, so a missing key only
    // matters in vector mode
    let embedder = OpenAiClient::new(optional_env(&config.openai.api_key_env).unwrap_or_default())
        .with_base_url(&config.openai.base_url)
        .with_models(&config.openai.chat_model, &config.openai.embedding_model)
        .with_dimensions(config.openai.dimensions);

    let response = search_with_params(&index, &embedder, &config.search, params).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}

/// Handles the stats command: shows statistics from the database and index
async fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", config.storage.database_path);

    let storage = open_storage(Path::new(&config.storage.database_path))?;
    let mut stats = load_statistics(&storage)?;
    drop(storage);

    let index = MeiliClient::from_config(&config.search);
    for (uid, slot) in [
        (&config.search.properties_index, &mut stats.property_documents),
        (&config.search.nodes_index, &mut stats.node_documents),
    ] {
        match index.document_count(uid).await {
            Ok(count) => *slot = Some(count),
            Err(e) => tracing::warn!("Could not read index {}: {}", uid, e),
        }
    }

    print_statistics(&stats);

    Ok(())
}

/// Handles the check command: validates config and shows what would run
fn handle_check(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Prospect Configuration Check ===\n");

    println!("Crawler Configuration:");
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Crawl delay: {}ms", config.crawler.crawl_delay_ms);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!(
        "  Redirects: {}",
        if config.crawler.follow_redirects {
            format!("follow (max {})", config.crawler.max_redirects)
        } else {
            "not followed".to_string()
        }
    );

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    println!("\nSeeds ({}):", config.seeds.len());
    for seed in &config.seeds {
        println!("  - {}", seed);
    }

    println!("\nBlacklist ({}):", config.blacklist.len());
    for entry in &config.blacklist {
        println!("  - {}", entry);
    }

    println!("\nSeed Domains ({}):", config.seed_domains.len());
    for domain in &config.seed_domains {
        println!("  - {}", domain);
    }

    println!("\nEnrichment:");
    println!("  Body text limit: {} chars", config.enrichment.body_text_limit);
    println!("  Chat model: {}", config.openai.chat_model);
    println!(
        "  Embedding model: {} ({} dimensions)",
        config.openai.embedding_model, config.openai.dimensions
    );

    println!("\nSearch:");
    println!("  Host: {}", config.search.host);
    println!(
        "  Indexes: {}, {}",
        config.search.properties_index, config.search.nodes_index
    );
    println!(
        "  Batch size: {}, concurrency: {}",
        config.search.batch_size, config.search.embedding_concurrency
    );

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling with {} seed URLs", config.seeds.len());

    Ok(())
}
