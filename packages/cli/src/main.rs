//! Operator CLI for the adaptive job crawler.
//!
//! Learn patterns, inspect them, and run one-off crawls from a terminal.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;

use job_crawler::{
    AggregateResponse, Aggregator, ChromeRenderer, CrawlParams, CrawlerConfig, PatternStore,
    PatternSummary, SiteCrawler, SqlitePatternStore,
};

#[derive(Parser)]
#[command(name = "crawler")]
#[command(about = "Adaptive job-listing crawler")]
#[command(version)]
struct Cli {
    /// SQLite URL holding learned patterns
    #[arg(long, default_value = "sqlite:patterns.db?mode=rwc")]
    database: String,

    /// Browser pool size (also the site-crawl concurrency ceiling)
    #[arg(long, default_value_t = 4)]
    browsers: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Learn an extraction pattern from a listing URL and store it
    Learn {
        /// Listing page to probe
        url: String,

        /// Display name for the site
        #[arg(long)]
        name: Option<String>,
    },

    /// Crawl one site through its stored (or freshly learned) pattern
    Crawl {
        /// Site domain, e.g. jobs.example.com
        domain: String,

        #[arg(long)]
        keyword: Option<String>,

        #[arg(long)]
        limit: Option<usize>,

        /// Listing URL to learn from if the domain has no pattern yet
        #[arg(long)]
        seed: Option<String>,
    },

    /// Crawl several sites concurrently and aggregate the results
    CrawlAll {
        /// Site domains
        sites: Vec<String>,

        #[arg(long)]
        keyword: Option<String>,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// List stored pattern summaries
    Patterns,

    /// Delete a stored pattern (it will be relearned on next crawl)
    Forget { domain: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let store = Arc::new(
        SqlitePatternStore::new(&cli.database)
            .await
            .context("opening pattern store")?,
    );
    let renderer = Arc::new(ChromeRenderer::new(cli.browsers));
    let config = CrawlerConfig::default().with_max_concurrent_sites(cli.browsers);
    let crawler = Arc::new(SiteCrawler::new(store, renderer, config));

    match cli.command {
        Commands::Learn { url, name } => {
            let pattern = crawler
                .learn_site(&url, name.as_deref())
                .await
                .context("learning pattern")?;
            print_json(&PatternSummary::from(&pattern))?;
        }

        Commands::Crawl {
            domain,
            keyword,
            limit,
            seed,
        } => {
            let mut params = CrawlParams::new();
            params.keyword = keyword;
            params.limit = limit;
            params.seed_url = seed;

            let jobs = crawler
                .crawl(&domain, &params)
                .await
                .with_context(|| format!("crawling {domain}"))?;
            eprintln!("{} jobs from {domain}", jobs.len());
            print_json(&jobs)?;
        }

        Commands::CrawlAll {
            sites,
            keyword,
            limit,
        } => {
            let mut params = CrawlParams::new();
            params.keyword = keyword;
            params.limit = limit;

            let aggregator = Aggregator::new(Arc::clone(&crawler));
            let outcome = aggregator.crawl_all(&sites, &params).await;
            print_json(&AggregateResponse::from_outcome(outcome))?;
        }

        Commands::Patterns => {
            let patterns = crawler.patterns().await.context("listing patterns")?;
            print_json(&patterns)?;
        }

        Commands::Forget { domain } => {
            crawler
                .store()
                .delete(&domain)
                .await
                .with_context(|| format!("deleting pattern for {domain}"))?;
            eprintln!("forgot {domain}");
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
