//! Newsdesk CLI
//! Searches every configured news source with one filter and prints the
//! merged, newest-first page.

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use newsdesk::session::FeedState;
use newsdesk::{Aggregator, Config, Filter, Page, QueryResult, Session, SourceKind};

/// Newsdesk - one search across many news sources
#[derive(Parser, Debug)]
#[command(name = "newsdesk")]
#[command(author = "Newsdesk Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Multi-source news search with a canonical article model")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, default_value = "false", global = true)]
    json_logs: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search the selected sources and print one merged page
    Search {
        /// Free-text search query
        #[arg(short, long, default_value = "")]
        query: String,

        /// Restrict to an author
        #[arg(short, long)]
        author: Option<String>,

        /// Earliest publication date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Latest publication date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Category; repeat for several, "all" for no restriction
        #[arg(short, long)]
        category: Vec<String>,

        /// Source to query (general, archive, magazine); repeat for several, default all
        #[arg(short, long)]
        source: Vec<SourceKind>,

        /// 1-based page number
        #[arg(short, long, default_value = "1")]
        page: u32,

        /// Output format (json, table, summary)
        #[arg(short, long, default_value = "summary")]
        output: String,
    },

    /// Show configured sources
    Status,
}

/// Generates a new correlation ID for the session
fn generate_correlation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Sets up structured logging with tracing
fn setup_logging(log_level: &str, json_output: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if json_output {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli.log_level, cli.json_logs);

    let correlation_id = generate_correlation_id();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        correlation_id = %correlation_id,
        "Starting newsdesk"
    );

    let config = Config::load()?;
    config.validate()?;

    info!(
        max_concurrent = config.max_concurrent_requests,
        request_timeout_secs = config.request_timeout_secs,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Search {
            query,
            author,
            from,
            to,
            category,
            source,
            page,
            output,
        } => {
            let page = Page::new(page).ok_or_else(|| anyhow::anyhow!("page must be at least 1"))?;
            let sources = if source.is_empty() { SourceKind::ALL.to_vec() } else { source };

            let mut filter = Filter::new().query(query).page(page);
            if let Some(author) = author {
                filter = filter.author(author);
            }
            if let Some(from) = from {
                filter = filter.from_date(from);
            }
            if let Some(to) = to {
                filter = filter.to_date(to);
            }
            filter = category.into_iter().fold(filter, |f, c| f.category(c));
            filter = sources.into_iter().fold(filter, |f, s| f.source(s));

            search(&config, &filter, &output).await?;
        }

        Commands::Status => {
            show_status(&config);
        }
    }

    Ok(())
}

/// Runs one search through a session and prints the committed page
async fn search(config: &Config, filter: &Filter, output_format: &str) -> Result<()> {
    let aggregator = Aggregator::from_config(config)?;
    let session = Session::new();

    info!(
        query = %filter.search_query,
        sources = ?filter.sources,
        page = %filter.page,
        "Starting search"
    );

    session.refresh(&aggregator, filter).await;

    let (result, page_count) = match session.state() {
        FeedState::Success { result, page_count, .. } => (result, page_count),
        FeedState::Failed { message, .. } => anyhow::bail!("search failed: {}", message),
        other => anyhow::bail!("search did not complete: {:?}", other),
    };

    print_result(&result, page_count, filter.page, output_format)
}

fn print_result(result: &QueryResult, page_count: u64, page: Page, output_format: &str) -> Result<()> {
    match output_format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(result)?);
        }
        "table" => {
            println!("\n{:<25} {:<10} {:<60}", "Published", "Source", "Title");
            println!("{}", "-".repeat(95));
            for article in &result.articles {
                let title: String = article.title.chars().take(58).collect();
                println!(
                    "{:<25} {:<10} {:<60}",
                    article.published_at.format("%Y-%m-%d %H:%M:%S"),
                    article.source.id,
                    title
                );
            }
            println!("\nPage {} of {} ({} results)", page, page_count, result.total_results);
        }
        _ => {
            println!("\nSearch Summary");
            println!("==============");
            println!("Articles: {}", result.articles.len());
            println!("Total:    {}", result.total_results);
            println!("Page:     {} of {}", page, page_count);

            if let (Some(first), Some(last)) = (result.articles.first(), result.articles.last()) {
                println!("Newest:   {} ({})", first.published_at.to_rfc3339(), first.source.name);
                println!("Oldest:   {} ({})", last.published_at.to_rfc3339(), last.source.name);
            }

            let mut by_source: std::collections::BTreeMap<&str, usize> = std::collections::BTreeMap::new();
            for article in &result.articles {
                *by_source.entry(article.source.id.as_str()).or_insert(0) += 1;
            }

            println!("\nBy Source:");
            for (source, count) in by_source {
                println!("  - {}: {}", source, count);
            }
        }
    }

    Ok(())
}

/// Shows configured sources
fn show_status(config: &Config) {
    println!("\nNewsdesk Status");
    println!("===============\n");

    println!("Configured Sources:");
    for kind in SourceKind::ALL {
        let key = if config.has_key(kind) { "key set" } else { "no API key" };
        println!(
            "  - {:<9} {} ({}, {} req/min)",
            kind.tag(),
            config.base_url(kind),
            key,
            config.rate_limit_rpm(kind)
        );
    }

    println!("\nTransport:");
    println!("  Max concurrent requests: {}", config.max_concurrent_requests);
    println!("  Request timeout: {}s", config.request_timeout_secs);
    println!(
        "  Circuit breaker: {} failures, {}s open",
        config.circuit_breaker_failure_threshold, config.circuit_breaker_open_duration_secs
    );
}
