//! # Growth News
//!
//! Gathers public growth-signal news for a list of companies and, optionally,
//! their recent public social-feed posts.
//!
//! ## Usage
//!
//! ```sh
//! growth_news news --timeframe year
//! growth_news news --company "LAB Group" --location Melbourne --with-posts
//! growth_news posts --company Axcelerate --handle axcelerate-student-training
//! growth_news import
//! ```
//!
//! ## Architecture
//!
//! For each company, sequentially:
//! 1. **Resolve**: search for the company's canonical URL
//! 2. **Enrich**: fetch headquarters, social handle and industry, retrying
//!    once on the localised domain
//! 3. **Extract**: ask a search-augmented model for growth news restricted to
//!    trusted domains and a recency window, then validate and sort it
//! 4. **Output**: write `data/<company>.json`
//!
//! The feed scraper is a separate best-effort path that only needs a social
//! handle and writes `data/output/<company> LinkedIn Posts.json`.

use clap::Parser;
use std::error::Error;
use std::time::{Duration as StdDuration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod crm;
mod enricher;
mod error;
mod models;
mod news;
mod outputs;
mod pipeline;
mod resolver;
mod scrapers;
mod utils;

use api::{PerplexityClient, RetryAsk};
use cli::{Cli, Command};
use config::Settings;
use crm::CrmClient;
use enricher::FirmableClient;
use models::{CompanyQuery, FirmographicRecord, Timeframe};
use news::NewsExtractor;
use outputs::companies::{read_companies, write_companies};
use pipeline::Pipeline;
use resolver::SerpResolver;
use scrapers::feed::FeedScraper;
use utils::ensure_writable_dir;

/// Transient generation-backend failures retried per company.
const BACKEND_RETRIES: usize = 3;
const HTTP_TIMEOUT: StdDuration = StdDuration::from_secs(120);

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let dotenv = dotenvy::dotenv();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    match dotenv {
        Ok(path) => debug!(path = %path.display(), "Loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "Ignoring unreadable .env"),
    }

    let start_time = Instant::now();
    let args = Cli::parse();
    debug!(data_dir = %args.settings.data_dir.display(), "Parsed CLI arguments");

    let res = match args.command {
        Command::News {
            company,
            location,
            input,
            timeframe,
            with_posts,
        } => {
            let queries = match (company, location) {
                (Some(name), Some(location)) => vec![CompanyQuery::new(name, location, timeframe)],
                _ => {
                    let path = input.unwrap_or_else(|| args.settings.companies_csv());
                    load_queries(&path, timeframe)?
                }
            };
            run_news(&args.settings, &queries, with_posts).await
        }
        Command::Posts { company, handle } => run_posts(&args.settings, &company, &handle).await,
        Command::Import => run_import(&args.settings).await,
    };

    let elapsed = start_time.elapsed();
    match &res {
        Ok(()) => info!(?elapsed, secs = elapsed.as_secs(), "Execution complete"),
        Err(e) => error!(?elapsed, error = %e, "Execution failed"),
    }
    res
}

fn load_queries(path: &std::path::Path, timeframe: Timeframe) -> Result<Vec<CompanyQuery>, Box<dyn Error>> {
    let queries: Vec<_> = read_companies(path)?
        .into_iter()
        .map(|row| CompanyQuery::new(row.company, row.location, timeframe))
        .collect();
    if queries.is_empty() {
        return Err(format!("no companies listed in {}", path.display()).into());
    }
    Ok(queries)
}

fn http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()
}

async fn run_news(settings: &Settings, queries: &[CompanyQuery], with_posts: bool) -> Result<(), Box<dyn Error>> {
    // All keys are checked before any network call.
    let perplexity_key = settings.perplexity_key()?;
    let firmable_key = settings.firmable_key()?;
    let serpapi_key = settings.serpapi_key()?;

    ensure_writable_dir(&settings.data_dir).await?;
    info!(count = queries.len(), with_posts, "Starting batch");

    let http = http_client()?;
    let backend = RetryAsk::new(
        PerplexityClient::new(http.clone(), &settings.perplexity_base_url, perplexity_key),
        BACKEND_RETRIES,
        StdDuration::from_secs(1),
    );
    let pipeline = Pipeline::new(
        SerpResolver::new(http.clone(), &settings.serp_base_url, serpapi_key),
        FirmableClient::new(http, &settings.firmable_base_url, firmable_key),
        NewsExtractor::new(backend, &settings.model),
        &settings.data_dir,
    )
    .with_scraper(with_posts.then(|| FeedScraper::new(&settings.feed_base_url, settings.posts_dir())));

    let summary = pipeline.run_batch(queries).await;
    info!(succeeded = summary.succeeded, failed = summary.failed, "Batch summary");

    if summary.succeeded == 0 && summary.failed > 0 {
        return Err(format!("all {} companies failed", summary.failed).into());
    }
    Ok(())
}

async fn run_posts(settings: &Settings, company: &str, handle: &str) -> Result<(), Box<dyn Error>> {
    let record = FirmographicRecord {
        hq_location: None,
        social_handle: Some(handle.to_string()),
        industry: String::new(),
    };
    let scraper = FeedScraper::new(&settings.feed_base_url, settings.posts_dir());

    match scraper.scrape_feed(company, &record).await {
        Some(path) => {
            info!(path = %path.display(), "Successfully scraped posts");
            Ok(())
        }
        None => Err(format!("no posts scraped for {company}").into()),
    }
}

async fn run_import(settings: &Settings) -> Result<(), Box<dyn Error>> {
    let (domain, client_id, client_secret) = settings.crm_credentials()?;
    info!("Starting CRM company import");

    let client = CrmClient::connect(http_client()?, domain, client_id, client_secret).await?;
    let companies = client.import_companies().await?;
    if companies.is_empty() {
        warn!("No companies found in the target reports");
    }

    write_companies(&settings.companies_csv(), &companies)?;
    info!(count = companies.len(), "Import complete");
    Ok(())
}
