//! Per-company pipeline and the sequential batch driver.
//!
//! Each company runs Resolver -> Enricher -> Extractor to completion before
//! the next one starts. A fatal error for one company is logged and the
//! batch moves on; nothing is shared between companies except the output
//! directory.

use std::path::PathBuf;
use tracing::{error, info, instrument, warn};

use crate::api::AskAsync;
use crate::enricher::FirmableClient;
use crate::error::Result;
use crate::models::CompanyQuery;
use crate::news::NewsExtractor;
use crate::outputs::json::write_articles;
use crate::resolver::UrlResolver;
use crate::scrapers::feed::FeedScraper;

/// Outcome counts for a batch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// What one successful company run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyResult {
    pub articles_path: PathBuf,
    pub article_count: usize,
    pub posts_path: Option<PathBuf>,
}

pub struct Pipeline<R, A> {
    resolver: R,
    enricher: FirmableClient,
    extractor: NewsExtractor<A>,
    scraper: Option<FeedScraper>,
    data_dir: PathBuf,
}

impl<R, A> Pipeline<R, A>
where
    R: UrlResolver,
    A: AskAsync<Response = String>,
{
    pub fn new(
        resolver: R,
        enricher: FirmableClient,
        extractor: NewsExtractor<A>,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            resolver,
            enricher,
            extractor,
            scraper: None,
            data_dir: data_dir.into(),
        }
    }

    /// Also scrape each company's public feed once it has been enriched.
    pub fn with_scraper(mut self, scraper: Option<FeedScraper>) -> Self {
        self.scraper = scraper;
        self
    }

    /// Run one company end to end and persist its articles.
    #[instrument(level = "info", skip_all, fields(company = %query.name, location = %query.location))]
    pub async fn run_company(&self, query: &CompanyQuery) -> Result<CompanyResult> {
        info!(timeframe = ?query.timeframe, "Starting news pull");

        let resolved = self.resolver.resolve(&query.name, &query.location).await?;
        let record = self.enricher.enrich(&resolved).await?;
        let schema = self.extractor.extract(query, &resolved, &record).await?;
        let articles_path = write_articles(&self.data_dir, &schema, &query.name).await?;

        let posts_path = match &self.scraper {
            Some(scraper) => scraper.scrape_feed(&query.name, &record).await,
            None => None,
        };

        Ok(CompanyResult {
            articles_path,
            article_count: schema.articles.len(),
            posts_path,
        })
    }

    /// Run every company in order, isolating failures per company.
    pub async fn run_batch(&self, queries: &[CompanyQuery]) -> BatchSummary {
        let mut summary = BatchSummary::default();

        for (i, query) in queries.iter().enumerate() {
            match self.run_company(query).await {
                Ok(result) => {
                    summary.succeeded += 1;
                    info!(
                        index = i,
                        company = %query.name,
                        articles = result.article_count,
                        path = %result.articles_path.display(),
                        "Company complete"
                    );
                }
                Err(e) => {
                    summary.failed += 1;
                    error!(index = i, company = %query.name, location = %query.location, error = %e, "Failed to pull news");
                }
            }
        }

        if summary.failed > 0 {
            warn!(succeeded = summary.succeeded, failed = summary.failed, "Batch finished with failures");
        } else {
            info!(succeeded = summary.succeeded, "Batch finished");
        }
        summary
    }
}
