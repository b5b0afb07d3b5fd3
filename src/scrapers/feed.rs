//! Social-Feed Scraper.
//!
//! One unauthenticated GET of a company's public feed page, paced and
//! fingerprinted to look like a browser navigation, followed by
//! [`extract_posts`] and [`dedupe_posts`]. There are no retries: a block is
//! final for this run.
//!
//! [`FeedScraper::scrape_feed`] never fails. Blocks, empty pages, network
//! and filesystem errors are all logged and reported as `None`.

use rand::rng;
use reqwest::redirect::Policy;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use super::extract::{dedupe_posts, extract_posts};
use super::fingerprint::{Fingerprint, PACING_SECS, pacing_delay};
use crate::error::Result;
use crate::models::FirmographicRecord;
use crate::outputs::json::write_posts;
use crate::utils::truncate_for_log;

/// Status the feed host answers with when it has detected automation.
pub const BLOCK_STATUS: u16 = 999;
/// A redirect landing on a URL containing any of these is an auth wall.
pub const BLOCK_URL_MARKERS: [&str; 3] = ["authwall", "login", "checkpoint"];

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
enum ScrapeOutcome {
    Blocked(String),
    Empty,
    Saved(PathBuf),
}

/// Reduce a profile URL or path to its bare company slug.
///
/// `https://www.linkedin.com/company/acme/posts/` and `acme` both give `acme`.
pub fn normalise_handle(raw: &str) -> String {
    const COMPANY_SEGMENT: &str = "company/";
    let raw = raw.trim();
    let tail = match raw.rfind(COMPANY_SEGMENT) {
        Some(i) => &raw[i + COMPANY_SEGMENT.len()..],
        None => raw.trim_start_matches('/'),
    };
    tail.split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Marker found in `final_url` when a request was redirected away from
/// `requested`.
fn block_marker(requested: &str, final_url: &str) -> Option<&'static str> {
    if final_url.trim_end_matches('/') == requested.trim_end_matches('/') {
        return None;
    }
    let lower = final_url.to_ascii_lowercase();
    BLOCK_URL_MARKERS.into_iter().find(|m| lower.contains(m))
}

/// Scraper for public company feed pages.
#[derive(Debug, Clone)]
pub struct FeedScraper {
    base_url: String,
    posts_dir: PathBuf,
    pacing: RangeInclusive<f64>,
}

impl FeedScraper {
    pub fn new(base_url: impl Into<String>, posts_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_url: base_url.into(),
            posts_dir: posts_dir.into(),
            pacing: PACING_SECS,
        }
    }

    /// Override the pause before each fetch, in seconds.
    pub fn with_pacing(mut self, secs: RangeInclusive<f64>) -> Self {
        self.pacing = secs;
        self
    }

    pub fn feed_url(&self, handle: &str) -> String {
        format!(
            "{}/company/{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(handle)
        )
    }

    /// Scrape `record`'s feed and save the posts for `company`.
    ///
    /// # Arguments
    ///
    /// * `company` - Display name, used for the output file name.
    /// * `record` - Enrichment result; its social handle selects the feed.
    ///
    /// # Returns
    ///
    /// The path of the written JSON file, or `None` when there was no handle,
    /// the request was blocked, nothing was found or anything failed.
    #[instrument(level = "info", skip_all, fields(company = %company))]
    pub async fn scrape_feed(&self, company: &str, record: &FirmographicRecord) -> Option<PathBuf> {
        let handle = record
            .social_handle
            .as_deref()
            .map(normalise_handle)
            .filter(|h| !h.is_empty());
        let Some(handle) = handle else {
            warn!("No social handle; skipping");
            return None;
        };

        match self.try_scrape(company, &handle).await {
            Ok(ScrapeOutcome::Saved(path)) => Some(path),
            Ok(ScrapeOutcome::Blocked(reason)) => {
                error!(%handle, %reason, "Scraper blocked");
                None
            }
            Ok(ScrapeOutcome::Empty) => {
                error!(%handle, "No posts found in response");
                None
            }
            Err(e) => {
                error!(%handle, error = %e, "Scraper failed");
                None
            }
        }
    }

    async fn try_scrape(&self, company: &str, handle: &str) -> Result<ScrapeOutcome> {
        let url = self.feed_url(handle);
        let referer = format!("{}/", self.base_url.trim_end_matches('/'));
        let (fingerprint, delay) = {
            let mut rng = rng();
            (
                Fingerprint::random(&mut rng, &referer),
                pacing_delay(&mut rng, &self.pacing),
            )
        };

        info!(delay_secs = delay.as_secs_f64(), "Waiting before request");
        sleep(delay).await;

        // One cookie-keeping session per scrape, dropped on every exit path.
        let session = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(REQUEST_TIMEOUT)
            .redirect(Policy::limited(10))
            .build()?;

        info!(%url, user_agent = %truncate_for_log(fingerprint.user_agent, 60), "GET feed page");
        let resp = session.get(&url).headers(fingerprint.headers()).send().await?;

        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        info!(status, %final_url, "Feed responded");

        if status == BLOCK_STATUS {
            return Ok(ScrapeOutcome::Blocked(format!("status {BLOCK_STATUS}")));
        }
        if let Some(marker) = block_marker(&url, &final_url) {
            return Ok(ScrapeOutcome::Blocked(format!(
                "redirected to {marker} page {final_url}"
            )));
        }

        let html = resp.error_for_status()?.text().await?;
        info!(bytes = html.len(), "Fetched feed page");

        let extraction = extract_posts(&html);
        let posts = dedupe_posts(extraction.posts);
        if posts.is_empty() {
            return Ok(ScrapeOutcome::Empty);
        }
        info!(
            count = posts.len(),
            markup_fallback = extraction.used_markup_fallback,
            "Extracted unique posts"
        );

        let path = write_posts(&self.posts_dir, company, &posts).await?;
        Ok(ScrapeOutcome::Saved(path))
    }
}
