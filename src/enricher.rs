//! Firmographic Enricher.
//!
//! Looks a company up on the company-data API either by website or by
//! social-profile URL. Many records are only indexed under the Australian
//! domain, so a failed lookup is retried once against the localised URL
//! (`acme.com` -> `acme.com.au`) unless the URL is already localised.

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::error::{NewsError, Result};
use crate::models::{FirmographicRecord, ResolvedUrl};

/// A URL ending in this is already localised and is never retried.
pub const COUNTRY_SUFFIX: &str = ".au";
/// Second-level domain swapped in for a trailing `.com`.
pub const LOCALISED_SUFFIX: &str = ".com.au";
/// Localised retries after the first failed lookup.
pub const ENRICH_RETRIES: usize = 1;

/// Rewrite a URL onto the country-specific domain.
///
/// A trailing `.com` becomes `.com.au`, anything else gets `.com.au`
/// appended, and a trailing slash survives the rewrite.
pub fn localise_url(url: &str) -> String {
    let has_trailing_slash = url.ends_with('/');
    let base = url.trim_end_matches('/');

    let mut localised = match base.strip_suffix(".com") {
        Some(stem) => format!("{stem}{LOCALISED_SUFFIX}"),
        None => format!("{base}{LOCALISED_SUFFIX}"),
    };
    if has_trailing_slash {
        localised.push('/');
    }
    localised
}

#[derive(Debug, Deserialize)]
struct CompanyPayload {
    hq_location: Option<String>,
    linkedin: Option<String>,
    industries: Option<Vec<String>>,
}

impl CompanyPayload {
    fn into_record(self, url: &str) -> Result<FirmographicRecord> {
        let industry = self
            .industries
            .and_then(|list| list.into_iter().next())
            .ok_or_else(|| NewsError::enrichment(url, "record has no industries"))?;

        Ok(FirmographicRecord {
            hq_location: self.hq_location.filter(|s| !s.trim().is_empty()),
            social_handle: self.linkedin.filter(|s| !s.trim().is_empty()),
            industry,
        })
    }
}

/// Client for the company-data API (`GET /company`).
#[derive(Debug, Clone)]
pub struct FirmableClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FirmableClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Enrich a resolved URL, retrying once on the localised domain.
    pub async fn enrich(&self, resolved: &ResolvedUrl) -> Result<FirmographicRecord> {
        self.enrich_with_retries(&resolved.url, resolved.is_social_profile, ENRICH_RETRIES)
            .await
    }

    /// Look `url` up, falling back to [`localise_url`] at most `retries` times.
    ///
    /// Only a failed request (transport error or non-2xx status) moves on to
    /// the localised candidate. A successful response whose body cannot be
    /// decoded, or that carries no industry, fails immediately.
    ///
    /// # Arguments
    ///
    /// * `url` - Website or social-profile URL from the resolver.
    /// * `is_social_profile` - Query by `ln_url` instead of `website`.
    /// * `retries` - Maximum number of localised retries.
    ///
    /// # Returns
    ///
    /// The [`FirmographicRecord`] of the first candidate that answered, or
    /// [`NewsError::Enrichment`] naming the last candidate tried.
    #[instrument(level = "info", skip(self))]
    pub async fn enrich_with_retries(
        &self,
        url: &str,
        is_social_profile: bool,
        retries: usize,
    ) -> Result<FirmographicRecord> {
        let mut candidate = url.to_string();
        let mut retries_left = retries;

        loop {
            match self.lookup(&candidate, is_social_profile).await {
                Ok(resp) => {
                    let payload: CompanyPayload = resp
                        .json()
                        .await
                        .map_err(|e| NewsError::enrichment(candidate.as_str(), format!("undecodable record: {e}")))?;
                    let record = payload.into_record(&candidate)?;
                    info!(url = %candidate, industry = %record.industry, "Enriched company");
                    return Ok(record);
                }
                Err(e) if retries_left > 0 && !candidate.ends_with(COUNTRY_SUFFIX) => {
                    let next = localise_url(&candidate);
                    warn!(url = %candidate, retry_url = %next, error = %e, "Lookup failed; retrying on localised domain");
                    retries_left -= 1;
                    candidate = next;
                }
                Err(e) => return Err(NewsError::enrichment(candidate, e.to_string())),
            }
        }
    }

    async fn lookup(&self, url: &str, is_social_profile: bool) -> Result<reqwest::Response> {
        let param = if is_social_profile { "ln_url" } else { "website" };
        let endpoint = format!("{}/company", self.base_url.trim_end_matches('/'));
        debug!(%endpoint, param, %url, "Querying company-data API");

        let resp = self
            .http
            .get(&endpoint)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[(param, url)])
            .send()
            .await?
            .error_for_status()?;
        Ok(resp)
    }
}
