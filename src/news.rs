//! Growth-News Extractor.
//!
//! Builds a constrained prompt for one company, sends it to the
//! search-augmented backend restricted to a domain allowlist and a recency
//! window, validates the answer against [`ArticleSchema`] and orders the
//! articles newest first.

use chrono::{Local, NaiveDate};
use serde_json::json;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::api::{AskAsync, ChatMessage, ChatRequest, UserLocation, WebSearchOptions};
use crate::error::{NewsError, Result};
use crate::models::{ArticleSchema, CompanyQuery, FirmographicRecord, ResolvedUrl};
use crate::utils::truncate_for_log;

/// Regional business-news publications searched alongside the company's own site.
pub const NEWS_DOMAINS: [&str; 6] = [
    "afr.com",
    "insidesmallbusiness.com.au",
    "dynamicbusiness.com",
    "smartcompany.com.au",
    "startupdaily.net",
    "businessnews.com.au",
];

/// Country sent as the geo hint.
pub const SEARCH_COUNTRY: &str = "AU";

/// Date format the search backend expects for its recency filter.
const SEARCH_AFTER_FORMAT: &str = "%-m/%-d/%Y";

/// Compose the user prompt for `name`.
///
/// The headquarters sentence is only included when the record has one.
pub fn build_prompt(name: &str, location: &str, record: &FirmographicRecord) -> String {
    let hq_sentence = match record.hq_location.as_deref() {
        Some(hq) => format!("{name} is currently headquartered at {hq}. "),
        None => String::new(),
    };

    format!(
        "The company you will be finding news articles for is {name} located in {location}. \
         {hq_sentence}\
         They are primarily in the {industry} industries. \
         Find news articles indicating growth (awards, expansion, new hires, \
         partnerships, patents, financial success, etc) for {name}. \
         Only return news for this specific company and location, do not confuse it \
         with other companies with similar names.",
        industry = record.industry.to_lowercase(),
    )
}

/// The company's own domain followed by [`NEWS_DOMAINS`].
///
/// The resolved URL is reduced to its host (without `www.`); a value that
/// does not parse as a URL is used as given.
pub fn domain_allowlist(company_url: &str) -> Vec<String> {
    let own = Url::parse(company_url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_else(|| company_url.trim_end_matches('/').to_string());

    std::iter::once(own)
        .chain(NEWS_DOMAINS.iter().map(|d| d.to_string()))
        .collect()
}

/// Structured-output schema every answer must satisfy.
pub fn article_response_format() -> serde_json::Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "schema": {
                "type": "object",
                "properties": {
                    "company": {"type": "string"},
                    "articles": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "headline": {"type": "string"},
                                "date": {
                                    "type": "string",
                                    "description": "Publish date of the article strictly in 'DD/MM/YYYY' format"
                                },
                                "summary": {"type": "string"},
                                "growth_type": {"type": "string"},
                                "source_url": {"type": "string"}
                            },
                            "required": ["headline", "date", "summary", "growth_type", "source_url"]
                        }
                    }
                },
                "required": ["company", "articles"]
            }
        }
    })
}

/// Build the full backend request for one company as of `today`.
///
/// # Arguments
///
/// * `model` - Generation model name.
/// * `query` - Company name, location and lookback window.
/// * `resolved` - Resolver output; its host leads the domain allowlist.
/// * `record` - Firmographics interpolated into the prompt.
/// * `today` - Reference date for the search-after cutoff.
pub fn build_request(
    model: &str,
    query: &CompanyQuery,
    resolved: &ResolvedUrl,
    record: &FirmographicRecord,
    today: NaiveDate,
) -> ChatRequest {
    let cutoff = query.timeframe.cutoff(today);

    ChatRequest {
        model: model.to_string(),
        messages: vec![ChatMessage::user(build_prompt(
            &query.name,
            &query.location,
            record,
        ))],
        search_domain_filter: domain_allowlist(&resolved.url),
        search_after_date_filter: cutoff.format(SEARCH_AFTER_FORMAT).to_string(),
        web_search_options: WebSearchOptions {
            user_location: UserLocation {
                country: SEARCH_COUNTRY.to_string(),
                city: query.location.clone(),
            },
        },
        response_format: article_response_format(),
    }
}

/// Parse the backend's JSON text into an [`ArticleSchema`].
pub fn parse_response(content: &str) -> Result<ArticleSchema> {
    serde_json::from_str(content.trim()).map_err(|e| {
        warn!(error = %e, response_preview = %truncate_for_log(content, 300), "Model returned non-conforming JSON");
        NewsError::SchemaValidation(e.to_string())
    })
}

/// Sort articles newest first.
///
/// Undated or malformed dates sort last, keeping their relative order.
pub fn sort_by_recency(schema: &mut ArticleSchema) {
    for article in schema.articles.iter().filter(|a| a.published_on().is_none()) {
        warn!(date = %article.date, headline = %article.headline, "Could not parse date; sorting to end");
    }
    schema
        .articles
        .sort_by_key(|a| std::cmp::Reverse(a.published_on().unwrap_or(NaiveDate::MIN)));
}

/// Growth-news extraction against any [`AskAsync`] backend.
#[derive(Debug)]
pub struct NewsExtractor<A> {
    backend: A,
    model: String,
}

impl<A> NewsExtractor<A>
where
    A: AskAsync<Response = String>,
{
    pub fn new(backend: A, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
        }
    }

    #[instrument(level = "info", skip_all, fields(company = %query.name, location = %query.location))]
    pub async fn extract(
        &self,
        query: &CompanyQuery,
        resolved: &ResolvedUrl,
        record: &FirmographicRecord,
    ) -> Result<ArticleSchema> {
        let request = build_request(&self.model, query, resolved, record, Local::now().date_naive());
        info!(
            after = %request.search_after_date_filter,
            domains = ?request.search_domain_filter,
            "Sending request to generation backend"
        );
        debug!(prompt = %request.messages[0].content, "User prompt");

        let content = self.backend.ask(&request).await?;
        let mut schema = parse_response(&content)?;
        sort_by_recency(&mut schema);

        info!(count = schema.articles.len(), "Retrieved growth articles");
        Ok(schema)
    }
}
