//! URL Resolver: turn a company name and location into one canonical URL.
//!
//! The search backend is a SerpAPI-style Google search. The first organic
//! result is taken as the best guess; no ranking is exposed to callers and
//! there is no retry of its own.

use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::error::{NewsError, Result};
use crate::models::ResolvedUrl;

/// Anything that can resolve a company to a single URL.
pub trait UrlResolver {
    async fn resolve(&self, name: &str, location: &str) -> Result<ResolvedUrl>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    link: Option<String>,
}

/// Google search through SerpAPI.
#[derive(Debug, Clone)]
pub struct SerpResolver {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SerpResolver {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

impl UrlResolver for SerpResolver {
    #[instrument(level = "info", skip(self))]
    async fn resolve(&self, name: &str, location: &str) -> Result<ResolvedUrl> {
        let query = format!("{name} {location}");
        let endpoint = format!("{}/search.json", self.base_url.trim_end_matches('/'));

        let resp = self
            .http
            .get(&endpoint)
            .query(&[
                ("engine", "google"),
                ("q", query.as_str()),
                ("gl", "au"),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;
        let body: SearchResponse = resp.json().await?;

        if let Some(message) = body.error {
            return Err(NewsError::Resolution {
                company: name.to_string(),
                message,
            });
        }

        debug!(results = body.organic_results.len(), "Search returned organic results");
        let url = body
            .organic_results
            .into_iter()
            .find_map(|r| r.link.filter(|l| !l.trim().is_empty()))
            .ok_or_else(|| NewsError::Resolution {
                company: name.to_string(),
                message: "search returned no results".into(),
            })?;

        let resolved = ResolvedUrl::new(url);
        info!(url = %resolved.url, social = resolved.is_social_profile, "Resolved company URL");
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn takes_first_organic_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.json"))
            .and(query_param("q", "Acme Melbourne"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "organic_results": [
                    {"link": "https://www.linkedin.com/company/acme"},
                    {"link": "https://acme.com.au"}
                ]
            })))
            .mount(&server)
            .await;

        let resolver = SerpResolver::new(reqwest::Client::new(), server.uri(), "key");
        let resolved = resolver.resolve("Acme", "Melbourne").await.unwrap();
        assert_eq!(resolved.url, "https://www.linkedin.com/company/acme");
        assert!(resolved.is_social_profile);
    }

    #[tokio::test]
    async fn no_results_is_a_resolution_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "organic_results": []
            })))
            .mount(&server)
            .await;

        let resolver = SerpResolver::new(reqwest::Client::new(), server.uri(), "key");
        let err = resolver.resolve("Nobody", "Nowhere").await.unwrap_err();
        assert!(matches!(err, NewsError::Resolution { .. }));
    }
}
