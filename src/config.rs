//! Environment-backed settings.
//!
//! Keys are read from the process environment (after `.env` has been loaded)
//! or from the matching command-line flag. Nothing is validated until a
//! subcommand asks for the keys it needs, so `posts` runs without a
//! generation-backend key and `import` runs without any scraping keys.

use clap::Args;
use std::path::PathBuf;

use crate::error::{NewsError, Result};

pub const DEFAULT_SERP_BASE_URL: &str = "https://serpapi.com";
pub const DEFAULT_FIRMABLE_BASE_URL: &str = "https://api.firmable.com";
pub const DEFAULT_PERPLEXITY_BASE_URL: &str = "https://api.perplexity.ai";
pub const DEFAULT_FEED_BASE_URL: &str = "https://www.linkedin.com";

/// Upstream credentials, endpoints and output location.
#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// API key for the search-augmented generation backend
    #[arg(long, env = "PERPLEXITY_API_KEY", hide_env_values = true)]
    pub perplexity_api_key: Option<String>,

    /// API key for the company-data provider
    #[arg(long, env = "FIRMABLE_API_KEY", hide_env_values = true)]
    pub firmable_api_key: Option<String>,

    /// API key for the search engine used to resolve company URLs
    #[arg(long, env = "SERPAPI_API_KEY", hide_env_values = true)]
    pub serpapi_api_key: Option<String>,

    /// CRM instance URL, e.g. https://example.my.salesforce.com
    #[arg(long, env = "SALESFORCE_DOMAIN")]
    pub salesforce_domain: Option<String>,

    /// CRM connected-app client id
    #[arg(long, env = "CONSUMER_KEY", hide_env_values = true)]
    pub consumer_key: Option<String>,

    /// CRM connected-app client secret
    #[arg(long, env = "CONSUMER_SECRET", hide_env_values = true)]
    pub consumer_secret: Option<String>,

    /// Generation model name
    #[arg(long, env = "PERPLEXITY_MODEL", default_value = "sonar-pro")]
    pub model: String,

    /// Root directory for inputs and results
    #[arg(long, env = "GROWTH_NEWS_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    #[arg(long, env = "SERPAPI_BASE_URL", default_value = DEFAULT_SERP_BASE_URL, hide = true)]
    pub serp_base_url: String,

    #[arg(long, env = "FIRMABLE_BASE_URL", default_value = DEFAULT_FIRMABLE_BASE_URL, hide = true)]
    pub firmable_base_url: String,

    #[arg(long, env = "PERPLEXITY_BASE_URL", default_value = DEFAULT_PERPLEXITY_BASE_URL, hide = true)]
    pub perplexity_base_url: String,

    #[arg(long, env = "FEED_BASE_URL", default_value = DEFAULT_FEED_BASE_URL, hide = true)]
    pub feed_base_url: String,
}

/// Return the value of a required key, failing fast with the variable name.
pub fn require<'a>(value: &'a Option<String>, var: &str) -> Result<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(NewsError::configuration(format!("{var} is not set"))),
    }
}

impl Settings {
    pub fn perplexity_key(&self) -> Result<&str> {
        require(&self.perplexity_api_key, "PERPLEXITY_API_KEY")
    }

    pub fn firmable_key(&self) -> Result<&str> {
        require(&self.firmable_api_key, "FIRMABLE_API_KEY")
    }

    pub fn serpapi_key(&self) -> Result<&str> {
        require(&self.serpapi_api_key, "SERPAPI_API_KEY")
    }

    /// Domain, client id and client secret for the CRM import.
    pub fn crm_credentials(&self) -> Result<(&str, &str, &str)> {
        Ok((
            require(&self.salesforce_domain, "SALESFORCE_DOMAIN")?,
            require(&self.consumer_key, "CONSUMER_KEY")?,
            require(&self.consumer_secret, "CONSUMER_SECRET")?,
        ))
    }

    /// `data/input/companies.csv`
    pub fn companies_csv(&self) -> PathBuf {
        self.data_dir.join("input").join("companies.csv")
    }

    /// `data/output`, where scraped posts land.
    pub fn posts_dir(&self) -> PathBuf {
        self.data_dir.join("output")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn require_rejects_missing_and_blank() {
        let err = require(&None, "FIRMABLE_API_KEY").unwrap_err();
        assert_eq!(err.to_string(), "configuration error: FIRMABLE_API_KEY is not set");

        let blank = Some("   ".to_string());
        assert!(matches!(
            require(&blank, "FIRMABLE_API_KEY"),
            Err(NewsError::Configuration(_))
        ));

        let set = Some("abc".to_string());
        assert_eq!(require(&set, "FIRMABLE_API_KEY").unwrap(), "abc");
    }

    fn settings() -> Settings {
        Settings {
            perplexity_api_key: None,
            firmable_api_key: None,
            serpapi_api_key: None,
            salesforce_domain: None,
            consumer_key: None,
            consumer_secret: None,
            model: "sonar-pro".into(),
            data_dir: PathBuf::from("data"),
            serp_base_url: DEFAULT_SERP_BASE_URL.into(),
            firmable_base_url: DEFAULT_FIRMABLE_BASE_URL.into(),
            perplexity_base_url: DEFAULT_PERPLEXITY_BASE_URL.into(),
            feed_base_url: DEFAULT_FEED_BASE_URL.into(),
        }
    }

    #[test]
    fn crm_credentials_name_the_first_missing_key() {
        let mut settings = Settings {
            salesforce_domain: Some("https://example.my.salesforce.com".into()),
            consumer_key: Some("id".into()),
            ..settings()
        };
        let err = settings.crm_credentials().unwrap_err();
        assert!(err.to_string().contains("CONSUMER_SECRET"));

        settings.consumer_key = None;
        let err = settings.crm_credentials().unwrap_err();
        assert!(err.to_string().contains("CONSUMER_KEY"));

        settings.consumer_key = Some("id".into());
        settings.consumer_secret = Some("shh".into());
        let (domain, id, secret) = settings.crm_credentials().unwrap();
        assert_eq!((domain, id, secret), ("https://example.my.salesforce.com", "id", "shh"));
    }

    #[test]
    fn derived_paths() {
        let cli = Cli::parse_from(["growth_news", "--data-dir", "/tmp/gn", "import"]);
        assert_eq!(
            cli.settings.companies_csv(),
            PathBuf::from("/tmp/gn/input/companies.csv")
        );
        assert_eq!(cli.settings.posts_dir(), PathBuf::from("/tmp/gn/output"));
    }
}
