//! Data models shared by the resolver, enricher, extractor and scraper.
//!
//! - [`CompanyQuery`]: one company to process, with the recency window
//! - [`ResolvedUrl`]: the resolver's single best guess
//! - [`FirmographicRecord`]: headquarters, social handle and industry
//! - [`ArticleSchema`] / [`Article`]: the structured growth-news answer
//! - [`ScrapedPost`]: one post pulled from a public social feed
//!
//! All of these live for one company's run and are never re-read once
//! persisted.

use chrono::{Duration, NaiveDate};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Strict date format the generation backend is asked to use for articles.
pub const ARTICLE_DATE_FORMAT: &str = "%d/%m/%Y";

/// How far back growth news may reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Day,
    Week,
    Month,
    #[default]
    Year,
}

impl Timeframe {
    pub fn days(self) -> i64 {
        match self {
            Timeframe::Day => 1,
            Timeframe::Week => 7,
            Timeframe::Month => 30,
            Timeframe::Year => 365,
        }
    }

    /// Earliest publish date eligible for inclusion, counted back from `today`.
    pub fn cutoff(self, today: NaiveDate) -> NaiveDate {
        today - Duration::days(self.days())
    }
}

/// A company to gather news for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyQuery {
    pub name: String,
    pub location: String,
    pub timeframe: Timeframe,
}

impl CompanyQuery {
    pub fn new(name: impl Into<String>, location: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            timeframe,
        }
    }
}

/// The resolver's answer: exactly one URL, never a ranked list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUrl {
    pub url: String,
    /// True when the URL points at a social profile rather than a website.
    pub is_social_profile: bool,
}

impl ResolvedUrl {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let is_social_profile = url.contains("linkedin");
        Self {
            url,
            is_social_profile,
        }
    }
}

/// Firmographic metadata for a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmographicRecord {
    pub hq_location: Option<String>,
    /// Social-profile handle (company slug), if the provider knows one.
    #[serde(rename = "linkedin")]
    pub social_handle: Option<String>,
    /// First entry of the provider's `industries` list.
    pub industry: String,
}

/// One growth-related news article.
///
/// Every field is required; a payload missing any of them fails the whole
/// extraction rather than being partially accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub headline: String,
    /// Publish date, expected as `DD/MM/YYYY`.
    pub date: String,
    pub summary: String,
    pub growth_type: String,
    pub source_url: String,
}

impl Article {
    /// Parsed publish date, or `None` when `date` is not `DD/MM/YYYY`.
    pub fn published_on(&self) -> Option<NaiveDate> {
        parse_article_date(&self.date)
    }
}

/// The structured answer for one company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSchema {
    pub company: String,
    pub articles: Vec<Article>,
}

/// A post scraped from a public social feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedPost {
    pub title: String,
    pub post_text: String,
    /// Best-effort, may be empty.
    pub date_posted: String,
}

/// Parse a strict `DD/MM/YYYY` article date.
pub fn parse_article_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    // chrono accepts unpadded fields; the format is strict about width.
    let bytes = raw.as_bytes();
    if bytes.len() != 10 || bytes[2] != b'/' || bytes[5] != b'/' {
        return None;
    }
    NaiveDate::parse_from_str(raw, ARTICLE_DATE_FORMAT).ok()
}
