//! Command-line interface definitions.
//!
//! Credentials and endpoints are shared by every subcommand and can be given
//! as flags or environment variables (see [`Settings`]).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Settings;
use crate::models::Timeframe;

/// Gather public growth-signal news for a list of companies.
///
/// # Examples
///
/// ```sh
/// # Every company in data/input/companies.csv
/// growth_news news --timeframe year
///
/// # A single company, and its public feed posts
/// growth_news news --company "LAB Group" --location Melbourne --with-posts
///
/// # Scrape a feed directly
/// growth_news posts --company Axcelerate --handle axcelerate-student-training
///
/// # Refresh the company list from the CRM
/// growth_news import
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve, enrich and pull growth news for one or many companies
    News {
        /// Company name; requires --location
        #[arg(long, requires = "location")]
        company: Option<String>,

        /// Company location (city)
        #[arg(long, requires = "company")]
        location: Option<String>,

        /// CSV of `company,location` rows; defaults to <data-dir>/input/companies.csv
        #[arg(long, conflicts_with = "company")]
        input: Option<PathBuf>,

        /// How far back to search
        #[arg(short, long, value_enum, default_value_t = Timeframe::Year)]
        timeframe: Timeframe,

        /// Also scrape each company's public feed after enrichment
        #[arg(long)]
        with_posts: bool,
    },

    /// Scrape a company's public social feed
    Posts {
        /// Company name, used for the output file name
        #[arg(long)]
        company: String,

        /// Social-profile handle (company slug)
        #[arg(long)]
        handle: String,
    },

    /// Write the CRM's target companies to <data-dir>/input/companies.csv
    Import,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_news_single_company() {
        let cli = Cli::parse_from([
            "growth_news",
            "news",
            "--company",
            "LAB Group",
            "--location",
            "Melbourne",
            "-t",
            "month",
        ]);

        match cli.command {
            Command::News {
                company,
                location,
                timeframe,
                with_posts,
                ..
            } => {
                assert_eq!(company.as_deref(), Some("LAB Group"));
                assert_eq!(location.as_deref(), Some("Melbourne"));
                assert_eq!(timeframe, Timeframe::Month);
                assert!(!with_posts);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_news_defaults_to_year() {
        let cli = Cli::parse_from(["growth_news", "news"]);
        assert!(matches!(
            cli.command,
            Command::News {
                timeframe: Timeframe::Year,
                company: None,
                ..
            }
        ));
    }

    #[test]
    fn test_company_requires_location() {
        let res = Cli::try_parse_from(["growth_news", "news", "--company", "Acme"]);
        assert!(res.is_err());
    }

    #[test]
    fn test_posts_command() {
        let cli = Cli::parse_from([
            "growth_news",
            "--data-dir",
            "/tmp/data",
            "posts",
            "--company",
            "Axcelerate",
            "--handle",
            "axcelerate",
        ]);
        assert_eq!(cli.settings.data_dir, PathBuf::from("/tmp/data"));
        assert!(matches!(cli.command, Command::Posts { ref handle, .. } if handle == "axcelerate"));
    }
}
