//! Public social-feed scraping.
//!
//! - [`feed`]: fetch, block detection and the overall best-effort contract
//! - [`fingerprint`]: randomised browser headers and request pacing
//! - [`extract`]: the three extraction strategies and deduplication
//!
//! The feed host offers no stable API and changes its markup and defences
//! without notice, so every strategy is opportunistic and the scraper as a
//! whole degrades to "no posts" rather than an error.

pub mod extract;
pub mod feed;
pub mod fingerprint;
