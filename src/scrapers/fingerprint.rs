//! Browser fingerprint randomisation for unauthenticated page fetches.
//!
//! Each request draws a user agent and accept-language from fixed pools of
//! real browser values, sends standard document-navigation headers and
//! sometimes a referer. None of this guarantees a response; it only makes
//! consecutive requests look less alike.

use rand::Rng;
use rand::seq::IndexedRandom;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, DNT, HeaderMap, HeaderName, HeaderValue, REFERER,
    UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};
use std::ops::RangeInclusive;
use std::time::Duration;

pub const USER_AGENTS: [&str; 8] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.2 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36 Edg/130.0.0.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (X11; Linux x86_64; rv:133.0) Gecko/20100101 Firefox/133.0",
];

pub const ACCEPT_LANGUAGES: [&str; 4] = [
    "en-US,en;q=0.9",
    "en-GB,en;q=0.9,en-US;q=0.8",
    "en-AU,en;q=0.9,en-GB;q=0.8,en-US;q=0.7",
    "en-US,en;q=0.9,es;q=0.8",
];

/// Chance that a request claims to come from the feed's home page.
pub const REFERER_PROBABILITY: f64 = 0.7;

/// Default pause before a fetch, in seconds.
pub const PACING_SECS: RangeInclusive<f64> = 3.0..=10.0;

const DOCUMENT_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

/// One randomly drawn set of identifying headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub user_agent: &'static str,
    pub accept_language: &'static str,
    pub referer: Option<String>,
}

impl Fingerprint {
    /// Draw a fingerprint; `referer` is attached with [`REFERER_PROBABILITY`].
    pub fn random<R: Rng>(rng: &mut R, referer: &str) -> Self {
        Self {
            user_agent: USER_AGENTS.choose(rng).copied().unwrap_or(USER_AGENTS[0]),
            accept_language: ACCEPT_LANGUAGES
                .choose(rng)
                .copied()
                .unwrap_or(ACCEPT_LANGUAGES[0]),
            referer: rng
                .random_bool(REFERER_PROBABILITY)
                .then(|| referer.to_string()),
        }
    }

    /// Full header set for a top-level document navigation.
    ///
    /// `Accept-Encoding` is left to the HTTP client so responses are
    /// decompressed transparently.
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(self.user_agent));
        headers.insert(ACCEPT, HeaderValue::from_static(DOCUMENT_ACCEPT));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(self.accept_language));
        headers.insert(DNT, HeaderValue::from_static("1"));
        headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
        for (name, value) in [
            ("sec-fetch-dest", "document"),
            ("sec-fetch-mode", "navigate"),
            ("sec-fetch-site", "none"),
            ("sec-fetch-user", "?1"),
        ] {
            headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
        }
        if let Some(referer) = self.referer.as_deref() {
            if let Ok(value) = HeaderValue::from_str(referer) {
                headers.insert(REFERER, value);
            }
        }
        headers
    }
}

/// Uniformly random pause drawn from `secs`, with negative bounds clamped to zero.
pub fn pacing_delay<R: Rng>(rng: &mut R, secs: &RangeInclusive<f64>) -> Duration {
    let (lo, hi) = (secs.start().max(0.0), secs.end().max(0.0));
    if hi <= lo {
        return Duration::from_secs_f64(lo);
    }
    Duration::from_secs_f64(rng.random_range(lo..=hi))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn fingerprints_come_from_the_pools() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let fp = Fingerprint::random(&mut rng, "https://www.linkedin.com/");
            assert!(USER_AGENTS.contains(&fp.user_agent));
            assert!(ACCEPT_LANGUAGES.contains(&fp.accept_language));
        }
    }

    #[test]
    fn referer_is_probabilistic() {
        let mut rng = StdRng::seed_from_u64(42);
        let with_referer = (0..1000)
            .filter(|_| Fingerprint::random(&mut rng, "https://www.linkedin.com/").referer.is_some())
            .count();
        assert!((600..800).contains(&with_referer), "{with_referer}");
    }

    #[test]
    fn headers_describe_a_document_navigation() {
        let fp = Fingerprint {
            user_agent: USER_AGENTS[0],
            accept_language: ACCEPT_LANGUAGES[2],
            referer: None,
        };
        let headers = fp.headers();
        assert_eq!(headers[USER_AGENT], USER_AGENTS[0]);
        assert_eq!(headers[ACCEPT_LANGUAGE], ACCEPT_LANGUAGES[2]);
        assert_eq!(headers["sec-fetch-mode"], "navigate");
        assert!(headers.get(REFERER).is_none());

        let fp = Fingerprint {
            referer: Some("https://www.linkedin.com/".into()),
            ..fp
        };
        assert_eq!(fp.headers()[REFERER], "https://www.linkedin.com/");
    }

    #[test]
    fn pacing_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let d = pacing_delay(&mut rng, &PACING_SECS);
            assert!(d >= Duration::from_secs(3) && d <= Duration::from_secs(10));
        }
        assert_eq!(pacing_delay(&mut rng, &(0.0..=0.0)), Duration::ZERO);
    }

    #[test]
    fn negative_pacing_clamps_to_zero() {
        let mut rng = StdRng::seed_from_u64(11);
        assert_eq!(pacing_delay(&mut rng, &(-5.0..=-1.0)), Duration::ZERO);
        for _ in 0..50 {
            assert!(pacing_delay(&mut rng, &(-2.0..=1.0)) <= Duration::from_secs(1));
        }
    }
}
