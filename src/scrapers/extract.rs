//! Best-effort post extraction from a public feed page.
//!
//! Three independent strategies run against the same HTML:
//!
//! 1. serialized page state embedded as JSON inside `<code><!-- … --></code>`
//! 2. JSON-LD `<script type="application/ld+json">` blocks
//! 3. regex patterns over post-bearing markup, only when 1 and 2 found nothing
//!
//! Results from every strategy are merged and then deduplicated on the
//! first 100 characters of the post text.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Node, Selector};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::models::ScrapedPost;

/// Post text must be longer than this many characters.
pub const MIN_POST_CHARS: usize = 20;
/// Length of the post-text prefix used as the deduplication key.
pub const DEDUP_PREFIX_CHARS: usize = 100;
/// Nesting beyond this is not searched.
pub const MAX_JSON_DEPTH: usize = 64;

/// JSON-LD keys that hold nested entities.
const LD_CONTAINER_KEYS: [&str; 5] = ["mainEntity", "hasPart", "itemListElement", "item", "@graph"];

static MARKUP_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#"(?is)data-test-id="main-feed-activity-card__commentary"[^>]*>(.*?)</(?:p|div)>"#,
        r#"(?is)class="feed-shared-update-v2__description[^"]*"[^>]*>(.*?)</div>"#,
        r#"(?is)class="update-components-text[^"]*"[^>]*>(.*?)</div>"#,
        r#"(?is)class="break-words[^"]*"[^>]*>(.*?)</(?:p|div|span)>"#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Everything the strategies found in one page, before deduplication.
#[derive(Debug, Default)]
pub struct Extraction {
    pub posts: Vec<ScrapedPost>,
    pub state_blocks: usize,
    pub ld_blocks: usize,
    /// Whether the markup regex fallback ran.
    pub used_markup_fallback: bool,
}

/// Run all strategies over `html`.
pub fn extract_posts(html: &str) -> Extraction {
    let document = Html::parse_document(html);
    let code_selector = Selector::parse("code").unwrap();
    let ld_selector = Selector::parse(r#"script[type="application/ld+json"]"#).unwrap();
    let mut out = Extraction::default();

    for raw in state_blocks(&document, &code_selector) {
        out.state_blocks += 1;
        match decode_state_block(&raw) {
            Some(value) => collect_state_posts(&value, 0, &mut out.posts),
            None => debug!(bytes = raw.len(), "Skipping undecodable state block"),
        }
    }
    info!(count = out.state_blocks, "Found embedded state blocks");

    for element in document.select(&ld_selector) {
        out.ld_blocks += 1;
        let raw: String = element.text().collect();
        match serde_json::from_str::<Value>(raw.trim()) {
            Ok(value) => collect_ld_posts(&value, 0, &mut out.posts),
            Err(e) => debug!(error = %e, "Skipping malformed ld+json block"),
        }
    }
    info!(count = out.ld_blocks, "Found ld+json blocks");

    if out.posts.is_empty() {
        info!("Trying HTML element extraction");
        out.used_markup_fallback = true;
        collect_markup_posts(html, &mut out.posts);
    }
    out
}

/// Keep the first post for each distinct text prefix, in order of first
/// appearance. Posts with empty text are dropped.
pub fn dedupe_posts(posts: Vec<ScrapedPost>) -> Vec<ScrapedPost> {
    posts
        .into_iter()
        .filter(|p| !p.post_text.is_empty())
        .unique_by(|p| p.post_text.chars().take(DEDUP_PREFIX_CHARS).collect::<String>())
        .collect()
}

/// Comment bodies of `<code>` elements.
fn state_blocks(document: &Html, code: &Selector) -> Vec<String> {
    document
        .select(code)
        .flat_map(|element| {
            element
                .children()
                .filter_map(|child| match child.value() {
                    Node::Comment(c) => Some(String::from(&*c.comment)),
                    _ => None,
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Parse a state block, accepting HTML-escaped JSON as a fallback.
fn decode_state_block(raw: &str) -> Option<Value> {
    let raw = raw.trim();
    serde_json::from_str(raw).ok().or_else(|| {
        let unescaped = raw
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&amp;", "&");
        serde_json::from_str(&unescaped).ok()
    })
}

/// Python-style truthiness: null, false, 0, and empty containers are falsy.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// First truthy value among `keys`.
fn first_truthy<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|k| map.get(*k)).find(|v| truthy(v))
}

/// Render a scalar as text; null becomes empty.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `commentary.text.text`
fn commentary_text(map: &Map<String, Value>) -> Option<&Value> {
    map.get("commentary")?
        .as_object()?
        .get("text")?
        .as_object()?
        .get("text")
        .filter(|v| truthy(v))
}

/// `post_text`, `text` or `commentary`, unwrapping a `{ "text": … }` object.
fn generic_text(map: &Map<String, Value>) -> Option<&Value> {
    let value = first_truthy(map, &["post_text", "text", "commentary"])?;
    match value {
        Value::Object(inner) => inner.get("text"),
        other => Some(other),
    }
}

fn state_post(map: &Map<String, Value>) -> Option<ScrapedPost> {
    let text = commentary_text(map)
        .or_else(|| generic_text(map))?
        .as_str()?;
    if text.chars().count() <= MIN_POST_CHARS {
        return None;
    }

    let date_posted = match first_truthy(map, &["date_posted", "postedAt", "publishedAt", "createdAt"]) {
        Some(v) => scalar_text(v),
        None => match map.get("created") {
            Some(Value::Object(created)) => created.get("time").map(scalar_text).unwrap_or_default(),
            Some(other) => scalar_text(other),
            None => String::new(),
        },
    };

    let title = match map.get("title") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Object(t)) => t.get("text").and_then(Value::as_str).unwrap_or_default().to_string(),
        _ => String::new(),
    };

    Some(ScrapedPost {
        title,
        post_text: text.trim().to_string(),
        date_posted,
    })
}

/// Strategy 1: depth-first search for post-shaped objects. A matching
/// object is not searched further.
fn collect_state_posts(value: &Value, depth: usize, out: &mut Vec<ScrapedPost>) {
    if depth > MAX_JSON_DEPTH {
        return;
    }
    match value {
        Value::Object(map) => {
            if let Some(post) = state_post(map) {
                out.push(post);
                return;
            }
            for child in map.values() {
                collect_state_posts(child, depth + 1, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_state_posts(item, depth + 1, out);
            }
        }
        _ => {}
    }
}

/// First string value among `keys`, or empty.
fn first_str(map: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|k| map.get(*k).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

fn names_post_type(ty: &str) -> bool {
    ty.contains("Posting") || ty.contains("Article")
}

/// Whether a JSON-LD `@type` names a posting or article.
fn is_post_type(ty: Option<&Value>) -> bool {
    match ty {
        Some(Value::String(s)) => names_post_type(s),
        Some(Value::Array(types)) => types.iter().filter_map(Value::as_str).any(names_post_type),
        _ => false,
    }
}

/// Strategy 2: JSON-LD postings and articles, including nested entities.
fn collect_ld_posts(value: &Value, depth: usize, out: &mut Vec<ScrapedPost>) {
    if depth > MAX_JSON_DEPTH {
        return;
    }
    let map = match value {
        Value::Array(items) => {
            for item in items {
                collect_ld_posts(item, depth + 1, out);
            }
            return;
        }
        Value::Object(map) => map,
        _ => return,
    };

    if is_post_type(map.get("@type")) {
        let text = ["articleBody", "text", "description"]
            .iter()
            .filter_map(|k| map.get(*k).and_then(Value::as_str))
            .find(|s| !s.is_empty());
        if let Some(text) = text {
            out.push(ScrapedPost {
                title: first_str(map, &["headline", "name"]),
                post_text: text.trim().to_string(),
                date_posted: first_str(map, &["datePublished", "dateCreated"]),
            });
        }
    }

    for key in LD_CONTAINER_KEYS {
        if let Some(nested) = map.get(key).filter(|v| truthy(v)) {
            collect_ld_posts(nested, depth + 1, out);
        }
    }
}

/// Strategy 3: scan raw HTML for post-bearing elements.
fn collect_markup_posts(html: &str, out: &mut Vec<ScrapedPost>) {
    for pattern in MARKUP_PATTERNS.iter() {
        for caps in pattern.captures_iter(html) {
            let stripped = TAG_RE.replace_all(&caps[1], "");
            let clean = WS_RE.replace_all(stripped.trim(), " ");
            if clean.chars().count() > MIN_POST_CHARS {
                out.push(ScrapedPost {
                    title: String::new(),
                    post_text: clean.into_owned(),
                    date_posted: String::new(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn code_block(value: &Value) -> String {
        format!(r#"<code style="display: none" id="bpr-guid-1"><!--{value}--></code>"#)
    }

    fn ld_block(value: &Value) -> String {
        format!(r#"<script type="application/ld+json">{value}</script>"#)
    }

    fn page(body: &str) -> String {
        format!("<!DOCTYPE html><html><head></head><body>{body}</body></html>")
    }

    #[test]
    fn state_block_commentary_with_nested_created_time() {
        let state = json!({
            "included": [
                {"entityUrn": "urn:li:activity:1", "noise": "short"},
                {
                    "commentary": {"text": {"text": "  We just opened our new Brisbane office!  "}},
                    "created": {"time": 1717200000000u64},
                    "title": {"text": "Office news"}
                }
            ]
        });
        let found = extract_posts(&page(&code_block(&state)));

        assert_eq!(found.state_blocks, 1);
        assert!(!found.used_markup_fallback);
        assert_eq!(found.posts.len(), 1);
        let post = &found.posts[0];
        assert_eq!(post.post_text, "We just opened our new Brisbane office!");
        assert_eq!(post.date_posted, "1717200000000");
        assert_eq!(post.title, "Office news");
    }

    #[test]
    fn state_block_generic_text_and_date_fallbacks() {
        let state = json!([
            {"text": "Too short to count"},
            {"text": {"text": "Proud to announce our ISO 27001 certification"}, "publishedAt": "2025-03-01"},
            {"post_text": "Welcoming three new engineers to the team", "created": "2025-02-01"}
        ]);
        let found = extract_posts(&page(&code_block(&state)));

        let dates: Vec<_> = found.posts.iter().map(|p| p.date_posted.as_str()).collect();
        assert_eq!(dates, ["2025-03-01", "2025-02-01"]);
    }

    #[test]
    fn matched_object_is_not_searched_further() {
        let state = json!({
            "text": "An outer post long enough to be kept here",
            "nested": {"text": "An inner post that should not be collected"}
        });
        let found = extract_posts(&page(&code_block(&state)));
        assert_eq!(found.posts.len(), 1);
        assert!(found.posts[0].post_text.starts_with("An outer"));
    }

    #[test]
    fn html_escaped_state_block_is_decoded() {
        let html = page(
            r#"<code><!--{&quot;commentary&quot;:&quot;Celebrating ten years of growth &amp; success&quot;}--></code>"#,
        );
        let found = extract_posts(&html);
        assert_eq!(found.posts.len(), 1);
        assert_eq!(found.posts[0].post_text, "Celebrating ten years of growth & success");
    }

    #[test]
    fn ld_json_postings_inside_containers() {
        let ld = json!({
            "@context": "https://schema.org",
            "@graph": [
                {"@type": "Organization", "name": "Acme", "description": "An organisation, not a post"},
                {
                    "@type": "ItemList",
                    "itemListElement": [
                        {
                            "@type": "SocialMediaPosting",
                            "headline": "Hiring",
                            "text": "We are hiring senior engineers in Melbourne",
                            "datePublished": "2025-05-04"
                        },
                        {"@type": ["NewsArticle"], "name": "Award", "articleBody": "Acme named a finalist in the Telstra awards"}
                    ]
                }
            ]
        });
        let found = extract_posts(&page(&ld_block(&ld)));

        assert_eq!(found.ld_blocks, 1);
        assert_eq!(found.posts.len(), 2);
        assert_eq!(found.posts[0].title, "Hiring");
        assert_eq!(found.posts[0].date_posted, "2025-05-04");
        assert_eq!(found.posts[1].title, "Award");
        assert_eq!(found.posts[1].date_posted, "");
    }

    #[test]
    fn markup_fallback_strips_tags_and_whitespace() {
        let html = page(
            r#"<div data-test-id="main-feed-activity-card__commentary" dir="ltr">
                 Thrilled to <a href="/x">partner</a> with   <b>Acme Bank</b>
                 on our next release
               </div>
               <p class="break-words text-sm">tiny</p>"#,
        );
        let found = extract_posts(&html);

        assert!(found.used_markup_fallback);
        assert_eq!(found.posts.len(), 1);
        assert_eq!(
            found.posts[0].post_text,
            "Thrilled to partner with Acme Bank on our next release"
        );
    }

    #[test]
    fn markup_fallback_skipped_when_structured_data_found() {
        let ld = json!({"@type": "SocialMediaPosting", "text": "Structured post text that is long enough"});
        let html = page(&format!(
            r#"{}<div class="update-components-text">Markup post text that is also long enough</div>"#,
            ld_block(&ld)
        ));
        let found = extract_posts(&html);

        assert!(!found.used_markup_fallback);
        assert_eq!(found.posts.len(), 1);
        assert!(found.posts[0].post_text.starts_with("Structured"));
    }

    #[test]
    fn duplicate_prefixes_across_blocks_collapse() {
        let shared = "x".repeat(DEDUP_PREFIX_CHARS);
        let first = json!({"commentary": {"text": {"text": format!("{shared} first ending")}}});
        let second = json!({"commentary": {"text": {"text": format!("{shared} second ending")}}});
        let html = page(&format!("{}{}", code_block(&first), code_block(&second)));

        let found = extract_posts(&html);
        assert_eq!(found.posts.len(), 2);

        let unique = dedupe_posts(found.posts);
        assert_eq!(unique.len(), 1);
        assert!(unique[0].post_text.ends_with("first ending"));
    }

    #[test]
    fn dedupe_keeps_first_seen_order() {
        let post = |t: &str| ScrapedPost {
            title: String::new(),
            post_text: t.into(),
            date_posted: String::new(),
        };
        let unique = dedupe_posts(vec![post("b"), post(""), post("a"), post("b"), post("c"), post("a")]);
        let texts: Vec<_> = unique.iter().map(|p| p.post_text.as_str()).collect();
        assert_eq!(texts, ["b", "a", "c"]);
    }

    #[test]
    fn depth_guard_bounds_the_search() {
        let mut value = json!({"text": "A post buried far too deep to be searched"});
        for _ in 0..(MAX_JSON_DEPTH + 10) {
            value = json!({ "child": value });
        }
        let mut out = Vec::new();
        collect_state_posts(&value, 0, &mut out);
        assert!(out.is_empty());

        let mut shallow = json!({"text": "A post at a reasonable nesting depth"});
        for _ in 0..10 {
            shallow = json!([shallow]);
        }
        collect_state_posts(&shallow, 0, &mut out);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn malformed_blocks_are_skipped() {
        let html = page(
            r#"<code><!--{not json--></code><script type="application/ld+json">{oops</script>"#,
        );
        let found = extract_posts(&html);
        assert_eq!(found.state_blocks, 1);
        assert_eq!(found.ld_blocks, 1);
        assert!(found.posts.is_empty());
        assert!(found.used_markup_fallback);
    }
}
