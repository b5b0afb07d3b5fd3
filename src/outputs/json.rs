//! JSON snapshots of one company's results.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

use crate::error::{NewsError, Result};
use crate::models::{ArticleSchema, ScrapedPost};
use crate::utils::file_stem;

/// Write `schema` to `<data_dir>/<company>.json`.
///
/// The company name the backend reported is preferred; `fallback_name` is
/// used when it is blank.
///
/// # Arguments
///
/// * `data_dir` - Directory the result file is written into.
/// * `schema` - Validated, recency-sorted articles for one company.
/// * `fallback_name` - Queried company name.
///
/// # Returns
///
/// The path of the pretty-printed JSON file.
#[instrument(level = "info", skip_all, fields(data_dir = %data_dir.display()))]
pub async fn write_articles(
    data_dir: &Path,
    schema: &ArticleSchema,
    fallback_name: &str,
) -> Result<PathBuf> {
    let name = if schema.company.trim().is_empty() {
        fallback_name
    } else {
        &schema.company
    };
    let path = data_dir.join(format!("{}.json", file_stem(name)));
    write_pretty(&path, schema).await?;
    info!(path = %path.display(), articles = schema.articles.len(), "Result saved");
    Ok(path)
}

/// Write scraped posts to `<posts_dir>/<company> LinkedIn Posts.json`.
#[instrument(level = "info", skip_all, fields(posts_dir = %posts_dir.display()))]
pub async fn write_posts(posts_dir: &Path, company: &str, posts: &[ScrapedPost]) -> Result<PathBuf> {
    let path = posts_dir.join(format!("{} LinkedIn Posts.json", file_stem(company)));
    write_pretty(&path, posts).await?;
    info!(path = %path.display(), posts = posts.len(), "Posts saved");
    Ok(path)
}

async fn write_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| NewsError::io(path, std::io::Error::other(e)))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| NewsError::io(parent, e))?;
    }
    fs::write(path, json)
        .await
        .map_err(|e| NewsError::io(path, e))
}
