//! Downloading and parsing a configured feed.

use anyhow::{Context, Result};
use webcal_sync_core::SourceEvent;
use webcal_sync_core::ics::parse_feed;
use webcal_sync_core::normalize::normalize;

/// `webcal://` is just a hint for calendar apps; the feed itself is served over HTTPS.
pub fn http_url(url: &str) -> String {
    for scheme in ["webcal://", "webcals://"] {
        if let Some(rest) = url.strip_prefix(scheme) {
            return format!("https://{}", rest);
        }
    }
    url.to_string()
}

pub async fn fetch(url: &str) -> Result<String> {
    let http_url = http_url(url);

    let response = reqwest::get(&http_url)
        .await
        .with_context(|| format!("Failed to fetch feed {}", http_url))?
        .error_for_status()
        .with_context(|| format!("Feed {} returned an error", http_url))?;

    response
        .text()
        .await
        .with_context(|| format!("Failed to read feed {}", http_url))
}

/// Fetch, parse and normalize the feed's events, in feed order
pub async fn load_sources(url: &str) -> Result<Vec<SourceEvent>> {
    let content = fetch(url).await?;
    let raw = parse_feed(&content).with_context(|| format!("Failed to parse feed {}", url))?;

    Ok(raw.into_iter().map(normalize).collect())
}
