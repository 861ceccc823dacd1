//! Top-headlines feed client.
//!
//! Fetches `{endpoint}?country=..&apiKey=..` and keeps the fields the
//! headline list shows.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

use crate::config::NewsConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Reasons a headline fetch can fail.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("No news API key configured. Set news.api_key in aura.toml or AURA_NEWS_API_KEY.")]
    MissingApiKey,
    #[error("Failed to connect to the news service. Check your internet connection.")]
    Connect,
    #[error("Request to the news service timed out.")]
    Timeout,
    #[error("News API key is invalid or expired.")]
    Unauthorized,
    #[error("Too many requests to the news service. Please wait and try again.")]
    RateLimited,
    #[error("News service error (status {status}): {message}")]
    Status { status: u16, message: String },
    #[error("News service returned an error ({code}): {message}")]
    Api { code: String, message: String },
    #[error("Failed to parse news response: {0}")]
    Parse(String),
    #[error("News request failed: {0}")]
    Request(String),
}

/// One headline as shown in the list.
#[derive(Debug, Clone, PartialEq)]
pub struct Headline {
    pub title: String,
    pub url: String,
    pub source_name: String,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct FeedResponse {
    status: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    source: Option<ArticleSource>,
    #[serde(default)]
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    #[serde(default)]
    name: Option<String>,
}

/// Turns a feed response body into headlines.
///
/// Articles without a title or URL are dropped.
///
/// # Errors
/// - If the body is not valid feed JSON
/// - If the feed reports `status: "error"`
pub fn parse_headlines(body: &str) -> Result<Vec<Headline>, FeedError> {
    let response: FeedResponse =
        serde_json::from_str(body).map_err(|e| FeedError::Parse(e.to_string()))?;

    if response.status != "ok" {
        return Err(FeedError::Api {
            code: response.code.unwrap_or_else(|| response.status.clone()),
            message: response.message.unwrap_or_default(),
        });
    }

    Ok(response
        .articles
        .into_iter()
        .filter_map(|article| {
            let title = article.title.filter(|t| !t.trim().is_empty())?;
            let url = article.url.filter(|u| !u.trim().is_empty())?;
            Some(Headline {
                title,
                url,
                source_name: article
                    .source
                    .and_then(|s| s.name)
                    .unwrap_or_else(|| "Unknown".to_string()),
                published_at: article
                    .published_at
                    .and_then(|p| DateTime::parse_from_rfc3339(&p).ok())
                    .map(|p| p.with_timezone(&Utc)),
            })
        })
        .collect())
}

/// Fetches the current top headlines.
///
/// # Errors
/// - If no API key is configured
/// - On network failures, non-success statuses or malformed responses
pub async fn fetch_headlines(config: &NewsConfig) -> Result<Vec<Headline>, FeedError> {
    let api_key = config.resolved_api_key().ok_or(FeedError::MissingApiKey)?;

    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| FeedError::Request(e.to_string()))?;

    tracing::debug!(
        "News API Call:\n  URL: {}\n  Method: GET\n  Query: country={}, apiKey=<redacted>",
        config.endpoint,
        config.country
    );

    let response = client
        .get(&config.endpoint)
        .query(&[("country", config.country.as_str()), ("apiKey", api_key.as_str())])
        .header(reqwest::header::USER_AGENT, concat!("aura/", env!("CARGO_PKG_VERSION")))
        .send()
        .await
        .map_err(|e| {
            if e.is_connect() {
                FeedError::Connect
            } else if e.is_timeout() {
                FeedError::Timeout
            } else {
                FeedError::Request(e.to_string())
            }
        })?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| FeedError::Request(e.to_string()))?;

    if !status.is_success() {
        return Err(match status.as_u16() {
            401 => FeedError::Unauthorized,
            429 => FeedError::RateLimited,
            code => {
                // Error bodies carry a readable message when they parse
                match parse_headlines(&body) {
                    Err(FeedError::Api { message, .. }) if !message.is_empty() => {
                        FeedError::Status { status: code, message }
                    }
                    _ => FeedError::Status {
                        status: code,
                        message: status.canonical_reason().unwrap_or("Unknown error").to_string(),
                    },
                }
            }
        });
    }

    let headlines = parse_headlines(&body)?;
    tracing::info!("Fetched {} headlines", headlines.len());
    Ok(headlines)
}
