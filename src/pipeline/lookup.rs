//! Title Lookup
//!
//! Resolves spine text to book titles through a site-restricted Google Custom
//! Search engine.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::types::{LookupError, TitleCandidate};
use crate::config::SearchConfig;

/// Base delay between retries, doubled per attempt
const RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Title search backend
#[async_trait]
pub trait TitleSearch: Send + Sync {
    /// Up to `max_results` candidates in the service's ranking order
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<TitleCandidate>, LookupError>;
}

/// Google Custom Search JSON API client
pub struct CustomSearchClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    engine_id: String,
    retries: u32,
}

impl CustomSearchClient {
    pub fn new(config: &SearchConfig) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LookupError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            engine_id: config.engine_id.clone(),
            retries: config.retries,
        })
    }

    async fn search_once(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<TitleCandidate>, LookupError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("cx", self.engine_id.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(classify)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LookupError::Status { status, body });
        }

        let body = response.text().await.map_err(classify)?;
        parse_response(&body, max_results)
    }
}

#[async_trait]
impl TitleSearch for CustomSearchClient {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<TitleCandidate>, LookupError> {
        tracing::debug!(query = %query, "Querying title search");

        let mut attempt = 0;
        loop {
            match self.search_once(query, max_results).await {
                Err(e) if e.is_transient() && attempt < self.retries => {
                    let delay = RETRY_BACKOFF * 2u32.saturating_pow(attempt);
                    tracing::warn!(
                        query = %query,
                        attempt = attempt + 1,
                        error = %e,
                        "Title search failed, retrying in {:?}",
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

fn classify(e: reqwest::Error) -> LookupError {
    if e.is_timeout() {
        LookupError::TimedOut
    } else {
        LookupError::Network(e.to_string())
    }
}

/// Parse a Custom Search response body.
///
/// A zero `totalResults` yields an empty list even when `items` is absent,
/// which is how the API reports no matches.
pub fn parse_response(body: &str, max_results: usize) -> Result<Vec<TitleCandidate>, LookupError> {
    let json: Value =
        serde_json::from_str(body).map_err(|e| LookupError::MalformedJson(e.to_string()))?;

    let total = &json["searchInformation"]["totalResults"];
    let total = match total {
        Value::String(s) => s.parse::<u64>().map_err(|_| {
            LookupError::MalformedJson(format!("totalResults is not a number: {:?}", s))
        })?,
        Value::Number(n) => n.as_u64().ok_or_else(|| {
            LookupError::MalformedJson(format!("totalResults is not a count: {}", n))
        })?,
        Value::Null => return Err(LookupError::MissingField("searchInformation.totalResults")),
        other => {
            return Err(LookupError::MalformedJson(format!(
                "unexpected totalResults: {}",
                other
            )))
        }
    };

    if total == 0 {
        return Ok(Vec::new());
    }

    let items = json["items"]
        .as_array()
        .ok_or(LookupError::MissingField("items"))?;

    items
        .iter()
        .take(max_results)
        .map(|item| {
            let link = item["link"]
                .as_str()
                .ok_or(LookupError::MissingField("items[].link"))?;
            let title = item["title"]
                .as_str()
                .ok_or(LookupError::MissingField("items[].title"))?;
            Ok(TitleCandidate {
                link: link.to_string(),
                title: title.to_string(),
            })
        })
        .collect()
}
