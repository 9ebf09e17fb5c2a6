// src/stack/client.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use reqwest::Client;

use super::{QuestionBatch, QuestionSource};

pub const DEFAULT_API_BASE: &str = "https://api.stackexchange.com/2.3";

/// Queries the Stack Exchange `search` endpoint, newest questions first.
pub struct StackExchangeClient {
    base_url: String,
    key: Option<String>,
    client: Client,
}

impl StackExchangeClient {
    pub fn new(base_url: impl Into<String>, key: Option<String>) -> Result<Self> {
        // The API always gzips its responses.
        let client = Client::builder()
            .gzip(true)
            .build()
            .context("building stack exchange http client")?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key,
            client,
        })
    }
}

#[async_trait]
impl QuestionSource for StackExchangeClient {
    async fn fetch(&self, site: &str, tags: &[String]) -> Result<QuestionBatch> {
        let url = format!("{}/search", self.base_url);
        let tagged = tags.join(";");
        let mut query: Vec<(&str, &str)> = vec![
            ("order", "desc"),
            ("sort", "creation"),
            ("site", site),
            ("tagged", tagged.as_str()),
        ];
        if let Some(key) = self.key.as_deref() {
            query.push(("key", key));
        }

        let resp = self
            .client
            .get(&url)
            .query(&query)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .with_context(|| format!("GET {url} for site {site}"))?;

        let status = resp.status();
        if !status.is_success() {
            counter!("stackexchange_errors_total").increment(1);
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("getting questions for {site} failed: {status} {body}");
        }

        let batch: QuestionBatch = resp
            .json()
            .await
            .with_context(|| format!("parsing search response for {site}"))?;
        tracing::debug!(
            site,
            items = batch.items.len(),
            backoff = ?batch.backoff,
            "fetched questions"
        );
        Ok(batch)
    }

    fn name(&self) -> &'static str {
        "stackexchange"
    }
}
