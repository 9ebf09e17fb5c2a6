// src/stack/mod.rs
pub mod client;

use anyhow::Result;
use serde::Deserialize;

use crate::question::Question;

pub use client::{StackExchangeClient, DEFAULT_API_BASE};

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct QuestionBatch {
    #[serde(default)]
    pub items: Vec<Question>,
    /// Seconds the API wants us to stay away for.
    #[serde(default)]
    pub backoff: Option<u64>,
}

/// Where questions come from.
#[async_trait::async_trait]
pub trait QuestionSource: Send + Sync {
    /// Newest questions on `site` carrying all of `tags`.
    async fn fetch(&self, site: &str, tags: &[String]) -> Result<QuestionBatch>;
    fn name(&self) -> &'static str;
}
