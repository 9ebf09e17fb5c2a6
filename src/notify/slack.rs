use anyhow::{Context, Result};
use reqwest::Client;

use super::{format_question, Notifier};
use crate::question::Question;

pub struct SlackNotifier {
    webhook_url: Option<String>,
    client: Client,
}

impl SlackNotifier {
    pub fn new(url: Option<String>) -> Self {
        Self {
            webhook_url: url,
            client: Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, questions: &[&Question]) -> Result<()> {
        if questions.is_empty() {
            return Ok(());
        }
        let Some(url) = &self.webhook_url else {
            tracing::debug!(count = questions.len(), "Slack disabled (no webhook url)");
            return Ok(());
        };

        // One message per question so each gets its own unfurl.
        for q in questions {
            let body = serde_json::json!({ "text": format_question(q) });
            self.client
                .post(url)
                .json(&body)
                .send()
                .await
                .context("slack post")?
                .error_for_status()
                .with_context(|| format!("slack non-2xx for question {}", q.question_id))?;
        }
        Ok(())
    }
}
