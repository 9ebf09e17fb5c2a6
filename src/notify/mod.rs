// src/notify/mod.rs
pub mod slack;

use anyhow::Result;

use crate::question::Question;

pub use slack::SlackNotifier;

/// Where new questions are announced.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, questions: &[&Question]) -> Result<()>;
}

/// Logs instead of posting. Used for `--dry-run`.
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, questions: &[&Question]) -> Result<()> {
        for q in questions {
            tracing::info!(id = %q.question_id, title = %q.title, link = %q.link, "new question");
        }
        Ok(())
    }
}

/// Slack mrkdwn line for one question: `<link|title> [tag] [tag]`.
pub fn format_question(q: &Question) -> String {
    let mut text = format!("<{}|{}>", q.link, q.title);
    for tag in &q.tags {
        text.push_str(" [");
        text.push_str(tag);
        text.push(']');
    }
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn message_has_link_title_and_tags() {
        let now = Utc::now();
        let q = Question {
            question_id: "1".into(),
            title: "Lifetimes?".into(),
            link: "https://stackoverflow.com/q/1".into(),
            tags: vec!["rust".into(), "lifetimes".into()],
            creation_date: now,
            last_activity_date: now,
        };
        assert_eq!(
            format_question(&q),
            "<https://stackoverflow.com/q/1|Lifetimes?> [rust] [lifetimes]\n"
        );
    }
}
