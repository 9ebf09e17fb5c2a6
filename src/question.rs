// src/question.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A question as returned by the Stack Exchange API.
///
/// Only the ID and the two timestamps matter for deduplication; the rest is
/// carried along for the notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(deserialize_with = "id_from_number_or_string")]
    pub question_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub creation_date: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub last_activity_date: DateTime<Utc>,
}

impl Question {
    pub fn id(&self) -> &str {
        &self.question_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.creation_date
    }
}

// The API sends numeric IDs; state files key them as strings.
fn id_from_number_or_string<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Num(u64),
        Str(String),
    }

    Ok(match RawId::deserialize(de)? {
        RawId::Num(n) => n.to_string(),
        RawId::Str(s) => s,
    })
}
