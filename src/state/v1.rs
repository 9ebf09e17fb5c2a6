// src/state/v1.rs
use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use super::{DedupState, StateRecord};
use crate::versioned::{default_version, RecordShape, VersionedFormat};

/// The first release accepted questions active up to this long before its
/// previous run.
pub const LEGACY_LEEWAY_MINUTES: i64 = 30;

/// State as written by the first release: timestamps in epoch milliseconds
/// and a flat list of the IDs seen on the previous run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateV1 {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    last_updated: DateTime<Utc>,
    #[serde(default)]
    ids_seen: Vec<String>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    backoff_until: Option<DateTime<Utc>>,
}

impl StateV1 {
    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    pub fn ids_seen(&self) -> &[String] {
        &self.ids_seen
    }

    pub fn backoff_until(&self) -> Option<DateTime<Utc>> {
        self.backoff_until
    }
}

impl VersionedFormat for StateV1 {
    fn version(&self) -> u32 {
        self.version
    }
}

impl RecordShape<StateRecord> for StateV1 {
    const SHAPE: &'static str = "StateV1";

    fn wrap(self) -> StateRecord {
        StateRecord::V1(self)
    }

    fn unwrap(record: StateRecord) -> Result<Self, StateRecord> {
        match record {
            StateRecord::V1(s) => Ok(s),
            other => Err(other),
        }
    }
}

/// v1 kept no creation times, so every remembered ID is pinned to the new
/// cutoff. They drop out of `seen` the first time the cutoff moves.
pub(super) fn upgrade(old: StateV1) -> StateRecord {
    let cutoff = old.last_updated - Duration::minutes(LEGACY_LEEWAY_MINUTES);
    let seen: BTreeMap<String, DateTime<Utc>> =
        old.ids_seen.into_iter().map(|id| (id, cutoff)).collect();
    StateRecord::V2(DedupState::from_parts(cutoff, seen, old.backoff_until))
}
