// src/state/mod.rs
//! The persisted deduplication state and its format history.
//!
//! | version | shape         | written by                         |
//! |---------|---------------|------------------------------------|
//! | 1       | [`StateV1`]   | first release, no `version` field  |
//! | 2       | [`DedupState`]| current                            |

mod v1;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::versioned::{
    JsonCodec, RecordShape, Upgrade, VersionedFormat, VersionedRecord, VersionedRecordReader,
};

pub use v1::{StateV1, LEGACY_LEEWAY_MINUTES};

pub const STATE_VERSION: u32 = 2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidState {
    #[error("state has version {0}, expected 2")]
    WrongVersion(u32),
    #[error("seen question {id} created at {created} is older than cutoff {cutoff}")]
    SeenBeforeCutoff {
        id: String,
        created: DateTime<Utc>,
        cutoff: DateTime<Utc>,
    },
}

/// What we remember between runs.
///
/// Every question created before `cutoff` counts as already posted. Questions
/// created at or after it are posted unless their ID is in `seen`. All
/// `seen` entries are at or after `cutoff`, which is checked whenever a state
/// is built from outside data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "DedupStateRepr")]
pub struct DedupState {
    version: u32,
    cutoff: DateTime<Utc>,
    seen: BTreeMap<String, DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    backoff_until: Option<DateTime<Utc>>,
}

impl DedupState {
    pub fn new<I>(cutoff: DateTime<Utc>, seen: I) -> Result<Self, InvalidState>
    where
        I: IntoIterator<Item = (String, DateTime<Utc>)>,
    {
        let seen: BTreeMap<_, _> = seen.into_iter().collect();
        check_seen(cutoff, &seen)?;
        Ok(Self::from_parts(cutoff, seen, None))
    }

    /// Callers guarantee every `seen` entry is at or after `cutoff`.
    pub(crate) fn from_parts(
        cutoff: DateTime<Utc>,
        seen: BTreeMap<String, DateTime<Utc>>,
        backoff_until: Option<DateTime<Utc>>,
    ) -> Self {
        debug_assert!(check_seen(cutoff, &seen).is_ok());
        Self {
            version: STATE_VERSION,
            cutoff,
            seen,
            backoff_until,
        }
    }

    pub fn cutoff(&self) -> DateTime<Utc> {
        self.cutoff
    }

    pub fn seen(&self) -> &BTreeMap<String, DateTime<Utc>> {
        &self.seen
    }

    pub fn has_seen(&self, id: &str) -> bool {
        self.seen.contains_key(id)
    }

    pub fn backoff_until(&self) -> Option<DateTime<Utc>> {
        self.backoff_until
    }

    pub fn with_backoff_until(self, backoff_until: Option<DateTime<Utc>>) -> Self {
        Self {
            backoff_until,
            ..self
        }
    }
}

impl VersionedFormat for DedupState {
    fn version(&self) -> u32 {
        self.version
    }
}

fn check_seen(
    cutoff: DateTime<Utc>,
    seen: &BTreeMap<String, DateTime<Utc>>,
) -> Result<(), InvalidState> {
    match seen.iter().find(|(_, created)| **created < cutoff) {
        Some((id, created)) => Err(InvalidState::SeenBeforeCutoff {
            id: id.clone(),
            created: *created,
            cutoff,
        }),
        None => Ok(()),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DedupStateRepr {
    version: u32,
    cutoff: DateTime<Utc>,
    #[serde(default)]
    seen: BTreeMap<String, DateTime<Utc>>,
    #[serde(default)]
    backoff_until: Option<DateTime<Utc>>,
}

impl TryFrom<DedupStateRepr> for DedupState {
    type Error = InvalidState;

    fn try_from(repr: DedupStateRepr) -> Result<Self, Self::Error> {
        if repr.version != STATE_VERSION {
            return Err(InvalidState::WrongVersion(repr.version));
        }
        check_seen(repr.cutoff, &repr.seen)?;
        Ok(Self::from_parts(repr.cutoff, repr.seen, repr.backoff_until))
    }
}

/// Every shape the state file has had.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateRecord {
    V1(StateV1),
    V2(DedupState),
}

impl VersionedFormat for StateRecord {
    fn version(&self) -> u32 {
        match self {
            StateRecord::V1(s) => s.version(),
            StateRecord::V2(s) => s.version(),
        }
    }
}

impl VersionedRecord for StateRecord {
    type Current = DedupState;
    const CURRENT_VERSION: u32 = STATE_VERSION;

    fn shape(&self) -> &'static str {
        match self {
            StateRecord::V1(_) => StateV1::SHAPE,
            StateRecord::V2(_) => DedupState::SHAPE,
        }
    }

    fn into_current(self) -> Result<DedupState, Self> {
        DedupState::unwrap(self)
    }
}

impl RecordShape<StateRecord> for DedupState {
    const SHAPE: &'static str = "DedupState";

    fn wrap(self) -> StateRecord {
        StateRecord::V2(self)
    }

    fn unwrap(record: StateRecord) -> Result<Self, StateRecord> {
        match record {
            StateRecord::V2(s) => Ok(s),
            other => Err(other),
        }
    }
}

pub type StateReader = VersionedRecordReader<StateRecord>;

/// A reader that understands every state file version ever written.
pub fn state_reader(codec: JsonCodec) -> StateReader {
    VersionedRecordReader::new(codec).with_step(Upgrade::new(1, v1::upgrade))
}
