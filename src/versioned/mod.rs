// src/versioned/mod.rs
//! Versioned on-disk records.
//!
//! A record type that may change shape over time is modelled as a closed enum
//! of per-version structs (a [`VersionedRecord`]). The newest struct is the
//! one the rest of the program works with; every older struct has exactly one
//! [`FormatUpgradeStep`] that turns it into the next version up. The
//! [`VersionedRecordReader`] detects which version some bytes hold and walks
//! the chain until it reaches the current version. Writing only ever happens
//! in the current version.

pub mod error;
pub mod reader;
pub mod step;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub use error::FormatError;
pub use reader::VersionedRecordReader;
pub use step::{FormatUpgradeStep, Upgrade};

/// Files written before versioning existed have no `version` field.
pub const UNVERSIONED: u32 = 1;

/// Serde default for `version` fields.
pub fn default_version() -> u32 {
    UNVERSIONED
}

/// Anything persisted with a format version tag.
pub trait VersionedFormat {
    fn version(&self) -> u32;
}

/// The closed set of every shape a record type has been persisted in.
pub trait VersionedRecord: VersionedFormat + Sized {
    /// The shape the program reads and writes today.
    type Current: VersionedFormat + Serialize + DeserializeOwned;

    const CURRENT_VERSION: u32;

    /// Name of the shape held by this value, for `TypeMismatch` reports.
    fn shape(&self) -> &'static str;

    /// Hands back the record unchanged if it is not the current shape.
    fn into_current(self) -> Result<Self::Current, Self>;
}

/// One member of a [`VersionedRecord`] family.
pub trait RecordShape<R>: VersionedFormat + DeserializeOwned + Sized {
    const SHAPE: &'static str;

    fn wrap(self) -> R;

    /// Hands back the record unchanged if it holds a different shape.
    fn unwrap(record: R) -> Result<Self, R>;
}

/// JSON encoder/decoder handed to readers explicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonCodec {
    pretty: bool,
}

impl JsonCodec {
    pub fn compact() -> Self {
        Self { pretty: false }
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    pub fn decode<T: DeserializeOwned>(&self, raw: &[u8]) -> Result<T, serde_json::Error> {
        serde_json::from_slice(raw)
    }

    pub fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, serde_json::Error> {
        if self.pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        }
    }
}

#[derive(Deserialize)]
struct VersionProbe {
    #[serde(default)]
    version: Option<u32>,
}

/// Reads only the `version` field of `raw`; all other fields are ignored.
/// A missing (or `null`) version means [`UNVERSIONED`].
pub fn detect_version(codec: &JsonCodec, raw: &[u8]) -> Result<u32, FormatError> {
    let probe: VersionProbe = codec
        .decode(raw)
        .map_err(|e| FormatError::malformed(UNVERSIONED, format!("reading version: {e}")))?;
    Ok(probe.version.unwrap_or(UNVERSIONED))
}
