// src/versioned/error.rs
use thiserror::Error;

/// Everything that can go wrong turning persisted bytes into a current record.
///
/// `MalformedRecord` and `UnknownVersion` describe bad input. The other three
/// mean an upgrade chain is wired or implemented incorrectly; see
/// [`FormatError::is_defect`].
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("malformed version {version} record: {reason}")]
    MalformedRecord { version: u32, reason: String },

    #[error("unknown format version {version} (current is {current})")]
    UnknownVersion { version: u32, current: u32 },

    #[error("upgrade step for version {expected} was given a version {found} record")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("upgrade step expects a `{expected}` record, got `{found}`")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("upgrade from version {from} produced version {to}")]
    NonMonotonicUpgrade { from: u32, to: u32 },

    #[error("encoding version {version} record: {source}")]
    Encode {
        version: u32,
        #[source]
        source: serde_json::Error,
    },
}

impl FormatError {
    pub(crate) fn malformed(version: u32, err: impl ToString) -> Self {
        Self::MalformedRecord {
            version,
            reason: err.to_string(),
        }
    }

    /// True when the error points at a broken upgrade step or registry rather
    /// than at the bytes being read. Such errors must not be retried.
    pub fn is_defect(&self) -> bool {
        matches!(
            self,
            Self::VersionMismatch { .. }
                | Self::TypeMismatch { .. }
                | Self::NonMonotonicUpgrade { .. }
        )
    }
}
