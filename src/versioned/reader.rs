// src/versioned/reader.rs
use std::collections::BTreeMap;

use super::{
    detect_version, FormatError, FormatUpgradeStep, JsonCodec, VersionedFormat, VersionedRecord,
};

/// Reads any registered version of `R` and writes the current one.
pub struct VersionedRecordReader<R: VersionedRecord> {
    codec: JsonCodec,
    steps: BTreeMap<u32, Box<dyn FormatUpgradeStep<R>>>,
}

impl<R: VersionedRecord> VersionedRecordReader<R> {
    pub fn new(codec: JsonCodec) -> Self {
        Self {
            codec,
            steps: BTreeMap::new(),
        }
    }

    /// Register the step for one legacy version. A later registration for
    /// the same version replaces the earlier one.
    pub fn with_step<S>(mut self, step: S) -> Self
    where
        S: FormatUpgradeStep<R> + 'static,
    {
        self.steps.insert(step.version(), Box::new(step));
        self
    }

    pub fn codec(&self) -> &JsonCodec {
        &self.codec
    }

    /// Legacy versions this reader can upgrade from, ascending.
    pub fn legacy_versions(&self) -> impl Iterator<Item = u32> + '_ {
        self.steps.keys().copied()
    }

    pub fn detect_version(&self, raw: &[u8]) -> Result<u32, FormatError> {
        detect_version(&self.codec, raw)
    }

    pub fn read(&self, raw: &[u8]) -> Result<R::Current, FormatError> {
        let version = self.detect_version(raw)?;
        if version == R::CURRENT_VERSION {
            return self
                .codec
                .decode(raw)
                .map_err(|e| FormatError::malformed(version, e));
        }

        let mut record = self.step_for(version)?.decode(&self.codec, raw)?;
        // Each hop must raise the version, so more hops than steps means a
        // step is going round in circles.
        let mut hops = 0;
        loop {
            let from = record.version();
            if from == R::CURRENT_VERSION {
                return record
                    .into_current()
                    .map_err(|other| FormatError::TypeMismatch {
                        expected: std::any::type_name::<R::Current>(),
                        found: other.shape(),
                    });
            }
            if hops >= self.steps.len() {
                return Err(FormatError::NonMonotonicUpgrade { from, to: from });
            }

            let next = self.step_for(from)?.upgrade(record)?;
            if next.version() <= from {
                return Err(FormatError::NonMonotonicUpgrade {
                    from,
                    to: next.version(),
                });
            }
            record = next;
            hops += 1;
        }
    }

    pub fn write(&self, current: &R::Current) -> Result<Vec<u8>, FormatError> {
        self.codec
            .encode(current)
            .map_err(|source| FormatError::Encode {
                version: R::CURRENT_VERSION,
                source,
            })
    }

    fn step_for(&self, version: u32) -> Result<&dyn FormatUpgradeStep<R>, FormatError> {
        self.steps
            .get(&version)
            .map(|s| &**s)
            .ok_or(FormatError::UnknownVersion {
                version,
                current: R::CURRENT_VERSION,
            })
    }
}
