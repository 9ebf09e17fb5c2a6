// src/versioned/step.rs
use super::{FormatError, JsonCodec, RecordShape, VersionedFormat, VersionedRecord};

/// Reads one legacy version of `R` and converts it to the next version up.
pub trait FormatUpgradeStep<R: VersionedRecord>: Send + Sync {
    /// The version this step accepts.
    fn version(&self) -> u32;

    /// The legacy shape this step accepts.
    fn shape(&self) -> &'static str;

    /// Deserialize `raw` into this step's legacy shape.
    fn decode(&self, codec: &JsonCodec, raw: &[u8]) -> Result<R, FormatError>;

    /// Convert `record` into a record with a strictly higher version.
    fn upgrade(&self, record: R) -> Result<R, FormatError>;
}

/// A [`FormatUpgradeStep`] built from a plain conversion function.
///
/// The function only sees well-typed input: `upgrade` refuses records of the
/// wrong shape or version before calling it, and refuses its output if the
/// version did not go up.
pub struct Upgrade<L, R> {
    version: u32,
    convert: fn(L) -> R,
}

impl<L, R> Upgrade<L, R>
where
    L: RecordShape<R>,
    R: VersionedRecord,
{
    pub const fn new(version: u32, convert: fn(L) -> R) -> Self {
        Self { version, convert }
    }
}

impl<L, R> FormatUpgradeStep<R> for Upgrade<L, R>
where
    L: RecordShape<R>,
    R: VersionedRecord,
{
    fn version(&self) -> u32 {
        self.version
    }

    fn shape(&self) -> &'static str {
        L::SHAPE
    }

    fn decode(&self, codec: &JsonCodec, raw: &[u8]) -> Result<R, FormatError> {
        codec
            .decode::<L>(raw)
            .map(L::wrap)
            .map_err(|e| FormatError::malformed(self.version, e))
    }

    fn upgrade(&self, record: R) -> Result<R, FormatError> {
        let legacy = L::unwrap(record).map_err(|other| FormatError::TypeMismatch {
            expected: L::SHAPE,
            found: other.shape(),
        })?;

        let from = legacy.version();
        if from != self.version {
            return Err(FormatError::VersionMismatch {
                expected: self.version,
                found: from,
            });
        }

        let next = (self.convert)(legacy);
        if next.version() <= from {
            return Err(FormatError::NonMonotonicUpgrade {
                from,
                to: next.version(),
            });
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Deserialize)]
    struct Data1 {
        #[serde(default = "crate::versioned::default_version")]
        version: u32,
        value: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Data2 {
        version: u32,
        value: String,
        value2: String,
    }

    #[derive(Debug)]
    enum Data {
        V1(Data1),
        V2(Data2),
    }

    impl VersionedFormat for Data1 {
        fn version(&self) -> u32 {
            self.version
        }
    }

    impl VersionedFormat for Data2 {
        fn version(&self) -> u32 {
            self.version
        }
    }

    impl VersionedFormat for Data {
        fn version(&self) -> u32 {
            match self {
                Data::V1(d) => d.version(),
                Data::V2(d) => d.version(),
            }
        }
    }

    impl VersionedRecord for Data {
        type Current = Data2;
        const CURRENT_VERSION: u32 = 2;

        fn shape(&self) -> &'static str {
            match self {
                Data::V1(_) => Data1::SHAPE,
                Data::V2(_) => Data2::SHAPE,
            }
        }

        fn into_current(self) -> Result<Data2, Self> {
            Data2::unwrap(self)
        }
    }

    impl RecordShape<Data> for Data1 {
        const SHAPE: &'static str = "Data1";

        fn wrap(self) -> Data {
            Data::V1(self)
        }

        fn unwrap(record: Data) -> Result<Self, Data> {
            match record {
                Data::V1(d) => Ok(d),
                other => Err(other),
            }
        }
    }

    impl RecordShape<Data> for Data2 {
        const SHAPE: &'static str = "Data2";

        fn wrap(self) -> Data {
            Data::V2(self)
        }

        fn unwrap(record: Data) -> Result<Self, Data> {
            match record {
                Data::V2(d) => Ok(d),
                other => Err(other),
            }
        }
    }

    fn to_v2(d: Data1) -> Data {
        Data::V2(Data2 {
            version: 2,
            value: d.value,
            value2: "default".into(),
        })
    }

    fn stuck_at_v1(d: Data1) -> Data {
        Data::V2(Data2 {
            version: 1,
            value: d.value,
            value2: "default".into(),
        })
    }

    const STEP: Upgrade<Data1, Data> = Upgrade::new(1, to_v2);

    #[test]
    fn upgrade_fills_new_field() {
        let out = STEP
            .upgrade(Data::V1(Data1 {
                version: 1,
                value: "testValue".into(),
            }))
            .unwrap();
        let d = match out {
            Data::V2(d) => d,
            other => panic!("expected v2, got {other:?}"),
        };
        assert_eq!(d.value, "testValue");
        assert_eq!(d.value2, "default");
        assert_eq!(d.version, 2);
    }

    #[test]
    fn wrong_shape_is_refused() {
        let err = STEP
            .upgrade(Data::V2(Data2 {
                version: 1,
                value: "testValue".into(),
                value2: "testValue2".into(),
            }))
            .unwrap_err();
        assert!(matches!(
            err,
            FormatError::TypeMismatch {
                expected: "Data1",
                found: "Data2"
            }
        ));
    }

    #[test]
    fn wrong_version_is_refused() {
        let err = STEP
            .upgrade(Data::V1(Data1 {
                version: 2,
                value: "testValue".into(),
            }))
            .unwrap_err();
        assert!(matches!(
            err,
            FormatError::VersionMismatch {
                expected: 1,
                found: 2
            }
        ));
    }

    #[test]
    fn step_that_does_not_raise_version_is_a_defect() {
        let bad = Upgrade::new(1, stuck_at_v1);
        let err = bad
            .upgrade(Data::V1(Data1 {
                version: 1,
                value: "testValue".into(),
            }))
            .unwrap_err();
        assert!(matches!(
            err,
            FormatError::NonMonotonicUpgrade { from: 1, to: 1 }
        ));
        assert!(err.is_defect());
    }

    #[test]
    fn decode_defaults_missing_version() {
        let rec = STEP
            .decode(&JsonCodec::compact(), br#"{"value":"v"}"#)
            .unwrap();
        assert_eq!(rec.version(), 1);
        assert_eq!(rec.shape(), "Data1");
    }

    #[test]
    fn decode_reports_shape_mismatch_as_malformed() {
        let err = STEP
            .decode(&JsonCodec::compact(), br#"{"version":1,"value":3}"#)
            .unwrap_err();
        assert!(matches!(
            err,
            FormatError::MalformedRecord { version: 1, .. }
        ));
    }
}
