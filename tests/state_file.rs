// tests/state_file.rs
use chrono::{DateTime, Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;
use slack_stacker::dedup::{advance, create_default, with_backoff};
use slack_stacker::state::{state_reader, STATE_VERSION};
use slack_stacker::storage::StateStore;
use slack_stacker::{DedupState, FormatError, JsonCodec, Question};

fn at(d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2016, 1, d, h, 0, 0).unwrap()
}

fn question(id: &str, created: DateTime<Utc>) -> Question {
    Question {
        question_id: id.into(),
        title: String::new(),
        link: String::new(),
        tags: vec![],
        creation_date: created,
        last_activity_date: created,
    }
}

#[test]
fn current_state_round_trips() {
    let reader = state_reader(JsonCodec::pretty());
    // Sub-second precision included: `Utc::now()` cutoffs must survive.
    let now = at(2, 12) + Duration::nanoseconds(123_456_789);
    let state = advance(
        &create_default(now),
        &[question("10", at(3, 1)), question("11", at(3, 2))],
    );
    let state = with_backoff(state, now, 90);

    for s in [create_default(now), state] {
        let bytes = reader.write(&s).unwrap();
        assert_eq!(reader.detect_version(&bytes).unwrap(), STATE_VERSION);
        assert_eq!(reader.read(&bytes).unwrap(), s);
    }
}

#[test]
fn written_file_uses_documented_field_names() {
    let reader = state_reader(JsonCodec::compact());
    let s = DedupState::new(at(2, 12), [("7".to_string(), at(2, 13))]).unwrap();
    let json: serde_json::Value = serde_json::from_slice(&reader.write(&s).unwrap()).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "version": 2,
            "cutoff": "2016-01-02T12:00:00Z",
            "seen": {"7": "2016-01-02T13:00:00Z"}
        })
    );
}

#[test]
fn legacy_unversioned_file_is_upgraded() {
    // What the first release wrote: no version, Jackson epoch-millis dates.
    let raw = br#"{"lastUpdated":1451736000000,"idsSeen":["100","101"],"backoffUntil":null}"#;
    let reader = state_reader(JsonCodec::pretty());
    assert_eq!(reader.detect_version(raw).unwrap(), 1);

    let state = reader.read(raw).unwrap();
    let cutoff = at(2, 12) - Duration::minutes(30);
    assert_eq!(state.cutoff(), cutoff);
    assert_eq!(
        state.seen().keys().cloned().collect::<Vec<_>>(),
        vec!["100".to_string(), "101".to_string()]
    );
    assert_eq!(state.backoff_until(), None);

    // Saving writes the current version.
    let bytes = reader.write(&state).unwrap();
    assert_eq!(reader.detect_version(&bytes).unwrap(), STATE_VERSION);
    assert_eq!(reader.read(&bytes).unwrap(), state);
}

#[test]
fn explicit_v1_with_backoff_is_upgraded() {
    let raw = br#"{"version":1,"lastUpdated":1451736000000,"idsSeen":[],"backoffUntil":1451739600000,"note":"x"}"#;
    let state = state_reader(JsonCodec::compact()).read(raw).unwrap();
    assert_eq!(state.backoff_until(), Some(at(2, 13)));
    assert!(state.seen().is_empty());
}

#[test]
fn seen_entry_older_than_cutoff_is_rejected_on_read() {
    let raw = br#"{"version":2,"cutoff":"2016-01-02T12:00:00Z","seen":{"1":"2016-01-01T12:00:00Z"}}"#;
    let err = state_reader(JsonCodec::compact()).read(raw).unwrap_err();
    assert!(
        matches!(err, FormatError::MalformedRecord { version: 2, .. }),
        "{err:?}"
    );
}

#[test]
fn bad_or_future_files_are_errors_not_defaults() {
    let reader = state_reader(JsonCodec::compact());
    let cases: [(&[u8], fn(&FormatError) -> bool); 4] = [
        (b"", |e| matches!(e, FormatError::MalformedRecord { .. })),
        (br#"{"version":"two"}"#, |e| {
            matches!(e, FormatError::MalformedRecord { .. })
        }),
        (br#"{"version":2,"seen":{}}"#, |e| {
            matches!(e, FormatError::MalformedRecord { version: 2, .. })
        }),
        (br#"{"version":3,"cutoff":"2016-01-02T12:00:00Z"}"#, |e| {
            matches!(e, FormatError::UnknownVersion { version: 3, current: 2 })
        }),
    ];
    for (raw, expected) in cases {
        let err = reader.read(raw).unwrap_err();
        assert!(expected(&err), "{}: {err:?}", String::from_utf8_lossy(raw));
    }
}

#[test]
fn store_keeps_state_between_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let reader = state_reader(JsonCodec::pretty());
    let s = create_default(at(5, 5));

    StateStore::new(&path)
        .save(&reader.write(&s).unwrap())
        .unwrap();

    let raw = StateStore::new(&path).load().unwrap().expect("state written");
    assert_eq!(reader.read(&raw).unwrap(), s);
}
