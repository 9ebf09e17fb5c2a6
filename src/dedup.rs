// src/dedup.rs
//! Deciding which fetched questions are new, and what to remember afterwards.
//!
//! Everything here is pure: no clock, no I/O. Callers pass `now` in.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use crate::question::Question;
use crate::state::DedupState;

/// State for the very first run: nothing seen, nothing older than `now` will
/// ever be posted.
pub fn create_default(now: DateTime<Utc>) -> DedupState {
    DedupState::from_parts(now, BTreeMap::new(), None)
}

pub fn is_new(question: &Question, state: &DedupState) -> bool {
    question.created_at() >= state.cutoff() && !state.has_seen(question.id())
}

/// The new questions, in the order they were fetched.
pub fn filter_new<'a>(questions: &'a [Question], state: &DedupState) -> Vec<&'a Question> {
    questions.iter().filter(|q| is_new(q, state)).collect()
}

/// Next state after a run that fetched `fetched`.
///
/// The cutoff moves up to the oldest fetched question but never back, and
/// `seen` keeps only entries at or after it. IDs missing from `fetched` are
/// kept until the cutoff passes them, so a question deleted upstream is not
/// forgotten early. Backoff is cleared; see [`with_backoff`].
pub fn advance(state: &DedupState, fetched: &[Question]) -> DedupState {
    let mut seen = state.seen().clone();
    for q in fetched {
        seen.insert(q.id().to_string(), q.created_at());
    }

    let cutoff = fetched
        .iter()
        .map(Question::created_at)
        .min()
        .map_or(state.cutoff(), |oldest| oldest.max(state.cutoff()));

    seen.retain(|_, created| *created >= cutoff);
    DedupState::from_parts(cutoff, seen, None)
}

/// Stamp a feed-requested cooldown of `secs` seconds onto `state`.
pub fn with_backoff(state: DedupState, now: DateTime<Utc>, secs: u64) -> DedupState {
    let secs = i64::try_from(secs).unwrap_or(i64::MAX);
    let until = Duration::try_seconds(secs)
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    state.with_backoff_until(Some(until))
}

pub fn is_backing_off(state: &DedupState, now: DateTime<Utc>) -> bool {
    state.backoff_until().is_some_and(|until| now < until)
}
