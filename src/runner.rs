// src/runner.rs
//! One poll: load state, fetch, post what is new, save the next state.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::dedup;
use crate::notify::Notifier;
use crate::question::Question;
use crate::stack::QuestionSource;
use crate::state::{DedupState, StateReader};
use crate::storage::StateStore;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("runs_total", "Runs that got past loading state.");
        describe_counter!(
            "runs_skipped_backoff_total",
            "Runs skipped because the API asked us to back off."
        );
        describe_counter!("questions_fetched_total", "Questions returned by the feed.");
        describe_counter!("questions_new_total", "Questions passed to the notifier.");
    });
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// No state existed; a fresh one was written and nothing was fetched.
    Initialized { cutoff: DateTime<Utc> },
    /// A previous run was told to back off and the deadline has not passed.
    SkippedBackoff { until: DateTime<Utc> },
    Completed {
        fetched: usize,
        notified: usize,
        backoff_until: Option<DateTime<Utc>>,
    },
}

pub struct Runner {
    sites: BTreeMap<String, Vec<String>>,
    source: Box<dyn QuestionSource>,
    notifier: Box<dyn Notifier>,
    store: StateStore,
    reader: StateReader,
}

impl Runner {
    pub fn new(
        sites: BTreeMap<String, Vec<String>>,
        source: Box<dyn QuestionSource>,
        notifier: Box<dyn Notifier>,
        store: StateStore,
        reader: StateReader,
    ) -> Self {
        Self {
            sites,
            source,
            notifier,
            store,
            reader,
        }
    }

    /// Any error leaves the state file as it was, so the next run repeats
    /// this one instead of skipping or double-posting questions.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<RunOutcome> {
        ensure_metrics_described();

        let Some(raw) = self.store.load()? else {
            let fresh = dedup::create_default(now);
            self.save(&fresh)?;
            info!(
                path = %self.store.path().display(),
                "no pre-existing state, wrote default state"
            );
            return Ok(RunOutcome::Initialized {
                cutoff: fresh.cutoff(),
            });
        };

        let version = self.reader.detect_version(&raw)?;
        let old = self
            .reader
            .read(&raw)
            .with_context(|| format!("reading state file {}", self.store.path().display()))?;
        if version != crate::state::STATE_VERSION {
            info!(from = version, "upgraded state file format");
        }

        if dedup::is_backing_off(&old, now) {
            // Checked just above; the deadline is present.
            let until = old.backoff_until().unwrap_or(now);
            counter!("runs_skipped_backoff_total").increment(1);
            info!(%until, "backing off, skipping run");
            return Ok(RunOutcome::SkippedBackoff { until });
        }
        counter!("runs_total").increment(1);

        let mut fetched: Vec<Question> = Vec::new();
        let mut notified = 0usize;
        let mut backoff = None;

        for (site, tags) in &self.sites {
            let batch = self
                .source
                .fetch(site, tags)
                .await
                .with_context(|| format!("{} fetch for {site}", self.source.name()))?;

            let new = dedup::filter_new(&batch.items, &old);
            debug!(site = %site, fetched = batch.items.len(), new = new.len(), "filtered");
            self.notifier.send(&new).await?;
            notified += new.len();
            counter!("questions_new_total").increment(new.len() as u64);
            counter!("questions_fetched_total").increment(batch.items.len() as u64);

            fetched.extend(batch.items);
            if let Some(secs) = batch.backoff.filter(|s| *s > 0) {
                warn!(site = %site, secs, "API asked us to back off");
                backoff = Some(secs);
                break;
            }
        }

        let mut next = dedup::advance(&old, &fetched);
        if let Some(secs) = backoff {
            next = dedup::with_backoff(next, now, secs);
        }
        self.save(&next)?;

        info!(
            fetched = fetched.len(),
            notified,
            cutoff = %next.cutoff(),
            seen = next.seen().len(),
            "run complete"
        );
        Ok(RunOutcome::Completed {
            fetched: fetched.len(),
            notified,
            backoff_until: next.backoff_until(),
        })
    }

    fn save(&self, state: &DedupState) -> Result<()> {
        let bytes = self.reader.write(state)?;
        self.store.save(&bytes)?;
        Ok(())
    }
}
