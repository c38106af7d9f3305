//! Run orchestrator: one monitoring pass over the whole catalog.
//!
//! Fetches run concurrently on a bounded pool of tokio tasks, each under a
//! per-fetch timeout. Results are applied on the calling task in catalog
//! order, so a record is only ever mutated by one writer. The catalog is
//! persisted exactly once, after every fetch has finished or been cancelled.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::domain::change::ChangeEvent;
use crate::domain::product::Barcode;
use crate::engine::{apply_fetch, Outcome, OutcomeKind};
use crate::errors::{FetchError, FetchErrorKind, StoreError};
use crate::fetch::{FetchResult, PriceFetcher};
use crate::notify::Notifier;
use crate::store::CatalogStore;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSettings {
    pub max_concurrency: usize,
    pub fetch_timeout: Duration,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self { max_concurrency: 4, fetch_timeout: Duration::from_secs(10) }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub initialized: usize,
    pub unchanged: usize,
    pub changed: usize,
    pub no_change: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total: usize,
    pub counts: OutcomeCounts,
    pub failures_by_kind: BTreeMap<FetchErrorKind, usize>,
    pub notifications_delivered: usize,
    pub notifications_failed: usize,
    /// Records left untouched because the run was cancelled before their fetch completed.
    pub skipped: usize,
    pub cancelled: bool,
    pub changes: Vec<ChangeEvent>,
}

impl RunSummary {
    fn new(run_id: Uuid, started_at: DateTime<Utc>, total: usize) -> Self {
        Self {
            run_id,
            started_at,
            finished_at: started_at,
            total,
            counts: OutcomeCounts::default(),
            failures_by_kind: BTreeMap::new(),
            notifications_delivered: 0,
            notifications_failed: 0,
            skipped: 0,
            cancelled: false,
            changes: Vec::new(),
        }
    }

    fn record(&mut self, outcome: &Outcome) {
        match outcome.kind() {
            OutcomeKind::Initialized => self.counts.initialized += 1,
            OutcomeKind::Unchanged => self.counts.unchanged += 1,
            OutcomeKind::Changed => self.counts.changed += 1,
            OutcomeKind::NoChange => self.counts.no_change += 1,
        }
        if let Some(kind) = outcome.fetch_error_kind() {
            *self.failures_by_kind.entry(kind).or_default() += 1;
        }
        if let Some(event) = outcome.notification() {
            self.changes.push(event.clone());
        }
    }

    pub fn changed_barcodes(&self) -> impl Iterator<Item = &Barcode> {
        self.changes.iter().map(|change| &change.barcode)
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("catalog could not be loaded: {0}")]
    Load(#[source] StoreError),
    /// Every fetch was applied; only the final save failed. The caller may retry
    /// `CatalogStore::save` with the returned catalog.
    #[error("run {run_id} completed but the catalog was not persisted: {source}", run_id = .summary.run_id)]
    Persistence { summary: Box<RunSummary>, catalog: Box<Catalog>, source: StoreError },
}

pub struct RunOrchestrator {
    store: Arc<dyn CatalogStore>,
    fetcher: Arc<dyn PriceFetcher>,
    notifier: Arc<dyn Notifier>,
    settings: RunSettings,
}

impl RunOrchestrator {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        fetcher: Arc<dyn PriceFetcher>,
        notifier: Arc<dyn Notifier>,
        settings: RunSettings,
    ) -> Self {
        Self { store, fetcher, notifier, settings }
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    pub async fn run(&self) -> Result<RunSummary, RunError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs a full pass; resolving `shutdown` cancels outstanding fetches but
    /// still persists whatever completed.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<RunSummary, RunError>
    where
        F: Future<Output = ()> + Send,
    {
        let mut catalog = self.store.load().await.map_err(RunError::Load)?;
        let summary = self.process(&mut catalog, shutdown).await;

        match self.store.save(&catalog).await {
            Ok(()) => {
                info!(
                    event_name = "run.persisted",
                    run_id = %summary.run_id,
                    location = %self.store.location(),
                    records = catalog.len(),
                    "catalog persisted"
                );
                Ok(summary)
            }
            Err(source) => {
                warn!(
                    event_name = "run.persist_failed",
                    run_id = %summary.run_id,
                    location = %self.store.location(),
                    error = %source,
                    "catalog persistence failed; returning in-memory state to caller"
                );
                Err(RunError::Persistence {
                    summary: Box::new(summary),
                    catalog: Box::new(catalog),
                    source,
                })
            }
        }
    }

    pub async fn process<F>(&self, catalog: &mut Catalog, shutdown: F) -> RunSummary
    where
        F: Future<Output = ()> + Send,
    {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let barcodes: Vec<Barcode> = catalog.barcodes().cloned().collect();
        let mut summary = RunSummary::new(run_id, started_at, barcodes.len());

        info!(
            event_name = "run.started",
            run_id = %run_id,
            products = barcodes.len(),
            max_concurrency = self.settings.max_concurrency,
            "starting price monitoring run"
        );

        let (results, cancelled) = self.fetch_all(run_id, &barcodes, shutdown).await;
        summary.cancelled = cancelled;

        for (barcode, result) in barcodes.iter().zip(results) {
            let Some(result) = result else {
                summary.skipped += 1;
                continue;
            };
            let Some(record) = catalog.get_mut(barcode) else {
                continue;
            };

            let outcome = apply_fetch(record, result, Utc::now());
            log_outcome(run_id, barcode, &outcome);
            summary.record(&outcome);

            if let Some(event) = outcome.notification() {
                match self.notifier.notify(event).await {
                    Ok(()) => summary.notifications_delivered += 1,
                    Err(error) => {
                        summary.notifications_failed += 1;
                        warn!(
                            event_name = "run.notification_failed",
                            run_id = %run_id,
                            barcode = %barcode,
                            error = %error,
                            "change notification was not delivered"
                        );
                    }
                }
            }
        }

        summary.finished_at = Utc::now();
        info!(
            event_name = "run.finished",
            run_id = %run_id,
            initialized = summary.counts.initialized,
            unchanged = summary.counts.unchanged,
            changed = summary.counts.changed,
            failed = summary.counts.no_change,
            skipped = summary.skipped,
            cancelled = summary.cancelled,
            "price monitoring run finished"
        );
        summary
    }

    async fn fetch_all<F>(
        &self,
        run_id: Uuid,
        barcodes: &[Barcode],
        shutdown: F,
    ) -> (Vec<Option<FetchResult>>, bool)
    where
        F: Future<Output = ()> + Send,
    {
        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrency.max(1)));
        let timeout = self.settings.fetch_timeout;
        let mut tasks = JoinSet::new();

        for (position, barcode) in barcodes.iter().cloned().enumerate() {
            let fetcher = Arc::clone(&self.fetcher);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let result = match tokio::time::timeout(timeout, fetcher.fetch(&barcode)).await {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout(timeout)),
                };
                (position, result)
            });
        }

        let mut results: Vec<Option<FetchResult>> = barcodes.iter().map(|_| None).collect();
        let mut cancelled = false;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                joined = tasks.join_next() => match joined {
                    Some(Ok((position, result))) => results[position] = Some(result),
                    Some(Err(join_error)) if join_error.is_cancelled() => {}
                    Some(Err(join_error)) => {
                        warn!(
                            event_name = "run.fetch_task_failed",
                            run_id = %run_id,
                            error = %join_error,
                            "fetch task terminated abnormally"
                        );
                    }
                    None => break,
                },
                () = &mut shutdown, if !cancelled => {
                    cancelled = true;
                    warn!(
                        event_name = "run.cancelled",
                        run_id = %run_id,
                        outstanding = tasks.len(),
                        "shutdown requested; aborting outstanding fetches"
                    );
                    tasks.abort_all();
                }
            }
        }

        if !cancelled {
            for result in results.iter_mut().filter(|result| result.is_none()) {
                *result = Some(Err(FetchError::TransientNetwork(
                    "fetch task terminated before reporting a result".to_owned(),
                )));
            }
        }

        (results, cancelled)
    }
}

fn log_outcome(run_id: Uuid, barcode: &Barcode, outcome: &Outcome) {
    match outcome {
        Outcome::Initialized { price } => info!(
            event_name = "run.price_initialized",
            run_id = %run_id,
            barcode = %barcode,
            price = %price,
            "first price recorded"
        ),
        Outcome::Unchanged { price } => debug!(
            event_name = "run.price_unchanged",
            run_id = %run_id,
            barcode = %barcode,
            price = %price,
            "price unchanged"
        ),
        Outcome::Changed(event) => info!(
            event_name = "run.price_changed",
            run_id = %run_id,
            barcode = %barcode,
            previous = %event.previous_price,
            current = %event.current_price,
            variation_pct = ?event.variation_pct,
            direction = event.direction.as_str(),
            "price changed"
        ),
        Outcome::NoChange { error } => warn!(
            event_name = "run.fetch_failed",
            run_id = %run_id,
            barcode = %barcode,
            error_kind = error.kind().as_str(),
            error = %error,
            "price fetch failed"
        ),
    }
}
