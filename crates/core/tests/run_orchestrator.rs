use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use pricewatch_core::{
    Barcode, Catalog, CatalogStore, ChangeEvent, DeliveryError, Direction, FetchError,
    FetchErrorKind, FetchResult, FetchedPrice, InMemoryCatalogStore, InMemoryNotifier,
    Notifier, PriceFetcher, PriceStatus, RunError, RunOrchestrator, RunSettings, StoreError,
};
use rust_decimal::Decimal;
use tokio::sync::oneshot;

struct ScriptedFetcher {
    script: Mutex<HashMap<String, VecDeque<FetchResult>>>,
}

impl ScriptedFetcher {
    fn new(entries: Vec<(&str, Vec<FetchResult>)>) -> Self {
        let script = entries
            .into_iter()
            .map(|(barcode, results)| (barcode.to_owned(), results.into_iter().collect()))
            .collect();
        Self { script: Mutex::new(script) }
    }
}

#[async_trait]
impl PriceFetcher for ScriptedFetcher {
    async fn fetch(&self, barcode: &Barcode) -> FetchResult {
        let mut script = self.script.lock().expect("script lock");
        script
            .get_mut(barcode.as_str())
            .and_then(VecDeque::pop_front)
            .unwrap_or(Err(FetchError::NotFound))
    }
}

/// Answers immediately except for the listed barcodes, which never resolve.
struct HangingFetcher {
    hang_on: HashSet<String>,
    price: Decimal,
}

#[async_trait]
impl PriceFetcher for HangingFetcher {
    async fn fetch(&self, barcode: &Barcode) -> FetchResult {
        if self.hang_on.contains(barcode.as_str()) {
            std::future::pending::<()>().await;
        }
        Ok(FetchedPrice::new(self.price))
    }
}

/// Fires the shutdown signal from inside its only fetch, just before answering.
struct SignallingFetcher {
    signal: Mutex<Option<oneshot::Sender<()>>>,
}

#[async_trait]
impl PriceFetcher for SignallingFetcher {
    async fn fetch(&self, _barcode: &Barcode) -> FetchResult {
        if let Some(signal) = self.signal.lock().expect("signal lock").take() {
            let _ = signal.send(());
        }
        price(700)
    }
}

struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _event: &ChangeEvent) -> Result<(), DeliveryError> {
        Err(DeliveryError::Transport("connection refused".to_owned()))
    }
}

struct FailingSaveStore {
    inner: InMemoryCatalogStore,
}

#[async_trait]
impl CatalogStore for FailingSaveStore {
    async fn load(&self) -> Result<Catalog, StoreError> {
        self.inner.load().await
    }

    async fn save(&self, _catalog: &Catalog) -> Result<(), StoreError> {
        Err(StoreError::Io {
            path: PathBuf::from("/read-only/catalog.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        })
    }

    fn location(&self) -> String {
        "/read-only/catalog.json".to_owned()
    }
}

fn barcode(raw: &str) -> Barcode {
    Barcode::parse(raw).expect("valid barcode")
}

fn price(cents: i64) -> FetchResult {
    Ok(FetchedPrice::new(Decimal::new(cents, 2)))
}

fn catalog_of(barcodes: &[&str]) -> Catalog {
    let mut catalog = Catalog::new();
    for raw in barcodes {
        catalog.register(barcode(raw), None, Utc::now()).expect("register");
    }
    catalog
}

fn settings() -> RunSettings {
    RunSettings { max_concurrency: 2, fetch_timeout: Duration::from_secs(5) }
}

#[tokio::test]
async fn price_drop_across_two_runs_notifies_once() {
    let store = Arc::new(InMemoryCatalogStore::with_catalog(catalog_of(&["7891000053508"])));
    let fetcher = Arc::new(ScriptedFetcher::new(vec![(
        "7891000053508",
        vec![
            Ok(FetchedPrice::new(Decimal::new(3250, 2)).with_name("Cafe Torrado 500g")),
            price(2990),
        ],
    )]));
    let notifier = InMemoryNotifier::default();
    let orchestrator =
        RunOrchestrator::new(store.clone(), fetcher, Arc::new(notifier.clone()), settings());

    let first = orchestrator.run().await.expect("first run");
    assert_eq!(first.counts.initialized, 1);
    assert!(first.changes.is_empty());
    assert!(notifier.events().is_empty(), "first observation never notifies");

    let second = orchestrator.run().await.expect("second run");
    assert_eq!(second.counts.changed, 1);
    assert_eq!(second.notifications_delivered, 1);

    let events = notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].previous_price, Decimal::new(3250, 2));
    assert_eq!(events[0].current_price, Decimal::new(2990, 2));
    assert_eq!(events[0].variation_pct, Some(Decimal::new(-800, 2)));
    assert_eq!(events[0].direction, Direction::Decrease);
    assert_eq!(events[0].display_name(), "Cafe Torrado 500g");

    let saved = store.snapshot().await.expect("catalog persisted");
    let record = saved.get(&barcode("7891000053508")).expect("record kept");
    assert_eq!(record.status(), PriceStatus::Monitoring);
    assert_eq!(record.history().len(), 2);
    assert_eq!(store.save_count(), 2, "each run saves exactly once");
}

#[tokio::test]
async fn failures_are_isolated_per_record() {
    let store = Arc::new(InMemoryCatalogStore::with_catalog(catalog_of(&["111", "222", "333"])));
    let fetcher = Arc::new(ScriptedFetcher::new(vec![
        ("111", vec![price(1000)]),
        ("222", vec![Err(FetchError::MalformedResponse("missing price".to_owned()))]),
        ("333", vec![Err(FetchError::TransientNetwork("connection reset".to_owned()))]),
    ]));
    let orchestrator = RunOrchestrator::new(
        store.clone(),
        fetcher,
        Arc::new(InMemoryNotifier::default()),
        settings(),
    );

    let summary = orchestrator.run().await.expect("run");

    assert_eq!(summary.total, 3);
    assert_eq!(summary.counts.initialized, 1);
    assert_eq!(summary.counts.no_change, 2);
    assert_eq!(summary.failures_by_kind.get(&FetchErrorKind::MalformedResponse), Some(&1));
    assert_eq!(summary.failures_by_kind.get(&FetchErrorKind::TransientNetwork), Some(&1));

    let saved = store.snapshot().await.expect("catalog persisted");
    let ok = saved.get(&barcode("111")).expect("record 111");
    assert_eq!(ok.status(), PriceStatus::Monitoring);
    let failed = saved.get(&barcode("222")).expect("record 222");
    assert_eq!(failed.status(), PriceStatus::Error);
    assert_eq!(failed.last_error(), Some(FetchErrorKind::MalformedResponse));
    assert!(failed.history().is_empty());
}

#[tokio::test]
async fn slow_source_is_reported_as_timeout() {
    let store = Arc::new(InMemoryCatalogStore::with_catalog(catalog_of(&["10", "20"])));
    let fetcher = Arc::new(HangingFetcher {
        hang_on: HashSet::from(["20".to_owned()]),
        price: Decimal::new(500, 2),
    });
    let orchestrator = RunOrchestrator::new(
        store.clone(),
        fetcher,
        Arc::new(InMemoryNotifier::default()),
        RunSettings { max_concurrency: 2, fetch_timeout: Duration::from_millis(50) },
    );

    let summary = orchestrator.run().await.expect("run");

    assert!(!summary.cancelled);
    assert_eq!(summary.counts.initialized, 1);
    assert_eq!(summary.failures_by_kind.get(&FetchErrorKind::Timeout), Some(&1));
    let saved = store.snapshot().await.expect("catalog persisted");
    let timed_out = saved.get(&barcode("20")).expect("record 20");
    assert_eq!(timed_out.last_error(), Some(FetchErrorKind::Timeout));
}

#[tokio::test]
async fn cancellation_persists_completed_records() {
    let store = Arc::new(InMemoryCatalogStore::with_catalog(catalog_of(&["1", "2", "3"])));
    let fetcher = Arc::new(HangingFetcher {
        hang_on: HashSet::from(["2".to_owned()]),
        price: Decimal::new(1234, 2),
    });
    let orchestrator = RunOrchestrator::new(
        store.clone(),
        fetcher,
        Arc::new(InMemoryNotifier::default()),
        RunSettings { max_concurrency: 3, fetch_timeout: Duration::from_secs(30) },
    );

    let summary = orchestrator
        .run_until(tokio::time::sleep(Duration::from_millis(100)))
        .await
        .expect("cancelled run still persists");

    assert!(summary.cancelled);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.counts.initialized, 2);
    assert_eq!(store.save_count(), 1);

    let saved = store.snapshot().await.expect("catalog persisted");
    assert_eq!(saved.get(&barcode("1")).map(|r| r.status()), Some(PriceStatus::Monitoring));
    assert_eq!(saved.get(&barcode("2")).map(|r| r.status()), Some(PriceStatus::Pending));
    assert_eq!(saved.get(&barcode("3")).map(|r| r.status()), Some(PriceStatus::Monitoring));
}

#[tokio::test]
async fn shutdown_racing_the_last_fetch_is_not_a_cancellation() {
    let store = Arc::new(InMemoryCatalogStore::with_catalog(catalog_of(&["8"])));
    let (signal, shutdown) = oneshot::channel();
    let fetcher = Arc::new(SignallingFetcher { signal: Mutex::new(Some(signal)) });
    let orchestrator = RunOrchestrator::new(
        store.clone(),
        fetcher,
        Arc::new(InMemoryNotifier::default()),
        settings(),
    );

    let summary = orchestrator
        .run_until(async move {
            let _ = shutdown.await;
        })
        .await
        .expect("run");

    assert!(!summary.cancelled);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.counts.initialized, 1);
}

#[tokio::test]
async fn notifications_match_changed_outcomes_even_when_delivery_fails() {
    let mut catalog = catalog_of(&["5", "6", "7"]);
    let seed_fetcher = Arc::new(ScriptedFetcher::new(vec![
        ("5", vec![price(100)]),
        ("6", vec![price(200)]),
        ("7", vec![price(300)]),
    ]));
    let seeding = RunOrchestrator::new(
        Arc::new(InMemoryCatalogStore::default()),
        seed_fetcher,
        Arc::new(InMemoryNotifier::default()),
        settings(),
    );
    seeding.process(&mut catalog, std::future::pending()).await;

    let store = Arc::new(InMemoryCatalogStore::with_catalog(catalog));
    let fetcher = Arc::new(ScriptedFetcher::new(vec![
        ("5", vec![price(150)]),
        ("6", vec![price(200)]),
        ("7", vec![price(250)]),
    ]));
    let orchestrator =
        RunOrchestrator::new(store.clone(), fetcher, Arc::new(FailingNotifier), settings());

    let summary = orchestrator.run().await.expect("delivery failures never fail the run");

    let changed: Vec<&str> = summary.changed_barcodes().map(Barcode::as_str).collect();
    assert_eq!(changed, vec!["5", "7"]);
    assert_eq!(summary.counts.changed, 2);
    assert_eq!(summary.notifications_failed, 2);
    assert_eq!(summary.notifications_delivered, 0);

    let saved = store.snapshot().await.expect("catalog persisted");
    let raised = saved.get(&barcode("5")).expect("record 5");
    assert_eq!(raised.current_price(), Some(Decimal::new(150, 2)));
}

#[tokio::test]
async fn persistence_failure_returns_summary_and_catalog() {
    let inner = InMemoryCatalogStore::with_catalog(catalog_of(&["42"]));
    let store = Arc::new(FailingSaveStore { inner });
    let fetcher = Arc::new(ScriptedFetcher::new(vec![("42", vec![price(990)])]));
    let orchestrator =
        RunOrchestrator::new(store, fetcher, Arc::new(InMemoryNotifier::default()), settings());

    let error = orchestrator.run().await.expect_err("save fails");

    match error {
        RunError::Persistence { summary, catalog, source } => {
            assert_eq!(summary.counts.initialized, 1);
            assert_eq!(
                catalog.get(&barcode("42")).and_then(|r| r.current_price()),
                Some(Decimal::new(990, 2))
            );
            assert!(matches!(source, StoreError::Io { .. }));
        }
        other => panic!("expected persistence error, got {other}"),
    }
}

#[tokio::test]
async fn empty_catalog_completes_without_fetching() {
    let store = Arc::new(InMemoryCatalogStore::default());
    let fetcher = Arc::new(ScriptedFetcher::new(Vec::new()));
    let orchestrator = RunOrchestrator::new(
        store.clone(),
        fetcher,
        Arc::new(InMemoryNotifier::default()),
        settings(),
    );

    let summary = orchestrator.run().await.expect("run");

    assert_eq!(summary.total, 0);
    assert!(summary.changes.is_empty());
    assert!(!summary.cancelled);
    assert_eq!(store.save_count(), 1);
}
