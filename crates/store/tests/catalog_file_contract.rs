use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use pricewatch_core::{
    apply_fetch, Barcode, Catalog, CatalogStore, FetchError, FetchErrorKind, FetchResult,
    FetchedPrice, InMemoryNotifier, PriceFetcher, PriceStatus, ProductRecord, RunOrchestrator,
    RunSettings,
};
use pricewatch_store::JsonFileCatalogStore;
use rust_decimal::Decimal;
use tempfile::TempDir;

struct FixedPriceFetcher(Decimal);

#[async_trait]
impl PriceFetcher for FixedPriceFetcher {
    async fn fetch(&self, _barcode: &Barcode) -> FetchResult {
        Ok(FetchedPrice::new(self.0))
    }
}

fn orchestrator(store: Arc<JsonFileCatalogStore>, cents: i64) -> RunOrchestrator {
    RunOrchestrator::new(
        store,
        Arc::new(FixedPriceFetcher(Decimal::new(cents, 2))),
        Arc::new(InMemoryNotifier::default()),
        RunSettings { max_concurrency: 2, fetch_timeout: Duration::from_secs(5) },
    )
}

#[tokio::test]
async fn runs_against_a_file_store_survive_reload() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("catalog.json");
    let store = Arc::new(JsonFileCatalogStore::new(&path));

    let mut catalog = Catalog::new();
    for raw in ["7891000053508", "7896004000015"] {
        let barcode = Barcode::parse(raw).expect("barcode");
        catalog.register(barcode, None, Utc::now()).expect("add");
    }
    store.save(&catalog).await.expect("initial save");

    orchestrator(store.clone(), 3250).run().await.expect("first run");
    let summary = orchestrator(store.clone(), 2990).run().await.expect("second run");
    assert_eq!(summary.counts.changed, 2);

    let reloaded = JsonFileCatalogStore::new(&path).load().await.expect("reload from disk");
    assert_eq!(reloaded.len(), 2);
    for record in &reloaded {
        assert_eq!(record.status(), PriceStatus::Monitoring);
        assert_eq!(record.previous_price(), Some(Decimal::new(3250, 2)));
        assert_eq!(record.current_price(), Some(Decimal::new(2990, 2)));
        assert_eq!(record.variation_pct(), Some(Decimal::new(-800, 2)));
        assert_eq!(record.history().len(), 2);
    }

    let order: Vec<&str> = reloaded.barcodes().map(Barcode::as_str).collect();
    assert_eq!(order, vec!["7891000053508", "7896004000015"]);
}

#[tokio::test]
async fn prices_are_stored_as_exact_decimal_strings() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("catalog.json");
    let store = Arc::new(JsonFileCatalogStore::new(&path));
    let mut catalog = Catalog::new();
    catalog.register(Barcode::parse("1").expect("barcode"), None, Utc::now()).expect("add");
    store.save(&catalog).await.expect("seed");

    orchestrator(store, 1999).run().await.expect("run");

    let raw = std::fs::read_to_string(&path).expect("read catalog");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
    assert_eq!(value["products"][0]["current_price"], "19.99");
    assert_eq!(value["products"][0]["history"][0]["price"], "19.99");
}

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, hour, 0, 0).single().expect("timestamp")
}

#[tokio::test]
async fn failed_record_with_long_history_round_trips() {
    let dir = TempDir::new().expect("temp dir");
    let store = JsonFileCatalogStore::new(dir.path().join("catalog.json"));

    let mut record =
        ProductRecord::new(Barcode::parse("07891000053508").expect("barcode"), "Cafe", at(8));
    for (hour, cents) in [(9, 1000), (10, 1150), (11, 1090)] {
        apply_fetch(&mut record, Ok(FetchedPrice::new(Decimal::new(cents, 2))), at(hour));
    }
    apply_fetch(&mut record, Err(FetchError::NotFound), at(12));

    let mut catalog = Catalog::new();
    catalog.add(ProductRecord::new(Barcode::parse("1").expect("barcode"), "", at(8))).expect("add");
    catalog.add(record).expect("add");

    store.save(&catalog).await.expect("save");
    let reloaded = store.load().await.expect("reload");

    assert_eq!(reloaded, catalog);
    let failed = reloaded.get(&Barcode::parse("07891000053508").expect("barcode")).expect("kept");
    assert_eq!(failed.status(), PriceStatus::Error);
    assert_eq!(failed.last_error(), Some(FetchErrorKind::NotFound));
    assert_eq!(failed.last_checked_at(), Some(at(12)));
    assert_eq!(failed.history().len(), 3);
    assert_eq!(failed.previous_price(), Some(Decimal::new(1150, 2)));
    assert_eq!(failed.current_price(), Some(Decimal::new(1090, 2)));
}
