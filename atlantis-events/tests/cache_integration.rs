//! Integration tests for the cache and accumulation engine.
//!
//! Exercises the query-key fast path and the accumulation set together, the
//! way a request handler uses them.

use std::time::Duration;

use atlantis_events::accumulate::dedup_by_identifier;
use atlantis_events::{
    extract_pins, AccumulationMerger, BoundingBox, CacheConfig, Pin, QueryKey, TemporalGeoCache,
    TimeWindow, Viewport,
};

fn raw_batch(ids: &[&str]) -> String {
    let records: Vec<String> = ids
        .iter()
        .map(|id| {
            format!(
                r#"{{"event_id": "{id}", "title": "T", "date": "2024-01-02", "lat": 1.3, "lng": 103.8, "location_label": "Singapore", "category": "economics", "significance_score": 0.5, "one_liner": "x", "confidence": 0.5, "positivity_scale": 0.5}}"#
            )
        })
        .collect();
    format!("[{}]", records.join(", "))
}

fn window() -> TimeWindow {
    TimeWindow::parse("2024-01-01", "2024-01-03").expect("window")
}

fn viewport(west: f64) -> Viewport {
    Viewport {
        bbox: BoundingBox {
            west,
            south: 1.1,
            east: west + 0.5,
            north: 1.5,
        },
        zoom: 9.4,
    }
}

fn setup(config: CacheConfig) -> (TemporalGeoCache, AccumulationMerger) {
    let cache = TemporalGeoCache::new(config).expect("cache");
    let merger = AccumulationMerger::new(cache.clone());
    (cache, merger)
}

#[tokio::test]
async fn viewports_converge_into_one_accumulated_set() {
    let (cache, merger) = setup(CacheConfig::default());
    let ttl = cache.config().pins_ttl();

    for (west, ids) in [(103.6, ["P1", "P2"]), (104.2, ["P2", "P3"])] {
        let extraction = extract_pins(&raw_batch(&ids), Some(&window()));
        let key = QueryKey::new(&window(), &viewport(west), "en", 8);
        cache.set_pins(key.digest(), extraction.pins.clone(), ttl).await;
        merger.merge(&window(), "en", &extraction.pins).await;
    }

    let ids: Vec<String> = merger
        .current(&window(), "en")
        .await
        .iter()
        .map(|p| p.event_id.clone())
        .collect();
    assert_eq!(ids, ["P1", "P2", "P3"]);
}

#[tokio::test]
async fn cache_hit_refolds_into_expired_accumulation() {
    let config = CacheConfig {
        accumulation_ttl_seconds: 1,
        ..CacheConfig::default()
    };
    let (cache, merger) = setup(config);
    let key = QueryKey::new(&window(), &viewport(103.6), "en", 8).digest();

    let pins = extract_pins(&raw_batch(&["P1"]), None).pins;
    cache.set_pins(key.clone(), pins.clone(), Duration::from_secs(30)).await;
    merger.merge(&window(), "en", &pins).await;

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(merger.current(&window(), "en").await.is_empty());

    let hit = cache.get_pins(&key).await.expect("query entry still live");
    let merged = merger.merge(&window(), "en", &hit).await;
    assert_eq!(merged.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_for_same_window_keep_every_pin() {
    let (_cache, merger) = setup(CacheConfig::default());
    let handles: Vec<_> = (0..16)
        .map(|i| {
            let merger = merger.clone();
            tokio::spawn(async move {
                let a = format!("evt_{i}_a");
                let b = format!("evt_{i}_b");
                let pins = extract_pins(&raw_batch(&[a.as_str(), b.as_str(), "shared"]), None).pins;
                merger.merge(&window(), "en", &pins).await.len()
            })
        })
        .collect();

    let mut sizes = Vec::new();
    for handle in handles {
        sizes.push(handle.await.expect("task"));
    }
    assert!(sizes.iter().all(|&n| n >= 3));
    assert_eq!(merger.current(&window(), "en").await.len(), 33);
}

#[tokio::test]
async fn merge_result_is_independent_of_call_order() {
    let a = extract_pins(&raw_batch(&["P1", "P2", "P3"]), None).pins;
    let b = extract_pins(&raw_batch(&["P3", "P4", "P1", "P5"]), None).pins;

    let (_cache, forward) = setup(CacheConfig::default());
    forward.merge(&window(), "en", &a).await;
    let forward = forward.merge(&window(), "en", &b).await;

    let (_cache, backward) = setup(CacheConfig::default());
    backward.merge(&window(), "en", &b).await;
    let backward = backward.merge(&window(), "en", &a).await;

    let sorted_ids = |pins: &[Pin]| {
        let mut ids: Vec<String> = pins.iter().map(|p| p.event_id.clone()).collect();
        ids.sort();
        ids
    };
    let expected = sorted_ids(&dedup_by_identifier(a.iter().chain(&b).cloned()));
    assert_eq!(expected, ["P1", "P2", "P3", "P4", "P5"]);
    assert_eq!(sorted_ids(&forward), expected);
    assert_eq!(sorted_ids(&backward), expected);
}
