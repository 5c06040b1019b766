/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! End-to-end coverage of `TrackerAggregator` through its public API
//! (spec §8, scenario 5): a burst of records settles into a single
//! debounced commit, termination flushes whatever is still pending, and a
//! cleared aggregator reports nothing.

use std::sync::Arc;
use std::time::Duration;

use tracker_stats::{BlockedTrackersStore, MemoryStore, TrackerAggregator};

#[tokio::test]
async fn a_burst_of_records_settles_into_one_committed_total() {
    let store = Arc::new(MemoryStore::new());
    let agg = TrackerAggregator::new(store.clone(), Duration::from_millis(30));
    let mut updates = agg.subscribe_updates();

    for _ in 0..5 {
        agg.record("Example Ads Co").await;
    }
    agg.record("Tracker Inc").await;

    tokio::time::timeout(Duration::from_millis(500), updates.recv())
        .await
        .expect("the debounced commit should have fired")
        .unwrap();

    let stats = agg.fetch_privacy_stats().await.unwrap();
    assert_eq!(stats.get("Example Ads Co"), Some(&5));
    assert_eq!(stats.get("Tracker Inc"), Some(&1));
}

#[tokio::test]
async fn termination_flushes_a_pending_commit_even_with_a_long_debounce() {
    let store = Arc::new(MemoryStore::new());
    let agg = TrackerAggregator::new(store.clone(), Duration::from_secs(3600));

    agg.record("Example Ads Co").await;
    agg.record("Example Ads Co").await;
    agg.handle_termination().await.unwrap();

    // Nothing went through the debounce timer; the flush on termination is
    // what landed these counts in the store.
    let today = chrono::Utc::now();
    let counts = store
        .counts_for_day(tracker_stats::start_of_day(today))
        .await
        .unwrap();
    assert_eq!(counts.get("Example Ads Co"), Some(&2));
}

#[tokio::test]
async fn clearing_stats_wipes_both_the_pack_and_the_store() {
    let store = Arc::new(MemoryStore::new());
    let agg = TrackerAggregator::new(store.clone(), Duration::from_millis(20));

    agg.record("Example Ads Co").await;
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(!agg.fetch_privacy_stats().await.unwrap().is_empty());

    agg.clear_privacy_stats().await.unwrap();

    assert!(agg.fetch_privacy_stats().await.unwrap().is_empty());
    assert!(agg.current_day_stats().await.unwrap().is_empty());
}

#[tokio::test]
async fn reset_discards_an_unflushed_burst_without_touching_the_store() {
    let store = Arc::new(MemoryStore::new());
    let agg = TrackerAggregator::new(store.clone(), Duration::from_millis(200));

    agg.record("Example Ads Co").await;
    agg.reset().await;

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(agg.fetch_privacy_stats().await.unwrap().is_empty());
}
