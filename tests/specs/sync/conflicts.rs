// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end specs for conflict resolution policies and the cache.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use chrono::Duration;
use eddy_core::{
    photo_key, ActionPayload, CacheValue, ClockSource, ConflictPolicy, ConnectionKind,
    ConnectivityState,
};
use eddy_sync::EngineConfig;
use specs::{harness, photo, Harness};

fn online_with_policy(policy: ConflictPolicy) -> Harness {
    harness(
        ConnectivityState::online(ConnectionKind::Wifi),
        EngineConfig {
            policy,
            ..EngineConfig::default()
        },
    )
}

#[tokio::test]
async fn server_wins_refreshes_cache_and_drops_local_change() {
    let h = online_with_policy(ConflictPolicy::ServerWins);
    h.service.start().await;

    // Remote updated at t=20s after the local edit
    h.remote.insert(photo("p1", "Server title", 220));
    h.service.enqueue(
        ActionPayload::update_photo(photo("p1", "Client title", 210)),
        None,
    );

    let report = h.service.sync_now().await.unwrap();

    assert!(report.success);
    assert_eq!(report.synced_count, 1);
    // Remote untouched, cache refreshed, action gone without a retry
    assert_eq!(h.remote.get("p1").unwrap().title, "Server title");
    let Some(CacheValue::Photo(cached)) = h.service.cache_get(&photo_key("p1")) else {
        unreachable!("expected cached remote copy")
    };
    assert_eq!(cached.title, "Server title");
    assert_eq!(h.service.pending_count(), 0);
}

#[tokio::test]
async fn client_wins_is_the_default_and_forces_the_local_value() {
    let h = online_with_policy(ConflictPolicy::default());
    h.service.start().await;

    h.remote.insert(photo("p1", "Server title", 220));
    h.service.enqueue(
        ActionPayload::update_photo(photo("p1", "Client title", 210)),
        None,
    );

    let report = h.service.sync_now().await.unwrap();

    assert!(report.success);
    assert_eq!(report.synced_count, 1);
    assert_eq!(h.remote.get("p1").unwrap().title, "Client title");
}

#[tokio::test]
async fn merge_policy_combines_both_sides() {
    let h = online_with_policy(ConflictPolicy::Merge);
    h.service.start().await;

    let mut remote = photo("p1", "Server title", 300);
    remote.storage_ref = "blob/server/p1".to_string();
    h.remote.insert(remote);
    // Local mutable fields are newer
    h.service.enqueue(
        ActionPayload::update_photo(photo("p1", "Client title", 400)),
        None,
    );

    let report = h.service.sync_now().await.unwrap();

    assert!(report.success);
    let merged = h.remote.get("p1").unwrap();
    assert_eq!(merged.title, "Client title");
    assert_eq!(merged.storage_ref, "blob/server/p1");
}

#[tokio::test]
async fn manual_policy_without_resolver_reports_and_continues() {
    let h = online_with_policy(ConflictPolicy::Manual);
    h.service.start().await;

    h.remote.insert(photo("p1", "Server title", 300));
    h.service.enqueue(
        ActionPayload::update_photo(photo("p1", "Client title", 200)),
        None,
    );
    h.service.enqueue(
        ActionPayload::create_photo(photo("p2", "Unaffected", 150)),
        None,
    );

    let report = h.service.sync_now().await.unwrap();

    assert!(!report.success);
    assert_eq!(report.synced_count, 1);
    assert_eq!(report.failed_count, 1);
    assert!(!report.errors[0].retryable);
    // The sibling landed; the conflicted action is not retried
    assert_eq!(h.remote.get("p2").unwrap().title, "Unaffected");
    assert_eq!(h.service.pending_count(), 0);
}

#[tokio::test]
async fn force_sync_overrides_then_restores_the_policy() {
    let h = online_with_policy(ConflictPolicy::ServerWins);
    h.service.start().await;

    h.remote.insert(photo("p1", "Server v1", 300));
    h.service.enqueue(
        ActionPayload::update_photo(photo("p1", "Client v1", 200)),
        None,
    );
    let forced = h.service.force_sync().await.unwrap();
    assert!(forced.success);
    assert_eq!(h.remote.get("p1").unwrap().title, "Client v1");

    // Next plain run is back to server-wins
    h.remote.insert(photo("p2", "Server v2", 300));
    h.service.enqueue(
        ActionPayload::update_photo(photo("p2", "Client v2", 200)),
        None,
    );
    let normal = h.service.sync_now().await.unwrap();
    assert!(normal.success);
    assert_eq!(h.remote.get("p2").unwrap().title, "Server v2");
}

#[tokio::test]
async fn cache_entry_expires_at_its_boundary() {
    let h = online_with_policy(ConflictPolicy::default());

    h.service.cache_set(
        photo_key("p1"),
        CacheValue::Photo(photo("p1", "Ephemeral", 150)),
        Some(Duration::seconds(10)),
    );

    // Just before expiry: served
    h.clock.advance(9);
    assert!(h.service.cache_get(&photo_key("p1")).is_some());

    // At expiry: gone, and the discovering read evicted it
    h.clock.advance(1);
    assert!(h.service.cache_get(&photo_key("p1")).is_none());
    assert!(h.service.cache_get(&photo_key("p1")).is_none());
}

#[tokio::test]
async fn incremental_sync_invalidates_cached_list_views() {
    let h = online_with_policy(ConflictPolicy::default());
    h.service.start().await;

    h.service.cache_set(
        "photos:recent",
        CacheValue::PhotoList(vec![photo("stale", "Stale", 100)]),
        None,
    );
    h.remote.insert(photo("p1", "New on server", 5_000));

    let report = h
        .service
        .incremental_sync(Some(h.clock.now()))
        .await
        .unwrap();

    assert!(report.success);
    // The list view is invalidated; the entity cache is fresh
    assert!(h.service.cache_get("photos:recent").is_none());
    assert!(h.service.cache_get(&photo_key("p1")).is_some());
}
