//! Redis-backed store behavior tests.
//!
//! These tests exercise the transition scripts against a live store. Each
//! test uses a fresh random class id so runs never interfere with each other
//! or with leftover state.
//!
//! Requires Redis: `docker run -d -p 6379:6379 redis:7-alpine`
//! Run with: `cargo test --test reservation_store_test -- --ignored`

#![allow(clippy::unwrap_used, clippy::expect_used)]

use boxoffice::store::{RedisTicketStore, TicketStore};
use boxoffice::types::{ClassId, TicketId};
use boxoffice::ReservationError;
use rand::Rng;
use serde_json::json;
use std::collections::HashSet;
use std::time::Duration;

const REDIS_URL: &str = "redis://127.0.0.1:6379";

fn fresh_class() -> ClassId {
    ClassId::new(rand::thread_rng().gen_range(1_000_000..2_000_000))
}

fn tickets(range: std::ops::Range<u32>) -> Vec<serde_json::Value> {
    range
        .map(|i| json!({"ticket_id": i.to_string(), "numbers": [1, 2, 3]}))
        .collect()
}

async fn seeded_store(class: ClassId, n: u32) -> RedisTicketStore {
    let store = RedisTicketStore::connect(REDIS_URL).await.unwrap();
    store.preload(class, &tickets(0..n)).await.unwrap();
    store
}

fn ids_of(reserved: &[boxoffice::types::ReservedTicket]) -> Vec<TicketId> {
    reserved.iter().map(|t| t.id.clone()).collect()
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn preload_populates_pool_and_available() {
    let class = fresh_class();
    let store = seeded_store(class, 10).await;

    let counts = store.counts(class).await.unwrap();
    assert_eq!(counts.available, 10);
    assert_eq!(counts.reserved, 0);
    assert_eq!(counts.sold, 0);
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn reserve_then_rollback_restores_available() {
    let class = fresh_class();
    let store = seeded_store(class, 10).await;

    let reserved = store.reserve_n(class, 4, 30).await.unwrap();
    assert_eq!(reserved.len(), 4);

    let counts = store.counts(class).await.unwrap();
    assert_eq!(counts.available, 6);
    assert_eq!(counts.reserved, 4);
    assert_eq!(store.lease_count(class).await.unwrap(), 4);

    store.rollback(class, &ids_of(&reserved)).await.unwrap();

    let counts = store.counts(class).await.unwrap();
    assert_eq!(counts.available, 10);
    assert_eq!(counts.reserved, 0);
    assert_eq!(counts.sold, 0);
    assert_eq!(store.lease_count(class).await.unwrap(), 0);

    // Set equality, not just cardinality: draining the class again must hand
    // back exactly the seeded ids.
    let drained = store.reserve_n(class, 10, 30).await.unwrap();
    let expected: HashSet<TicketId> = (0..10).map(|i| TicketId::new(i.to_string())).collect();
    assert_eq!(ids_of(&drained).into_iter().collect::<HashSet<_>>(), expected);
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn reserve_then_confirm_moves_to_sold() {
    let class = fresh_class();
    let store = seeded_store(class, 10).await;

    let reserved = store.reserve_n(class, 3, 30).await.unwrap();
    let ids = ids_of(&reserved);

    let acked = store.confirm(class, &ids).await.unwrap();
    assert_eq!(acked, 3);
    assert_eq!(store.sold_count(class, &ids).await.unwrap(), 3);

    let counts = store.counts(class).await.unwrap();
    assert_eq!(counts.available, 7);
    assert_eq!(counts.reserved, 0);
    assert_eq!(counts.sold, 3);
    assert_eq!(store.lease_count(class).await.unwrap(), 0);
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn reserve_returns_the_seeded_payloads() {
    let class = fresh_class();
    let store = RedisTicketStore::connect(REDIS_URL).await.unwrap();
    store
        .preload(class, &[json!({"ticket_id": "42", "numbers": [7, 8, 9]})])
        .await
        .unwrap();

    let reserved = store.reserve_n(class, 1, 30).await.unwrap();
    assert_eq!(reserved.len(), 1);
    assert_eq!(reserved[0].id, TicketId::new("42"));
    let payload = reserved[0].payload.as_ref().unwrap();
    assert_eq!(payload["ticket_id"], "42");
    assert_eq!(payload["numbers"], json!([7, 8, 9]));
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn reserve_underfills_when_short() {
    let class = fresh_class();
    let store = seeded_store(class, 2).await;

    let reserved = store.reserve_n(class, 5, 30).await.unwrap();
    assert_eq!(reserved.len(), 2);

    let counts = store.counts(class).await.unwrap();
    assert_eq!(counts.available, 0);
    assert_eq!(counts.reserved, 2);
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn reserve_on_empty_class_returns_nothing() {
    let class = fresh_class();
    let store = RedisTicketStore::connect(REDIS_URL).await.unwrap();

    let reserved = store.reserve_n(class, 3, 30).await.unwrap();
    assert!(reserved.is_empty());
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn zero_count_and_zero_lease_are_rejected() {
    let class = fresh_class();
    let store = seeded_store(class, 1).await;

    let err = store.reserve_n(class, 0, 30).await.unwrap_err();
    assert!(matches!(err, ReservationError::InvalidRequest(_)));

    let err = store.reserve_n(class, 1, 0).await.unwrap_err();
    assert!(matches!(err, ReservationError::InvalidRequest(_)));

    assert_eq!(store.counts(class).await.unwrap().available, 1);
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn confirm_ignores_ids_that_are_not_reserved() {
    let class = fresh_class();
    let store = seeded_store(class, 3).await;

    let stranger = [TicketId::new("never-reserved")];
    let acked = store.confirm(class, &stranger).await.unwrap();
    assert_eq!(acked, 1);
    assert_eq!(store.sold_count(class, &stranger).await.unwrap(), 0);

    let counts = store.counts(class).await.unwrap();
    assert_eq!(counts.available, 3);
    assert_eq!(counts.sold, 0);
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn reclaim_is_a_noop_without_expired_leases() {
    let class = fresh_class();
    let store = seeded_store(class, 3).await;

    store.reserve_n(class, 3, 600).await.unwrap();
    let reclaimed = store.reclaim_expired(class, 100).await.unwrap();
    assert!(reclaimed.is_empty());

    let counts = store.counts(class).await.unwrap();
    assert_eq!(counts.available, 0);
    assert_eq!(counts.reserved, 3);
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn reclaim_returns_expired_leases_to_available() {
    let class = fresh_class();
    let store = seeded_store(class, 3).await;

    let reserved = store.reserve_n(class, 3, 1).await.unwrap();
    assert_eq!(reserved.len(), 3);
    tokio::time::sleep(Duration::from_secs(2)).await;

    let reclaimed = store.reclaim_expired(class, 100).await.unwrap();
    assert_eq!(reclaimed.len(), 3);
    assert_eq!(
        reclaimed.iter().collect::<HashSet<_>>(),
        ids_of(&reserved).iter().collect::<HashSet<_>>()
    );

    let counts = store.counts(class).await.unwrap();
    assert_eq!(counts.available, 3);
    assert_eq!(counts.reserved, 0);
    assert_eq!(store.lease_count(class).await.unwrap(), 0);
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn reclaim_respects_the_batch_limit() {
    let class = fresh_class();
    let store = seeded_store(class, 5).await;

    store.reserve_n(class, 5, 1).await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    let first = store.reclaim_expired(class, 2).await.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(store.counts(class).await.unwrap().reserved, 3);

    let rest = store.reclaim_expired(class, 100).await.unwrap();
    assert_eq!(rest.len(), 3);
    assert_eq!(store.counts(class).await.unwrap().available, 5);
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn reclaim_does_not_race_live_confirms() {
    // A confirmed ticket has no lease entry left, so a sweep arriving late
    // must not move it anywhere.
    let class = fresh_class();
    let store = seeded_store(class, 2).await;

    let reserved = store.reserve_n(class, 2, 1).await.unwrap();
    let ids = ids_of(&reserved);
    store.confirm(class, &ids).await.unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;
    let reclaimed = store.reclaim_expired(class, 100).await.unwrap();
    assert!(reclaimed.is_empty());

    let counts = store.counts(class).await.unwrap();
    assert_eq!(counts.sold, 2);
    assert_eq!(counts.available, 0);
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn concurrent_reserves_never_hand_out_the_same_id() {
    let class = fresh_class();
    let store = seeded_store(class, 100).await;

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.reserve_n(class, 5, 30).await.unwrap() })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for ticket in handle.await.unwrap() {
            assert!(seen.insert(ticket.id), "id handed out twice");
        }
    }
    assert_eq!(seen.len(), 100);

    let counts = store.counts(class).await.unwrap();
    assert_eq!(counts.available, 0);
    assert_eq!(counts.reserved, 100);
}
