//! Cache discipline integration tests: read-through, population on create,
//! and synchronous invalidation on commit.

mod common;

use std::time::Duration;

use common::TestHarness;

use tally_cache::{Cache, Lookup};
use tally_ledger::keys;

#[tokio::test]
async fn create_account_populates_the_balance_entry() {
    let harness = TestHarness::new();
    harness.register("alice").await;

    let lookup = harness.cache.get(&keys::balance("alice")).unwrap();
    assert_eq!(lookup, Lookup::Hit(b"0".to_vec()));
}

#[tokio::test]
async fn balance_read_repopulates_after_a_miss() {
    let harness = TestHarness::new();
    let alice = harness.register_funded("alice", 50_000).await;

    // The top-up invalidated the created-at-zero entry.
    assert_eq!(
        harness.cache.get(&keys::balance("alice")).unwrap(),
        Lookup::Miss
    );

    // The read falls through to the store and repopulates the cache.
    assert_eq!(harness.ledger.balance(&alice).await.unwrap(), 50_000);
    assert_eq!(
        harness.cache.get(&keys::balance("alice")).unwrap(),
        Lookup::Hit(b"50000".to_vec())
    );
}

#[tokio::test]
async fn balances_reflect_a_transfer_even_when_previously_cached() {
    let harness = TestHarness::new();
    let alice = harness.register_funded("alice", 50_000).await;
    let bob = harness.register("bob").await;

    // Serve both balances once so they are cached.
    assert_eq!(harness.ledger.balance(&alice).await.unwrap(), 50_000);
    assert_eq!(harness.ledger.balance(&bob).await.unwrap(), 0);

    harness.ledger.transfer(&alice, 20_000, "bob").await.unwrap();

    // Both entries were invalidated with the commit; neither read may see
    // the pre-transfer value.
    assert_eq!(harness.ledger.balance(&alice).await.unwrap(), 30_000);
    assert_eq!(harness.ledger.balance(&bob).await.unwrap(), 20_000);
}

#[tokio::test]
async fn transfer_invalidates_views_for_both_parties() {
    let harness = TestHarness::new();
    let alice = harness.register_funded("alice", 50_000).await;
    let bob = harness.register("bob").await;

    // Prime every derived view.
    harness.ledger.top_users().await.unwrap();
    harness.ledger.top_transactions(&alice).await.unwrap();
    harness.ledger.top_transactions(&bob).await.unwrap();
    assert!(harness.cache.get(keys::TOP_USERS).unwrap().is_hit());

    harness.ledger.transfer(&alice, 20_000, "bob").await.unwrap();

    assert_eq!(harness.cache.get(keys::TOP_USERS).unwrap(), Lookup::Miss);
    assert_eq!(
        harness.cache.get(&keys::history(alice.account_id)).unwrap(),
        Lookup::Miss
    );
    assert_eq!(
        harness.cache.get(&keys::history(bob.account_id)).unwrap(),
        Lookup::Miss
    );
    assert_eq!(
        harness.cache.get(&keys::balance("alice")).unwrap(),
        Lookup::Miss
    );
    assert_eq!(
        harness.cache.get(&keys::balance("bob")).unwrap(),
        Lookup::Miss
    );
}

#[tokio::test]
async fn topup_invalidates_only_the_balance_entry() {
    let harness = TestHarness::new();
    let alice = harness.register_funded("alice", 1_000).await;
    harness.register("bob").await;
    harness.ledger.transfer(&alice, 100, "bob").await.unwrap();

    // Prime everything.
    harness.ledger.balance(&alice).await.unwrap();
    harness.ledger.top_users().await.unwrap();
    harness.ledger.top_transactions(&alice).await.unwrap();

    harness.ledger.topup(&alice, 500).await.unwrap();

    assert_eq!(
        harness.cache.get(&keys::balance("alice")).unwrap(),
        Lookup::Miss
    );
    assert!(harness.cache.get(keys::TOP_USERS).unwrap().is_hit());
    assert!(harness
        .cache
        .get(&keys::history(alice.account_id))
        .unwrap()
        .is_hit());
}

#[tokio::test]
async fn undecodable_cache_entry_degrades_to_the_store() {
    let harness = TestHarness::new();
    let alice = harness.register_funded("alice", 7_500).await;

    // Poison the cached balance with bytes that do not decode as a number.
    harness
        .cache
        .set(&keys::balance("alice"), b"not-a-number", Duration::from_secs(60))
        .unwrap();

    // The read must not fail and must not invent a value: it falls back to
    // the store and replaces the poisoned entry.
    assert_eq!(harness.ledger.balance(&alice).await.unwrap(), 7_500);
    assert_eq!(
        harness.cache.get(&keys::balance("alice")).unwrap(),
        Lookup::Hit(b"7500".to_vec())
    );
}
