//! Aggregation query integration tests.

mod common;

use common::TestHarness;

// ============================================================================
// Transaction history view
// ============================================================================

#[tokio::test]
async fn history_is_signed_sorted_by_magnitude_and_capped() {
    let harness = TestHarness::new();
    let alice = harness.register_funded("alice", 5_000_000).await;
    let bob = harness.register_funded("bob", 2_000_000).await;

    for i in 1..11_i64 {
        harness
            .ledger
            .transfer(&alice, i * 25_000, "bob")
            .await
            .unwrap();
        harness
            .ledger
            .transfer(&bob, i * 17_000, "alice")
            .await
            .unwrap();
    }

    let top = harness.ledger.top_transactions(&alice).await.unwrap();
    assert_eq!(top.len(), 10);

    // Outgoing legs are negative, incoming positive, ordered by absolute
    // value descending; the counterparty is always bob.
    let amounts: Vec<i64> = top.iter().map(|t| t.amount).collect();
    assert_eq!(
        amounts,
        vec![
            -250_000, -225_000, -200_000, -175_000, 170_000, 153_000, -150_000, 136_000, -125_000,
            119_000
        ]
    );
    assert!(top.iter().all(|t| t.username == "bob"));
}

#[tokio::test]
async fn history_excludes_topups() {
    let harness = TestHarness::new();
    let alice = harness.register_funded("alice", 100_000).await;
    harness.register("bob").await;

    harness.ledger.transfer(&alice, 500, "bob").await.unwrap();

    let top = harness.ledger.top_transactions(&alice).await.unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].amount, -500);
}

#[tokio::test]
async fn history_is_refreshed_after_a_new_transfer() {
    let harness = TestHarness::new();
    let alice = harness.register_funded("alice", 100_000).await;
    harness.register("bob").await;

    harness.ledger.transfer(&alice, 1_000, "bob").await.unwrap();

    // Populate the cached view, then commit a larger transfer.
    let before = harness.ledger.top_transactions(&alice).await.unwrap();
    assert_eq!(before.len(), 1);

    harness.ledger.transfer(&alice, 9_000, "bob").await.unwrap();

    let after = harness.ledger.top_transactions(&alice).await.unwrap();
    assert_eq!(after.len(), 2);
    assert_eq!(after[0].amount, -9_000);
}

#[tokio::test]
async fn receiving_party_sees_the_transfer_too() {
    let harness = TestHarness::new();
    let alice = harness.register_funded("alice", 100_000).await;
    let bob = harness.register("bob").await;

    // Prime bob's (empty) cached history, then receive.
    assert!(harness.ledger.top_transactions(&bob).await.unwrap().is_empty());

    harness.ledger.transfer(&alice, 2_500, "bob").await.unwrap();

    let top = harness.ledger.top_transactions(&bob).await.unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].username, "alice");
    assert_eq!(top[0].amount, 2_500);
}

// ============================================================================
// Leaderboard view
// ============================================================================

#[tokio::test]
async fn leaderboard_ranks_by_outgoing_total_and_caps_at_ten() {
    let harness = TestHarness::new();
    harness.register("sink").await;

    for i in 1..13_i64 {
        let caller = harness
            .register_funded(&format!("user{i:02}"), 1_000_000)
            .await;
        harness
            .ledger
            .transfer(&caller, i * 10_000, "sink")
            .await
            .unwrap();
    }

    let top = harness.ledger.top_users().await.unwrap();
    assert_eq!(top.len(), 10);
    assert_eq!(top[0].username, "user12");
    assert_eq!(top[0].total_outgoing, 120_000);
    assert_eq!(top[9].username, "user03");
    assert_eq!(top[9].total_outgoing, 30_000);
}

#[tokio::test]
async fn leaderboard_updates_after_a_transfer_but_not_a_topup() {
    let harness = TestHarness::new();
    let alice = harness.register_funded("alice", 100_000).await;
    let bob = harness.register_funded("bob", 100_000).await;

    harness.ledger.transfer(&alice, 5_000, "bob").await.unwrap();

    let first = harness.ledger.top_users().await.unwrap();
    assert_eq!(first[0].username, "alice");
    assert_eq!(first[0].total_outgoing, 5_000);

    // A top-up does not move outgoing totals; the cached view may be
    // served as-is.
    harness.ledger.topup(&bob, 9_000_000).await.unwrap();
    assert_eq!(harness.ledger.top_users().await.unwrap(), first);

    // A transfer from bob does.
    harness.ledger.transfer(&bob, 8_000, "alice").await.unwrap();
    let second = harness.ledger.top_users().await.unwrap();
    assert_eq!(second[0].username, "bob");
    assert_eq!(second[0].total_outgoing, 8_000);
    assert_eq!(second[1].username, "alice");
}
