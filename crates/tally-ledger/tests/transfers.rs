//! Transfer protocol integration tests.

mod common;

use common::TestHarness;

use tally_core::{LedgerError, MutationKind};
use tally_store::Store;

// ============================================================================
// Happy path
// ============================================================================

#[tokio::test]
async fn topup_then_transfer_moves_value() {
    let harness = TestHarness::new();

    let alice = harness.register("alice").await;
    harness.ledger.topup(&alice, 50_000).await.unwrap();
    assert_eq!(harness.ledger.balance(&alice).await.unwrap(), 50_000);

    let bob = harness.register("bob").await;

    let receipt = harness.ledger.transfer(&alice, 20_000, "bob").await.unwrap();
    assert_eq!(receipt.sender_balance, 30_000);

    assert_eq!(harness.ledger.balance(&alice).await.unwrap(), 30_000);
    assert_eq!(harness.ledger.balance(&bob).await.unwrap(), 20_000);
}

#[tokio::test]
async fn committed_transfer_writes_exactly_two_linked_legs() {
    let harness = TestHarness::new();
    let alice = harness.register_funded("alice", 50_000).await;
    let bob = harness.register("bob").await;

    let receipt = harness.ledger.transfer(&alice, 20_000, "bob").await.unwrap();

    let sender_legs: Vec<_> = harness
        .store
        .mutations_for(alice.account_id, 100, 0)
        .await
        .unwrap()
        .into_iter()
        .filter(|m| m.ref_id == receipt.ref_id)
        .collect();
    let receiver_legs: Vec<_> = harness
        .store
        .mutations_for(bob.account_id, 100, 0)
        .await
        .unwrap()
        .into_iter()
        .filter(|m| m.ref_id == receipt.ref_id)
        .collect();

    assert_eq!(sender_legs.len(), 1);
    assert_eq!(receiver_legs.len(), 1);

    let outgoing = &sender_legs[0];
    let incoming = &receiver_legs[0];
    assert_eq!(outgoing.kind, MutationKind::Outgoing);
    assert_eq!(incoming.kind, MutationKind::Incoming);
    assert_eq!(outgoing.value, 20_000);
    assert_eq!(incoming.value, 20_000);
    assert_eq!(outgoing.created_at, incoming.created_at);
}

// ============================================================================
// Failure modes
// ============================================================================

#[tokio::test]
async fn insufficient_balance_leaves_sender_untouched() {
    let harness = TestHarness::new();
    let alice = harness.register_funded("alice", 50_000).await;
    harness.register("bob").await;

    let err = harness
        .ledger
        .transfer(&alice, 999_999_999, "bob")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientBalance { required } if required == 999_999_999));

    assert_eq!(harness.ledger.balance(&alice).await.unwrap(), 50_000);
}

#[tokio::test]
async fn unknown_destination_leaves_sender_untouched() {
    let harness = TestHarness::new();
    let alice = harness.register_funded("alice", 50_000).await;

    let err = harness
        .ledger
        .transfer(&alice, 1_000, "nonexistent")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::DestinationNotFound { username } if username == "nonexistent"));

    assert_eq!(harness.ledger.balance(&alice).await.unwrap(), 50_000);
    assert_eq!(
        harness
            .store
            .outgoing_total(alice.account_id)
            .await
            .unwrap()
            .total_outgoing,
        0
    );

    // No half-written transfer legs either: the only mutation is the top-up.
    let mutations = harness
        .store
        .mutations_for(alice.account_id, 100, 0)
        .await
        .unwrap();
    assert_eq!(mutations.len(), 1);
    assert_eq!(mutations[0].kind, MutationKind::Topup);
}

#[tokio::test]
async fn duplicate_username_is_a_conflict() {
    let harness = TestHarness::new();
    harness.register("alice").await;

    let err = harness.ledger.create_account("alice").await.unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyExists { username } if username == "alice"));
}

#[tokio::test]
async fn non_positive_amounts_are_rejected_before_the_store() {
    let harness = TestHarness::new();
    let alice = harness.register_funded("alice", 1_000).await;
    harness.register("bob").await;

    for amount in [0, -1, -20_000] {
        assert!(matches!(
            harness.ledger.topup(&alice, amount).await.unwrap_err(),
            LedgerError::InvalidAmount(_)
        ));
        assert!(matches!(
            harness.ledger.transfer(&alice, amount, "bob").await.unwrap_err(),
            LedgerError::InvalidAmount(_)
        ));
    }

    // Nothing reached the store.
    assert_eq!(harness.ledger.balance(&alice).await.unwrap(), 1_000);
    let mutations = harness
        .store
        .mutations_for(alice.account_id, 100, 0)
        .await
        .unwrap();
    assert_eq!(mutations.len(), 1);
}

#[tokio::test]
async fn blank_usernames_are_rejected() {
    let harness = TestHarness::new();

    assert!(matches!(
        harness.ledger.create_account("  ").await.unwrap_err(),
        LedgerError::InvalidUsername(_)
    ));

    let alice = harness.register_funded("alice", 1_000).await;
    assert!(matches!(
        harness.ledger.transfer(&alice, 100, "").await.unwrap_err(),
        LedgerError::InvalidUsername(_)
    ));
}

// ============================================================================
// Balance invariant under contention
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_transfers_never_overdraw_the_sender() {
    let harness = TestHarness::new();
    let alice = harness.register_funded("alice", 1_000).await;
    let bob = harness.register("bob").await;

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let ledger = harness.ledger.clone();
        let sender = alice.clone();
        tasks.push(tokio::spawn(async move {
            ledger.transfer(&sender, 100, "bob").await
        }));
    }

    let mut committed = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => committed += 1,
            Err(err) => {
                assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
            }
        }
    }

    // The balance covered exactly ten of the twenty attempts; each of the
    // others failed its own conditional debit.
    assert_eq!(committed, 10);
    assert_eq!(harness.ledger.balance(&alice).await.unwrap(), 0);
    assert_eq!(harness.ledger.balance(&bob).await.unwrap(), 1_000);
}
