//! # Ledger → Indexer → Bus Flows
//!
//! Scenarios that cross the ledger, the indexer and the notification bus:
//!
//! 1. **Spend notification**: an owner's subscriber sees the spend of its
//!    UTXO before the creation of its change output.
//! 2. **Rejection**: double spends and missing inputs leave the ledger as
//!    it was.
//! 3. **Atomic visibility**: no reader sees an input spent without the
//!    spending transaction's outputs.
//! 4. **Retry safety**: re-indexing produces no duplicate records or events.
//! 5. **Jig history**: successive states share an origin; the latest is
//!    current, even when the states are broadcast concurrently.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use mc_01_utxo_ledger::{InputRejection, LedgerError, UtxoLedgerApi};
    use serde_json::Value;
    use shared_bus::{EventType, Topic};
    use shared_types::{Location, TransactionBuilder};
    use tokio::time::timeout;

    use crate::integration::fixtures::{
        channel_script, jig_script, locking, payment, Harness, ADDR_A, ADDR_B, ADDR_C,
    };

    /// Everything a client could read about the ledger.
    async fn snapshot(h: &Harness, addresses: &[&str]) -> Value {
        let mut utxos = Vec::new();
        for address in addresses {
            utxos.push(h.ledger.utxos(address, true).await.unwrap());
        }
        serde_json::json!({
            "transactions": h.ledger.transactions().await,
            "utxos": utxos,
            "stats": h.ledger.stats().await,
        })
    }

    // =========================================================================
    // SPEND NOTIFICATION
    // =========================================================================

    #[tokio::test]
    async fn test_spend_and_change_notify_owner_in_order() {
        let h = Harness::new();
        let u1 = h.fund(ADDR_A, 100).await;
        assert_eq!(u1.address.as_deref(), Some(ADDR_A));
        assert!(!u1.is_spent());

        let mut sub_a = h.bus.subscribe(&[Topic::address(ADDR_A)], None);
        let rawtx = payment(&[u1.location], &[(ADDR_B, 40), (ADDR_A, 58)]);
        let (mutation, _) = h.broadcast(&rawtx).await.unwrap();

        let spent = h.ledger.is_spent(&u1.location).await.unwrap();
        assert!(spent.spent);
        assert_eq!(spent.spent_txid, Some(mutation.txid));
        assert_eq!(spent.spent_index, Some(0));

        let to_b = h.ledger.utxos(ADDR_B, false).await.unwrap();
        let to_a = h.ledger.utxos(ADDR_A, false).await.unwrap();
        assert_eq!(to_b.len(), 1);
        assert_eq!(to_b[0].satoshis, 40);
        assert_eq!(to_a.len(), 1);
        assert_eq!(to_a[0].satoshis, 58);

        let first = timeout(Duration::from_secs(1), sub_a.recv()).await.unwrap().unwrap();
        let second = timeout(Duration::from_secs(1), sub_a.recv()).await.unwrap().unwrap();
        assert_eq!(first.event_type, EventType::Spent);
        assert_eq!(first.payload["_id"], u1.location.to_string());
        assert_eq!(second.event_type, EventType::Utxo);
        assert_eq!(second.payload["_id"], Location::new(mutation.txid, 1).to_string());
        assert!(first.sequence < second.sequence);
        assert!(sub_a.try_recv().unwrap().is_none());

        let b_events = h.bus.events_since(&Topic::address(ADDR_B), 0);
        assert_eq!(b_events.len(), 1);
        assert_eq!(b_events[0].event_type, EventType::Utxo);
    }

    // =========================================================================
    // REJECTION
    // =========================================================================

    #[tokio::test]
    async fn test_rejected_broadcasts_leave_ledger_unchanged() {
        let h = Harness::new();
        let u1 = h.fund(ADDR_A, 100).await;
        h.broadcast(&payment(&[u1.location], &[(ADDR_B, 90)])).await.unwrap();
        let u2 = h.fund(ADDR_C, 100).await;

        let before = snapshot(&h, &[ADDR_A, ADDR_B, ADDR_C]).await;
        let sequence = h.bus.stats().last_sequence;

        // Already spent, listed after a good input so nothing may be half-applied.
        let double = payment(&[u2.location, u1.location], &[(ADDR_C, 150)]);
        match h.broadcast(&double).await {
            Err(LedgerError::DoubleSpendOrMissingInput { location, reason }) => {
                assert_eq!(location, u1.location);
                assert!(matches!(reason, InputRejection::AlreadySpent { .. }));
            }
            other => panic!("expected double spend, got {other:?}"),
        }

        let missing = Location::new(u2.txid, 9);
        match h.broadcast(&payment(&[u2.location, missing], &[(ADDR_C, 1)])).await {
            Err(LedgerError::DoubleSpendOrMissingInput { location, reason }) => {
                assert_eq!(location, missing);
                assert_eq!(reason, InputRejection::Missing);
            }
            other => panic!("expected missing input, got {other:?}"),
        }

        let duplicate = payment(&[u2.location, u2.location], &[(ADDR_C, 1)]);
        assert!(matches!(
            h.broadcast(&duplicate).await,
            Err(LedgerError::DoubleSpendOrMissingInput {
                reason: InputRejection::DuplicateInput,
                ..
            })
        ));

        assert!(matches!(
            h.broadcast("not hex").await,
            Err(LedgerError::MalformedTransaction(_))
        ));
        let coinbase = TransactionBuilder::new()
            .coinbase(7)
            .pay(locking(ADDR_A), 1)
            .to_hex();
        assert!(matches!(
            h.broadcast(&coinbase).await,
            Err(LedgerError::MalformedTransaction(_))
        ));

        assert_eq!(snapshot(&h, &[ADDR_A, ADDR_B, ADDR_C]).await, before);
        assert_eq!(h.bus.stats().last_sequence, sequence);
    }

    #[tokio::test]
    async fn test_concurrent_spends_of_one_output_have_one_winner() {
        let h = Harness::new();
        let u1 = h.fund(ADDR_A, 1_000).await;

        let mut tasks = Vec::new();
        for i in 0..16u64 {
            let ledger = h.ledger.clone();
            let rawtx = payment(&[u1.location], &[(ADDR_B, 100 + i)]);
            tasks.push(tokio::spawn(async move { ledger.broadcast(&rawtx).await }));
        }

        let mut winners = Vec::new();
        for task in tasks {
            match task.await.unwrap() {
                Ok(mutation) => winners.push(mutation.txid),
                Err(LedgerError::DoubleSpendOrMissingInput { location, .. }) => {
                    assert_eq!(location, u1.location);
                }
                Err(other) => panic!("unexpected error {other}"),
            }
        }

        assert_eq!(winners.len(), 1);
        let spent = h.ledger.is_spent(&u1.location).await.unwrap();
        assert_eq!(spent.spent_txid, Some(winners[0]));
        assert_eq!(h.ledger.utxos(ADDR_B, true).await.unwrap().len(), 1);
    }

    // =========================================================================
    // ATOMIC VISIBILITY
    // =========================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_readers_never_see_partial_broadcast() {
        let h = Harness::new();
        let mut tip = h.fund(ADDR_A, 1_000_000).await.location;

        // Precompute a chain of spends so the reader knows each output.
        let mut chain = Vec::new();
        for _ in 0..50 {
            let rawtx = payment(&[tip], &[(ADDR_A, 1_000)]);
            let txid = shared_types::DecodedTransaction::from_hex(&rawtx).unwrap().txid;
            let next = Location::new(txid, 0);
            chain.push((tip, next, rawtx));
            tip = next;
        }

        let done = Arc::new(AtomicBool::new(false));
        let reader = {
            let ledger = h.ledger.clone();
            let done = done.clone();
            let pairs: Vec<(Location, Location)> =
                chain.iter().map(|(input, output, _)| (*input, *output)).collect();
            tokio::spawn(async move {
                let mut observed_spends = 0;
                while !done.load(Ordering::Acquire) {
                    for (input, output) in &pairs {
                        let spent = ledger.is_spent(input).await.map(|s| s.spent).unwrap_or(false);
                        if spent {
                            observed_spends += 1;
                            let found = ledger.utxos_by_location(&[*output]).await;
                            assert_eq!(found.len(), 1, "{input} spent but {output} missing");
                        }
                    }
                    tokio::task::yield_now().await;
                }
                observed_spends
            })
        };

        for (_, _, rawtx) in &chain {
            h.ledger.broadcast(rawtx).await.unwrap();
            tokio::task::yield_now().await;
        }
        done.store(true, Ordering::Release);

        timeout(Duration::from_secs(10), reader)
            .await
            .expect("reader stuck")
            .expect("reader saw a partial broadcast");
        assert_eq!(h.ledger.utxos(ADDR_A, false).await.unwrap().len(), 1);
    }

    // =========================================================================
    // RETRY SAFETY
    // =========================================================================

    #[tokio::test]
    async fn test_reindex_and_rebroadcast_are_idempotent() {
        let h = Harness::new();
        let funding = h.fund(ADDR_A, 10_000).await;
        let rawtx = TransactionBuilder::new()
            .spend(funding.location)
            .pay(jig_script("Coin", None, ADDR_A), 1_000)
            .pay(channel_script(&[ADDR_B], ADDR_A), 1)
            .to_hex();

        let (mutation, report) = h.broadcast(&rawtx).await.unwrap();
        assert!(report.first_seen);
        assert_eq!(report.jigs.len(), 1);
        assert_eq!(report.channels.len(), 1);
        let stats = h.indexer.stats();
        let sequence = h.bus.stats().last_sequence;

        let again = h.indexer.index(&mutation);
        assert!(!again.first_seen);
        assert!(again.jigs.is_empty());
        assert!(again.channels.is_empty());

        let (replayed, report) = h.broadcast(&rawtx).await.unwrap();
        assert!(replayed.already_known);
        assert_eq!(replayed.txid, mutation.txid);
        assert!(!report.first_seen);

        assert_eq!(h.indexer.stats(), stats);
        assert_eq!(h.indexer.jigs().len(), 1);
        assert_eq!(h.bus.stats().last_sequence, sequence);
        assert_eq!(h.ledger.stats().await.transactions, 2);
    }

    // =========================================================================
    // JIG HISTORY
    // =========================================================================

    #[tokio::test]
    async fn test_jig_states_share_origin() {
        let h = Harness::new();
        let funding = h.fund(ADDR_A, 10_000).await;

        let (first, _) = h
            .broadcast(
                &TransactionBuilder::new()
                    .spend(funding.location)
                    .pay(jig_script("Coin", None, ADDR_A), 1_000)
                    .to_hex(),
            )
            .await
            .unwrap();
        let l1 = Location::new(first.txid, 0);

        // Second state moves to B alongside a plain payment.
        let (second, report) = h
            .broadcast(
                &TransactionBuilder::new()
                    .spend(l1)
                    .pay(locking(ADDR_A), 100)
                    .pay(jig_script("Coin", Some(l1), ADDR_B), 800)
                    .to_hex(),
            )
            .await
            .unwrap();
        let l2 = Location::new(second.txid, 1);
        assert_eq!(report.jigs, vec![l2]);

        let by_kind: Vec<Location> = h.indexer.jigs_by_kind("Coin").iter().map(|j| j.location).collect();
        let by_origin: Vec<Location> = h.indexer.jigs_by_origin(&l1).iter().map(|j| j.location).collect();
        assert_eq!(by_kind, vec![l1, l2]);
        assert_eq!(by_origin, vec![l1, l2]);

        let current = h.indexer.current_state(&l1).unwrap();
        assert_eq!(current.location, l2);
        assert_eq!(current.owner, ADDR_B);
        assert!(!current.is_origin);
        assert!(h.indexer.jig(&l1).unwrap().is_origin);

        // Origin subscribers see both states in order.
        let events = h.bus.events_since(&Topic::origin(l1), 0);
        let locations: Vec<&Value> = events.iter().map(|e| &e.payload["location"]).collect();
        assert_eq!(locations, vec![&Value::from(l1.to_string()), &Value::from(l2.to_string())]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_chained_states_index_in_commit_order() {
        for _ in 0..10 {
            let h = Harness::served();
            let funding = h.fund(ADDR_A, 10_000).await;

            let first = TransactionBuilder::new()
                .spend(funding.location)
                .pay(jig_script("Coin", None, ADDR_A), 1_000)
                .to_hex();
            let l1 = Location::new(
                shared_types::DecodedTransaction::from_hex(&first).unwrap().txid,
                0,
            );
            let second = TransactionBuilder::new()
                .spend(l1)
                .pay(jig_script("Coin", Some(l1), ADDR_B), 900)
                .to_hex();

            let child = {
                let ledger = h.ledger.clone();
                tokio::spawn(async move {
                    loop {
                        match ledger.broadcast(&second).await {
                            Ok(mutation) => break mutation,
                            Err(LedgerError::DoubleSpendOrMissingInput {
                                reason: InputRejection::Missing,
                                ..
                            }) => tokio::task::yield_now().await,
                            Err(other) => panic!("unexpected error {other}"),
                        }
                    }
                })
            };
            let parent = {
                let ledger = h.ledger.clone();
                tokio::spawn(async move { ledger.broadcast(&first).await.unwrap() })
            };
            parent.await.unwrap();
            let l2 = Location::new(child.await.unwrap().txid, 0);
            timeout(Duration::from_secs(5), h.flush()).await.expect("pipeline stuck");

            assert_eq!(h.indexer.current_state(&l1).map(|jig| jig.location), Some(l2));
            let origin_events: Vec<Value> = h
                .bus
                .events_since(&Topic::origin(l1), 0)
                .iter()
                .map(|event| event.payload["location"].clone())
                .collect();
            assert_eq!(
                origin_events,
                vec![Value::from(l1.to_string()), Value::from(l2.to_string())]
            );
        }
    }

    #[tokio::test]
    async fn test_bad_commitment_does_not_block_rest_of_transaction() {
        let h = Harness::new();
        let funding = h.fund(ADDR_A, 10_000).await;
        let broken = shared_types::envelope_script(
            shared_types::JIG_TAG,
            b"{not json",
            &locking(ADDR_A),
        )
        .unwrap();

        let (mutation, report) = h
            .broadcast(
                &TransactionBuilder::new()
                    .spend(funding.location)
                    .pay(broken, 10)
                    .pay(jig_script("Token", None, ADDR_C), 10)
                    .pay(locking(ADDR_B), 10)
                    .to_hex(),
            )
            .await
            .unwrap();

        assert_eq!(mutation.created.len(), 3);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.jigs, vec![Location::new(mutation.txid, 1)]);
        assert_eq!(h.bus.events_since(&Topic::kind("Token"), 0).len(), 1);
        assert_eq!(h.bus.events_since(&Topic::address(ADDR_B), 0).len(), 1);
    }

    #[tokio::test]
    async fn test_channel_reaches_recipients_not_owner() {
        let h = Harness::new();
        let funding = h.fund(ADDR_A, 10_000).await;
        let (mutation, _) = h
            .broadcast(
                &TransactionBuilder::new()
                    .spend(funding.location)
                    .pay(channel_script(&[ADDR_B, ADDR_C, ADDR_A], ADDR_A), 1)
                    .to_hex(),
            )
            .await
            .unwrap();
        let loc = Location::new(mutation.txid, 0);

        let record = h.indexer.channel(&loc).unwrap();
        assert_eq!(record.owner.as_deref(), Some(ADDR_A));

        let is_channel = |topic: Topic| {
            h.bus
                .events_since(&topic, 0)
                .iter()
                .filter(|e| e.event_type == EventType::Channel)
                .count()
        };
        assert_eq!(is_channel(Topic::channel(loc)), 1);
        assert_eq!(is_channel(Topic::address(ADDR_B)), 1);
        assert_eq!(is_channel(Topic::address(ADDR_C)), 1);
        assert_eq!(is_channel(Topic::address(ADDR_A)), 0);
    }
}
