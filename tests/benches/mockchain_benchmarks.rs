//! # Mockchain Benchmarks
//!
//! | Component | Operation |
//! |-----------|-----------|
//! | shared-types | raw transaction decode |
//! | mc-01 Ledger | validate + apply under the write section |
//! | mc-02 Indexer | output classification |
//! | shared-bus | publish with fan-out, replay from a retained log |

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use mc_01_utxo_ledger::LedgerState;
use mc_02_tx_indexer::{CommitmentDecoder, EnvelopeDecoder};
use serde_json::json;
use shared_bus::{BusConfig, EventPublisher, EventType, NotificationBus, Topic};
use shared_types::bitcoin::Network;
use shared_types::{envelope_script, parse_address, DecodedTransaction, TransactionBuilder, JIG_TAG};

const ADDR: &str = "mh5CE8Nbj38iND267s4XnvhSmhDW7yWc6Q";

fn spend_tx(outputs: usize) -> String {
    let faucet = TransactionBuilder::new()
        .coinbase(1)
        .pay_to_address(ADDR, 1_000_000)
        .unwrap()
        .build();
    let funding = DecodedTransaction::from_transaction(&faucet);
    let mut builder = TransactionBuilder::new().spend(funding.output_location(0));
    for _ in 0..outputs {
        builder = builder.pay_to_address(ADDR, 1_000).unwrap();
    }
    builder.to_hex()
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("shared-types-codec");
    for outputs in [1, 10, 100] {
        let rawtx = spend_tx(outputs);
        group.bench_with_input(BenchmarkId::new("decode", outputs), &rawtx, |b, rawtx| {
            b.iter(|| black_box(DecodedTransaction::from_hex(rawtx).unwrap()))
        });
    }
    group.finish();
}

fn bench_ledger_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("mc-01-ledger");
    for outputs in [1, 10, 100] {
        let rawtx = spend_tx(outputs);
        group.bench_with_input(BenchmarkId::new("validate_apply", outputs), &rawtx, |b, rawtx| {
            b.iter_batched(
                || {
                    let mut state = LedgerState::new(Network::Testnet);
                    let faucet = TransactionBuilder::new()
                        .coinbase(1)
                        .pay_to_address(ADDR, 1_000_000)
                        .unwrap()
                        .build();
                    state.apply(DecodedTransaction::from_transaction(&faucet));
                    (state, DecodedTransaction::from_hex(rawtx).unwrap())
                },
                |(mut state, tx)| {
                    state.validate(&tx).unwrap();
                    black_box(state.apply(tx))
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let decoder = EnvelopeDecoder::default();
    let locking = parse_address(ADDR).unwrap().script_pubkey();
    let jig = envelope_script(JIG_TAG, br#"{"kind":"Coin","type":"Coin"}"#, &locking).unwrap();

    let mut group = c.benchmark_group("mc-02-indexer");
    group.bench_function("classify_payment", |b| {
        b.iter(|| black_box(decoder.classify(&locking).unwrap()))
    });
    group.bench_function("classify_jig", |b| {
        b.iter(|| black_box(decoder.classify(&jig).unwrap()))
    });
    group.finish();
}

fn bench_bus(c: &mut Criterion) {
    let mut group = c.benchmark_group("shared-bus");
    let topic = Topic::address(ADDR);

    for subscribers in [0usize, 10, 100] {
        group.bench_with_input(
            BenchmarkId::new("publish_fanout", subscribers),
            &subscribers,
            |b, &subscribers| {
                b.iter_batched(
                    || {
                        let bus = NotificationBus::new();
                        let subs: Vec<_> = (0..subscribers)
                            .map(|_| bus.subscribe(&[topic.clone()], None))
                            .collect();
                        (bus, subs)
                    },
                    |(bus, subs)| {
                        black_box(bus.publish(topic.clone(), EventType::Utxo, json!({ "n": 1 })));
                        subs
                    },
                    BatchSize::SmallInput,
                )
            },
        );
    }

    let bus = NotificationBus::with_config(BusConfig {
        retention: 10_000,
        ..BusConfig::default()
    });
    for n in 0..10_000 {
        bus.publish(topic.clone(), EventType::Utxo, json!({ "n": n }));
    }
    for after in [9_900u64, 5_000, 0] {
        group.bench_with_input(BenchmarkId::new("replay", 10_000 - after), &after, |b, &after| {
            b.iter(|| black_box(bus.subscribe(&[topic.clone()], Some(after))))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_decode, bench_ledger_apply, bench_classify, bench_bus);
criterion_main!(benches);
