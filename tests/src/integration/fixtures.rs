//! In-process mockchain for scenario tests.
//!
//! `Harness::new` indexes synchronously, so assertions can follow
//! immediately and `broadcast` returns what the indexer did.
//! `Harness::served` wires the ledger into the asynchronous pipeline the way
//! the node does; its `fund` and `submit` wait for the pipeline to catch up,
//! and `gateway` serves the same components over HTTP.

use std::sync::Arc;

use mc_01_utxo_ledger::{
    InMemoryLedger, LedgerConfig, LedgerMutation, LedgerResult, UtxoLedgerApi,
};
use mc_02_tx_indexer::{
    spawn_pipeline, EnvelopeDecoder, IndexReport, IndexerConfig, IndexerHandle,
    TransactionIndexer,
};
use mc_03_api_gateway::{GatewayConfig, GatewayService};
use mc_04_message_relay::{MessageRelay, RelayConfig};
use shared_bus::{BusConfig, NotificationBus};
use shared_types::bitcoin::ScriptBuf;
use shared_types::{
    envelope_script, parse_address, Location, TransactionBuilder, Utxo, CHANNEL_TAG, JIG_TAG,
};

pub const ADDR_A: &str = "mh5CE8Nbj38iND267s4XnvhSmhDW7yWc6Q";
pub const ADDR_B: &str = "midSACfDe3qAxJZZXA9gkwBZgPqJJUpy1w";
pub const ADDR_C: &str = "mkBg6GwqZ4XdYQ72vTEqiwfgb6T6WRSDm5";

pub struct Harness {
    pub ledger: Arc<InMemoryLedger>,
    pub bus: Arc<NotificationBus>,
    pub indexer: Arc<TransactionIndexer>,
    pub relay: Arc<MessageRelay>,
    /// Set in served mode; the ledger delivers every commit into it.
    pub pipeline: Option<IndexerHandle>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_bus_config(BusConfig::default())
    }

    pub fn with_bus_config(config: BusConfig) -> Self {
        let (bus, indexer, relay) = Self::components(config);
        Self {
            ledger: Arc::new(InMemoryLedger::default()),
            bus,
            indexer,
            relay,
            pipeline: None,
        }
    }

    /// Ledger, pipeline and indexer wired as in the node. Must run inside a
    /// tokio runtime.
    pub fn served() -> Self {
        let (bus, indexer, relay) = Self::components(BusConfig::default());
        let (pipeline, _task) = spawn_pipeline(indexer.clone(), &IndexerConfig::default());
        Self {
            ledger: Arc::new(InMemoryLedger::with_sink(
                LedgerConfig::default(),
                Arc::new(pipeline.clone()),
            )),
            bus,
            indexer,
            relay,
            pipeline: Some(pipeline),
        }
    }

    fn components(
        config: BusConfig,
    ) -> (Arc<NotificationBus>, Arc<TransactionIndexer>, Arc<MessageRelay>) {
        let bus = Arc::new(NotificationBus::with_config(config));
        let indexer = Arc::new(TransactionIndexer::new(
            Arc::new(EnvelopeDecoder::default()),
            bus.clone(),
        ));
        let relay = Arc::new(MessageRelay::new(&RelayConfig::default(), bus.clone()));
        (bus, indexer, relay)
    }

    /// Fund `address` and wait until the faucet transaction is indexed.
    pub async fn fund(&self, address: &str, satoshis: u64) -> Utxo {
        let funding = self
            .ledger
            .fund(address, satoshis)
            .await
            .expect("funding a valid address");
        match &self.pipeline {
            Some(pipeline) => pipeline.flush().await.expect("pipeline running"),
            None => {
                self.indexer.index(&funding.mutation);
            }
        }
        funding.utxo
    }

    /// Broadcast and index synchronously. Not for served mode, where the
    /// pipeline already indexes every commit.
    pub async fn broadcast(&self, rawtx: &str) -> LedgerResult<(LedgerMutation, IndexReport)> {
        assert!(self.pipeline.is_none(), "served harness indexes through its pipeline");
        let mutation = self.ledger.broadcast(rawtx).await?;
        let report = self.indexer.index(&mutation);
        Ok((mutation, report))
    }

    /// Broadcast in served mode and wait for the pipeline to catch up.
    pub async fn submit(&self, rawtx: &str) -> LedgerResult<LedgerMutation> {
        let mutation = self.ledger.broadcast(rawtx).await?;
        self.flush().await;
        Ok(mutation)
    }

    pub async fn flush(&self) {
        if let Some(pipeline) = &self.pipeline {
            pipeline.flush().await.expect("pipeline running");
        }
    }

    /// A gateway over this harness's components.
    pub fn gateway(&self, config: GatewayConfig) -> GatewayService {
        let pipeline = self
            .pipeline
            .clone()
            .expect("gateway needs Harness::served");
        GatewayService::new(
            config,
            self.ledger.clone(),
            self.indexer.clone(),
            pipeline,
            self.relay.clone(),
            self.bus.clone(),
        )
        .expect("valid gateway config")
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

pub fn locking(address: &str) -> ScriptBuf {
    parse_address(address)
        .expect("valid test address")
        .script_pubkey()
}

/// Spend `inputs`, paying each `(address, satoshis)` in order.
pub fn payment(inputs: &[Location], outputs: &[(&str, u64)]) -> String {
    let mut builder = TransactionBuilder::new();
    for input in inputs {
        builder = builder.spend(*input);
    }
    for (address, satoshis) in outputs {
        builder = builder.pay(locking(address), *satoshis);
    }
    builder.to_hex()
}

/// A jig commitment owned by `owner`. `origin: None` makes it a first state.
pub fn jig_script(kind: &str, origin: Option<Location>, owner: &str) -> ScriptBuf {
    let body = match origin {
        Some(origin) => format!(r#"{{"kind":"{kind}","type":"{kind}","origin":"{origin}"}}"#),
        None => format!(r#"{{"kind":"{kind}","type":"{kind}"}}"#),
    };
    envelope_script(JIG_TAG, body.as_bytes(), &locking(owner)).expect("small envelope")
}

pub fn channel_script(recipients: &[&str], owner: &str) -> ScriptBuf {
    let body = serde_json::json!({ "recipients": recipients }).to_string();
    envelope_script(CHANNEL_TAG, body.as_bytes(), &locking(owner)).expect("small envelope")
}
