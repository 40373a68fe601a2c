//! # Subsystem Container
//!
//! Holds the subsystem instances and the indexing task.
//!
//! ## Initialization Order
//!
//! ```text
//! Notification Bus   (no dependencies)
//! Tx Indexer         (publishes to the bus)
//! Indexing pipeline  (task feeding the indexer)
//! UTXO Ledger        (delivers commits into the pipeline)
//! Message Relay      (publishes to the bus)
//! ```
//!
//! The gateway is built on top of the container by the runtime.

use std::sync::Arc;

use mc_01_utxo_ledger::InMemoryLedger;
use mc_02_tx_indexer::{spawn_pipeline, EnvelopeDecoder, IndexerHandle, TransactionIndexer};
use mc_04_message_relay::MessageRelay;
use parking_lot::Mutex;
use shared_bus::NotificationBus;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::container::config::NodeConfig;

/// Central container holding all subsystem instances.
pub struct SubsystemContainer {
    pub ledger: Arc<InMemoryLedger>,
    pub bus: Arc<NotificationBus>,
    pub indexer: Arc<TransactionIndexer>,
    /// Queue side of the indexing pipeline; the ledger holds a clone.
    pub pipeline: IndexerHandle,
    pub relay: Arc<MessageRelay>,
    pipeline_task: Mutex<Option<JoinHandle<()>>>,
    pub config: NodeConfig,
}

impl SubsystemContainer {
    /// Build every subsystem. Must run inside a tokio runtime; the indexing
    /// task is spawned here.
    #[instrument(skip_all)]
    pub fn new(config: NodeConfig) -> Self {
        let bus = Arc::new(NotificationBus::with_config(config.bus.clone()));
        info!(
            retention = config.bus.retention,
            channel_capacity = config.bus.channel_capacity,
            "Notification bus ready"
        );

        let indexer = Arc::new(TransactionIndexer::new(
            Arc::new(EnvelopeDecoder::new(config.ledger.network)),
            bus.clone(),
        ));
        let (pipeline, task) = spawn_pipeline(indexer.clone(), &config.indexer);
        info!(queue_capacity = config.indexer.queue_capacity, "Indexing pipeline started");

        let ledger = Arc::new(InMemoryLedger::with_sink(
            config.ledger.clone(),
            Arc::new(pipeline.clone()),
        ));
        info!(network = %config.ledger.network, "UTXO ledger ready");

        let relay = Arc::new(MessageRelay::new(&config.relay, bus.clone()));
        info!(max_messages = config.relay.max_messages, "Message relay ready");

        Self {
            ledger,
            bus,
            indexer,
            pipeline,
            relay,
            pipeline_task: Mutex::new(Some(task)),
            config,
        }
    }

    /// Wait for every committed mutation to be indexed.
    pub async fn drain(&self) {
        if let Err(e) = self.pipeline.flush().await {
            warn!(error = %e, "Indexing pipeline already stopped");
        }
    }

    /// Stop the indexing task. Anything still queued is dropped; call
    /// [`SubsystemContainer::drain`] first.
    pub fn stop_pipeline(&self) {
        if let Some(task) = self.pipeline_task.lock().take() {
            task.abort();
        }
    }
}
