//! # Indexing Pipeline
//!
//! Explicit handoff from the ledger to the indexer:
//!
//! ```text
//! ledger write section ──deliver(LedgerMutation)──► bounded mpsc ──► indexing task
//!                                                                      │
//!                                                                      ▼
//!                                                        TransactionIndexer::index
//!                                                                      │
//!                                                                      ▼
//!                                                               Notification Bus
//! ```
//!
//! `IndexerHandle` is the ledger's `MutationSink`. The ledger reserves queue
//! space before committing and fills it under its write lock, so mutations
//! are indexed one at a time in commit order.

use std::sync::Arc;

use async_trait::async_trait;
use mc_01_utxo_ledger::{LedgerMutation, MutationSink, MutationSlot, SinkClosed};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::domain::IndexingError;
use crate::service::{IndexerConfig, TransactionIndexer};

enum PipelineMessage {
    Index(LedgerMutation),
    /// Answered once everything queued before it has been indexed.
    Flush(oneshot::Sender<()>),
}

/// Submission side of the pipeline. Cheap to clone.
#[derive(Clone)]
pub struct IndexerHandle {
    sender: mpsc::Sender<PipelineMessage>,
}

impl IndexerHandle {
    /// Wait until every mutation queued so far has been indexed.
    pub async fn flush(&self) -> Result<(), IndexingError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PipelineMessage::Flush(tx))
            .await
            .map_err(|_| IndexingError::PipelineClosed)?;
        rx.await.map_err(|_| IndexingError::PipelineClosed)
    }

    /// Mutations waiting to be indexed.
    pub fn pending(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }
}

/// Queue space held for one mutation.
struct PipelineSlot(mpsc::OwnedPermit<PipelineMessage>);

impl MutationSlot for PipelineSlot {
    fn deliver(self: Box<Self>, mutation: LedgerMutation) {
        let _ = self.0.send(PipelineMessage::Index(mutation));
    }
}

#[async_trait]
impl MutationSink for IndexerHandle {
    async fn reserve(&self) -> Result<Box<dyn MutationSlot>, SinkClosed> {
        let permit = self
            .sender
            .clone()
            .reserve_owned()
            .await
            .map_err(|_| SinkClosed)?;
        Ok(Box::new(PipelineSlot(permit)))
    }
}

/// Start the indexing task. It stops once every handle is dropped.
pub fn spawn_pipeline(
    indexer: Arc<TransactionIndexer>,
    config: &IndexerConfig,
) -> (IndexerHandle, JoinHandle<()>) {
    let (sender, mut receiver) = mpsc::channel(config.queue_capacity.max(1));

    let task = tokio::spawn(async move {
        info!("Indexing pipeline started");
        while let Some(message) = receiver.recv().await {
            match message {
                PipelineMessage::Index(mutation) => {
                    let report = indexer.index(&mutation);
                    debug!(
                        txid = %report.txid,
                        jigs = report.jigs.len(),
                        channels = report.channels.len(),
                        "Pipeline indexed mutation"
                    );
                }
                PipelineMessage::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
        info!("Indexing pipeline stopped");
    });

    (IndexerHandle { sender }, task)
}
