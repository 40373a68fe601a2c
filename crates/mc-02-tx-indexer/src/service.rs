//! # Transaction Indexer Service
//!
//! Turns a `LedgerMutation` into notifications and records, in this order:
//!
//! 1. one `spent` event per consumed UTXO, on its owner's address topic
//! 2. one `utxo` event per created UTXO, on its owner's address topic
//! 3. for each created output the decoder recognizes:
//!    - a jig record, published on owner, origin and kind topics
//!    - a channel record, published on the channel topic and on each
//!      recipient's address topic
//!
//! Steps 1 and 2 run once per txid and step 3 once per location, so
//! re-indexing a transaction publishes nothing new.

use std::sync::Arc;

use mc_01_utxo_ledger::LedgerMutation;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shared_bus::{EventPublisher, EventType, Topic};
use shared_types::bitcoin::{ScriptBuf, Txid};
use shared_types::{now_millis, ChannelRecord, JigRecord, Location, Utxo};
use tracing::{debug, warn};

use crate::domain::{
    ChannelUpdate, DecodeError, IndexerStats, IndexingError, JigCommitment, OutputClass,
    RecordIndex,
};
use crate::ports::outbound::CommitmentDecoder;

/// Default capacity of the indexing pipeline queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Indexer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Mutations buffered between the gateway and the indexing task.
    pub queue_capacity: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// What one `index` call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexReport {
    pub txid: Txid,
    /// `false` when the UTXO events for this txid had already been published.
    pub first_seen: bool,
    /// Newly indexed jig locations.
    pub jigs: Vec<Location>,
    /// Newly indexed channel locations.
    pub channels: Vec<Location>,
    /// Outputs that could not be decoded.
    pub errors: Vec<IndexingError>,
}

impl IndexReport {
    fn new(txid: Txid) -> Self {
        Self {
            txid,
            first_seen: false,
            jigs: Vec::new(),
            channels: Vec::new(),
            errors: Vec::new(),
        }
    }
}

pub struct TransactionIndexer {
    index: Mutex<RecordIndex>,
    decoder: Arc<dyn CommitmentDecoder>,
    publisher: Arc<dyn EventPublisher>,
}

impl TransactionIndexer {
    pub fn new(decoder: Arc<dyn CommitmentDecoder>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            index: Mutex::new(RecordIndex::new()),
            decoder,
            publisher,
        }
    }

    /// Index one ledger mutation. Safe to call again for the same mutation.
    ///
    /// The index lock is held while publishing, so events of one
    /// transaction are never interleaved with another's.
    pub fn index(&self, mutation: &LedgerMutation) -> IndexReport {
        let mut index = self.index.lock();
        let mut report = IndexReport::new(mutation.txid);

        if index.mark_indexed(mutation.txid) {
            report.first_seen = true;
            for utxo in &mutation.spent {
                self.publish_utxo(EventType::Spent, utxo);
            }
            for utxo in &mutation.created {
                self.publish_utxo(EventType::Utxo, utxo);
            }
        }

        let ts = now_millis();
        for utxo in &mutation.created {
            let class = match self.classify(utxo) {
                Ok(class) => class,
                Err(err) => {
                    let err = err.at(utxo.location);
                    warn!(txid = %mutation.txid, error = %err, "Skipping undecodable output");
                    report.errors.push(err);
                    continue;
                }
            };

            match class {
                OutputClass::JigCommitment(commitment) => {
                    let record = jig_record(utxo.location, commitment, ts);
                    if index.insert_jig(record.clone()) {
                        self.publish_jig(&record);
                        report.jigs.push(record.location);
                    }
                }
                OutputClass::ChannelUpdate(update) => {
                    let record = channel_record(utxo.location, update, ts);
                    if index.insert_channel(record.clone()) {
                        self.publish_channel(&record);
                        report.channels.push(record.loc);
                    }
                }
                OutputClass::Payment | OutputClass::Unrecognized => {}
            }
        }

        debug!(
            txid = %mutation.txid,
            first_seen = report.first_seen,
            jigs = report.jigs.len(),
            channels = report.channels.len(),
            errors = report.errors.len(),
            "Indexed transaction"
        );
        report
    }

    pub fn jig(&self, location: &Location) -> Option<JigRecord> {
        self.index.lock().jig(location).cloned()
    }

    pub fn jigs(&self) -> Vec<JigRecord> {
        self.index.lock().jigs()
    }

    pub fn jigs_by_kind(&self, kind: &str) -> Vec<JigRecord> {
        self.index.lock().jigs_by_kind(kind)
    }

    pub fn jigs_by_origin(&self, origin: &Location) -> Vec<JigRecord> {
        self.index.lock().jigs_by_origin(origin)
    }

    /// The current state of the logical jig identified by `origin`.
    pub fn current_state(&self, origin: &Location) -> Option<JigRecord> {
        self.index.lock().current_state(origin).cloned()
    }

    pub fn jigs_at(&self, locations: &[Location]) -> Vec<JigRecord> {
        self.index.lock().jigs_at(locations)
    }

    pub fn channel(&self, location: &Location) -> Option<ChannelRecord> {
        self.index.lock().channel(location).cloned()
    }

    pub fn stats(&self) -> IndexerStats {
        self.index.lock().stats()
    }

    fn classify(&self, utxo: &Utxo) -> Result<OutputClass, DecodeError> {
        let bytes = hex::decode(&utxo.script).map_err(|e| DecodeError::new(format!("script hex: {e}")))?;
        self.decoder.classify(&ScriptBuf::from_bytes(bytes))
    }

    fn publish_utxo(&self, event_type: EventType, utxo: &Utxo) {
        self.publisher
            .publish(Topic::address(utxo.owner()), event_type, payload(utxo));
    }

    fn publish_jig(&self, record: &JigRecord) {
        let data = payload(record);
        self.publisher
            .publish(Topic::address(record.owner.clone()), EventType::Jig, data.clone());
        self.publisher
            .publish(Topic::origin(record.origin), EventType::Jig, data.clone());
        if !record.kind.is_empty() {
            self.publisher
                .publish(Topic::kind(record.kind.clone()), EventType::Jig, data);
        }
    }

    fn publish_channel(&self, record: &ChannelRecord) {
        let data = payload(record);
        self.publisher
            .publish(Topic::channel(record.loc), EventType::Channel, data.clone());

        let mut notified: Vec<&str> = Vec::with_capacity(record.recipients.len());
        for recipient in &record.recipients {
            if record.owner.as_deref() == Some(recipient.as_str()) || notified.contains(&recipient.as_str()) {
                continue;
            }
            notified.push(recipient);
            self.publisher
                .publish(Topic::address(recipient.clone()), EventType::Channel, data.clone());
        }
    }
}

fn jig_record(location: Location, commitment: JigCommitment, ts: i64) -> JigRecord {
    let origin = commitment.origin.unwrap_or(location);
    JigRecord {
        location,
        kind: commitment.kind,
        type_name: commitment.type_name,
        origin,
        owner: commitment.owner,
        ts,
        is_origin: origin == location,
    }
}

fn channel_record(location: Location, update: ChannelUpdate, ts: i64) -> ChannelRecord {
    ChannelRecord {
        loc: location,
        recipients: update.recipients,
        owner: Some(update.owner),
        ts,
    }
}

fn payload<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|err| {
        warn!(error = %err, "Failed to serialize event payload");
        serde_json::Value::Null
    })
}
