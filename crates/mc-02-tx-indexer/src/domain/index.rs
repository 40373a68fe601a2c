//! # Record Index
//!
//! Append-only storage for jig and channel records with the lookups the
//! gateway serves. Records are keyed by location, so inserting the same
//! location twice is a no-op.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use shared_types::bitcoin::Txid;
use shared_types::{ChannelRecord, JigRecord, Location};

/// Index statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexerStats {
    pub transactions: usize,
    pub jigs: usize,
    pub channels: usize,
}

#[derive(Default)]
pub struct RecordIndex {
    jigs: HashMap<Location, JigRecord>,
    /// Jig locations in indexing order.
    jig_order: Vec<Location>,
    by_origin: HashMap<Location, Vec<Location>>,
    by_kind: HashMap<String, Vec<Location>>,
    channels: HashMap<Location, ChannelRecord>,
    indexed_txids: HashSet<Txid>,
}

impl RecordIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `txid` has had its UTXO events published. Returns `false`
    /// if it already had.
    pub fn mark_indexed(&mut self, txid: Txid) -> bool {
        self.indexed_txids.insert(txid)
    }

    /// Returns `false` if a record already exists at this location.
    pub fn insert_jig(&mut self, record: JigRecord) -> bool {
        if self.jigs.contains_key(&record.location) {
            return false;
        }
        let location = record.location;
        self.by_origin.entry(record.origin).or_default().push(location);
        if !record.kind.is_empty() {
            self.by_kind.entry(record.kind.clone()).or_default().push(location);
        }
        self.jig_order.push(location);
        self.jigs.insert(location, record);
        true
    }

    /// Returns `false` if a record already exists at this location.
    pub fn insert_channel(&mut self, record: ChannelRecord) -> bool {
        if self.channels.contains_key(&record.loc) {
            return false;
        }
        self.channels.insert(record.loc, record);
        true
    }

    pub fn jig(&self, location: &Location) -> Option<&JigRecord> {
        self.jigs.get(location)
    }

    pub fn jigs(&self) -> Vec<JigRecord> {
        self.collect(&self.jig_order)
    }

    pub fn jigs_by_kind(&self, kind: &str) -> Vec<JigRecord> {
        self.by_kind
            .get(kind)
            .map(|locations| self.collect(locations))
            .unwrap_or_default()
    }

    pub fn jigs_by_origin(&self, origin: &Location) -> Vec<JigRecord> {
        self.by_origin
            .get(origin)
            .map(|locations| self.collect(locations))
            .unwrap_or_default()
    }

    /// The most recently indexed state sharing `origin`.
    pub fn current_state(&self, origin: &Location) -> Option<&JigRecord> {
        self.by_origin
            .get(origin)
            .and_then(|locations| locations.last())
            .and_then(|location| self.jigs.get(location))
    }

    /// Records at the given locations, skipping locations that hold none.
    pub fn jigs_at(&self, locations: &[Location]) -> Vec<JigRecord> {
        self.collect(locations)
    }

    pub fn channel(&self, location: &Location) -> Option<&ChannelRecord> {
        self.channels.get(location)
    }

    pub fn stats(&self) -> IndexerStats {
        IndexerStats {
            transactions: self.indexed_txids.len(),
            jigs: self.jigs.len(),
            channels: self.channels.len(),
        }
    }

    fn collect(&self, locations: &[Location]) -> Vec<JigRecord> {
        locations
            .iter()
            .filter_map(|location| self.jigs.get(location).cloned())
            .collect()
    }
}
