//! Session-scoped pipeline state: the parcel id counter and record store
//!
//! Both live for as long as the owning session does; nothing is persisted.
//! Locks are held only for the duration of a single counter bump or map
//! access, so one context may be shared across concurrent sessions.

use crate::domain::record::ParcelRecord;
use chrono::NaiveDate;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::debug;

pub struct PipelineContext {
    /// Next counter value to hand out (starts at 1)
    next_sequence: Mutex<u64>,
    /// Records by parcel_id
    records: Mutex<FxHashMap<String, ParcelRecord>>,
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineContext {
    pub fn new() -> Self {
        Self { next_sequence: Mutex::new(1), records: Mutex::new(FxHashMap::default()) }
    }

    /// Issue `PRC-<YYYYMMDD>-<counter:06>` for the given local day, advancing the counter by one
    pub fn next_parcel_id(&self, day: NaiveDate) -> String {
        let sequence = {
            let mut next = self.next_sequence.lock();
            let current = *next;
            *next += 1;
            current
        };
        let id = format!("PRC-{}-{:06}", day.format("%Y%m%d"), sequence);
        debug!(parcel_id = %id, sequence = %sequence, "parcel_id_generated");
        id
    }

    /// Store a record, replacing any earlier record with the same id
    pub fn insert(&self, record: ParcelRecord) -> Option<ParcelRecord> {
        self.records.lock().insert(record.parcel_id.clone(), record)
    }

    pub fn get(&self, parcel_id: &str) -> Option<ParcelRecord> {
        self.records.lock().get(parcel_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// All stored parcel ids, sorted
    pub fn parcel_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.records.lock().keys().cloned().collect();
        ids.sort();
        ids
    }
}
