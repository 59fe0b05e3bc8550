//! Bookkeeping of structure starts recorded by older saves.
//!
//! Each family keeps two sets of packed chunk keys: every chunk that ever
//! started a structure, and the subset not yet migrated. Removal only clears
//! the "remaining" mark, so `remaining ⊆ all` always holds.

use crate::record::{DecodeError, Record};
use crate::structure_start::StructureStart;
use crate::structures::StructureFamily;
use std::collections::{BTreeMap, BTreeSet};
use structgen_core::ChunkPos;
use tracing::{debug, warn};

/// Started and still-unhandled chunk keys of one family.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyStructureIndex {
    all: BTreeSet<i64>,
    remaining: BTreeSet<i64>,
}

impl LegacyStructureIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a start at `key` as not yet handled.
    pub fn add_index(&mut self, key: i64) {
        self.all.insert(key);
        self.remaining.insert(key);
    }

    pub fn has_start_index(&self, key: i64) -> bool {
        self.all.contains(&key)
    }

    pub fn has_unhandled_index(&self, key: i64) -> bool {
        self.remaining.contains(&key)
    }

    /// Mark `key` handled. The start stays known.
    pub fn remove_index(&mut self, key: i64) {
        self.remaining.remove(&key);
    }

    pub fn all(&self) -> impl Iterator<Item = i64> + '_ {
        self.all.iter().copied()
    }

    pub fn remaining(&self) -> impl Iterator<Item = i64> + '_ {
        self.remaining.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.put_long_array("All", self.all.iter().copied().collect());
        record.put_long_array("Remaining", self.remaining.iter().copied().collect());
        record
    }

    /// Decode an index. Unhandled keys missing from `All` are added back.
    pub fn from_record(record: &Record) -> Result<Self, DecodeError> {
        let all: BTreeSet<i64> = record.get_long_array("All")?.iter().copied().collect();
        let remaining: BTreeSet<i64> = record
            .get_long_array("Remaining")?
            .iter()
            .copied()
            .collect();
        let mut index = Self { all, remaining };
        let orphans: Vec<i64> = index.remaining.difference(&index.all).copied().collect();
        if !orphans.is_empty() {
            debug!(count = orphans.len(), "restoring unhandled keys missing from the start set");
            index.all.extend(orphans);
        }
        Ok(index)
    }
}

/// Per-family legacy indices for one dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyStructureHandler {
    indices: BTreeMap<StructureFamily, LegacyStructureIndex>,
}

impl LegacyStructureHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(&self, family: StructureFamily) -> Option<&LegacyStructureIndex> {
        self.indices.get(&family)
    }

    pub fn index_mut(&mut self, family: StructureFamily) -> &mut LegacyStructureIndex {
        self.indices.entry(family).or_default()
    }

    /// Register a start read from an older save.
    pub fn record_start(&mut self, start: &StructureStart) {
        self.index_mut(start.family()).add_index(start.chunk().pack());
    }

    /// True when `family` started at `chunk` and it has not been migrated yet.
    pub fn is_unhandled_start(&self, family: StructureFamily, chunk: ChunkPos) -> bool {
        self.index(family)
            .is_some_and(|index| index.has_unhandled_index(chunk.pack()))
    }

    /// Families with an unhandled start at `chunk`, in declaration order.
    pub fn unhandled_families(&self, chunk: ChunkPos) -> Vec<StructureFamily> {
        StructureFamily::ALL
            .into_iter()
            .filter(|family| self.is_unhandled_start(*family, chunk))
            .collect()
    }

    /// Mark the start at `chunk` migrated.
    pub fn mark_handled(&mut self, family: StructureFamily, chunk: ChunkPos) {
        if let Some(index) = self.indices.get_mut(&family) {
            index.remove_index(chunk.pack());
        }
    }

    /// One compound per family, keyed by the family's persisted id.
    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        for (family, index) in &self.indices {
            record.put_compound(family.id(), index.to_record());
        }
        record
    }

    /// Decode every known family. Unknown or malformed entries are dropped.
    pub fn from_record_lenient(record: &Record) -> Self {
        let mut handler = Self::new();
        for key in record.keys() {
            if StructureFamily::from_id(key).is_none() {
                warn!(key, "ignoring legacy index for unknown structure");
            }
        }
        for family in StructureFamily::ALL {
            if !record.contains(family.id()) {
                continue;
            }
            let decoded = record
                .get_compound(family.id())
                .and_then(LegacyStructureIndex::from_record);
            match decoded {
                Ok(index) => {
                    handler.indices.insert(family, index);
                }
                Err(err) => warn!(family = %family, %err, "dropping unreadable legacy index"),
            }
        }
        handler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Tag;
    use proptest::prelude::*;

    #[test]
    fn removal_keeps_the_start_known() {
        let mut index = LegacyStructureIndex::new();
        let key = ChunkPos::new(3, -9).pack();
        index.add_index(key);
        assert!(index.has_start_index(key));
        assert!(index.has_unhandled_index(key));
        index.remove_index(key);
        assert!(index.has_start_index(key));
        assert!(!index.has_unhandled_index(key));
    }

    #[test]
    fn orphaned_remaining_keys_are_restored() {
        let mut record = Record::new();
        record.put_long_array("All", vec![1]);
        record.put_long_array("Remaining", vec![1, 7]);
        let index = LegacyStructureIndex::from_record(&record).unwrap();
        assert!(index.has_start_index(7));
        assert!(index.has_unhandled_index(7));
    }

    #[test]
    fn handler_tracks_families_separately() {
        let mut handler = LegacyStructureHandler::new();
        let chunk = ChunkPos::new(10, 12);
        handler.index_mut(StructureFamily::Stronghold).add_index(chunk.pack());
        handler.index_mut(StructureFamily::Mineshaft).add_index(chunk.pack());
        handler.mark_handled(StructureFamily::Stronghold, chunk);
        assert!(!handler.is_unhandled_start(StructureFamily::Stronghold, chunk));
        assert_eq!(handler.unhandled_families(chunk), vec![StructureFamily::Mineshaft]);
        handler.mark_handled(StructureFamily::EndCity, chunk);
        assert!(handler.index(StructureFamily::EndCity).is_none());
    }

    #[test]
    fn lenient_decode_skips_bad_families() {
        let mut handler = LegacyStructureHandler::new();
        handler.index_mut(StructureFamily::EndCity).add_index(5);
        let mut record = handler.to_record();
        record.put("Mineshaft", Tag::Int(3));
        record.put("Igloo", Tag::Compound(Record::new()));
        let decoded = LegacyStructureHandler::from_record_lenient(&record);
        assert_eq!(decoded, handler);
    }

    proptest! {
        #[test]
        fn remaining_stays_within_all(ops in proptest::collection::vec((any::<bool>(), -8i64..8), 0..64)) {
            let mut index = LegacyStructureIndex::new();
            for (add, key) in ops {
                if add {
                    index.add_index(key);
                } else {
                    index.remove_index(key);
                }
                prop_assert!(index.remaining().all(|k| index.has_start_index(k)));
            }
            let decoded = LegacyStructureIndex::from_record(&index.to_record()).unwrap();
            prop_assert_eq!(decoded, index);
        }
    }
}
