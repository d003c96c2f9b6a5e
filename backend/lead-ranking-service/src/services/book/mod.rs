// ============================================
// Lead Book
// ============================================
//
// Single owner of the loaded record set.
// - Every full-set load bumps the generation and re-ranks
// - Score updates are applied only when their generation is current
// - The revision counter changes whenever records change inside a generation,
//   so (book, generation, revision) identifies the exact content for memoization

use crate::models::{Generation, LeadRecord, ScoreUpdate};
use crate::services::ranking::assign_ranks_in_place;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

static NEXT_BOOK_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of the record set content. Unique across books in the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RecordSetId {
    pub book: u64,
    pub generation: Generation,
    pub revision: u64,
}

/// Immutable copy of the records of one generation, handed to background work.
///
/// Holds only records an update can reach: of a duplicated id, the last occurrence.
#[derive(Debug, Clone)]
pub struct RecordSnapshot {
    pub generation: Generation,
    pub records: Arc<[LeadRecord]>,
}

impl RecordSnapshot {
    pub fn pending(&self) -> impl Iterator<Item = &LeadRecord> {
        self.records.iter().filter(|r| !r.is_scored())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// Computed against another generation; discarded.
    Stale,
    UnknownRecord,
    /// Record already carries a probability; reconciliation never overwrites it.
    AlreadyScored,
}

#[derive(Debug)]
pub struct LeadBook {
    id: u64,
    generation: Generation,
    revision: u64,
    records: Vec<LeadRecord>,
    positions: HashMap<String, usize>,
}

impl Default for LeadBook {
    fn default() -> Self {
        Self {
            id: NEXT_BOOK_ID.fetch_add(1, Ordering::Relaxed),
            generation: Generation::default(),
            revision: 0,
            records: Vec::new(),
            positions: HashMap::new(),
        }
    }
}

impl LeadBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the full set, starting a new generation.
    pub fn load(&mut self, records: Vec<LeadRecord>) -> Generation {
        self.generation = self.generation.next();
        self.revision = 0;
        self.records = records;
        assign_ranks_in_place(&mut self.records);

        self.positions.clear();
        for (index, record) in self.records.iter().enumerate() {
            if self.positions.insert(record.id.clone(), index).is_some() {
                warn!(id = %record.id, "Duplicate lead id in loaded set");
            }
        }

        info!(
            generation = %self.generation,
            record_count = self.records.len(),
            pending = self.pending_count(),
            "Loaded lead set"
        );

        self.generation
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn identity(&self) -> RecordSetId {
        RecordSetId {
            book: self.id,
            generation: self.generation,
            revision: self.revision,
        }
    }

    pub fn records(&self) -> &[LeadRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&LeadRecord> {
        self.positions.get(id).map(|&i| &self.records[i])
    }

    pub fn pending_count(&self) -> usize {
        self.records.iter().filter(|r| !r.is_scored()).count()
    }

    pub fn snapshot(&self) -> RecordSnapshot {
        let records: Vec<LeadRecord> = self
            .records
            .iter()
            .enumerate()
            .filter(|(index, record)| self.positions.get(&record.id) == Some(index))
            .map(|(_, record)| record.clone())
            .collect();

        RecordSnapshot {
            generation: self.generation,
            records: records.into(),
        }
    }

    /// Apply one update without re-ranking.
    fn apply(&mut self, update: &ScoreUpdate) -> ApplyOutcome {
        if update.generation != self.generation {
            return ApplyOutcome::Stale;
        }

        let Some(&index) = self.positions.get(&update.id) else {
            return ApplyOutcome::UnknownRecord;
        };

        let record = &mut self.records[index];
        if record.is_scored() {
            return ApplyOutcome::AlreadyScored;
        }

        record.probability = Some(update.probability);
        ApplyOutcome::Applied
    }

    /// Apply updates and re-rank once if anything changed. Returns the number applied.
    pub fn apply_updates<I>(&mut self, updates: I) -> usize
    where
        I: IntoIterator<Item = ScoreUpdate>,
    {
        let mut applied = 0;

        for update in updates {
            match self.apply(&update) {
                ApplyOutcome::Applied => applied += 1,
                ApplyOutcome::Stale => {
                    warn!(
                        id = %update.id,
                        update_generation = %update.generation,
                        current_generation = %self.generation,
                        "Discarding score update from superseded generation"
                    );
                }
                outcome => {
                    debug!(id = %update.id, ?outcome, "Score update not applied");
                }
            }
        }

        if applied > 0 {
            assign_ranks_in_place(&mut self.records);
            self.revision += 1;
            debug!(applied, revision = self.revision, "Re-ranked after score updates");
        }

        applied
    }
}
