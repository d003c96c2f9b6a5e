// ============================================
// Sort Composer
// ============================================
//
// Multi-key priority ordering: keys are tried in the caller's order and the
// first non-equal comparison wins. Full ties fall back to descending
// probability, then to the incoming order (stable sort).

use crate::models::LeadRecord;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Highest,
    Lowest,
}

/// Registered sort keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[serde(alias = "balanceSort")]
    Balance,
    Rank,
}

impl SortKey {
    /// Comparison that puts the preferred record first for the given direction.
    pub fn compare(&self, a: &LeadRecord, b: &LeadRecord, direction: Direction) -> Ordering {
        let ascending = match self {
            SortKey::Balance => a.balance.total_cmp(&b.balance),
            // A missing rank sorts as the worst rank.
            SortKey::Rank => rank_value(a).cmp(&rank_value(b)),
        };

        match (self, direction) {
            // Highest balance = largest first
            (SortKey::Balance, Direction::Highest) => ascending.reverse(),
            (SortKey::Balance, Direction::Lowest) => ascending,
            // Highest rank = rank 1 first
            (SortKey::Rank, Direction::Highest) => ascending,
            (SortKey::Rank, Direction::Lowest) => ascending.reverse(),
        }
    }
}

fn rank_value(record: &LeadRecord) -> u32 {
    record.rank.unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SortSpec {
    pub rank: Option<Direction>,
    pub balance_sort: Option<Direction>,
    pub sort_order: Vec<SortKey>,
}

impl SortSpec {
    pub fn direction_for(&self, key: SortKey) -> Option<Direction> {
        match key {
            SortKey::Balance => self.balance_sort,
            SortKey::Rank => self.rank,
        }
    }

    pub fn compare(&self, a: &LeadRecord, b: &LeadRecord) -> Ordering {
        for key in &self.sort_order {
            let Some(direction) = self.direction_for(*key) else {
                continue;
            };
            let ord = key.compare(a, b, direction);
            if ord != Ordering::Equal {
                return ord;
            }
        }

        b.probability_or_zero().total_cmp(&a.probability_or_zero())
    }

    /// Keys listed more than once in `sort_order`.
    pub fn duplicate_keys(&self) -> Vec<SortKey> {
        let mut seen = Vec::new();
        let mut duplicates = Vec::new();
        for key in &self.sort_order {
            if seen.contains(key) {
                if !duplicates.contains(key) {
                    duplicates.push(*key);
                }
            } else {
                seen.push(*key);
            }
        }
        duplicates
    }
}

/// Records ordered by `spec`.
pub fn sort(records: &[LeadRecord], spec: &SortSpec) -> Vec<LeadRecord> {
    let mut ordered = records.to_vec();
    ordered.sort_by(|a, b| spec.compare(a, b));
    ordered
}

/// Reorder positions into `records` by `spec`; ties keep the incoming position order.
pub fn sort_indices(records: &[LeadRecord], indices: &mut [usize], spec: &SortSpec) {
    indices.sort_by(|&a, &b| spec.compare(&records[a], &records[b]));
}
