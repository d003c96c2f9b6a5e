// ============================================
// Filter Engine
// ============================================
//
// Declarative record filtering for the lead table.
// Every predicate is a conjunction term; an empty or unset option passes all.
// Output keeps the input order, ordering belongs to the sort composer.

use crate::models::{Flag, LeadRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Probability bucket. Inner buckets are inclusive on both ends, so a value sitting on
/// a shared edge (30, 50, 70) belongs to both neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProbabilityBucket {
    #[serde(rename = "<10%")]
    Below10,
    #[serde(rename = "10%-30%")]
    From10To30,
    #[serde(rename = "30%-50%")]
    From30To50,
    #[serde(rename = "50%-70%")]
    From50To70,
    #[serde(rename = "70%-90%")]
    From70To90,
    #[serde(rename = ">90%")]
    Above90,
}

impl ProbabilityBucket {
    pub fn contains(&self, value: f64) -> bool {
        match self {
            ProbabilityBucket::Below10 => value < 10.0,
            ProbabilityBucket::From10To30 => (10.0..=30.0).contains(&value),
            ProbabilityBucket::From30To50 => (30.0..=50.0).contains(&value),
            ProbabilityBucket::From50To70 => (50.0..=70.0).contains(&value),
            ProbabilityBucket::From70To90 => (70.0..=90.0).contains(&value),
            ProbabilityBucket::Above90 => value > 90.0,
        }
    }
}

/// Age bucket, same inclusive-edge semantics as [`ProbabilityBucket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgeBucket {
    #[serde(rename = "<30", alias = "<30 yo")]
    Below30,
    #[serde(rename = "30-50", alias = "30-50 yo")]
    From30To50,
    #[serde(rename = "50-70", alias = "50-70 yo")]
    From50To70,
    #[serde(rename = ">70", alias = ">70 yo")]
    Above70,
}

impl AgeBucket {
    pub fn contains(&self, age: u32) -> bool {
        match self {
            AgeBucket::Below30 => age < 30,
            AgeBucket::From30To50 => (30..=50).contains(&age),
            AgeBucket::From50To70 => (50..=70).contains(&age),
            AgeBucket::Above70 => age > 70,
        }
    }
}

/// Yes/No selector for flag filters. An unset selector means "any".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Choice {
    #[serde(alias = "yes", alias = "YES")]
    Yes,
    #[serde(alias = "no", alias = "NO")]
    No,
}

impl Choice {
    /// `Unknown` flags never satisfy an explicit Yes/No selection.
    pub fn matches(&self, flag: Flag) -> bool {
        matches!(
            (self, flag),
            (Choice::Yes, Flag::Yes) | (Choice::No, Flag::No)
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterSpec {
    pub search: String,
    pub categories: BTreeSet<String>,
    pub probability_ranges: BTreeSet<ProbabilityBucket>,
    pub age_ranges: BTreeSet<AgeBucket>,
    pub has_deposit: Option<Choice>,
    pub has_loan: Option<Choice>,
    pub exclude_zero_balance: bool,
}

impl FilterSpec {
    /// True when this filter lets every record through.
    pub fn is_pass_all(&self) -> bool {
        self.search.trim().is_empty()
            && self.categories.is_empty()
            && self.probability_ranges.is_empty()
            && self.age_ranges.is_empty()
            && self.has_deposit.is_none()
            && self.has_loan.is_none()
            && !self.exclude_zero_balance
    }

    pub fn matches(&self, record: &LeadRecord) -> bool {
        self.matches_search(record)
            && self.matches_category(record)
            && self.matches_probability(record)
            && self.matches_age(record)
            && self.matches_balance(record)
            && self.has_deposit.map_or(true, |c| c.matches(record.has_deposit))
            && self.has_loan.map_or(true, |c| c.matches(record.has_loan))
    }

    fn matches_search(&self, record: &LeadRecord) -> bool {
        let needle = self.search.trim();
        if needle.is_empty() {
            return true;
        }
        let needle = needle.to_lowercase();
        record.name.to_lowercase().contains(&needle) || record.id.to_lowercase().contains(&needle)
    }

    fn matches_category(&self, record: &LeadRecord) -> bool {
        self.categories.is_empty() || self.categories.contains(&record.category)
    }

    fn matches_probability(&self, record: &LeadRecord) -> bool {
        if self.probability_ranges.is_empty() {
            return true;
        }
        let value = record.probability_or_zero();
        self.probability_ranges.iter().any(|b| b.contains(value))
    }

    fn matches_age(&self, record: &LeadRecord) -> bool {
        self.age_ranges.is_empty() || self.age_ranges.iter().any(|b| b.contains(record.age))
    }

    fn matches_balance(&self, record: &LeadRecord) -> bool {
        !self.exclude_zero_balance || record.balance > 0.0
    }
}

/// Records matching `spec`, in their original order.
pub fn filter(records: &[LeadRecord], spec: &FilterSpec) -> Vec<LeadRecord> {
    records.iter().filter(|r| spec.matches(r)).cloned().collect()
}

/// Positions of the records matching `spec`, ascending.
pub fn filter_indices(records: &[LeadRecord], spec: &FilterSpec) -> Vec<usize> {
    records
        .iter()
        .enumerate()
        .filter(|(_, r)| spec.matches(r))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead(id: &str, probability: Option<f64>) -> LeadRecord {
        let mut record = LeadRecord::new(id, format!("Customer {}", id));
        record.probability = probability;
        record
    }

    fn ids(records: &[LeadRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_empty_spec_is_identity() {
        let records = vec![lead("c", Some(10.0)), lead("a", None), lead("b", Some(99.0))];
        let spec = FilterSpec::default();

        assert!(spec.is_pass_all());
        assert_eq!(filter(&records, &spec), records);
    }

    #[test]
    fn test_probability_bucket_overlap_on_edges() {
        let records = vec![lead("edge", Some(30.0))];

        for bucket in [ProbabilityBucket::From10To30, ProbabilityBucket::From30To50] {
            let spec = FilterSpec {
                probability_ranges: BTreeSet::from([bucket]),
                ..Default::default()
            };
            assert_eq!(filter(&records, &spec).len(), 1, "{:?}", bucket);
        }

        let spec = FilterSpec {
            probability_ranges: BTreeSet::from([
                ProbabilityBucket::Below10,
                ProbabilityBucket::From50To70,
                ProbabilityBucket::Above90,
            ]),
            ..Default::default()
        };
        assert!(filter(&records, &spec).is_empty());
    }

    #[test]
    fn test_pending_probability_falls_into_lowest_bucket() {
        let records = vec![lead("pending", None), lead("scored", Some(55.0))];
        let spec = FilterSpec {
            probability_ranges: BTreeSet::from([ProbabilityBucket::Below10]),
            ..Default::default()
        };
        assert_eq!(ids(&filter(&records, &spec)), vec!["pending"]);
    }

    #[test]
    fn test_age_bucket_overlap() {
        let mut fifty = lead("fifty", None);
        fifty.age = 50;
        let mut seventy_one = lead("seventy-one", None);
        seventy_one.age = 71;
        let records = vec![fifty, seventy_one];

        let middle = FilterSpec {
            age_ranges: BTreeSet::from([AgeBucket::From30To50]),
            ..Default::default()
        };
        assert_eq!(ids(&filter(&records, &middle)), vec!["fifty"]);

        let upper = FilterSpec {
            age_ranges: BTreeSet::from([AgeBucket::From50To70, AgeBucket::Above70]),
            ..Default::default()
        };
        assert_eq!(ids(&filter(&records, &upper)), vec!["fifty", "seventy-one"]);
    }

    #[test]
    fn test_search_is_case_insensitive_on_name_and_id() {
        let mut a = lead("CUST-001", None);
        a.name = "Siti Rahma".to_string();
        let mut b = lead("CUST-002", None);
        b.name = "Joko".to_string();
        let records = vec![a, b];

        let by_name = FilterSpec {
            search: "rahma".to_string(),
            ..Default::default()
        };
        assert_eq!(ids(&filter(&records, &by_name)), vec!["CUST-001"]);

        let by_id = FilterSpec {
            search: "  cust-002 ".to_string(),
            ..Default::default()
        };
        assert_eq!(ids(&filter(&records, &by_id)), vec!["CUST-002"]);
    }

    #[test]
    fn test_flag_and_balance_filters() {
        let mut a = lead("a", None);
        a.has_deposit = Flag::Yes;
        a.balance = 1200.0;
        let mut b = lead("b", None);
        b.has_deposit = Flag::Unknown;
        b.balance = 800.0;
        let mut c = lead("c", None);
        c.has_deposit = Flag::Yes;
        c.balance = 0.0;
        let records = vec![a, b, c];

        let deposit = FilterSpec {
            has_deposit: Some(Choice::Yes),
            ..Default::default()
        };
        assert_eq!(ids(&filter(&records, &deposit)), vec!["a", "c"]);

        let funded = FilterSpec {
            has_deposit: Some(Choice::Yes),
            exclude_zero_balance: true,
            ..Default::default()
        };
        assert_eq!(ids(&filter(&records, &funded)), vec!["a"]);
    }

    #[test]
    fn test_category_filter() {
        let mut a = lead("a", None);
        a.category = "Priority".to_string();
        let mut b = lead("b", None);
        b.category = "Not Priority".to_string();
        let records = vec![a, b];

        let spec = FilterSpec {
            categories: BTreeSet::from(["Not Priority".to_string()]),
            ..Default::default()
        };
        assert_eq!(ids(&filter(&records, &spec)), vec!["b"]);
        assert_eq!(filter_indices(&records, &spec), vec![1]);
    }

    #[test]
    fn test_spec_wire_format() {
        let spec: FilterSpec = serde_json::from_str(
            r#"{"probabilityRanges":["30%-50%"],"ageRanges":["<30 yo"],"hasLoan":"No"}"#,
        )
        .unwrap();

        assert!(spec.probability_ranges.contains(&ProbabilityBucket::From30To50));
        assert!(spec.age_ranges.contains(&AgeBucket::Below30));
        assert_eq!(spec.has_loan, Some(Choice::No));
        assert!(spec.search.is_empty());
    }
}
