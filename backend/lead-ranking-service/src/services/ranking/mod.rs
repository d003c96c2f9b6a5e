/// Rank Assignment
///
/// Stamps every record of the *full* loaded set with its position by conversion
/// probability. Ranks always form the contiguous sequence 1..=N.
///
/// # Ordering
/// - Scored records first, highest probability first
/// - Pending records after all scored ones
/// - Ties (equal probability, or both pending) keep load order
use crate::models::LeadRecord;
use std::cmp::Ordering;

fn rank_order(a: &LeadRecord, b: &LeadRecord) -> Ordering {
    match (a.probability, b.probability) {
        (Some(pa), Some(pb)) => pb.total_cmp(&pa),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Copy of `records` with `rank` set; input order is preserved.
pub fn assign_ranks(records: &[LeadRecord]) -> Vec<LeadRecord> {
    let mut ranked = records.to_vec();
    assign_ranks_in_place(&mut ranked);
    ranked
}

/// Same as [`assign_ranks`] but stamps the records where they are.
pub fn assign_ranks_in_place(records: &mut [LeadRecord]) {
    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by(|&a, &b| rank_order(&records[a], &records[b]));

    for (position, index) in order.into_iter().enumerate() {
        records[index].rank = Some(position as u32 + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn lead(id: &str, probability: Option<f64>) -> LeadRecord {
        let mut record = LeadRecord::new(id, id);
        record.probability = probability;
        record
    }

    fn rank_of(records: &[LeadRecord], id: &str) -> u32 {
        records
            .iter()
            .find(|r| r.id == id)
            .and_then(|r| r.rank)
            .unwrap()
    }

    #[test]
    fn test_ranks_form_contiguous_permutation() {
        let records: Vec<LeadRecord> = (0..37)
            .map(|i| {
                let probability = if i % 5 == 0 { None } else { Some((i * 7 % 100) as f64) };
                lead(&format!("c{}", i), probability)
            })
            .collect();

        let ranked = assign_ranks(&records);
        let ranks: BTreeSet<u32> = ranked.iter().map(|r| r.rank.unwrap()).collect();

        assert_eq!(ranks.len(), records.len());
        assert_eq!(ranks, (1..=records.len() as u32).collect());
    }

    #[test]
    fn test_scored_before_pending_and_stable_ties() {
        let records = vec![
            lead("pending-1", None),
            lead("mid-a", Some(50.0)),
            lead("top", Some(95.0)),
            lead("pending-2", None),
            lead("mid-b", Some(50.0)),
        ];

        let ranked = assign_ranks(&records);

        assert_eq!(rank_of(&ranked, "top"), 1);
        assert_eq!(rank_of(&ranked, "mid-a"), 2);
        assert_eq!(rank_of(&ranked, "mid-b"), 3);
        assert_eq!(rank_of(&ranked, "pending-1"), 4);
        assert_eq!(rank_of(&ranked, "pending-2"), 5);
        // Input order untouched
        assert_eq!(ranked[0].id, "pending-1");
    }

    #[test]
    fn test_assign_ranks_is_deterministic() {
        let records = vec![lead("a", Some(10.0)), lead("b", Some(10.0)), lead("c", None)];
        assert_eq!(assign_ranks(&records), assign_ranks(&records));
    }

    #[test]
    fn test_empty_set() {
        assert!(assign_ranks(&[]).is_empty());
    }
}
