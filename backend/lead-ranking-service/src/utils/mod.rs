// Utility functions for lead-ranking-service

/// Parse a probability written either as a bare number or as a percent string ("72%").
///
/// Returns `None` for blank or unparseable input; the record is then treated as unscored.
pub fn parse_percent(raw: &str) -> Option<f64> {
    let trimmed = raw.trim().trim_end_matches('%').trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// A probability the engine will accept from a scorer or a store.
pub fn is_valid_probability(value: f64) -> bool {
    value.is_finite() && (0.0..=100.0).contains(&value)
}

/// Number of pages needed to show `total` items, never less than one.
pub fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 1;
    }
    total.div_ceil(page_size).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_percent() {
        assert_eq!(parse_percent("72%"), Some(72.0));
        assert_eq!(parse_percent(" 35.5 % "), Some(35.5));
        assert_eq!(parse_percent("90"), Some(90.0));
        assert_eq!(parse_percent(""), None);
        assert_eq!(parse_percent("%"), None);
        assert_eq!(parse_percent("n/a"), None);
    }

    #[test]
    fn test_valid_probability_bounds() {
        assert!(is_valid_probability(0.0));
        assert!(is_valid_probability(100.0));
        assert!(!is_valid_probability(100.5));
        assert!(!is_valid_probability(-1.0));
        assert!(!is_valid_probability(f64::NAN));
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 10), 1);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
        assert_eq!(page_count(5, 0), 1);
    }
}
