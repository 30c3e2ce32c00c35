use crate::domain::model::{Configuration, Ledger, Pool, MAX_RANGE_WIDTH};
use crate::utils::error::Result;
use crate::utils::validation::validate_number_range;
use std::collections::HashSet;

pub struct PoolBuilder;

impl PoolBuilder {
    /// Every integer in `[min, max]` that no ledger list contains, ascending.
    pub fn build(min: i64, max: i64, ledger: &Ledger) -> Result<Pool> {
        validate_number_range(min, max, MAX_RANGE_WIDTH)?;

        let drawn: HashSet<i64> = ledger.numbers().collect();
        let numbers: Vec<i64> = (min..=max).filter(|n| !drawn.contains(n)).collect();

        tracing::debug!(
            "Built pool for [{}, {}]: {} available, {} drawn",
            min,
            max,
            numbers.len(),
            drawn.len()
        );
        Ok(Pool::from_sorted(numbers))
    }

    pub fn for_config(config: &Configuration, ledger: &Ledger) -> Result<Pool> {
        Self::build(config.min_number, config.max_number, ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::DrawError;

    #[test]
    fn test_full_range_without_winners() {
        let pool = PoolBuilder::build(1, 10, &Ledger::empty(2)).unwrap();
        assert_eq!(pool.as_slice(), &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
    }

    #[test]
    fn test_drawn_numbers_are_removed() {
        let ledger = Ledger::from_lists(vec![vec![5], vec![7, 2]]);
        let pool = PoolBuilder::build(1, 8, &ledger).unwrap();
        assert_eq!(pool.as_slice(), &[1, 3, 4, 6, 8]);
        assert!(!pool.contains(7));
    }

    #[test]
    fn test_negative_ranges() {
        let pool = PoolBuilder::build(-2, 2, &Ledger::empty(1)).unwrap();
        assert_eq!(pool.len(), 5);
        assert_eq!(pool.get(0), Some(-2));
    }

    #[test]
    fn test_rejects_inverted_range() {
        assert!(matches!(
            PoolBuilder::build(10, 10, &Ledger::empty(1)),
            Err(DrawError::InvalidRange { .. })
        ));
        assert!(matches!(
            PoolBuilder::build(10, 1, &Ledger::empty(1)),
            Err(DrawError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_rejects_oversized_range() {
        assert!(PoolBuilder::build(0, 10_000, &Ledger::empty(1)).is_ok());
        assert!(matches!(
            PoolBuilder::build(0, 10_001, &Ledger::empty(1)),
            Err(DrawError::RangeTooLarge { width: 10_001, limit: 10_000 })
        ));
    }
}
