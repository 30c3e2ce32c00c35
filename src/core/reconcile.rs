use crate::core::pool::PoolBuilder;
use crate::core::records;
use crate::domain::model::{Configuration, EngineState, Ledger, Pool};
use crate::domain::ports::Store;
use crate::utils::error::{DrawError, Result};
use std::collections::HashSet;
use std::fmt;

/// In-memory state rebuilt from a configuration and a ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub ledger: Ledger,
    pub pool: Pool,
    pub state: EngineState,
    /// The persisted ledger was incompatible and has been cleared.
    pub discarded: bool,
}

/// Why a configuration edit cannot keep the recorded winners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetReason {
    TierCountChanged { from: usize, to: usize },
    CapacityBelowDrawn {
        tier_index: usize,
        capacity: u32,
        drawn: usize,
    },
    NumberOutOfRange { number: i64, min: i64, max: i64 },
}

impl fmt::Display for ResetReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResetReason::TierCountChanged { from, to } => {
                write!(f, "the number of tiers changes from {} to {}", from, to)
            }
            ResetReason::CapacityBelowDrawn {
                tier_index,
                capacity,
                drawn,
            } => write!(
                f,
                "tier #{} would allow {} winners but {} are already drawn",
                tier_index + 1,
                capacity,
                drawn
            ),
            ResetReason::NumberOutOfRange { number, min, max } => write!(
                f,
                "drawn number {} falls outside the new range [{}, {}]",
                number, min, max
            ),
        }
    }
}

pub struct ReconciliationPolicy;

impl ReconciliationPolicy {
    /// Loads the persisted ledger and rebuilds pool and state against `config`.
    ///
    /// A missing ledger starts empty. A ledger that does not fit the
    /// configuration is never merged: it is cleared from the store and
    /// replaced by empty lists.
    pub fn startup<S: Store + ?Sized>(store: &mut S, config: &Configuration) -> Result<Reconciled> {
        let tier_count = config.tier_count();

        let (ledger, discarded) = match records::load_ledger(store) {
            None => (Ledger::empty(tier_count), false),
            Some(ledger) => match Self::check_ledger(config, &ledger) {
                Ok(()) => (ledger, false),
                Err(e) => {
                    tracing::warn!("Persisted ledger discarded: {}", e);
                    records::clear_ledger(store);
                    (Ledger::empty(tier_count), true)
                }
            },
        };

        let pool = PoolBuilder::for_config(config, &ledger)?;
        let state = Self::derive_state(config, &ledger);

        tracing::info!(
            "Reconciled {} tiers: {} winners recorded, {} numbers left, current tier {}{}",
            tier_count,
            ledger.total_drawn(),
            pool.len(),
            state.current_tier_index + 1,
            if state.all_finished { " (all finished)" } else { "" }
        );

        Ok(Reconciled {
            ledger,
            pool,
            state,
            discarded,
        })
    }

    /// Verifies every ledger invariant against `config`.
    pub fn check_ledger(config: &Configuration, ledger: &Ledger) -> Result<()> {
        if ledger.len() != config.tier_count() {
            return Err(DrawError::ConfigMismatch {
                ledger_len: ledger.len(),
                tier_count: config.tier_count(),
            });
        }

        let mut seen = HashSet::new();
        for (tier_index, tier) in config.tiers.iter().enumerate() {
            let drawn = ledger.drawn(tier_index);
            if drawn.len() > tier.capacity() {
                return Err(DrawError::InvalidConfigValue {
                    field: format!("ledger[{}]", tier_index),
                    value: drawn.len().to_string(),
                    reason: format!("tier capacity is {}", tier.capacity),
                });
            }
            for &number in drawn {
                if !config.contains(number) {
                    return Err(DrawError::InvalidConfigValue {
                        field: format!("ledger[{}]", tier_index),
                        value: number.to_string(),
                        reason: format!(
                            "outside the range [{}, {}]",
                            config.min_number, config.max_number
                        ),
                    });
                }
                if !seen.insert(number) {
                    return Err(DrawError::InvalidConfigValue {
                        field: format!("ledger[{}]", tier_index),
                        value: number.to_string(),
                        reason: "number drawn more than once".to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Cursor at the first tier with remaining capacity, or finished at tier 0.
    pub fn derive_state(config: &Configuration, ledger: &Ledger) -> EngineState {
        match ledger.first_open_tier(&config.tiers) {
            Some(index) => EngineState {
                running: false,
                current_tier_index: index,
                all_finished: false,
            },
            None => EngineState {
                running: false,
                current_tier_index: 0,
                all_finished: true,
            },
        }
    }

    /// Returns why `ledger` cannot survive a switch to `new_config`, if it cannot.
    pub fn reset_reason(ledger: &Ledger, new_config: &Configuration) -> Option<ResetReason> {
        if ledger.len() != new_config.tier_count() {
            return Some(ResetReason::TierCountChanged {
                from: ledger.len(),
                to: new_config.tier_count(),
            });
        }

        for (tier_index, tier) in new_config.tiers.iter().enumerate() {
            let drawn = ledger.drawn_count(tier_index);
            if tier.capacity() < drawn {
                return Some(ResetReason::CapacityBelowDrawn {
                    tier_index,
                    capacity: tier.capacity,
                    drawn,
                });
            }
        }

        ledger
            .numbers()
            .find(|&number| !new_config.contains(number))
            .map(|number| ResetReason::NumberOutOfRange {
                number,
                min: new_config.min_number,
                max: new_config.max_number,
            })
    }

    pub fn needs_reset(ledger: &Ledger, new_config: &Configuration) -> bool {
        Self::reset_reason(ledger, new_config).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use crate::core::records::LEDGER_KEY;
    use crate::domain::model::Tier;

    fn config(capacities: &[u32]) -> Configuration {
        let tiers = capacities
            .iter()
            .enumerate()
            .map(|(i, &capacity)| Tier::new(format!("T{}", i + 1), capacity))
            .collect();
        Configuration::new("Test", 1, 10, tiers)
    }

    #[test]
    fn test_startup_without_ledger() {
        let mut store = MemoryStore::new();
        let reconciled = ReconciliationPolicy::startup(&mut store, &config(&[1, 2])).unwrap();
        assert_eq!(reconciled.ledger, Ledger::empty(2));
        assert_eq!(reconciled.pool.len(), 10);
        assert_eq!(reconciled.state, EngineState::default());
        assert!(!reconciled.discarded);
    }

    #[test]
    fn test_startup_keeps_matching_ledger() {
        let mut store = MemoryStore::new().with_record(LEDGER_KEY, "[[5],[7]]");
        let reconciled = ReconciliationPolicy::startup(&mut store, &config(&[1, 2])).unwrap();
        assert_eq!(reconciled.ledger.drawn(1), &[7]);
        assert_eq!(reconciled.pool.len(), 8);
        assert_eq!(reconciled.state.current_tier_index, 1);
        assert!(!reconciled.state.all_finished);
        assert!(store.contains(LEDGER_KEY));
    }

    #[test]
    fn test_startup_discards_duplicate_numbers() {
        let mut store = MemoryStore::new().with_record(LEDGER_KEY, "[[5],[5]]");
        let reconciled = ReconciliationPolicy::startup(&mut store, &config(&[1, 2])).unwrap();
        assert!(reconciled.discarded);
        assert_eq!(reconciled.ledger, Ledger::empty(2));
        assert!(!store.contains(LEDGER_KEY));
    }

    #[test]
    fn test_startup_discards_overfull_tier() {
        let mut store = MemoryStore::new().with_record(LEDGER_KEY, "[[5,6],[]]");
        let reconciled = ReconciliationPolicy::startup(&mut store, &config(&[1, 2])).unwrap();
        assert!(reconciled.discarded);
        assert_eq!(reconciled.pool.len(), 10);
    }

    #[test]
    fn test_check_ledger_reports_mismatch() {
        let err = ReconciliationPolicy::check_ledger(&config(&[1, 1, 1]), &Ledger::empty(2))
            .unwrap_err();
        assert!(matches!(
            err,
            DrawError::ConfigMismatch {
                ledger_len: 2,
                tier_count: 3
            }
        ));
    }

    #[test]
    fn test_reset_reasons() {
        let ledger = Ledger::from_lists(vec![vec![1, 2], vec![3]]);

        assert_eq!(ReconciliationPolicy::reset_reason(&ledger, &config(&[2, 1])), None);
        assert_eq!(ReconciliationPolicy::reset_reason(&ledger, &config(&[5, 5])), None);
        assert!(!ReconciliationPolicy::needs_reset(&ledger, &config(&[5, 5])));
        assert!(ReconciliationPolicy::needs_reset(&ledger, &config(&[2])));
        assert_eq!(
            ReconciliationPolicy::reset_reason(&ledger, &config(&[2, 1, 1])),
            Some(ResetReason::TierCountChanged { from: 2, to: 3 })
        );
        assert_eq!(
            ReconciliationPolicy::reset_reason(&ledger, &config(&[1, 1])),
            Some(ResetReason::CapacityBelowDrawn {
                tier_index: 0,
                capacity: 1,
                drawn: 2
            })
        );

        let mut narrowed = config(&[2, 1]);
        narrowed.min_number = 2;
        assert_eq!(
            ReconciliationPolicy::reset_reason(&ledger, &narrowed),
            Some(ResetReason::NumberOutOfRange {
                number: 1,
                min: 2,
                max: 10
            })
        );
    }

    #[test]
    fn test_reset_reason_display() {
        let reason = ResetReason::CapacityBelowDrawn {
            tier_index: 0,
            capacity: 1,
            drawn: 2,
        };
        assert_eq!(
            reason.to_string(),
            "tier #1 would allow 1 winners but 2 are already drawn"
        );
    }
}
