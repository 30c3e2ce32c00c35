use crate::utils::error::{DrawError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};

/// Largest allowed `max_number - min_number`.
pub const MAX_RANGE_WIDTH: i64 = 10_000;
pub const MAX_TITLE_CHARS: usize = 10;
pub const DEFAULT_TITLE: &str = "Lucky Draw";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub name: String,
    pub capacity: u32,
}

impl Tier {
    pub fn new(name: impl Into<String>, capacity: u32) -> Self {
        Self {
            name: name.into(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub title: String,
    pub min_number: i64,
    pub max_number: i64,
    pub tiers: Vec<Tier>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            min_number: 1,
            max_number: 200,
            tiers: vec![
                Tier::new("First Prize", 1),
                Tier::new("Second Prize", 2),
                Tier::new("Third Prize", 3),
                Tier::new("Lucky Prize", 5),
            ],
        }
    }
}

impl Configuration {
    pub fn new(title: impl Into<String>, min_number: i64, max_number: i64, tiers: Vec<Tier>) -> Self {
        Self {
            title: title.into(),
            min_number,
            max_number,
            tiers,
        }
    }

    /// Applies the input clean-up the settings form performs before validation:
    /// trimmed title (default when blank, cut to [`MAX_TITLE_CHARS`]) and
    /// placeholder names for blank tiers.
    pub fn normalized(mut self) -> Self {
        self.title = normalize_title(&self.title);
        for (index, tier) in self.tiers.iter_mut().enumerate() {
            let trimmed = tier.name.trim();
            tier.name = if trimmed.is_empty() {
                format!("Tier {}", index + 1)
            } else {
                trimmed.to_string()
            };
        }
        self
    }

    pub fn tier_count(&self) -> usize {
        self.tiers.len()
    }

    pub fn contains(&self, number: i64) -> bool {
        (self.min_number..=self.max_number).contains(&number)
    }

    pub fn total_capacity(&self) -> usize {
        self.tiers.iter().map(Tier::capacity).sum()
    }
}

impl Validate for Configuration {
    fn validate(&self) -> Result<()> {
        validation::validate_number_range(self.min_number, self.max_number, MAX_RANGE_WIDTH)?;

        if self.title.chars().count() > MAX_TITLE_CHARS {
            return Err(DrawError::InvalidConfigValue {
                field: "title".to_string(),
                value: self.title.clone(),
                reason: format!("Title must be at most {} characters", MAX_TITLE_CHARS),
            });
        }

        if self.tiers.is_empty() {
            return Err(DrawError::InvalidConfigValue {
                field: "tiers".to_string(),
                value: "[]".to_string(),
                reason: "At least one tier is required".to_string(),
            });
        }

        for (index, tier) in self.tiers.iter().enumerate() {
            validation::validate_positive_number(
                &format!("tiers[{}].capacity", index),
                u64::from(tier.capacity),
                1,
            )?;
        }

        Ok(())
    }
}

pub fn normalize_title(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return DEFAULT_TITLE.to_string();
    }
    trimmed.chars().take(MAX_TITLE_CHARS).collect()
}

/// Drawn numbers per tier, positionally aligned with `Configuration::tiers`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    lists: Vec<Vec<i64>>,
}

impl Ledger {
    pub fn empty(tier_count: usize) -> Self {
        Self {
            lists: vec![Vec::new(); tier_count],
        }
    }

    pub fn from_lists(lists: Vec<Vec<i64>>) -> Self {
        Self { lists }
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    pub fn lists(&self) -> &[Vec<i64>] {
        &self.lists
    }

    pub fn drawn(&self, tier_index: usize) -> &[i64] {
        self.lists.get(tier_index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn drawn_count(&self, tier_index: usize) -> usize {
        self.drawn(tier_index).len()
    }

    pub fn total_drawn(&self) -> usize {
        self.lists.iter().map(Vec::len).sum()
    }

    pub fn numbers(&self) -> impl Iterator<Item = i64> + '_ {
        self.lists.iter().flatten().copied()
    }

    pub(crate) fn record(&mut self, tier_index: usize, number: i64) {
        if let Some(list) = self.lists.get_mut(tier_index) {
            list.push(number);
        }
    }

    /// First tier that can still take a winner.
    pub fn first_open_tier(&self, tiers: &[Tier]) -> Option<usize> {
        tiers
            .iter()
            .enumerate()
            .position(|(index, tier)| self.drawn_count(index) < tier.capacity())
    }

    pub fn is_complete(&self, tiers: &[Tier]) -> bool {
        self.first_open_tier(tiers).is_none()
    }
}

/// Numbers still eligible to be drawn, in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pool {
    numbers: Vec<i64>,
}

impl Pool {
    pub(crate) fn from_sorted(numbers: Vec<i64>) -> Self {
        Self { numbers }
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<i64> {
        self.numbers.get(index).copied()
    }

    pub fn contains(&self, number: i64) -> bool {
        self.numbers.binary_search(&number).is_ok()
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.numbers
    }

    /// Removes and returns the number at `index`, keeping the rest in order.
    pub(crate) fn take(&mut self, index: usize) -> Option<i64> {
        if index < self.numbers.len() {
            Some(self.numbers.remove(index))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineState {
    pub running: bool,
    pub current_tier_index: usize,
    pub all_finished: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Running,
    Finished,
}

impl EngineState {
    pub fn phase(&self) -> Phase {
        if self.all_finished {
            Phase::Finished
        } else if self.running {
            Phase::Running
        } else {
            Phase::Idle
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierSnapshot {
    pub name: String,
    pub capacity: u32,
    pub drawn: Vec<i64>,
    pub remaining: usize,
}

/// Read-only view handed to observers and printed by the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub title: String,
    pub min_number: i64,
    pub max_number: i64,
    pub phase: Phase,
    pub running: bool,
    pub current_tier_index: usize,
    pub all_finished: bool,
    pub pool_size: usize,
    pub tiers: Vec<TierSnapshot>,
}

impl Snapshot {
    pub fn build(config: &Configuration, ledger: &Ledger, pool: &Pool, state: &EngineState) -> Self {
        let tiers = config
            .tiers
            .iter()
            .enumerate()
            .map(|(index, tier)| {
                let drawn = ledger.drawn(index).to_vec();
                TierSnapshot {
                    name: tier.name.clone(),
                    capacity: tier.capacity,
                    remaining: tier.capacity().saturating_sub(drawn.len()),
                    drawn,
                }
            })
            .collect();

        Self {
            title: config.title.clone(),
            min_number: config.min_number,
            max_number: config.max_number,
            phase: state.phase(),
            running: state.running,
            current_tier_index: state.current_tier_index,
            all_finished: state.all_finished,
            pool_size: pool.len(),
            tiers,
        }
    }
}
