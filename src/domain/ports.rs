use crate::domain::model::Snapshot;
use crate::utils::error::Result;

/// Keyed record storage. Records are opaque strings; callers own the schema.
pub trait Store {
    /// Returns `None` for missing or unreadable records.
    fn load(&self, key: &str) -> Option<String>;
    fn save(&mut self, key: &str, record: &str) -> Result<()>;
    fn clear(&mut self, key: &str) -> Result<()>;
}

/// Uniform index source used for both winner selection and display sampling.
pub trait RandomSource {
    /// Returns a value in `0..len`. Never called with `len == 0`.
    fn next_index(&mut self, len: usize) -> usize;
}

/// Presentation-layer hooks. Observers read engine output and never feed state back.
pub trait DrawObserver {
    fn on_draw_start(&mut self) {}

    fn on_number_sampled(&mut self, _number: i64) {}

    fn on_draw_stop(&mut self, _winning_number: i64, _tier_index: usize) {}

    fn on_tier_advanced(&mut self, _new_index: usize) {}

    fn on_all_finished(&mut self) {}

    fn on_state_changed(&mut self, _snapshot: &Snapshot) {}
}
