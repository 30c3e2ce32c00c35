use crate::core::pool::PoolBuilder;
use crate::core::reconcile::{ReconciliationPolicy, ResetReason};
use crate::core::records;
use crate::domain::model::{
    normalize_title, Configuration, EngineState, Ledger, Phase, Pool, Snapshot, Tier,
};
use crate::domain::ports::{DrawObserver, RandomSource, Store};
use crate::utils::error::{DrawError, Result};
use crate::utils::validation::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Winner {
    pub number: i64,
    pub tier_index: usize,
}

/// What a call to [`DrawEngine::request_draw`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
    /// The draw is finished; nothing happened.
    Ignored,
    /// Rolling started; drive [`DrawEngine::tick`] until the next request.
    Started,
    Stopped(Winner),
    /// The current tier was full; the cursor moved to this tier without drawing.
    Advanced(usize),
    /// The current tier was full and it was the last one.
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconfigureOutcome {
    /// Recorded winners still fit and were kept.
    Applied,
    /// Winners were discarded after confirmation.
    Reset(ResetReason),
    /// Confirmation was declined; the previous tiers were restored.
    NotSaved(ResetReason),
}

/// Owns the configuration, winner ledger, pool and draw cursor.
///
/// All mutation goes through the methods below, each of which persists what
/// it changed before returning and then notifies observers.
pub struct DrawEngine<S: Store, R: RandomSource> {
    store: S,
    random: R,
    config: Configuration,
    ledger: Ledger,
    pool: Pool,
    state: EngineState,
    observers: Vec<Box<dyn DrawObserver>>,
}

impl<S: Store, R: RandomSource> DrawEngine<S, R> {
    /// Loads the persisted configuration (default when absent or invalid) and
    /// runs startup reconciliation of the ledger.
    ///
    /// Title and tier names are normalized before validation; a repaired
    /// record is written back.
    pub fn open(mut store: S, random: R) -> Result<Self> {
        let config = match records::load_config(&mut store) {
            Some(stored) => {
                let config = stored.clone().normalized();
                match config.validate() {
                    Ok(()) => {
                        if config != stored {
                            tracing::info!("Normalized persisted configuration");
                            records::save_config(&mut store, &config);
                        }
                        config
                    }
                    Err(e) => {
                        tracing::warn!("Persisted configuration rejected ({}), using defaults", e);
                        records::clear_record(&mut store, records::CONFIG_KEY);
                        Configuration::default()
                    }
                }
            }
            None => Configuration::default(),
        };

        let reconciled = ReconciliationPolicy::startup(&mut store, &config)?;

        Ok(Self {
            store,
            random,
            config,
            ledger: reconciled.ledger,
            pool: reconciled.pool,
            state: reconciled.state,
            observers: Vec::new(),
        })
    }

    pub fn add_observer(&mut self, observer: Box<dyn DrawObserver>) {
        self.observers.push(observer);
    }

    pub fn with_observer(mut self, observer: impl DrawObserver + 'static) -> Self {
        self.add_observer(Box::new(observer));
        self
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn current_tier(&self) -> &Tier {
        &self.config.tiers[self.state.current_tier_index]
    }

    pub fn remaining(&self, tier_index: usize) -> Option<usize> {
        self.config
            .tiers
            .get(tier_index)
            .map(|tier| tier.capacity().saturating_sub(self.ledger.drawn_count(tier_index)))
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::build(&self.config, &self.ledger, &self.pool, &self.state)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Start/stop toggle.
    pub fn request_draw(&mut self) -> Result<DrawOutcome> {
        if self.state.all_finished {
            tracing::debug!("Draw requested after all tiers finished; ignoring");
            return Ok(DrawOutcome::Ignored);
        }

        if self.state.running {
            return Ok(match self.stop()? {
                Some(winner) => DrawOutcome::Stopped(winner),
                None => DrawOutcome::Ignored,
            });
        }

        let tier_index = self.state.current_tier_index;
        if self.ledger.drawn_count(tier_index) >= self.config.tiers[tier_index].capacity() {
            return Ok(match self.advance_tier()? {
                Some(next) => DrawOutcome::Advanced(next),
                None => DrawOutcome::Finished,
            });
        }

        if self.pool.is_empty() {
            return Err(DrawError::PoolExhausted { tier_index });
        }

        self.state.running = true;
        tracing::info!(
            "Draw started for tier '{}' ({} numbers in pool)",
            self.config.tiers[tier_index].name,
            self.pool.len()
        );
        self.emit(|observer| observer.on_draw_start());
        self.notify_state();
        Ok(DrawOutcome::Started)
    }

    /// Samples one pool member for display while a draw is running. Reads only.
    pub fn tick(&mut self) -> Option<i64> {
        if !self.state.running || self.pool.is_empty() {
            return None;
        }
        let index = self.random.next_index(self.pool.len());
        let number = self.pool.get(index)?;
        self.emit(|observer| observer.on_number_sampled(number));
        Some(number)
    }

    /// Commits a winner for the current tier. No-op unless a draw is running.
    pub fn stop(&mut self) -> Result<Option<Winner>> {
        if !self.state.running {
            return Ok(None);
        }

        let tier_index = self.state.current_tier_index;
        if self.pool.is_empty() {
            self.state.running = false;
            self.notify_state();
            return Err(DrawError::PoolExhausted { tier_index });
        }

        let len = self.pool.len();
        let index = self.random.next_index(len);
        let number = self
            .pool
            .take(index)
            .ok_or_else(|| DrawError::OperationInvalid {
                reason: format!("random index {} out of bounds for pool of {}", index, len),
            })?;

        self.ledger.record(tier_index, number);
        records::save_ledger(&mut self.store, &self.ledger);
        self.state.running = false;

        let tier = &self.config.tiers[tier_index];
        tracing::info!(
            "Drew {} for tier '{}' ({}/{})",
            number,
            tier.name,
            self.ledger.drawn_count(tier_index),
            tier.capacity
        );

        let was_finished = self.state.all_finished;
        let finished = self.check_all_finished_quietly();

        self.emit(|observer| observer.on_draw_stop(number, tier_index));
        if finished && !was_finished {
            tracing::info!("All tiers finished");
            self.emit(|observer| observer.on_all_finished());
        }
        self.notify_state();

        Ok(Some(Winner { number, tier_index }))
    }

    /// Moves the cursor to the next tier, or finishes the draw on the last tier.
    /// Returns the new tier index, or `None` once finished.
    pub fn advance_tier(&mut self) -> Result<Option<usize>> {
        if self.state.running {
            return Err(DrawError::OperationInvalid {
                reason: "cannot change tier while a draw is running".to_string(),
            });
        }
        if self.state.all_finished {
            return Ok(None);
        }

        if self.state.current_tier_index + 1 >= self.config.tier_count() {
            self.state.all_finished = true;
            tracing::info!("Last tier complete; draw finished");
            self.emit(|observer| observer.on_all_finished());
            self.notify_state();
            return Ok(None);
        }

        self.state.current_tier_index += 1;
        let next = self.state.current_tier_index;
        tracing::info!("Advanced to tier '{}'", self.config.tiers[next].name);
        self.emit(|observer| observer.on_tier_advanced(next));
        self.notify_state();
        Ok(Some(next))
    }

    /// True when every tier is full; forces the finished flag in that case.
    pub fn check_all_finished(&mut self) -> bool {
        let was_finished = self.state.all_finished;
        let finished = self.check_all_finished_quietly();
        if finished && !was_finished {
            self.emit(|observer| observer.on_all_finished());
            self.notify_state();
        }
        finished
    }

    fn check_all_finished_quietly(&mut self) -> bool {
        let finished = self.ledger.is_complete(&self.config.tiers);
        if finished {
            self.state.all_finished = true;
        }
        finished
    }

    /// Points the cursor at `index`, overriding the front-to-back order.
    pub fn select_tier(&mut self, index: usize) -> Result<()> {
        if self.state.running {
            return Err(DrawError::OperationInvalid {
                reason: "stop the running draw before switching tiers".to_string(),
            });
        }

        let tier = self
            .config
            .tiers
            .get(index)
            .ok_or_else(|| DrawError::OperationInvalid {
                reason: format!(
                    "tier #{} does not exist ({} configured)",
                    index + 1,
                    self.config.tier_count()
                ),
            })?;

        if self.ledger.drawn_count(index) >= tier.capacity() {
            return Err(DrawError::TierExhausted {
                index,
                name: tier.name.clone(),
            });
        }

        self.state.current_tier_index = index;
        tracing::info!("Selected tier '{}'", tier.name);
        self.notify_state();
        Ok(())
    }

    /// Applies an edited configuration.
    ///
    /// The edit is normalized and validated first; a rejected edit changes
    /// nothing. When the recorded winners no longer fit, `confirm` decides
    /// between discarding them and rolling the tiers back.
    pub fn reconfigure<F>(&mut self, new_config: Configuration, confirm: F) -> Result<ReconfigureOutcome>
    where
        F: FnOnce(&ResetReason) -> bool,
    {
        if self.state.running {
            return Err(DrawError::OperationInvalid {
                reason: "stop the running draw before changing the configuration".to_string(),
            });
        }

        let new_config = new_config.normalized();
        new_config.validate()?;

        let Some(reason) = ReconciliationPolicy::reset_reason(&self.ledger, &new_config) else {
            let pool = PoolBuilder::for_config(&new_config, &self.ledger)?;
            self.config = new_config;
            self.pool = pool;
            self.state = ReconciliationPolicy::derive_state(&self.config, &self.ledger);
            records::save_config(&mut self.store, &self.config);
            tracing::info!("Configuration updated; {} winners kept", self.ledger.total_drawn());
            self.notify_state();
            return Ok(ReconfigureOutcome::Applied);
        };

        if confirm(&reason) {
            let ledger = Ledger::empty(new_config.tier_count());
            let pool = PoolBuilder::for_config(&new_config, &ledger)?;
            self.config = new_config;
            self.ledger = ledger;
            self.pool = pool;
            self.state = EngineState::default();
            records::save_config(&mut self.store, &self.config);
            records::clear_ledger(&mut self.store);
            tracing::info!("Configuration updated; winners discarded because {}", reason);
            self.notify_state();
            return Ok(ReconfigureOutcome::Reset(reason));
        }

        self.roll_back_tiers(new_config);
        tracing::info!("Tier changes not saved: {}", reason);
        self.notify_state();
        Ok(ReconfigureOutcome::NotSaved(reason))
    }

    /// Keeps the last persisted tiers; title and range from `rejected` survive
    /// only where the kept ledger still fits them.
    fn roll_back_tiers(&mut self, rejected: Configuration) {
        let persisted_tiers = records::load_config(&mut self.store)
            .filter(|config| config.tier_count() == self.ledger.len())
            .map(|config| config.tiers)
            .unwrap_or_else(|| self.config.tiers.clone());

        let mut restored = Configuration {
            tiers: persisted_tiers,
            ..rejected
        };
        if ReconciliationPolicy::reset_reason(&self.ledger, &restored).is_some() {
            restored.min_number = self.config.min_number;
            restored.max_number = self.config.max_number;
        }

        match PoolBuilder::for_config(&restored, &self.ledger) {
            Ok(pool) => {
                self.pool = pool;
                self.config = restored;
            }
            Err(e) => {
                tracing::warn!("Keeping previous range after rollback: {}", e);
                self.config.title = restored.title;
            }
        }

        self.state = ReconciliationPolicy::derive_state(&self.config, &self.ledger);
        records::save_config(&mut self.store, &self.config);
    }

    /// Discards all winners and returns to tier 0 with a full pool.
    ///
    /// Callers obtain the user's confirmation before calling this.
    pub fn reset(&mut self) -> Result<()> {
        let ledger = Ledger::empty(self.config.tier_count());
        let pool = PoolBuilder::for_config(&self.config, &ledger)?;
        self.ledger = ledger;
        self.pool = pool;
        self.state = EngineState::default();
        records::clear_ledger(&mut self.store);
        tracing::info!("Draw reset; {} numbers back in the pool", self.pool.len());
        self.notify_state();
        Ok(())
    }

    /// Replaces configuration and winners with the defaults.
    pub fn restore_defaults(&mut self) -> Result<()> {
        let config = Configuration::default();
        let ledger = Ledger::empty(config.tier_count());
        let pool = PoolBuilder::for_config(&config, &ledger)?;
        self.config = config;
        self.ledger = ledger;
        self.pool = pool;
        self.state = EngineState::default();
        records::clear_ledger(&mut self.store);
        records::clear_record(&mut self.store, records::CONFIG_KEY);
        records::save_config(&mut self.store, &self.config);
        tracing::info!("Default configuration restored");
        self.notify_state();
        Ok(())
    }

    /// Stores a new headline, returning it as saved.
    pub fn set_title(&mut self, title: &str) -> &str {
        self.config.title = normalize_title(title);
        records::save_config(&mut self.store, &self.config);
        self.notify_state();
        &self.config.title
    }

    fn emit(&mut self, mut f: impl FnMut(&mut dyn DrawObserver)) {
        for observer in &mut self.observers {
            f(observer.as_mut());
        }
    }

    fn notify_state(&mut self) {
        if self.observers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        self.emit(|observer| observer.on_state_changed(&snapshot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{DrawEvent, EventLog, MemoryStore, ScriptedRandom};
    use crate::core::records::{CONFIG_KEY, LEDGER_KEY};

    fn engine_with(
        config: Configuration,
        script: impl IntoIterator<Item = usize>,
    ) -> DrawEngine<MemoryStore, ScriptedRandom> {
        let mut store = MemoryStore::new();
        records::save_config(&mut store, &config);
        DrawEngine::open(store, ScriptedRandom::new(script)).unwrap()
    }

    fn small_config(capacities: &[u32]) -> Configuration {
        let tiers = capacities
            .iter()
            .enumerate()
            .map(|(i, &capacity)| Tier::new(format!("T{}", i + 1), capacity))
            .collect();
        Configuration::new("Test", 1, 10, tiers)
    }

    #[test]
    fn test_open_uses_defaults_on_empty_store() {
        let engine = DrawEngine::open(MemoryStore::new(), ScriptedRandom::default()).unwrap();
        assert_eq!(engine.config(), &Configuration::default());
        assert_eq!(engine.pool().len(), 200);
        assert_eq!(engine.phase(), Phase::Idle);
    }

    #[test]
    fn test_open_rejects_invalid_persisted_config() {
        let mut bad = Configuration::default();
        bad.min_number = 500;
        let mut store = MemoryStore::new();
        records::save_config(&mut store, &bad);
        let engine = DrawEngine::open(store, ScriptedRandom::default()).unwrap();
        assert_eq!(engine.config(), &Configuration::default());
        assert!(!engine.store().contains(records::CONFIG_KEY));
    }

    #[test]
    fn test_draw_cycle_records_scripted_winner() {
        let mut engine = engine_with(small_config(&[2]), [4]);
        assert_eq!(engine.request_draw().unwrap(), DrawOutcome::Started);
        assert_eq!(engine.phase(), Phase::Running);

        let outcome = engine.request_draw().unwrap();
        assert_eq!(
            outcome,
            DrawOutcome::Stopped(Winner {
                number: 5,
                tier_index: 0
            })
        );
        assert_eq!(engine.ledger().drawn(0), &[5]);
        assert!(!engine.pool().contains(5));
        assert_eq!(engine.store().get(LEDGER_KEY), Some("[[5]]"));
        assert_eq!(engine.phase(), Phase::Idle);
    }

    #[test]
    fn test_tick_only_reads() {
        let mut engine = engine_with(small_config(&[1]), [0, 1, 2]);
        assert_eq!(engine.tick(), None);
        engine.request_draw().unwrap();
        assert_eq!(engine.tick(), Some(1));
        assert_eq!(engine.tick(), Some(2));
        assert_eq!(engine.pool().len(), 10);
        assert_eq!(engine.ledger().total_drawn(), 0);
    }

    #[test]
    fn test_stop_without_running_is_noop() {
        let mut engine = engine_with(small_config(&[1]), []);
        assert_eq!(engine.stop().unwrap(), None);
        assert!(engine.store().get(LEDGER_KEY).is_none());
    }

    #[test]
    fn test_select_tier_rules() {
        let mut engine = engine_with(small_config(&[1, 2]), [0]);

        assert!(matches!(
            engine.select_tier(5),
            Err(DrawError::OperationInvalid { .. })
        ));

        engine.request_draw().unwrap();
        assert!(matches!(
            engine.select_tier(1),
            Err(DrawError::OperationInvalid { .. })
        ));
        engine.request_draw().unwrap();

        assert!(matches!(
            engine.select_tier(0),
            Err(DrawError::TierExhausted { index: 0, .. })
        ));
        engine.select_tier(1).unwrap();
        assert_eq!(engine.state().current_tier_index, 1);
    }

    #[test]
    fn test_pool_exhausted_with_capacity_left() {
        let config = Configuration::new("Tight", 1, 2, vec![Tier::new("All", 5)]);
        let mut engine = engine_with(config, []);
        for _ in 0..2 {
            engine.request_draw().unwrap();
            engine.request_draw().unwrap();
        }
        assert!(engine.pool().is_empty());
        assert!(matches!(
            engine.request_draw(),
            Err(DrawError::PoolExhausted { tier_index: 0 })
        ));
        assert_eq!(engine.phase(), Phase::Idle);
    }

    #[test]
    fn test_advance_tier_while_running_is_rejected() {
        let mut engine = engine_with(small_config(&[1, 1]), []);
        engine.request_draw().unwrap();
        assert!(engine.advance_tier().is_err());
    }

    #[test]
    fn test_observer_sees_transitions_in_order() {
        let log = EventLog::new();
        let mut engine = engine_with(small_config(&[1, 1]), [0, 2]).with_observer(log.clone());

        engine.request_draw().unwrap();
        engine.tick();
        engine.request_draw().unwrap();
        engine.request_draw().unwrap();

        assert_eq!(
            log.transitions(),
            vec![
                DrawEvent::DrawStarted,
                DrawEvent::NumberSampled(1),
                DrawEvent::DrawStopped {
                    number: 3,
                    tier_index: 0
                },
                DrawEvent::TierAdvanced(1),
            ]
        );
        let snapshot = log.last_snapshot().unwrap();
        assert_eq!(snapshot.current_tier_index, 1);
        assert_eq!(snapshot.tiers[0].drawn, vec![3]);
        assert_eq!(snapshot.pool_size, 9);
    }

    #[test]
    fn test_set_title_is_normalized_and_persisted() {
        let mut engine = engine_with(small_config(&[1]), []);
        assert_eq!(engine.set_title("  Spring Festival Gala "), "Spring Fes");
        let saved = engine.store().get(CONFIG_KEY).unwrap();
        assert!(saved.contains("\"title\":\"Spring Fes\""));
        assert_eq!(engine.set_title(""), "Lucky Draw");
    }

    #[test]
    fn test_restore_defaults() {
        let mut engine = engine_with(small_config(&[1]), [0]);
        engine.request_draw().unwrap();
        engine.request_draw().unwrap();

        engine.restore_defaults().unwrap();
        assert_eq!(engine.config(), &Configuration::default());
        assert_eq!(engine.ledger(), &Ledger::empty(4));
        assert_eq!(engine.pool().len(), 200);
        assert!(engine.store().get(LEDGER_KEY).is_none());
        assert_eq!(records::load_config(&mut engine.into_store()), Some(Configuration::default()));
    }

    #[test]
    fn test_reconfigure_rejects_invalid_edit_without_changes() {
        let mut engine = engine_with(small_config(&[1]), []);
        let before = engine.store().get(CONFIG_KEY).map(str::to_string);

        let mut edit = small_config(&[1]);
        edit.max_number = 20_000;
        assert!(matches!(
            engine.reconfigure(edit, |_| true),
            Err(DrawError::RangeTooLarge { .. })
        ));

        let mut edit = small_config(&[1]);
        edit.tiers[0].capacity = 0;
        assert!(engine.reconfigure(edit, |_| true).is_err());

        assert_eq!(engine.config(), &small_config(&[1]));
        assert_eq!(engine.store().get(CONFIG_KEY).map(str::to_string), before);
    }

    #[test]
    fn test_reconfigure_while_running_is_rejected() {
        let mut engine = engine_with(small_config(&[1]), []);
        engine.request_draw().unwrap();
        assert!(matches!(
            engine.reconfigure(small_config(&[2]), |_| true),
            Err(DrawError::OperationInvalid { .. })
        ));
    }
}
