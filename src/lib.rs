pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

pub use crate::adapters::{DrawEvent, EventLog, FileStore, MemoryStore, ScriptedRandom, StdRandom};
pub use crate::config::Settings;
pub use crate::core::engine::{DrawEngine, DrawOutcome, ReconfigureOutcome, Winner};
pub use crate::core::pool::PoolBuilder;
pub use crate::core::reconcile::{ReconciliationPolicy, ResetReason};
pub use crate::domain::model::{Configuration, EngineState, Ledger, Phase, Pool, Snapshot, Tier};
pub use crate::domain::ports::{DrawObserver, RandomSource, Store};
pub use crate::utils::error::{DrawError, Result};
