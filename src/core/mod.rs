pub mod engine;
pub mod pool;
pub mod reconcile;
pub mod records;
pub mod report;

pub use crate::domain::model::{Configuration, EngineState, Ledger, Phase, Pool, Snapshot, Tier};
pub use crate::domain::ports::{DrawObserver, RandomSource, Store};
pub use crate::utils::error::Result;
