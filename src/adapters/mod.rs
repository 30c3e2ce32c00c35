// Adapters layer: concrete implementations of the domain ports (storage, randomness, observers).

pub mod observer;
pub mod random;
pub mod storage;

pub use observer::{DrawEvent, EventLog};
pub use random::{ScriptedRandom, StdRandom};
pub use storage::{FileStore, MemoryStore};
