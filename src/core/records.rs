//! Typed access to the two persisted records.
//!
//! Writes are fire-and-forget: a failed save or clear is logged and the
//! in-memory state stays authoritative. Unparseable records are cleared and
//! reported as absent.

use crate::domain::model::{Configuration, Ledger};
use crate::domain::ports::Store;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const CONFIG_KEY: &str = "config";
pub const LEDGER_KEY: &str = "ledger";

pub fn load_record<T, S>(store: &mut S, key: &str) -> Option<T>
where
    T: DeserializeOwned,
    S: Store + ?Sized,
{
    let raw = store.load(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Discarding malformed '{}' record: {}", key, e);
            clear_record(store, key);
            None
        }
    }
}

pub fn save_record<T, S>(store: &mut S, key: &str, value: &T)
where
    T: Serialize + ?Sized,
    S: Store + ?Sized,
{
    let encoded = match serde_json::to_string(value) {
        Ok(encoded) => encoded,
        Err(e) => {
            tracing::warn!("Failed to encode '{}' record: {}", key, e);
            return;
        }
    };
    if let Err(e) = store.save(key, &encoded) {
        tracing::warn!("Failed to save '{}' record: {}", key, e);
    }
}

pub fn clear_record<S: Store + ?Sized>(store: &mut S, key: &str) {
    if let Err(e) = store.clear(key) {
        tracing::warn!("Failed to clear '{}' record: {}", key, e);
    }
}

pub fn load_config<S: Store + ?Sized>(store: &mut S) -> Option<Configuration> {
    load_record(store, CONFIG_KEY)
}

pub fn save_config<S: Store + ?Sized>(store: &mut S, config: &Configuration) {
    save_record(store, CONFIG_KEY, config);
}

pub fn load_ledger<S: Store + ?Sized>(store: &mut S) -> Option<Ledger> {
    load_record(store, LEDGER_KEY)
}

pub fn save_ledger<S: Store + ?Sized>(store: &mut S, ledger: &Ledger) {
    save_record(store, LEDGER_KEY, ledger);
}

pub fn clear_ledger<S: Store + ?Sized>(store: &mut S) {
    clear_record(store, LEDGER_KEY);
}
