use crate::domain::ports::Store;
use crate::utils::error::Result;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// One `<key>.json` file per record under a base directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn record_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", key))
    }
}

impl Store for FileStore {
    fn load(&self, key: &str) -> Option<String> {
        let path = self.record_path(key);
        match fs::read_to_string(&path) {
            Ok(record) => Some(record),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!("Failed to read record {}: {}", path.display(), e);
                None
            }
        }
    }

    fn save(&mut self, key: &str, record: &str) -> Result<()> {
        let full_path = self.record_path(key);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write then rename so a crash never leaves a half-written record behind.
        let tmp_path = full_path.with_extension("json.tmp");
        fs::write(&tmp_path, record)?;
        fs::rename(&tmp_path, &full_path)?;
        Ok(())
    }

    fn clear(&mut self, key: &str) -> Result<()> {
        match fs::remove_file(self.record_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, key: &str, record: &str) -> Self {
        self.records.insert(key.to_string(), record.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.records.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }
}

impl Store for MemoryStore {
    fn load(&self, key: &str) -> Option<String> {
        self.records.get(key).cloned()
    }

    fn save(&mut self, key: &str, record: &str) -> Result<()> {
        self.records.insert(key.to_string(), record.to_string());
        Ok(())
    }

    fn clear(&mut self, key: &str) -> Result<()> {
        self.records.remove(key);
        Ok(())
    }
}
