use crate::utils::error::{DrawError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Settings file picked up from the working directory when `--config` is not given.
pub const DEFAULT_SETTINGS_FILE: &str = "lucky-draw.toml";
pub const DEFAULT_DATA_DIR: &str = ".lucky-draw";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 2] = ["compact", "json"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub draw: DrawSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    pub data_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DrawSettings {
    pub roll_interval_ms: Option<u64>,
    pub roll_duration_ms: Option<u64>,
    /// Fixed RNG seed for rehearsals; unset means OS entropy.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: Option<String>,
    pub format: Option<String>,
}

impl Settings {
    /// Reads and parses a settings file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(DrawError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| DrawError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Explicit path must exist; otherwise the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_SETTINGS_FILE).exists() => {
                Self::from_file(DEFAULT_SETTINGS_FILE)
            }
            None => Ok(Self::default()),
        }
    }

    /// Expands `${VAR}` from the environment; unknown variables stay as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| DrawError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn data_dir(&self) -> &str {
        self.storage.data_dir.as_deref().unwrap_or(DEFAULT_DATA_DIR)
    }

    pub fn roll_interval(&self) -> Duration {
        Duration::from_millis(self.draw.roll_interval_ms.unwrap_or(50))
    }

    pub fn roll_duration(&self) -> Duration {
        Duration::from_millis(self.draw.roll_duration_ms.unwrap_or(1500))
    }

    pub fn seed(&self) -> Option<u64> {
        self.draw.seed
    }

    pub fn log_level(&self) -> Option<&str> {
        self.logging.level.as_deref()
    }

    pub fn json_logs(&self) -> bool {
        self.logging.format.as_deref() == Some("json")
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validation::validate_path("storage.data_dir", self.data_dir())?;

        if let Some(interval) = self.draw.roll_interval_ms {
            validation::validate_positive_number("draw.roll_interval_ms", interval, 1)?;
        }

        if let Some(level) = self.log_level() {
            validation::validate_one_of("logging.level", level, &LOG_LEVELS)?;
        }

        if let Some(format) = self.logging.format.as_deref() {
            validation::validate_non_empty_string("logging.format", format)?;
            validation::validate_one_of("logging.format", format, &LOG_FORMATS)?;
        }

        Ok(())
    }
}
