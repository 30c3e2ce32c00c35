use thiserror::Error;

#[derive(Error, Debug)]
pub enum DrawError {
    #[error("Invalid number range: min {min} must be less than max {max}")]
    InvalidRange { min: i64, max: i64 },

    #[error("Number range too large: width {width} exceeds the limit of {limit}")]
    RangeTooLarge { width: i64, limit: i64 },

    #[error("Pool exhausted: no numbers left for tier {tier_index} although it has remaining capacity")]
    PoolExhausted { tier_index: usize },

    #[error("Operation not allowed: {reason}")]
    OperationInvalid { reason: String },

    #[error("Tier '{name}' (#{index}) has no remaining capacity")]
    TierExhausted { index: usize, name: String },

    #[error("Ledger has {ledger_len} tier lists but the configuration has {tier_count} tiers")]
    ConfigMismatch { ledger_len: usize, tier_count: usize },

    #[error("Invalid value for '{field}': {value} ({reason})")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV export error: {0}")]
    CsvError(#[from] csv::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rejected input; nothing was changed.
    Validation,
    /// The request does not fit the current draw state.
    State,
    /// Reading or writing records failed.
    Storage,
}

impl DrawError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DrawError::InvalidRange { .. }
            | DrawError::RangeTooLarge { .. }
            | DrawError::InvalidConfigValue { .. }
            | DrawError::ConfigError { .. } => ErrorCategory::Validation,
            DrawError::PoolExhausted { .. }
            | DrawError::OperationInvalid { .. }
            | DrawError::TierExhausted { .. }
            | DrawError::ConfigMismatch { .. } => ErrorCategory::State,
            DrawError::IoError(_) | DrawError::SerializationError(_) | DrawError::CsvError(_) => {
                ErrorCategory::Storage
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            DrawError::InvalidRange { .. } => {
                "The minimum number must be smaller than the maximum number.".to_string()
            }
            DrawError::RangeTooLarge { limit, .. } => {
                format!("The number range is too large (at most {} apart).", limit)
            }
            DrawError::PoolExhausted { .. } => "Every number has already been drawn.".to_string(),
            DrawError::TierExhausted { name, .. } => {
                format!("All winners for '{}' have already been drawn.", name)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            DrawError::InvalidRange { .. } | DrawError::RangeTooLarge { .. } => {
                "Adjust --min/--max and run configure again"
            }
            DrawError::PoolExhausted { .. } => {
                "Widen the number range or lower the tier capacities"
            }
            DrawError::OperationInvalid { .. } => "Stop the running draw first",
            DrawError::TierExhausted { .. } => "Select a tier that still has remaining winners",
            DrawError::ConfigMismatch { .. } => "Reset the draw to start a fresh ledger",
            DrawError::InvalidConfigValue { .. } | DrawError::ConfigError { .. } => {
                "Check the settings file and command arguments"
            }
            DrawError::IoError(_) | DrawError::SerializationError(_) | DrawError::CsvError(_) => {
                "Check that the data directory exists and is writable"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, DrawError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(
            DrawError::InvalidRange { min: 5, max: 1 }.category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            DrawError::TierExhausted {
                index: 0,
                name: "First".to_string()
            }
            .category(),
            ErrorCategory::State
        );
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert_eq!(DrawError::from(io).category(), ErrorCategory::Storage);
    }

    #[test]
    fn test_messages_name_the_tier() {
        let err = DrawError::TierExhausted {
            index: 1,
            name: "Second Prize".to_string(),
        };
        assert!(err.to_string().contains("Second Prize"));
        assert!(err.user_friendly_message().contains("Second Prize"));
    }
}
