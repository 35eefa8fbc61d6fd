use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrainingStatus {
    Success,
    Error,
    Skipped,
}

impl TrainingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Error => "ERROR",
            Self::Skipped => "SKIPPED",
        }
    }
}

impl FromStr for TrainingStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "SUCCESS" => Ok(Self::Success),
            "ERROR" => Ok(Self::Error),
            "SKIPPED" => Ok(Self::Skipped),
            other => Err(DomainError::InvariantViolation(format!(
                "unknown training status `{other}`"
            ))),
        }
    }
}

/// Audit record appended once per training invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingLogEntry {
    pub status: TrainingStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl TrainingLogEntry {
    pub fn new(status: TrainingStatus, message: impl Into<String>) -> Self {
        Self { status, message: message.into(), timestamp: Utc::now() }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(TrainingStatus::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(TrainingStatus::Error, message)
    }

    pub fn skipped(message: impl Into<String>) -> Self {
        Self::new(TrainingStatus::Skipped, message)
    }
}

#[cfg(test)]
mod tests {
    use super::{TrainingLogEntry, TrainingStatus};

    #[test]
    fn status_round_trips_through_storage_text() {
        for status in [TrainingStatus::Success, TrainingStatus::Error, TrainingStatus::Skipped] {
            assert_eq!(status.as_str().parse::<TrainingStatus>(), Ok(status));
        }
        assert!("DONE".parse::<TrainingStatus>().is_err());
    }

    #[test]
    fn status_serializes_upper_case() {
        let entry = TrainingLogEntry::skipped("No training data available.");
        let value = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(value["status"], "SKIPPED");
        assert_eq!(value["message"], "No training data available.");
    }
}
