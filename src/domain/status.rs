use std::error::Error;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityStatus {
    Scheduled,
    Deferred,
    Completed,
    Cancelled,
    Rescheduled,
}

impl ActivityStatus {
    pub const ALL: [ActivityStatus; 5] = [
        ActivityStatus::Scheduled,
        ActivityStatus::Deferred,
        ActivityStatus::Completed,
        ActivityStatus::Cancelled,
        ActivityStatus::Rescheduled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActivityStatus::Scheduled => "scheduled",
            ActivityStatus::Deferred => "deferred",
            ActivityStatus::Completed => "completed",
            ActivityStatus::Cancelled => "cancelled",
            ActivityStatus::Rescheduled => "rescheduled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ActivityStatus::Completed | ActivityStatus::Cancelled)
    }
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityStatus {
    type Err = ParseStatusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        let status = match normalized.as_str() {
            "scheduled" | "programada" => ActivityStatus::Scheduled,
            "deferred" | "aplazada" => ActivityStatus::Deferred,
            "completed" | "completada" => ActivityStatus::Completed,
            "cancelled" | "canceled" | "cancelada" => ActivityStatus::Cancelled,
            "rescheduled" | "reprogramada" => ActivityStatus::Rescheduled,
            _ => {
                return Err(ParseStatusError {
                    value: value.to_string(),
                });
            }
        };

        Ok(status)
    }
}

impl Serialize for ActivityStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ActivityStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ActivityStatus::from_str(&raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    value: String,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid activity status '{}': expected one of {}",
            self.value,
            ActivityStatus::ALL
                .iter()
                .map(|status| status.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl Error for ParseStatusError {}
