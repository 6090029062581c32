use std::error::Error;
use std::fmt;
use std::path::Path;

use serde::Deserialize;
use time::Weekday;

use crate::workdays::WorkdayRule;

/// Planned area assumed when an activity carries no explicit value.
pub const DEFAULT_PLANNED_HECTARES: f64 = 60.0;
/// Planned area assumed for a buffer day that carries no explicit value.
pub const DEFAULT_BUFFER_HECTARES: f64 = 15.0;
/// Hard ceiling for what a single buffer day may absorb.
pub const BUFFER_CAP_HECTARES: f64 = 70.0;
/// Duration is kept proportional to area: 60 ha ~ 480 min.
pub const MINUTES_PER_HECTARE: f64 = 8.0;
/// Completion deltas at or below this magnitude trigger no redistribution.
pub const TOLERANCE_HECTARES: f64 = 0.1;
/// Upper bound on the deficit folded into one existing activity.
pub const MAX_DEFICIT_PER_ACTIVITY: f64 = 60.0;

/// Farm-level tuning, loadable from `.surco/config.toml`. Every field has
/// a compiled-in default so the file is optional.
#[derive(Debug, Clone, PartialEq)]
pub struct FarmConfig {
    pub default_planned_hectares: f64,
    pub default_buffer_hectares: f64,
    pub buffer_cap_hectares: f64,
    pub minutes_per_hectare: f64,
    pub tolerance_hectares: f64,
    pub max_deficit_per_activity: f64,
    pub shift_rest_day: Weekday,
    pub reorganize_rest_day: Weekday,
}

impl Default for FarmConfig {
    fn default() -> Self {
        Self {
            default_planned_hectares: DEFAULT_PLANNED_HECTARES,
            default_buffer_hectares: DEFAULT_BUFFER_HECTARES,
            buffer_cap_hectares: BUFFER_CAP_HECTARES,
            minutes_per_hectare: MINUTES_PER_HECTARE,
            tolerance_hectares: TOLERANCE_HECTARES,
            max_deficit_per_activity: MAX_DEFICIT_PER_ACTIVITY,
            shift_rest_day: Weekday::Sunday,
            reorganize_rest_day: Weekday::Sunday,
        }
    }
}

impl FarmConfig {
    pub fn load(data_root: &Path) -> Result<Self, ConfigError> {
        let path = data_root.join(".surco").join("config.toml");
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let file: RawConfigFile = toml::from_str(raw)?;
        let mut config = Self::default();

        if let Some(value) = file.default_planned_hectares {
            config.default_planned_hectares = value;
        }
        if let Some(value) = file.default_buffer_hectares {
            config.default_buffer_hectares = value;
        }
        if let Some(value) = file.buffer_cap_hectares {
            config.buffer_cap_hectares = value;
        }
        if let Some(value) = file.minutes_per_hectare {
            config.minutes_per_hectare = value;
        }
        if let Some(value) = file.tolerance_hectares {
            config.tolerance_hectares = value;
        }
        if let Some(value) = file.max_deficit_per_activity {
            config.max_deficit_per_activity = value;
        }
        if let Some(raw_day) = file.shift_rest_day.as_deref() {
            config.shift_rest_day = parse_weekday(raw_day)?;
        }
        if let Some(raw_day) = file.reorganize_rest_day.as_deref() {
            config.reorganize_rest_day = parse_weekday(raw_day)?;
        }

        Ok(config)
    }

    pub fn shift_rule(&self) -> WorkdayRule {
        WorkdayRule::new(self.shift_rest_day)
    }

    pub fn reorganize_rule(&self) -> WorkdayRule {
        WorkdayRule::new(self.reorganize_rest_day)
    }

    pub fn duration_for_hectares(&self, hectares: f64) -> i64 {
        (hectares * self.minutes_per_hectare).round() as i64
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawConfigFile {
    default_planned_hectares: Option<f64>,
    default_buffer_hectares: Option<f64>,
    buffer_cap_hectares: Option<f64>,
    minutes_per_hectare: Option<f64>,
    tolerance_hectares: Option<f64>,
    max_deficit_per_activity: Option<f64>,
    shift_rest_day: Option<String>,
    reorganize_rest_day: Option<String>,
}

fn parse_weekday(raw: &str) -> Result<Weekday, ConfigError> {
    let day = match raw.trim().to_ascii_lowercase().as_str() {
        "monday" => Weekday::Monday,
        "tuesday" => Weekday::Tuesday,
        "wednesday" => Weekday::Wednesday,
        "thursday" => Weekday::Thursday,
        "friday" => Weekday::Friday,
        "saturday" => Weekday::Saturday,
        "sunday" => Weekday::Sunday,
        _ => {
            return Err(ConfigError::InvalidWeekday {
                value: raw.to_string(),
            });
        }
    };
    Ok(day)
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
    InvalidWeekday { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "failed to read config file: {}", err),
            ConfigError::Toml(err) => write!(f, "failed to parse config file: {}", err),
            ConfigError::InvalidWeekday { value } => {
                write!(f, "invalid rest day '{}': use a weekday name", value)
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            ConfigError::Toml(err) => Some(err),
            ConfigError::InvalidWeekday { .. } => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError::Io(value)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        ConfigError::Toml(value)
    }
}

#[cfg(test)]
mod tests {
    use super::FarmConfig;
    use time::Weekday;

    #[test]
    fn defaults_match_named_constants() {
        let config = FarmConfig::default();
        assert_eq!(config.default_planned_hectares, 60.0);
        assert_eq!(config.default_buffer_hectares, 15.0);
        assert_eq!(config.buffer_cap_hectares, 70.0);
        assert_eq!(config.tolerance_hectares, 0.1);
        assert_eq!(config.shift_rest_day, Weekday::Sunday);
        assert_eq!(config.reorganize_rest_day, Weekday::Sunday);
    }

    #[test]
    fn duration_is_eight_minutes_per_hectare() {
        let config = FarmConfig::default();
        assert_eq!(config.duration_for_hectares(60.0), 480);
        assert_eq!(config.duration_for_hectares(15.0), 120);
        assert_eq!(config.duration_for_hectares(0.4), 3);
    }

    #[test]
    fn toml_overrides_merge_over_defaults() {
        let config = FarmConfig::from_toml(
            r#"
buffer_cap_hectares = 80.0
shift_rest_day = "saturday"
"#,
        )
        .expect("valid overrides should parse");
        assert_eq!(config.buffer_cap_hectares, 80.0);
        assert_eq!(config.shift_rest_day, Weekday::Saturday);
        assert_eq!(config.default_planned_hectares, 60.0);
        assert_eq!(config.reorganize_rest_day, Weekday::Sunday);
    }

    #[test]
    fn rejects_unknown_weekday() {
        let err = FarmConfig::from_toml("shift_rest_day = \"someday\"")
            .expect_err("bad weekday should fail");
        assert!(err.to_string().contains("invalid rest day"));
    }
}
