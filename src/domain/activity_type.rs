use std::error::Error;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ActivityType {
    Irrigation,
    #[default]
    Spraying,
    Harvest,
    Sowing,
    Fertilization,
    Maintenance,
    SoilPreparation,
    Pruning,
}

impl ActivityType {
    pub const ALL: [ActivityType; 8] = [
        ActivityType::Irrigation,
        ActivityType::Spraying,
        ActivityType::Harvest,
        ActivityType::Sowing,
        ActivityType::Fertilization,
        ActivityType::Maintenance,
        ActivityType::SoilPreparation,
        ActivityType::Pruning,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActivityType::Irrigation => "irrigation",
            ActivityType::Spraying => "spraying",
            ActivityType::Harvest => "harvest",
            ActivityType::Sowing => "sowing",
            ActivityType::Fertilization => "fertilization",
            ActivityType::Maintenance => "maintenance",
            ActivityType::SoilPreparation => "soil_preparation",
            ActivityType::Pruning => "pruning",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = ParseActivityTypeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase().replace('-', "_");
        let kind = match normalized.as_str() {
            "irrigation" | "riego" => ActivityType::Irrigation,
            "spraying" | "fumigacion" | "fumigación" => ActivityType::Spraying,
            "harvest" | "cosecha" => ActivityType::Harvest,
            "sowing" | "siembra" => ActivityType::Sowing,
            "fertilization" | "fertilizacion" | "fertilización" => ActivityType::Fertilization,
            "maintenance" | "mantenimiento" => ActivityType::Maintenance,
            "soil_preparation" | "preparacion_suelo" | "preparación_suelo" => {
                ActivityType::SoilPreparation
            }
            "pruning" | "poda" => ActivityType::Pruning,
            _ => {
                return Err(ParseActivityTypeError {
                    value: value.to_string(),
                });
            }
        };

        Ok(kind)
    }
}

impl Serialize for ActivityType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ActivityType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ActivityType::from_str(&raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseActivityTypeError {
    value: String,
}

impl fmt::Display for ParseActivityTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid activity type '{}': expected one of {}",
            self.value,
            ActivityType::ALL
                .iter()
                .map(|kind| kind.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl Error for ParseActivityTypeError {}
