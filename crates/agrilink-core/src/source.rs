use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Logical upstream data sources the aggregator knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Sustainability,
    FarmPractice,
    MarketPrice,
    Weather,
}

impl SourceKind {
    pub const ALL: [Self; 4] = [
        Self::Sustainability,
        Self::FarmPractice,
        Self::MarketPrice,
        Self::Weather,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sustainability => "sustainability",
            Self::FarmPractice => "farm_practice",
            Self::MarketPrice => "market_price",
            Self::Weather => "weather",
        }
    }

    /// Suffix used for `AGRILINK_<SOURCE>_URL` endpoint overrides.
    pub const fn env_suffix(self) -> &'static str {
        match self {
            Self::Sustainability => "SUSTAINABILITY",
            Self::FarmPractice => "FARM_PRACTICE",
            Self::MarketPrice => "MARKET_PRICE",
            Self::Weather => "WEATHER",
        }
    }

    /// Parses a comma separated list such as `weather,market_price`.
    ///
    /// Duplicates collapse; order of first appearance is kept.
    pub fn parse_list(input: &str) -> Result<Vec<Self>, ValidationError> {
        let mut kinds = Vec::new();
        for part in input.split(',').map(str::trim).filter(|part| !part.is_empty()) {
            let kind = part.parse::<Self>()?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        Ok(kinds)
    }
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "sustainability" | "fsdn" => Ok(Self::Sustainability),
            "farm_practice" | "fast" => Ok(Self::FarmPractice),
            "market_price" | "market" | "prices" => Ok(Self::MarketPrice),
            "weather" | "climate" => Ok(Self::Weather),
            other => Err(ValidationError::InvalidSource {
                value: other.to_owned(),
            }),
        }
    }
}
