//! Response schemas for each upstream.
//!
//! Fetchers validate upstream bodies against these types before caching
//! them; [`ResponseBundle`](crate::ResponseBundle) uses them to read typed
//! views back out of a bundle.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// FSDN sustainability indicators for a region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SustainabilityMetrics {
    pub soil_health: String,
    pub water_efficiency: String,
    pub biodiversity: String,
}

/// Some FSDN deployments wrap the metrics in a `sustainability_metrics` object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum SustainabilityBody {
    Flat(SustainabilityMetrics),
    Nested {
        sustainability_metrics: SustainabilityMetrics,
    },
}

impl SustainabilityBody {
    pub(crate) fn is_nested(&self) -> bool {
        matches!(self, Self::Nested { .. })
    }
}

/// FaST platform soil and practice advice for a region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarmPractices {
    pub soil_nutrients: String,
    pub recommended_practices: Vec<String>,
}

impl FarmPractices {
    /// Practices as display labels: `minimum_tillage` becomes `Minimum Tillage`.
    pub fn practice_labels(&self) -> Vec<String> {
        self.recommended_practices
            .iter()
            .map(|practice| practice_label(practice))
            .collect()
    }
}

/// Price of one commodity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropPrice {
    pub price: f64,
    pub unit: String,
}

/// Crop name to price, ordered by crop name.
pub type MarketPrices = BTreeMap<String, CropPrice>;

/// One row of the market overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketRow {
    pub crop: String,
    pub price: f64,
    pub unit: String,
}

/// Rows sorted by crop name, ready for a bar chart.
pub fn market_overview(prices: &MarketPrices) -> Vec<MarketRow> {
    prices
        .iter()
        .map(|(crop, price)| MarketRow {
            crop: crop.clone(),
            price: price.price,
            unit: price.unit.clone(),
        })
        .collect()
}

/// OpenWeather "current weather" body; only `main` is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub main: WeatherReadings,
}

/// Temperature in °C (metric units requested), humidity in %, pressure in hPa.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherReadings {
    pub temp: f64,
    pub humidity: f64,
    pub pressure: f64,
}

/// One axis of the climate chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClimateReading {
    pub label: &'static str,
    pub value: f64,
}

impl WeatherReadings {
    /// Readings for the climate radar chart; pressure is divided by ten so
    /// the three axes share a scale.
    pub fn climate_readings(&self) -> [ClimateReading; 3] {
        [
            ClimateReading {
                label: "Temperature (°C)",
                value: self.temp,
            },
            ClimateReading {
                label: "Humidity (%)",
                value: self.humidity,
            },
            ClimateReading {
                label: "Pressure (hPa)",
                value: self.pressure / 10.0,
            },
        ]
    }
}

pub fn practice_label(practice: &str) -> String {
    practice
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
