//! Request context and cache key derivation.
//!
//! A [`SourceKey`] is derived from a source kind plus the part of the
//! [`RequestContext`] that source depends on. Two contexts that are logically
//! the same must map to the same key, otherwise the cache never hits:
//!
//! - region names are trimmed and lowercased,
//! - coordinates are quantized to [`COORDINATE_PRECISION`] decimal places,
//! - market prices ignore the context entirely.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{SourceKind, ValidationError};

/// Decimal places kept when coordinates are turned into cache keys (~1.1 km).
pub const COORDINATE_PRECISION: u32 = 2;

/// WGS84 latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    lat: f64,
    lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Result<Self, ValidationError> {
        if !lat.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "lat" });
        }
        if !lon.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "lon" });
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(ValidationError::LatitudeOutOfRange { value: lat });
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(ValidationError::LongitudeOutOfRange { value: lon });
        }
        Ok(Self { lat, lon })
    }

    pub const fn lat(self) -> f64 {
        self.lat
    }

    pub const fn lon(self) -> f64 {
        self.lon
    }

    /// Coordinates rounded to [`COORDINATE_PRECISION`] decimals, as integers.
    pub fn quantized(self) -> (i64, i64) {
        let scale = 10_f64.powi(COORDINATE_PRECISION as i32);
        (
            (self.lat * scale).round() as i64,
            (self.lon * scale).round() as i64,
        )
    }

    /// The quantized pair rendered as decimal degrees, e.g. `("48.79", "11.50")`.
    pub fn quantized_degrees(self) -> (String, String) {
        let (lat, lon) = self.quantized();
        (format_quantized(lat), format_quantized(lon))
    }
}

fn format_quantized(value: i64) -> String {
    let scale = 10_u64.pow(COORDINATE_PRECISION);
    let sign = if value < 0 { "-" } else { "" };
    let magnitude = value.unsigned_abs();
    format!(
        "{sign}{}.{:0width$}",
        magnitude / scale,
        magnitude % scale,
        width = COORDINATE_PRECISION as usize
    )
}

/// What a caller knows about the place it is asking about.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    pub region: Option<String>,
    pub coordinates: Option<Coordinates>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_region(region: impl Into<String>) -> Self {
        Self::new().with_region(region)
    }

    pub fn for_coordinates(coordinates: Coordinates) -> Self {
        Self::new().with_coordinates(coordinates)
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        let region = region.into();
        let trimmed = region.trim();
        self.region = (!trimmed.is_empty()).then(|| trimmed.to_owned());
        self
    }

    pub fn with_coordinates(mut self, coordinates: Coordinates) -> Self {
        self.coordinates = Some(coordinates);
        self
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }
}

/// Deterministic cache key for one (source, request parameters) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceKey(String);

impl SourceKey {
    /// Key for region-scoped sources.
    pub fn region(kind: SourceKind, region: &str) -> Self {
        Self(format!(
            "{}:region:{}",
            kind.as_str(),
            region.trim().to_lowercase()
        ))
    }

    /// Key for coordinate-scoped sources.
    pub fn coordinates(kind: SourceKind, coordinates: Coordinates) -> Self {
        let (lat, lon) = coordinates.quantized();
        Self(format!("{}:coord:{lat}:{lon}", kind.as_str()))
    }

    /// Key for sources that do not depend on the request at all.
    pub fn global(kind: SourceKind) -> Self {
        Self(format!("{}:global", kind.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SourceKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
