//! Built-in region catalog.

use serde::Serialize;

use crate::{Coordinates, RequestContext, ValidationError};

/// A farming region known without any upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Region {
    /// Short name sent to region-keyed sources.
    pub key: &'static str,
    /// Display name used in recommendation prompts.
    pub name: &'static str,
    pub lat: f64,
    pub lon: f64,
    pub soil_type: &'static str,
}

pub const REGIONS: [Region; 2] = [
    Region {
        key: "Tuscany",
        name: "Tuscany, Italy",
        lat: 43.7711,
        lon: 11.2486,
        soil_type: "Clay-Limestone",
    },
    Region {
        key: "Bavaria",
        name: "Bavaria, Germany",
        lat: 48.7904,
        lon: 11.4979,
        soil_type: "Loess",
    },
];

impl Region {
    /// Look a region up by key or display name, ignoring case.
    pub fn find(name: &str) -> Result<&'static Region, ValidationError> {
        let wanted = name.trim();
        REGIONS
            .iter()
            .find(|region| {
                region.key.eq_ignore_ascii_case(wanted) || region.name.eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| ValidationError::UnknownRegion {
                value: name.to_owned(),
            })
    }

    pub fn coordinates(&self) -> Result<Coordinates, ValidationError> {
        Coordinates::new(self.lat, self.lon)
    }

    /// Context carrying both the region key and its centre point.
    pub fn to_context(&self) -> Result<RequestContext, ValidationError> {
        Ok(RequestContext::for_region(self.key).with_coordinates(self.coordinates()?))
    }
}
