//! Land parcels and their saved recommendations.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::{Coordinates, RequestContext, StoreError, ValidationError};

/// A parcel as submitted by a user, before it has an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLand {
    name: String,
    boundary: Vec<[f64; 2]>,
    soil_type: String,
    area: u32,
}

impl NewLand {
    /// `boundary` is a polygon ring of `[lon, lat]` vertices (GeoJSON order).
    pub fn new(
        name: impl Into<String>,
        boundary: Vec<[f64; 2]>,
        soil_type: impl Into<String>,
        area: u32,
    ) -> Result<Self, ValidationError> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(ValidationError::EmptyLandName);
        }
        if boundary.len() < 3 {
            return Err(ValidationError::BoundaryTooShort {
                len: boundary.len(),
            });
        }
        for [lon, lat] in &boundary {
            Coordinates::new(*lat, *lon)?;
        }
        Ok(Self {
            name,
            boundary,
            soil_type: soil_type.into(),
            area,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Land {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub boundary: Vec<[f64; 2]>,
    pub soil_type: String,
    pub area: u32,
}

impl Land {
    /// Context for aggregating data about this parcel: its name as the
    /// region and the first boundary vertex as coordinates.
    pub fn request_context(&self) -> Result<RequestContext, ValidationError> {
        let ctx = RequestContext::for_region(self.name.as_str());
        match self.boundary.first() {
            Some([lon, lat]) => Ok(ctx.with_coordinates(Coordinates::new(*lat, *lon)?)),
            None => Ok(ctx),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub id: Uuid,
    pub land_id: Uuid,
    pub data: Value,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Persistence seam for lands and recommendations.
pub trait LandStore: Send + Sync {
    fn user_lands(&self, user_id: Uuid) -> Result<Vec<Land>, StoreError>;

    fn save_land(&self, user_id: Uuid, land: NewLand) -> Result<Land, StoreError>;

    fn save_recommendation(&self, land_id: Uuid, data: Value) -> Result<Recommendation, StoreError>;

    /// Recommendations for `land_id`, newest first.
    fn land_recommendations(&self, land_id: Uuid) -> Result<Vec<Recommendation>, StoreError>;
}

#[derive(Debug, Default)]
struct StoreInner {
    lands: Vec<Land>,
    recommendations: Vec<Recommendation>,
}

/// Process-local [`LandStore`].
pub struct InMemoryLandStore {
    inner: Mutex<StoreInner>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryLandStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLandStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(StoreInner::default()),
            clock,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreInner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl LandStore for InMemoryLandStore {
    fn user_lands(&self, user_id: Uuid) -> Result<Vec<Land>, StoreError> {
        Ok(self
            .lock()?
            .lands
            .iter()
            .filter(|land| land.user_id == user_id)
            .cloned()
            .collect())
    }

    fn save_land(&self, user_id: Uuid, land: NewLand) -> Result<Land, StoreError> {
        let land = Land {
            id: Uuid::new_v4(),
            user_id,
            name: land.name,
            boundary: land.boundary,
            soil_type: land.soil_type,
            area: land.area,
        };
        self.lock()?.lands.push(land.clone());
        Ok(land)
    }

    fn save_recommendation(&self, land_id: Uuid, data: Value) -> Result<Recommendation, StoreError> {
        let mut inner = self.lock()?;
        if !inner.lands.iter().any(|land| land.id == land_id) {
            return Err(StoreError::UnknownLand { land_id });
        }
        let recommendation = Recommendation {
            id: Uuid::new_v4(),
            land_id,
            data,
            created_at: self.clock.now(),
        };
        inner.recommendations.push(recommendation.clone());
        Ok(recommendation)
    }

    fn land_recommendations(&self, land_id: Uuid) -> Result<Vec<Recommendation>, StoreError> {
        let inner = self.lock()?;
        let mut found: Vec<Recommendation> = inner
            .recommendations
            .iter()
            .rev()
            .filter(|recommendation| recommendation.land_id == land_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }
}
