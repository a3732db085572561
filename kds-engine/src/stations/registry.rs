//! Station Registry - cached view over the station table
//!
//! Stations are created by administrative action and read on every
//! routing decision and display refresh, so the active list caches with
//! the long station TTL and invalidates on station change events.

use std::sync::Arc;
use std::time::Duration;

use shared::{Station, StationType};

use crate::cache::{keys, CacheService};
use crate::core::{CacheConfig, EngineError, EngineResult};
use crate::store::EngineStore;

#[derive(Clone)]
pub struct StationRegistry {
    store: Arc<dyn EngineStore>,
    cache: CacheService,
    ttl: Duration,
}

impl StationRegistry {
    pub fn new(store: Arc<dyn EngineStore>, cache: CacheService, config: &CacheConfig) -> Self {
        Self {
            store,
            cache,
            ttl: config.stations_ttl,
        }
    }

    /// Active stations ordered by display position
    pub async fn list_active(&self) -> EngineResult<Vec<Station>> {
        let store = Arc::clone(&self.store);
        self.cache
            .get_or_fetch(
                &keys::stations_key(),
                self.ttl,
                &[keys::TAG_STATIONS.to_string()],
                || async move { Ok(store.list_stations().await?) },
            )
            .await
    }

    /// Like [`Self::list_active`], but an empty registry is an error —
    /// nothing can be routed without at least one station.
    pub async fn require_active(&self) -> EngineResult<Vec<Station>> {
        let stations = self.list_active().await?;
        if stations.is_empty() {
            return Err(EngineError::NoActiveStations);
        }
        Ok(stations)
    }

    pub async fn get(&self, station_id: &str) -> EngineResult<Station> {
        self.list_active()
            .await?
            .into_iter()
            .find(|s| s.id == station_id)
            .ok_or_else(|| EngineError::not_found(format!("station {station_id}")))
    }

    /// First active station of the given type, in display order
    pub async fn find_by_type(&self, station_type: StationType) -> EngineResult<Option<Station>> {
        Ok(self
            .list_active()
            .await?
            .into_iter()
            .find(|s| s.station_type == station_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn registry_with(stations: Vec<Station>) -> StationRegistry {
        let store = Arc::new(MemoryStore::new());
        for station in stations {
            store.seed_station(station);
        }
        StationRegistry::new(store, CacheService::new(16), &CacheConfig::default())
    }

    #[tokio::test]
    async fn test_empty_registry_is_an_error() {
        let registry = registry_with(vec![]);
        assert!(matches!(
            registry.require_active().await,
            Err(EngineError::NoActiveStations)
        ));
    }

    #[tokio::test]
    async fn test_find_by_type_respects_display_order() {
        let mut grill_back = Station::new("g2", "Back Grill", StationType::Grill);
        grill_back.position = 5;
        let mut grill_front = Station::new("g1", "Front Grill", StationType::Grill);
        grill_front.position = 1;
        let registry = registry_with(vec![grill_back, grill_front]);

        let found = registry.find_by_type(StationType::Grill).await.unwrap();
        assert_eq!(found.unwrap().id, "g1");
        assert!(registry
            .find_by_type(StationType::Bar)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_second_listing_is_served_from_cache() {
        let registry = registry_with(vec![Station::new("g1", "Grill", StationType::Grill)]);
        registry.list_active().await.unwrap();
        registry.list_active().await.unwrap();
        assert_eq!(registry.cache.stats().hits, 1);
    }
}
