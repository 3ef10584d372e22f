use crate::application::catalog::MapCatalog;
use crate::domain::error::MistwarError;
use crate::domain::geometry::{contains_point, refit, world_position};
use crate::domain::model::{Coord3, ExpandedFloorMap, PoiType, Sector, StaticObjective};
use crate::domain::objective::{ObjectiveEntity, ObjectiveGeometry, Waypoint};
use crate::domain::traits::{Clock, RemoteSource};
use crate::infrastructure::network::retry::{retry, RetryPolicy};
use crate::infrastructure::storage::{CacheResult, SingleFlightCache};
use std::sync::Arc;
use tracing::{debug, warn};

/// Objectives of one map, shared with the synchronizer and every reader.
pub type ObjectiveList = Arc<Vec<Arc<ObjectiveEntity>>>;

// Langor Gulch reports a position far outside its sector
const MISPLACED_ID: &str = "38-15";
const MISPLACED_COORD: Coord3 = Coord3::new(11766.3, 14793.5, -2133.39);

/// Corrects objective coordinates known to be wrong in the static data.
pub fn patch_coordinate(id: &str, coord: Coord3) -> Coord3 {
    let near = |a: f64, b: f64| (a - b).abs() < 1.0;
    if id == MISPLACED_ID
        && near(coord.x, MISPLACED_COORD.x)
        && near(coord.y, MISPLACED_COORD.y)
        && near(coord.z, MISPLACED_COORD.z)
    {
        Coord3::new(11462.5, 15490.0, coord.z - 500.0)
    } else {
        coord
    }
}

/// Per-map registry of trackable objectives.
///
/// The first request for a map builds its entities from the static objective
/// list and the map's default floor; later requests share the same `Arc`s
/// until [`ObjectiveRegistry::clear`].
pub struct ObjectiveRegistry {
    objectives: SingleFlightCache<i32, ObjectiveList>,
}

impl ObjectiveRegistry {
    pub fn new(
        remote: Arc<dyn RemoteSource>,
        catalog: Arc<MapCatalog>,
        clock: Arc<dyn Clock>,
        policy: RetryPolicy,
    ) -> Self {
        let objectives = SingleFlightCache::new(move |map_id: i32| {
            let remote = Arc::clone(&remote);
            let catalog = Arc::clone(&catalog);
            let clock = Arc::clone(&clock);
            async move {
                let entities = build_objectives(&*remote, &catalog, clock, policy, map_id).await?;
                debug!("Built {} objectives for map {}", entities.len(), map_id);
                Ok(Arc::new(entities))
            }
        });
        Self { objectives }
    }

    /// Objectives of `map_id`; empty when the map could not be resolved.
    pub async fn get_objectives(&self, map_id: i32) -> ObjectiveList {
        match self.try_get_objectives(map_id).await {
            Ok(list) => list,
            Err(e) => {
                warn!("Objectives of map {} are unavailable: {}", map_id, e);
                Arc::new(Vec::new())
            }
        }
    }

    pub async fn try_get_objectives(&self, map_id: i32) -> CacheResult<ObjectiveList> {
        self.objectives.get(map_id).await
    }

    pub fn contains(&self, map_id: i32) -> bool {
        self.objectives.contains_key(&map_id)
    }

    /// Forget every built map; entities already handed out stay valid.
    pub async fn clear(&self) {
        self.objectives.clear().await;
    }

    /// Forget every map without waiting for builds still in flight.
    pub fn clear_now(&self) {
        self.objectives.clear_now();
    }
}

async fn build_objectives(
    remote: &dyn RemoteSource,
    catalog: &MapCatalog,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
    map_id: i32,
) -> Result<Vec<Arc<ObjectiveEntity>>, MistwarError> {
    let definitions = retry(policy, "Fetching objective definitions", || remote.objectives()).await?;
    if definitions.is_empty() {
        return Ok(Vec::new());
    }

    let map = catalog.try_get_map(map_id).await?;
    let floor = match catalog.try_get_expanded_floor(&map, map.default_floor).await {
        Ok(floor) => floor,
        Err(e) if matches!(*e, MistwarError::NotFound(_)) => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    Ok(floor
        .sectors
        .values()
        .filter_map(|sector| {
            let definition = definitions.iter().find(|d| d.sector_id == sector.id)?;
            Some(Arc::new(build_entity(
                definition,
                sector,
                &floor,
                map.id,
                Arc::clone(&clock),
            )))
        })
        .collect())
}

fn build_entity(
    definition: &StaticObjective,
    sector: &Sector,
    floor: &ExpandedFloorMap,
    map_id: i32,
    clock: Arc<dyn Clock>,
) -> ObjectiveEntity {
    let origin = floor.continent_rect.top_left;
    let coord = definition
        .coord
        .unwrap_or(Coord3::new(sector.coord.x, sector.coord.y, 0.0));

    let waypoints = floor
        .points_of_interest
        .values()
        .filter(|poi| poi.kind == PoiType::Waypoint)
        .filter(|poi| contains_point(&sector.bounds, poi.coord))
        .map(|poi| Waypoint {
            id: poi.id,
            name: poi.name.clone(),
            chat_link: poi.chat_link.clone(),
            position: refit(poi.coord, origin, 0),
        })
        .collect();

    let geometry = ObjectiveGeometry {
        bounds: sector.bounds.iter().map(|c| refit(*c, origin, 0)).collect(),
        center: refit(sector.coord, origin, 0),
        world_position: world_position(
            patch_coordinate(&definition.id, coord),
            &floor.continent_rect,
        ),
        waypoints,
    };

    ObjectiveEntity::new(
        definition.id.clone(),
        definition.name.clone(),
        definition.kind,
        map_id,
        definition.chat_link.clone(),
        geometry,
        clock,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_only_touches_known_bad_coordinate() {
        let bad = Coord3::new(11766.0, 14793.9, -2133.0);
        assert_eq!(
            patch_coordinate("38-15", bad),
            Coord3::new(11462.5, 15490.0, -2633.0)
        );
        assert_eq!(patch_coordinate("38-14", bad), bad);

        let elsewhere = Coord3::new(11768.0, 14793.5, -2133.39);
        assert_eq!(patch_coordinate("38-15", elsewhere), elsewhere);
    }
}
