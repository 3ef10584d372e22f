//! 测试公共设施: 内存中的远端数据源, 手动时钟等
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use image::{ImageFormat, Rgba, RgbaImage};
use mistwar::domain::error::MistwarError;
use mistwar::domain::model::{
    Account, Character, Coord2, Coord3, ExpandedFloorMap, MapMetadata, MapSnapshot,
    MatchSnapshot, ObjectiveDelta, ObjectiveType, Poi, PoiType, Population, Rect, Sector,
    StaticObjective, TeamRoster, TileAddress, TokenPermission, World, WvwOwner,
};
use mistwar::domain::objective::{ObjectiveEntity, ObjectiveGeometry};
use mistwar::domain::traits::{Clock, Notifier, PlayerContext, RemoteSource};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const MAP_ID: i32 = 38;
pub const TEAM_ID: i32 = 11001;
pub const GUILD: Uuid = Uuid::from_u128(0x4bbb52aa_d768_4fc6_8ede_c299f2822f0f);

pub fn ts(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, h, m, s).unwrap()
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(now),
        })
    }

    pub fn advance(&self, by: TimeDelta) {
        *self.now.lock() += by;
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

// ---------------------------------------------------------------------------
// Player and notifier
// ---------------------------------------------------------------------------

pub struct TestPlayer {
    pub in_match: AtomicBool,
    pub map_id: Mutex<Option<i32>>,
}

impl TestPlayer {
    pub fn in_match() -> Arc<Self> {
        Arc::new(Self {
            in_match: AtomicBool::new(true),
            map_id: Mutex::new(Some(MAP_ID)),
        })
    }
}

impl PlayerContext for TestPlayer {
    fn is_in_match(&self) -> bool {
        self.in_match.load(Ordering::SeqCst)
    }

    fn character_name(&self) -> Option<String> {
        Some("Tester".to_string())
    }

    fn current_map_id(&self) -> Option<i32> {
        *self.map_id.lock()
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub warnings: Mutex<Vec<String>>,
    pub progress: Mutex<Vec<Option<String>>>,
}

impl Notifier for RecordingNotifier {
    fn progress(&self, message: Option<&str>) {
        self.progress.lock().push(message.map(str::to_string));
    }

    fn warning(&self, message: &str) {
        self.warnings.lock().push(message.to_string());
    }
}

// ---------------------------------------------------------------------------
// Remote source
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct Calls {
    pub maps: AtomicUsize,
    pub floors: AtomicUsize,
    pub objectives: AtomicUsize,
    pub matches: AtomicUsize,
    pub tiles: AtomicUsize,
    pub accounts: AtomicUsize,
}

impl Calls {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// In-memory remote with one small WvW map (id 38).
pub struct FakeRemote {
    pub permissions: Mutex<Vec<TokenPermission>>,
    pub permissions_loaded: AtomicBool,
    /// Token-info requests left to fail before one succeeds.
    pub tokeninfo_failures: AtomicUsize,
    pub team_id: Mutex<Option<i32>>,
    pub snapshot: Mutex<Option<MatchSnapshot>>,
    pub objectives: Vec<StaticObjective>,
    pub maps: HashMap<i32, MapMetadata>,
    pub floors: HashMap<i32, ExpandedFloorMap>,
    pub tiles: Mutex<HashMap<(i32, i32), Vec<u8>>>,
    pub delay: Duration,
    pub calls: Calls,
}

impl FakeRemote {
    pub fn new() -> Self {
        let map = map_38();
        let floor = floor_38();
        let mut tiles = HashMap::new();
        for x in 1..=3 {
            for y in 1..=2 {
                tiles.insert((x, y), tile_png(Rgba([40, 80, 120, 255])));
            }
        }
        Self {
            permissions: Mutex::new(vec![TokenPermission::Account, TokenPermission::Characters]),
            permissions_loaded: AtomicBool::new(true),
            tokeninfo_failures: AtomicUsize::new(0),
            team_id: Mutex::new(Some(TEAM_ID)),
            snapshot: Mutex::new(Some(snapshot(vec![]))),
            objectives: static_objectives(),
            maps: HashMap::from([(map.id, map)]),
            floors: HashMap::from([(floor.id, floor)]),
            tiles: Mutex::new(tiles),
            delay: Duration::ZERO,
            calls: Calls::default(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_snapshot(&self, snapshot: Option<MatchSnapshot>) {
        *self.snapshot.lock() = snapshot;
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl RemoteSource for FakeRemote {
    fn has_permissions(&self, required: &[TokenPermission]) -> bool {
        if !self.permissions_loaded() {
            return false;
        }
        let granted = self.permissions.lock();
        required.iter().all(|p| granted.contains(p))
    }

    fn permissions_loaded(&self) -> bool {
        self.permissions_loaded.load(Ordering::SeqCst)
    }

    async fn refresh_permissions(&self) -> Result<Vec<TokenPermission>, MistwarError> {
        let failing = self
            .tokeninfo_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(MistwarError::Status {
                status: 503,
                url: "/v2/tokeninfo".to_string(),
            });
        }
        self.permissions_loaded.store(true, Ordering::SeqCst);
        Ok(self.permissions.lock().clone())
    }

    async fn account(&self) -> Result<Account, MistwarError> {
        self.calls.accounts.fetch_add(1, Ordering::SeqCst);
        Ok(Account {
            world: 1001,
            team_id: *self.team_id.lock(),
        })
    }

    async fn character(&self, name: &str) -> Result<Character, MistwarError> {
        Ok(Character {
            name: name.to_string(),
            guild: Some(GUILD),
        })
    }

    async fn worlds(&self) -> Result<Vec<World>, MistwarError> {
        Ok(vec![
            world(1004, "Mystery", Population::Unknown),
            world(1001, "Gandara", Population::High),
            world(11001, "Moogooloo", Population::Full),
            world(1002, "Desolation", Population::Medium),
            world(1003, "Kodash", Population::Low),
        ])
    }

    async fn match_by_world(&self, _world_id: i32) -> Result<MatchSnapshot, MistwarError> {
        self.calls.matches.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.snapshot
            .lock()
            .clone()
            .ok_or_else(|| MistwarError::NotFound("/v2/wvw/matches".to_string()))
    }

    async fn objectives(&self) -> Result<Vec<StaticObjective>, MistwarError> {
        self.calls.objectives.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        Ok(self.objectives.clone())
    }

    async fn map(&self, map_id: i32) -> Result<MapMetadata, MistwarError> {
        self.calls.maps.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.maps
            .get(&map_id)
            .cloned()
            .ok_or_else(|| MistwarError::NotFound(format!("/v2/maps/{}", map_id)))
    }

    async fn expanded_floor(
        &self,
        map: &MapMetadata,
        _floor_id: i32,
    ) -> Result<ExpandedFloorMap, MistwarError> {
        self.calls.floors.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.floors
            .get(&map.id)
            .cloned()
            .ok_or_else(|| MistwarError::NotFound(format!("floor of {}", map.id)))
    }

    async fn tile(&self, address: TileAddress) -> Result<Vec<u8>, MistwarError> {
        self.calls.tiles.fetch_add(1, Ordering::SeqCst);
        self.tiles
            .lock()
            .get(&(address.x, address.y))
            .cloned()
            .ok_or_else(|| MistwarError::NotFound(format!("tile {}/{}", address.x, address.y)))
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn world(id: i32, name: &str, population: Population) -> World {
    World {
        id,
        name: name.to_string(),
        population,
    }
}

fn rect(l: f64, t: f64, r: f64, b: f64) -> Rect {
    Rect::new(Coord2::new(l, t), Coord2::new(r, b))
}

fn square(l: f64, t: f64, r: f64, b: f64) -> Vec<Coord2> {
    vec![
        Coord2::new(l, t),
        Coord2::new(r, t),
        Coord2::new(r, b),
        Coord2::new(l, b),
    ]
}

/// 512 x 384 continent pixels starting at (256, 256), six tiles at zoom 6.
pub fn map_38() -> MapMetadata {
    MapMetadata {
        id: MAP_ID,
        name: "Eternal Battlegrounds".to_string(),
        continent_id: 2,
        region_id: 7,
        default_floor: 3,
        continent_rect: rect(256.0, 256.0, 768.0, 640.0),
        map_rect: rect(-36864.0, -36864.0, 36864.0, 36864.0),
    }
}

/// Sector 1 is the left half, sector 2 shares its right edge at x = 512,
/// sector 3 has no objective.
pub fn floor_38() -> ExpandedFloorMap {
    let sectors = [
        (1, square(256.0, 256.0, 512.0, 640.0), Coord2::new(384.0, 448.0)),
        (2, square(512.0, 256.0, 700.0, 500.0), Coord2::new(606.0, 378.0)),
        (3, square(700.0, 520.0, 760.0, 630.0), Coord2::new(730.0, 575.0)),
    ];
    let pois = [
        (10, PoiType::Waypoint, Coord2::new(300.0, 300.0)),
        (11, PoiType::Waypoint, Coord2::new(512.0, 300.0)),
        (12, PoiType::Landmark, Coord2::new(600.0, 300.0)),
        (13, PoiType::Waypoint, Coord2::new(740.0, 100.0)),
    ];

    ExpandedFloorMap {
        id: MAP_ID,
        continent_rect: map_38().continent_rect,
        sectors: sectors
            .into_iter()
            .map(|(id, bounds, coord)| {
                (
                    id,
                    Sector {
                        id,
                        name: Some(format!("Sector {}", id)),
                        coord,
                        bounds,
                        chat_link: None,
                    },
                )
            })
            .collect::<BTreeMap<_, _>>(),
        points_of_interest: pois
            .into_iter()
            .map(|(id, kind, coord)| {
                (
                    id,
                    Poi {
                        id,
                        name: None,
                        kind,
                        coord,
                        chat_link: None,
                    },
                )
            })
            .collect(),
    }
}

pub fn static_objectives() -> Vec<StaticObjective> {
    vec![
        StaticObjective {
            id: "38-6".to_string(),
            name: "Overlook".to_string(),
            sector_id: 1,
            kind: ObjectiveType::Keep,
            map_id: MAP_ID,
            coord: Some(Coord3::new(400.0, 400.0, -100.0)),
            chat_link: None,
        },
        StaticObjective {
            id: "38-15".to_string(),
            name: "Langor Gulch".to_string(),
            sector_id: 2,
            kind: ObjectiveType::Camp,
            map_id: MAP_ID,
            coord: Some(Coord3::new(11766.3, 14793.5, -2133.39)),
            chat_link: None,
        },
        StaticObjective {
            id: "95-34".to_string(),
            name: "Elsewhere".to_string(),
            sector_id: 999,
            kind: ObjectiveType::Tower,
            map_id: 95,
            coord: None,
            chat_link: None,
        },
    ]
}

pub fn delta(id: &str, owner: WvwOwner) -> ObjectiveDelta {
    ObjectiveDelta {
        id: id.to_string(),
        owner,
        claimed_by: None,
        guild_upgrades: Vec::new(),
        yaks_delivered: None,
        last_flipped: None,
    }
}

pub fn snapshot(objectives: Vec<ObjectiveDelta>) -> MatchSnapshot {
    MatchSnapshot {
        teams: TeamRoster {
            red: vec![1001, TEAM_ID],
            blue: vec![1002],
            green: vec![1003],
        },
        maps: vec![MapSnapshot {
            id: MAP_ID,
            objectives,
        }],
    }
}

/// Solid 256 x 256 PNG tile.
pub fn tile_png(color: Rgba<u8>) -> Vec<u8> {
    let image = RgbaImage::from_pixel(256, 256, color);
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

pub fn entity(id: &str, kind: ObjectiveType, clock: Arc<dyn Clock>) -> ObjectiveEntity {
    let geometry = ObjectiveGeometry {
        bounds: Vec::new(),
        center: mistwar::domain::model::Point::new(0, 0),
        world_position: Default::default(),
        waypoints: Vec::new(),
    };
    ObjectiveEntity::new(id, format!("Objective {}", id), kind, MAP_ID, None, geometry, clock)
}
