use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

// 大陆像素坐标, serialized as `[x, y]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coord2 {
    pub x: f64,
    pub y: f64,
}

impl Coord2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for Coord2 {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Coord2> for [f64; 2] {
    fn from(c: Coord2) -> Self {
        [c.x, c.y]
    }
}

// Objective coordinate with height, serialized as `[x, y, z]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Coord3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Coord3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl From<[f64; 3]> for Coord3 {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<Coord3> for [f64; 3] {
    fn from(c: Coord3) -> Self {
        [c.x, c.y, c.z]
    }
}

// `[[left, top], [right, bottom]]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[Coord2; 2]", into = "[Coord2; 2]")]
pub struct Rect {
    pub top_left: Coord2,
    pub bottom_right: Coord2,
}

impl Rect {
    pub const fn new(top_left: Coord2, bottom_right: Coord2) -> Self {
        Self {
            top_left,
            bottom_right,
        }
    }

    pub fn width(&self) -> f64 {
        self.bottom_right.x - self.top_left.x
    }

    pub fn height(&self) -> f64 {
        self.bottom_right.y - self.top_left.y
    }

    pub fn center(&self) -> Coord2 {
        Coord2::new(
            (self.top_left.x + self.bottom_right.x) / 2.0,
            (self.top_left.y + self.bottom_right.y) / 2.0,
        )
    }
}

impl From<[Coord2; 2]> for Rect {
    fn from([top_left, bottom_right]: [Coord2; 2]) -> Self {
        Self {
            top_left,
            bottom_right,
        }
    }
}

impl From<Rect> for [Coord2; 2] {
    fn from(r: Rect) -> Self {
        [r.top_left, r.bottom_right]
    }
}

/// Integer position in top-left-origin tile (destination pixel) space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Position in the game world, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Vec3) -> f32 {
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

// 地图元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapMetadata {
    pub id: i32,
    #[serde(default)]
    pub name: String,
    pub continent_id: i32,
    pub region_id: i32,
    pub default_floor: i32,
    pub continent_rect: Rect,
    pub map_rect: Rect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sector {
    pub id: u32,
    #[serde(default)]
    pub name: Option<String>,
    pub coord: Coord2,
    pub bounds: Vec<Coord2>,
    #[serde(default)]
    pub chat_link: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoiType {
    Landmark,
    Waypoint,
    Vista,
    Unlock,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poi {
    pub id: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: PoiType,
    pub coord: Coord2,
    #[serde(default)]
    pub chat_link: Option<String>,
}

/// Sectors and points of interest of one map on one floor.
///
/// Geometry is kept in continent pixel space exactly as fetched; consumers refit
/// their own copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpandedFloorMap {
    pub id: i32,
    pub continent_rect: Rect,
    #[serde(default)]
    pub sectors: BTreeMap<u32, Sector>,
    #[serde(default)]
    pub points_of_interest: BTreeMap<u32, Poi>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectiveType {
    Spawn,
    Camp,
    Ruins,
    Tower,
    Keep,
    Castle,
    Mercenary,
    Generic,
    Resource,
    #[serde(other)]
    Unknown,
}

// 静态目标定义 (/v2/wvw/objectives)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticObjective {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub sector_id: u32,
    #[serde(rename = "type")]
    pub kind: ObjectiveType,
    pub map_id: i32,
    #[serde(default)]
    pub coord: Option<Coord3>,
    #[serde(default)]
    pub chat_link: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WvwOwner {
    Neutral,
    Red,
    Blue,
    Green,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Population {
    Low,
    Medium,
    High,
    VeryHigh,
    Full,
    #[serde(other)]
    Unknown,
}

impl Population {
    /// Crowdedness for sorting; an unknown population ranks below `Low`.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::VeryHigh => 4,
            Self::Full => 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub id: i32,
    pub name: String,
    pub population: Population,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenPermission {
    Account,
    Builds,
    Characters,
    Guilds,
    Inventories,
    Progression,
    Pvp,
    Tradingpost,
    Unlocks,
    Wallet,
    Wvw,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub world: i32,
    pub team_id: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Character {
    pub name: String,
    pub guild: Option<Uuid>,
}

/// World (or team) ids taking part in a match, per team color.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamRoster {
    #[serde(default)]
    pub red: Vec<i32>,
    #[serde(default)]
    pub blue: Vec<i32>,
    #[serde(default)]
    pub green: Vec<i32>,
}

impl TeamRoster {
    pub fn team_of(&self, id: i32) -> WvwOwner {
        if self.blue.contains(&id) {
            WvwOwner::Blue
        } else if self.red.contains(&id) {
            WvwOwner::Red
        } else if self.green.contains(&id) {
            WvwOwner::Green
        } else {
            WvwOwner::Unknown
        }
    }

    pub fn members(&self, owner: WvwOwner) -> &[i32] {
        match owner {
            WvwOwner::Red => &self.red,
            WvwOwner::Blue => &self.blue,
            WvwOwner::Green => &self.green,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectiveDelta {
    pub id: String,
    pub owner: WvwOwner,
    pub claimed_by: Option<Uuid>,
    pub guild_upgrades: Vec<u32>,
    pub yaks_delivered: Option<u32>,
    pub last_flipped: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapSnapshot {
    pub id: i32,
    pub objectives: Vec<ObjectiveDelta>,
}

// 一次比赛轮询的结果, 用完即弃
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSnapshot {
    pub teams: TeamRoster,
    pub maps: Vec<MapSnapshot>,
}

impl MatchSnapshot {
    pub fn map(&self, map_id: i32) -> Option<&MapSnapshot> {
        self.maps.iter().find(|m| m.id == map_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileAddress {
    pub continent_id: i32,
    pub floor: i32,
    pub zoom: u8,
    pub x: i32,
    pub y: i32,
}
