use crate::domain::model::{ObjectiveType, Point, Vec3, WvwOwner};
use crate::domain::traits::{Clock, Release};
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Duration of the protection buff granted after a change of ownership.
pub const BUFF_DURATION: TimeDelta = TimeDelta::minutes(5);

/// Guild upgrade that places an emergency waypoint.
pub const EMERGENCY_WAYPOINT_UPGRADE: u32 = 178;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ObjectiveTier {
    Supported,
    Secured,
    Reinforced,
    Fortified,
}

impl ObjectiveTier {
    pub fn from_yaks(yaks_delivered: u32) -> Self {
        match yaks_delivered {
            140.. => Self::Fortified,
            60.. => Self::Reinforced,
            20.. => Self::Secured,
            _ => Self::Supported,
        }
    }
}

/// A waypoint inside an objective's sector, in tile space.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Waypoint {
    pub id: u32,
    pub name: Option<String>,
    pub chat_link: Option<String>,
    pub position: Point,
}

/// Everything about an objective that is fixed once the entity is built.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectiveGeometry {
    pub bounds: Vec<Point>,
    pub center: Point,
    pub world_position: Vec3,
    pub waypoints: Vec<Waypoint>,
}

#[derive(Debug, Clone)]
struct ObjectiveState {
    owner: WvwOwner,
    claimed_by: Option<Uuid>,
    yaks_delivered: u32,
    guild_upgrades: BTreeSet<u32>,
    last_flipped: DateTime<Utc>,
    last_modified: DateTime<Utc>,
}

/// Point-in-time copy of an objective, for output and comparisons.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectiveSnapshot {
    pub id: String,
    pub name: String,
    pub kind: ObjectiveType,
    pub map_id: i32,
    pub owner: WvwOwner,
    pub claimed_by: Option<Uuid>,
    pub yaks_delivered: u32,
    pub tier: ObjectiveTier,
    pub guild_upgrades: Vec<u32>,
    pub last_flipped: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub world_position: Vec3,
    pub waypoints: usize,
}

/// A trackable objective on one map.
///
/// Built once by the objective registry and then shared. The match synchronizer
/// is the only writer; every setter compares before assigning so that
/// `last_modified` moves only on a real change.
pub struct ObjectiveEntity {
    id: String,
    name: String,
    kind: ObjectiveType,
    map_id: i32,
    chat_link: Option<String>,
    geometry: ObjectiveGeometry,
    buff_duration: TimeDelta,
    clock: Arc<dyn Clock>,
    state: RwLock<ObjectiveState>,
}

impl ObjectiveEntity {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: ObjectiveType,
        map_id: i32,
        chat_link: Option<String>,
        geometry: ObjectiveGeometry,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            map_id,
            chat_link,
            geometry,
            buff_duration: BUFF_DURATION,
            clock,
            state: RwLock::new(ObjectiveState {
                owner: WvwOwner::Neutral,
                claimed_by: None,
                yaks_delivered: 0,
                guild_upgrades: BTreeSet::new(),
                last_flipped: DateTime::<Utc>::UNIX_EPOCH,
                last_modified: DateTime::<Utc>::UNIX_EPOCH,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ObjectiveType {
        self.kind
    }

    pub fn map_id(&self) -> i32 {
        self.map_id
    }

    pub fn chat_link(&self) -> Option<&str> {
        self.chat_link.as_deref()
    }

    pub fn bounds(&self) -> &[Point] {
        &self.geometry.bounds
    }

    pub fn center(&self) -> Point {
        self.geometry.center
    }

    pub fn world_position(&self) -> Vec3 {
        self.geometry.world_position
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.geometry.waypoints
    }

    pub fn buff_duration(&self) -> TimeDelta {
        self.buff_duration
    }

    pub fn owner(&self) -> WvwOwner {
        self.state.read().owner
    }

    pub fn claimed_by(&self) -> Option<Uuid> {
        self.state.read().claimed_by
    }

    pub fn yaks_delivered(&self) -> u32 {
        self.state.read().yaks_delivered
    }

    pub fn guild_upgrades(&self) -> Vec<u32> {
        self.state.read().guild_upgrades.iter().copied().collect()
    }

    pub fn last_flipped(&self) -> DateTime<Utc> {
        self.state.read().last_flipped
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.state.read().last_modified
    }

    // ---------------------------------------------------------------------
    // Setters, each returns whether the value changed
    // ---------------------------------------------------------------------

    pub fn set_owner(&self, owner: WvwOwner) -> bool {
        self.update(|s| {
            if s.owner == owner {
                return false;
            }
            s.owner = owner;
            true
        })
    }

    pub fn set_claimed_by(&self, guild: Option<Uuid>) -> bool {
        let guild = guild.filter(|g| !g.is_nil());
        self.update(|s| {
            if s.claimed_by == guild {
                return false;
            }
            s.claimed_by = guild;
            true
        })
    }

    pub fn set_yaks_delivered(&self, yaks: u32) -> bool {
        self.update(|s| {
            if s.yaks_delivered == yaks {
                return false;
            }
            s.yaks_delivered = yaks;
            true
        })
    }

    /// Replaces the enabled upgrades; order and duplicates are irrelevant.
    pub fn set_guild_upgrades(&self, upgrades: impl IntoIterator<Item = u32>) -> bool {
        let upgrades: BTreeSet<u32> = upgrades.into_iter().collect();
        self.update(|s| {
            if s.guild_upgrades == upgrades {
                return false;
            }
            s.guild_upgrades = upgrades;
            true
        })
    }

    /// Records the last ownership flip. Does not count as a modification.
    pub fn set_last_flipped(&self, flipped: DateTime<Utc>) -> bool {
        let mut state = self.state.write();
        if state.last_flipped == flipped {
            return false;
        }
        state.last_flipped = flipped;
        true
    }

    fn update(&self, apply: impl FnOnce(&mut ObjectiveState) -> bool) -> bool {
        let mut state = self.state.write();
        if !apply(&mut state) {
            return false;
        }
        let now = self.clock.now();
        if now > state.last_modified {
            state.last_modified = now;
        }
        true
    }

    // ---------------------------------------------------------------------
    // Derived queries
    // ---------------------------------------------------------------------

    pub fn tier(&self) -> ObjectiveTier {
        ObjectiveTier::from_yaks(self.yaks_delivered())
    }

    /// Remaining protection time, `None` once the buff expired.
    pub fn buff_remaining(&self) -> Option<TimeDelta> {
        let elapsed = self.clock.now() - self.last_flipped();
        let remaining = self.buff_duration - elapsed;
        (remaining > TimeDelta::zero()).then_some(remaining)
    }

    pub fn has_buff(&self) -> bool {
        self.buff_remaining().is_some()
    }

    pub fn is_owned(&self) -> bool {
        matches!(
            self.owner(),
            WvwOwner::Red | WvwOwner::Green | WvwOwner::Blue
        )
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed_by().is_some()
    }

    pub fn is_claimed_by(&self, guild: Uuid) -> bool {
        !guild.is_nil() && self.claimed_by() == Some(guild)
    }

    pub fn has_guild_upgrades(&self) -> bool {
        !self.state.read().guild_upgrades.is_empty()
    }

    pub fn has_upgraded(&self) -> bool {
        self.yaks_delivered() >= 20
    }

    pub fn is_spawn(&self) -> bool {
        self.kind == ObjectiveType::Spawn
    }

    pub fn has_emergency_waypoint(&self) -> bool {
        self.state
            .read()
            .guild_upgrades
            .contains(&EMERGENCY_WAYPOINT_UPGRADE)
    }

    pub fn has_regular_waypoint(&self) -> bool {
        self.is_spawn()
            || (self.tier() == ObjectiveTier::Fortified
                && matches!(self.kind, ObjectiveType::Keep | ObjectiveType::Castle))
    }

    pub fn distance_to(&self, position: &Vec3) -> f32 {
        self.geometry.world_position.distance(position)
    }

    pub fn snapshot(&self) -> ObjectiveSnapshot {
        let state = self.state.read().clone();
        ObjectiveSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            kind: self.kind,
            map_id: self.map_id,
            owner: state.owner,
            claimed_by: state.claimed_by,
            yaks_delivered: state.yaks_delivered,
            tier: ObjectiveTier::from_yaks(state.yaks_delivered),
            guild_upgrades: state.guild_upgrades.into_iter().collect(),
            last_flipped: state.last_flipped,
            last_modified: state.last_modified,
            world_position: self.geometry.world_position,
            waypoints: self.geometry.waypoints.len(),
        }
    }
}

impl fmt::Debug for ObjectiveEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectiveEntity")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("map_id", &self.map_id)
            .field("state", &*self.state.read())
            .finish()
    }
}

impl Release for ObjectiveEntity {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_thresholds() {
        let cases = [
            (0, ObjectiveTier::Supported),
            (19, ObjectiveTier::Supported),
            (20, ObjectiveTier::Secured),
            (59, ObjectiveTier::Secured),
            (60, ObjectiveTier::Reinforced),
            (139, ObjectiveTier::Reinforced),
            (140, ObjectiveTier::Fortified),
            (999, ObjectiveTier::Fortified),
        ];
        for (yaks, tier) in cases {
            assert_eq!(ObjectiveTier::from_yaks(yaks), tier, "yaks = {}", yaks);
        }
    }
}
