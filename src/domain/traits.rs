use crate::domain::error::MistwarError;
use crate::domain::model::{
    Account, Character, ExpandedFloorMap, MapMetadata, MatchSnapshot, StaticObjective,
    TileAddress, TokenPermission, World,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Trait for the remote game data source
///
/// Every call is a suspension point; implementations must be safe to share
/// across tasks. The HTTP implementation lives in `infrastructure::network`.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Whether the configured credentials were granted every scope in `required`.
    fn has_permissions(&self, required: &[TokenPermission]) -> bool;

    /// Whether the granted scopes have been read since startup.
    fn permissions_loaded(&self) -> bool;

    /// Ask the remote which scopes the configured credentials were granted.
    async fn refresh_permissions(&self) -> Result<Vec<TokenPermission>, MistwarError>;

    async fn account(&self) -> Result<Account, MistwarError>;

    async fn character(&self, name: &str) -> Result<Character, MistwarError>;

    async fn worlds(&self) -> Result<Vec<World>, MistwarError>;

    /// Current match of the given world or team.
    async fn match_by_world(&self, world_id: i32) -> Result<MatchSnapshot, MistwarError>;

    async fn objectives(&self) -> Result<Vec<StaticObjective>, MistwarError>;

    async fn map(&self, map_id: i32) -> Result<MapMetadata, MistwarError>;

    async fn expanded_floor(
        &self,
        map: &MapMetadata,
        floor_id: i32,
    ) -> Result<ExpandedFloorMap, MistwarError>;

    /// Encoded image bytes of one map tile.
    async fn tile(&self, address: TileAddress) -> Result<Vec<u8>, MistwarError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// What the game client currently tells us about the player.
pub trait PlayerContext: Send + Sync {
    /// Whether the player is inside a World vs. World match instance.
    fn is_in_match(&self) -> bool;

    fn character_name(&self) -> Option<String>;

    fn current_map_id(&self) -> Option<i32>;
}

/// Passive, user-visible signals: loading messages and warnings.
pub trait Notifier: Send + Sync {
    /// `None` clears the current loading message.
    fn progress(&self, message: Option<&str>);

    fn warning(&self, message: &str);
}

/// Notifier that only writes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn progress(&self, message: Option<&str>) {
        if let Some(message) = message {
            tracing::debug!("{}", message);
        }
    }

    fn warning(&self, message: &str) {
        tracing::warn!("{}", message);
    }
}

/// Values that own external resources freed on cache eviction.
pub trait Release {
    fn release(&self) {}
}

impl<T: Release> Release for Arc<T> {
    fn release(&self) {
        (**self).release()
    }
}

impl<T: Release> Release for Option<T> {
    fn release(&self) {
        if let Some(value) = self {
            value.release();
        }
    }
}

impl<T: Release> Release for Vec<T> {
    fn release(&self) {
        for item in self {
            item.release();
        }
    }
}

impl Release for MapMetadata {}

impl Release for ExpandedFloorMap {}
