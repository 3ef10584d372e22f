// Periodic match polling and objective reconciliation
use crate::application::registry::ObjectiveRegistry;
use crate::domain::error::MistwarError;
use crate::domain::model::{MatchSnapshot, TeamRoster, TokenPermission, World, WvwOwner};
use crate::domain::objective::ObjectiveEntity;
use crate::domain::traits::{Clock, Notifier, PlayerContext, RemoteSource};
use crate::infrastructure::network::retry::{retry, try_once, RetryPolicy};
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::{Mutex, RwLock};
use std::cmp::Reverse;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, warn};
use uuid::Uuid;

/// Desert Borderlands, Alpine Borderlands (blue and green), Eternal Battlegrounds.
pub const WVW_MAP_IDS: [i32; 4] = [1099, 96, 95, 38];

/// Minimum time between two match polls.
pub const POLL_INTERVAL: TimeDelta = TimeDelta::seconds(15);

const STALE_AFTER: TimeDelta = TimeDelta::minutes(1);
const STALE_WARNING_INTERVAL: TimeDelta = TimeDelta::minutes(2);

/// Team id used when the account has no assignment or cannot be read.
pub const NO_TEAM: i32 = -1;

const REFRESH_MESSAGE: &str = "Refreshing";

#[derive(Debug, Default)]
struct PollGate {
    refreshing: bool,
    last_poll: Option<DateTime<Utc>>,
    last_warning: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct MatchState {
    worlds: Vec<World>,
    teams: TeamRoster,
    team_id: i32,
    current_team: WvwOwner,
    guild: Option<Uuid>,
    home_world: Option<i32>,
    last_change: DateTime<Utc>,
    refresh_message: Option<String>,
}

/// Ends a refresh even if the poll is dropped half way: clears the flag and
/// the refresh message.
struct RefreshGuard<'a>(&'a MatchSynchronizer);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.gate.lock().refreshing = false;
        self.0.set_refresh_message(None);
    }
}

/// Polls the current match every tick (at most once per [`POLL_INTERVAL`]) and
/// writes the result into the registry's objective entities.
pub struct MatchSynchronizer {
    remote: Arc<dyn RemoteSource>,
    registry: Arc<ObjectiveRegistry>,
    clock: Arc<dyn Clock>,
    player: Arc<dyn PlayerContext>,
    notifier: Arc<dyn Notifier>,
    policy: RetryPolicy,
    started: DateTime<Utc>,
    gate: Mutex<PollGate>,
    state: RwLock<MatchState>,
}

impl MatchSynchronizer {
    pub fn new(
        remote: Arc<dyn RemoteSource>,
        registry: Arc<ObjectiveRegistry>,
        clock: Arc<dyn Clock>,
        player: Arc<dyn PlayerContext>,
        notifier: Arc<dyn Notifier>,
        policy: RetryPolicy,
    ) -> Self {
        let started = clock.now();
        Self {
            remote,
            registry,
            clock,
            player,
            notifier,
            policy,
            started,
            gate: Mutex::new(PollGate::default()),
            state: RwLock::new(MatchState {
                worlds: Vec::new(),
                teams: TeamRoster::default(),
                team_id: NO_TEAM,
                current_team: WvwOwner::Unknown,
                guild: None,
                home_world: None,
                last_change: DateTime::<Utc>::UNIX_EPOCH,
                refresh_message: None,
            }),
        }
    }

    /// Fetch the world list; polling stays disabled until this succeeded once.
    pub async fn load_world_data(&self) -> Result<usize, MistwarError> {
        let worlds = retry(self.policy, "Fetching worlds", || self.remote.worlds()).await?;
        let count = worlds.len();
        self.state.write().worlds = worlds;
        debug!("Loaded {} worlds", count);
        Ok(count)
    }

    /// One tick. Returns whether a match poll actually ran.
    pub async fn update(self: &Arc<Self>) -> bool {
        if self.is_loading() || self.is_refreshing() || !self.player.is_in_match() {
            return false;
        }

        let now = self.clock.now();
        {
            let mut gate = self.gate.lock();
            if gate.refreshing {
                return false;
            }
            if gate.last_poll.is_some_and(|last| now - last < POLL_INTERVAL) {
                return false;
            }
            gate.refreshing = true;
            gate.last_poll = Some(now);
        }
        let _guard = RefreshGuard(self);

        self.set_refresh_message(Some(REFRESH_MESSAGE));
        self.poll().await;
        self.check_staleness();
        true
    }

    async fn poll(self: &Arc<Self>) {
        // 启动时没读到权限的话, 每次轮询都再试一次
        if !self.remote.permissions_loaded() {
            try_once("Fetching token permissions", self.remote.refresh_permissions()).await;
        }
        let guild = self.resolve_guild().await;
        let team_id = self.resolve_team_id().await;
        {
            let mut state = self.state.write();
            state.guild = guild;
            state.team_id = team_id;
        }
        if team_id == NO_TEAM {
            debug!("No WvW team, skipping match poll");
            return;
        }

        let mut tasks = JoinSet::new();
        for map_id in WVW_MAP_IDS {
            let this = Arc::clone(self);
            tasks.spawn(async move { this.sync_map(team_id, map_id).await });
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!("Map synchronization task failed: {}", e);
            }
        }
    }

    async fn sync_map(&self, team_id: i32, map_id: i32) {
        let entities = self.registry.get_objectives(map_id).await;
        let fetch = self.remote.match_by_world(team_id);
        let Some(snapshot) = try_once("Fetching match", fetch).await else {
            return;
        };
        let changed = self.apply(&snapshot, team_id, map_id, &entities);
        if changed > 0 {
            debug!("Map {}: {} objectives changed", map_id, changed);
        }
    }

    /// Write one map's part of `snapshot` into `entities`.
    ///
    /// Returns how many entities changed. Entities without a matching delta are
    /// left alone.
    pub fn apply(
        &self,
        snapshot: &MatchSnapshot,
        team_id: i32,
        map_id: i32,
        entities: &[Arc<ObjectiveEntity>],
    ) -> usize {
        {
            let mut state = self.state.write();
            state.teams = snapshot.teams.clone();
            state.current_team = snapshot.teams.team_of(team_id);
        }

        let Some(map) = snapshot.map(map_id) else {
            return 0;
        };
        if map.objectives.is_empty() {
            return 0;
        }

        let mut changed = 0;
        let mut latest = DateTime::<Utc>::UNIX_EPOCH;
        for entity in entities {
            let Some(delta) = map
                .objectives
                .iter()
                .find(|d| d.id.eq_ignore_ascii_case(entity.id()))
            else {
                continue;
            };

            entity.set_last_flipped(delta.last_flipped.unwrap_or(DateTime::<Utc>::UNIX_EPOCH));
            // 不能短路: 每个字段都要写入
            let modified = [
                entity.set_owner(delta.owner),
                entity.set_claimed_by(delta.claimed_by),
                entity.set_guild_upgrades(delta.guild_upgrades.iter().copied()),
                entity.set_yaks_delivered(delta.yaks_delivered.unwrap_or(0)),
            ];
            if modified.contains(&true) {
                changed += 1;
            }
            latest = latest.max(entity.last_modified());
        }

        let mut state = self.state.write();
        if latest > state.last_change {
            state.last_change = latest;
        }
        changed
    }

    async fn resolve_guild(&self) -> Option<Uuid> {
        if !self
            .remote
            .has_permissions(&[TokenPermission::Account, TokenPermission::Characters])
        {
            return None;
        }
        let name = self.player.character_name()?;
        try_once("Fetching character", self.remote.character(&name))
            .await
            .and_then(|c| c.guild)
    }

    async fn resolve_team_id(&self) -> i32 {
        if !self.remote.has_permissions(&[TokenPermission::Account]) {
            return NO_TEAM;
        }
        let Some(account) = try_once("Fetching account", self.remote.account()).await else {
            return NO_TEAM;
        };
        self.state.write().home_world = Some(account.world);
        account.team_id.unwrap_or(NO_TEAM)
    }

    fn check_staleness(&self) {
        let now = self.clock.now();
        let since = now - self.last_change().max(self.started);
        if since <= STALE_AFTER {
            return;
        }
        {
            let mut gate = self.gate.lock();
            if gate
                .last_warning
                .is_some_and(|last| now - last < STALE_WARNING_INTERVAL)
            {
                return;
            }
            gate.last_warning = Some(now);
        }
        self.notifier.warning(&format!(
            "No changes in the last {} minutes.",
            since.num_minutes()
        ));
    }

    fn set_refresh_message(&self, message: Option<&str>) {
        self.state.write().refresh_message = message.map(str::to_string);
        self.notifier.progress(message);
    }

    /// True until the world list has been loaded.
    pub fn is_loading(&self) -> bool {
        self.state.read().worlds.is_empty()
    }

    pub fn is_refreshing(&self) -> bool {
        self.gate.lock().refreshing
    }

    pub fn refresh_message(&self) -> Option<String> {
        self.state.read().refresh_message.clone()
    }

    pub fn last_change(&self) -> DateTime<Utc> {
        self.state.read().last_change
    }

    pub fn current_team(&self) -> WvwOwner {
        self.state.read().current_team
    }

    pub fn current_guild(&self) -> Option<Uuid> {
        self.state.read().guild
    }

    pub fn team_id(&self) -> i32 {
        self.state.read().team_id
    }

    /// Name of the account's home world, once the account has been read.
    pub fn home_world(&self) -> Option<String> {
        let state = self.state.read();
        let id = state.home_world?;
        state.worlds.iter().find(|w| w.id == id).map(|w| w.name.clone())
    }

    /// Name of the most populous world playing for `owner`.
    pub fn world_name(&self, owner: WvwOwner) -> Option<String> {
        let state = self.state.read();
        let members = state.teams.members(owner);
        state
            .worlds
            .iter()
            .filter(|w| members.contains(&w.id))
            .min_by_key(|w| Reverse(w.population.rank()))
            .map(|w| w.name.clone())
    }
}
