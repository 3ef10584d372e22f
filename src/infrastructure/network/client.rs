use crate::domain::error::MistwarError;
use crate::domain::model::{
    Account, Character, ExpandedFloorMap, MapMetadata, MapSnapshot, MatchSnapshot,
    ObjectiveDelta, StaticObjective, TeamRoster, TileAddress, TokenPermission, World, WvwOwner,
};
use crate::domain::traits::RemoteSource;
use crate::infrastructure::config::ApiConfig;
use crate::infrastructure::network::http::check_status;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

/// Account schema version that carries the WvW team assignment.
const ACCOUNT_SCHEMA: &str = "2024-07-20T01:00:00.000Z";

// Guild Wars 2 API v2 response structures
#[derive(Deserialize, Debug)]
struct TokenInfoResponse {
    #[serde(default)]
    permissions: Vec<TokenPermission>,
}

#[derive(Deserialize, Debug)]
struct AccountResponse {
    world: i32,
    wvw: Option<AccountWvw>,
}

#[derive(Deserialize, Debug)]
struct AccountWvw {
    team_id: Option<i32>,
}

#[derive(Deserialize, Debug)]
struct CharacterResponse {
    name: String,
    guild: Option<Uuid>,
}

#[derive(Deserialize, Debug)]
struct MatchResponse {
    #[serde(default)]
    all_worlds: TeamRoster,
    #[serde(default)]
    maps: Vec<MatchMap>,
}

#[derive(Deserialize, Debug)]
struct MatchMap {
    id: i32,
    #[serde(default)]
    objectives: Vec<MatchObjective>,
}

#[derive(Deserialize, Debug)]
struct MatchObjective {
    id: String,
    owner: WvwOwner,
    last_flipped: Option<DateTime<Utc>>,
    claimed_by: Option<Uuid>,
    guild_upgrades: Option<Vec<u32>>,
    yaks_delivered: Option<u32>,
}

impl From<MatchResponse> for MatchSnapshot {
    fn from(response: MatchResponse) -> Self {
        Self {
            teams: response.all_worlds,
            maps: response
                .maps
                .into_iter()
                .map(|m| MapSnapshot {
                    id: m.id,
                    objectives: m
                        .objectives
                        .into_iter()
                        .map(|o| ObjectiveDelta {
                            id: o.id,
                            owner: o.owner,
                            claimed_by: o.claimed_by,
                            guild_upgrades: o.guild_upgrades.unwrap_or_default(),
                            yaks_delivered: o.yaks_delivered,
                            last_flipped: o.last_flipped,
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// HTTP implementation of [`RemoteSource`] against the official API.
pub struct Gw2Client {
    client: Client,
    base_url: String,
    tile_url: String,
    api_key: Option<String>,
    // None until tokeninfo answered once
    permissions: RwLock<Option<Vec<TokenPermission>>>,
}

impl Gw2Client {
    pub fn new(client: Client, api: &ApiConfig) -> Self {
        Self {
            client,
            base_url: api.base_url.clone(),
            tile_url: api.tile_url.clone(),
            api_key: api.key.clone().filter(|k| !k.is_empty()),
            permissions: RwLock::new(None),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn url(&self, segments: &[&str]) -> Result<Url, MistwarError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| MistwarError::Config(format!("Invalid API base url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| MistwarError::Config("API base url cannot have a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn tile_url_for(&self, address: TileAddress) -> String {
        self.tile_url
            .replace("{continent}", &address.continent_id.to_string())
            .replace("{floor}", &address.floor.to_string())
            .replace("{zoom}", &address.zoom.to_string())
            .replace("{x}", &address.x.to_string())
            .replace("{y}", &address.y.to_string())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
        authorized: bool,
    ) -> Result<T, MistwarError> {
        let url = self.url(segments)?;
        let mut request = self.client.get(url).query(query);
        if authorized {
            let key = self
                .api_key
                .as_deref()
                .ok_or_else(|| MistwarError::Unauthorized("no API key configured".to_string()))?;
            request = request.bearer_auth(key);
        }
        let response = check_status(request.send().await?)?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl RemoteSource for Gw2Client {
    fn has_permissions(&self, required: &[TokenPermission]) -> bool {
        let granted = self.permissions.read();
        self.api_key.is_some()
            && granted
                .as_ref()
                .is_some_and(|g| required.iter().all(|p| g.contains(p)))
    }

    fn permissions_loaded(&self) -> bool {
        self.api_key.is_none() || self.permissions.read().is_some()
    }

    async fn refresh_permissions(&self) -> Result<Vec<TokenPermission>, MistwarError> {
        if self.api_key.is_none() {
            return Ok(Vec::new());
        }
        let info: TokenInfoResponse = self.get_json(&["v2", "tokeninfo"], &[], true).await?;
        debug!("Token permissions: {:?}", info.permissions);
        *self.permissions.write() = Some(info.permissions.clone());
        Ok(info.permissions)
    }

    async fn account(&self) -> Result<Account, MistwarError> {
        let account: AccountResponse = self
            .get_json(&["v2", "account"], &[("v", ACCOUNT_SCHEMA)], true)
            .await?;
        Ok(Account {
            world: account.world,
            team_id: account.wvw.and_then(|w| w.team_id),
        })
    }

    async fn character(&self, name: &str) -> Result<Character, MistwarError> {
        let character: CharacterResponse = self
            .get_json(&["v2", "characters", name], &[], true)
            .await?;
        Ok(Character {
            name: character.name,
            guild: character.guild,
        })
    }

    async fn worlds(&self) -> Result<Vec<World>, MistwarError> {
        self.get_json(&["v2", "worlds"], &[("ids", "all")], false)
            .await
    }

    async fn match_by_world(&self, world_id: i32) -> Result<MatchSnapshot, MistwarError> {
        let world = world_id.to_string();
        let response: MatchResponse = self
            .get_json(&["v2", "wvw", "matches"], &[("world", &world)], false)
            .await?;
        Ok(response.into())
    }

    async fn objectives(&self) -> Result<Vec<StaticObjective>, MistwarError> {
        self.get_json(&["v2", "wvw", "objectives"], &[("ids", "all")], false)
            .await
    }

    async fn map(&self, map_id: i32) -> Result<MapMetadata, MistwarError> {
        let id = map_id.to_string();
        self.get_json(&["v2", "maps", &id], &[], false).await
    }

    async fn expanded_floor(
        &self,
        map: &MapMetadata,
        floor_id: i32,
    ) -> Result<ExpandedFloorMap, MistwarError> {
        let (continent, floor, region, id) = (
            map.continent_id.to_string(),
            floor_id.to_string(),
            map.region_id.to_string(),
            map.id.to_string(),
        );
        self.get_json(
            &[
                "v2", "continents", &continent, "floors", &floor, "regions", &region, "maps", &id,
            ],
            &[],
            false,
        )
        .await
    }

    async fn tile(&self, address: TileAddress) -> Result<Vec<u8>, MistwarError> {
        let url = self.tile_url_for(address);
        let response = check_status(self.client.get(&url).send().await?)?;
        Ok(response.bytes().await?.to_vec())
    }
}
