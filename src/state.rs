use crate::application::catalog::MapCatalog;
use crate::application::compositor::TileCompositor;
use crate::application::maps::MapService;
use crate::application::registry::ObjectiveRegistry;
use crate::application::sync::MatchSynchronizer;
use crate::domain::error::MistwarError;
use crate::domain::traits::{Clock, Notifier, PlayerContext, RemoteSource, SystemClock};
use crate::infrastructure::config::{get_cache_dir, Config};
use crate::infrastructure::network::http::create_client;
use crate::infrastructure::network::{Gw2Client, RetryPolicy};
use crate::infrastructure::storage::RasterStore;
use crate::interfaces::player::StaticPlayer;
use crate::presentation::progress::SpinnerNotifier;
use std::sync::Arc;

/// Every long-lived component, wired once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub client: Arc<Gw2Client>,
    pub player: Arc<StaticPlayer>,
    pub notifier: Arc<SpinnerNotifier>,
    pub catalog: Arc<MapCatalog>,
    pub registry: Arc<ObjectiveRegistry>,
    pub sync: Arc<MatchSynchronizer>,
    pub maps: Arc<MapService>,
}

impl AppState {
    pub fn new(config: Config, character: Option<String>) -> Result<Self, MistwarError> {
        let http_client = create_client(&config.api)?;
        let client = Arc::new(Gw2Client::new(http_client, &config.api));
        let remote: Arc<dyn RemoteSource> = client.clone();

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let player = Arc::new(StaticPlayer::new(character.or_else(|| config.api.character.clone())));
        let notifier = Arc::new(SpinnerNotifier::new());
        let policy = RetryPolicy::from_config(&config.retry);

        let catalog = Arc::new(MapCatalog::new(remote.clone(), policy));
        let registry = Arc::new(ObjectiveRegistry::new(
            remote.clone(),
            catalog.clone(),
            clock.clone(),
            policy,
        ));
        let sync = Arc::new(MatchSynchronizer::new(
            remote.clone(),
            registry.clone(),
            clock,
            player.clone() as Arc<dyn PlayerContext>,
            notifier.clone() as Arc<dyn Notifier>,
            policy,
        ));

        let store = RasterStore::new(
            get_cache_dir(&config),
            config.raster.load_retries,
            config.raster.load_retry_delay(),
        );
        let compositor = Arc::new(TileCompositor::new(remote, catalog.clone(), store));
        let maps = Arc::new(MapService::new(
            catalog.clone(),
            registry.clone(),
            compositor,
            player.clone(),
            notifier.clone(),
            config.clip_to_sectors,
        ));

        Ok(Self {
            config: Arc::new(config),
            client,
            player,
            notifier,
            catalog,
            registry,
            sync,
            maps,
        })
    }
}
