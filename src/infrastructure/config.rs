use crate::domain::error::MistwarError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_clip_to_sectors")]
    pub clip_to_sectors: bool,
    pub cache_dir: Option<String>,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub raster: RasterConfig,
    #[serde(default)]
    pub logging: Logging,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ApiConfig {
    pub key: Option<String>,
    pub character: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_tile_url")]
    pub tile_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RetryConfig {
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RasterConfig {
    #[serde(default = "default_load_retries")]
    pub load_retries: u32,
    #[serde(default = "default_delay_ms")]
    pub load_retry_delay_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Logging {
    #[serde(default = "default_enable")]
    pub enable: bool,
    pub path: Option<String>,
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            clip_to_sectors: default_clip_to_sectors(),
            cache_dir: None,
            tick_ms: default_tick_ms(),
            api: ApiConfig::default(),
            retry: RetryConfig::default(),
            raster: RasterConfig::default(),
            logging: Logging::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key: None,
            character: None,
            base_url: default_base_url(),
            tile_url: default_tile_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            load_retries: default_load_retries(),
            load_retry_delay_ms: default_delay_ms(),
        }
    }
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            enable: true,
            path: None,
            level: "WARN".to_string(),
        }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl RasterConfig {
    pub fn load_retry_delay(&self) -> Duration {
        Duration::from_millis(self.load_retry_delay_ms)
    }
}

// Defaults
fn default_theme() -> String {
    "normal".to_string()
}
fn default_clip_to_sectors() -> bool {
    true
}
fn default_tick_ms() -> u64 {
    1000
}
fn default_base_url() -> String {
    "https://api.guildwars2.com".to_string()
}
fn default_tile_url() -> String {
    "https://tiles.guildwars2.com/{continent}/{floor}/{zoom}/{x}/{y}.jpg".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_attempts() -> u32 {
    3
}
fn default_delay_ms() -> u64 {
    2000
}
fn default_load_retries() -> u32 {
    2
}
fn default_enable() -> bool {
    true
}
fn default_log_level() -> String {
    "WARN".to_string()
}

pub fn get_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("mistwar").join("config.toml"))
}

/// Directory holding the composed map images (`<cache_dir>/<map_id>.png`).
pub fn get_cache_dir(config: &Config) -> PathBuf {
    match config.cache_dir.as_deref() {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        // ~/.cache/mistwar (Linux)
        _ => dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mistwar"),
    }
}

pub fn parse_config(content: &str) -> Result<Config, MistwarError> {
    Ok(toml::from_str::<Config>(content)?)
}

pub fn load_config() -> Result<Config, MistwarError> {
    let config_path = get_config_path();

    if let Some(path) = config_path {
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            match parse_config(&content) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    eprintln!(
                        "Warning: Failed to parse config file: {}. Using defaults.",
                        e
                    );
                }
            }
        }
    }

    Ok(Config::default())
}

pub fn generate_config_sample() -> Result<(), MistwarError> {
    let config_path = get_config_path();

    if let Some(path) = config_path {
        if path.exists() {
            eprintln!("Config file already exists at: {}", path.display());
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let sample = Config::default();
        let toml_content = toml::to_string_pretty(&sample)
            .map_err(|e| MistwarError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(&path, toml_content)
            .map_err(|e| MistwarError::Config(format!("Failed to write config file: {}", e)))?;
        println!("Generated config file at: {}", path.display());
    } else {
        return Err(MistwarError::Config(
            "Cannot determine config directory".to_string(),
        ));
    }

    Ok(())
}
