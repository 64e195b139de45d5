use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const DEFAULT_BIND: &str = "127.0.0.1:8000";
pub const DEFAULT_DATABASE_PATH: &str = "cities.db";
pub const DEFAULT_GEOCODING_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_WEATHER_URL: &str = "https://api.open-meteo.com";
pub const DEFAULT_USER_AGENT: &str = concat!("city-weather/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Shared secret expected in the `access_token` header.
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: DEFAULT_BIND.to_string(), api_key: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: PathBuf::from(DEFAULT_DATABASE_PATH) }
    }
}

/// `[providers.geocoding]`: where city names are resolved to coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodingConfig {
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GEOCODING_URL.to_string(),
            user_agent: Some(DEFAULT_USER_AGENT.to_string()),
        }
    }
}

/// `[providers.weather]`: the current-conditions API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_WEATHER_URL.to_string(), user_agent: None }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub geocoding: GeocodingConfig,
    pub weather: WeatherConfig,
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// [server]
/// bind = "0.0.0.0:8000"
/// api_key = "..."
///
/// [database]
/// path = "/var/lib/city-weather/cities.db"
///
/// [providers.weather]
/// base_url = "https://api.open-meteo.com"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub providers: ProvidersConfig,
}

impl Config {
    /// Load config from the platform config directory, or return defaults if
    /// it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the platform config directory.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "city-weather", "city-weather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Apply `API_KEY`, `DATABASE_URL` and `BIND_ADDRESS` overrides.
    ///
    /// `lookup` is usually `|k| std::env::var(k).ok()`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("API_KEY").filter(|v| !v.is_empty()) {
            self.server.api_key = Some(key);
        }

        if let Some(url) = lookup("DATABASE_URL").filter(|v| !v.is_empty()) {
            self.database.path = database_path_from_url(&url);
        }

        if let Some(bind) = lookup("BIND_ADDRESS").filter(|v| !v.is_empty()) {
            self.server.bind = bind;
        }
    }

    /// Returns the configured API key, or an error explaining how to set one.
    pub fn require_api_key(&self) -> Result<&str> {
        self.server.api_key.as_deref().filter(|k| !k.is_empty()).ok_or_else(|| {
            anyhow!(
                "No API key configured.\n\
                 Hint: set API_KEY or run `city-weather configure` first."
            )
        })
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.server.api_key = Some(api_key);
    }
}

/// Accepts plain paths as well as `sqlite:///path` / `sqlite://path` URLs.
fn database_path_from_url(url: &str) -> PathBuf {
    let trimmed = url
        .strip_prefix("sqlite:///")
        .or_else(|| url.strip_prefix("sqlite://"))
        .unwrap_or(url);

    PathBuf::from(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn require_api_key_errors_when_not_set() {
        let cfg = Config::default();
        let err = cfg.require_api_key().unwrap_err();

        assert!(err.to_string().contains("No API key configured"));
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let mut cfg = Config::default();
        cfg.set_api_key("FROM_FILE".into());

        cfg.apply_env_overrides(env(&[
            ("API_KEY", "FROM_ENV"),
            ("DATABASE_URL", "sqlite:///./data/cities.db"),
            ("BIND_ADDRESS", "0.0.0.0:9000"),
        ]));

        assert_eq!(cfg.require_api_key().unwrap(), "FROM_ENV");
        assert_eq!(cfg.database.path, PathBuf::from("./data/cities.db"));
        assert_eq!(cfg.server.bind, "0.0.0.0:9000");
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut cfg = Config::default();
        cfg.apply_env_overrides(env(&[("API_KEY", ""), ("DATABASE_URL", "")]));

        assert!(cfg.require_api_key().is_err());
        assert_eq!(cfg.database.path, PathBuf::from(DEFAULT_DATABASE_PATH));
    }

    #[test]
    fn database_url_forms() {
        assert_eq!(database_path_from_url("cities.db"), PathBuf::from("cities.db"));
        assert_eq!(database_path_from_url("sqlite://cities.db"), PathBuf::from("cities.db"));
        assert_eq!(database_path_from_url("sqlite:///./cities.db"), PathBuf::from("./cities.db"));
        assert_eq!(
            database_path_from_url("sqlite:////var/lib/cities.db"),
            PathBuf::from("/var/lib/cities.db")
        );
    }

    #[test]
    fn save_and_load_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.set_api_key("SECRET".into());
        cfg.providers.weather.base_url = "http://localhost:1234".into();
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.require_api_key().unwrap(), "SECRET");
        assert_eq!(loaded.providers.weather.base_url, "http://localhost:1234");
        assert_eq!(loaded.server.bind, DEFAULT_BIND);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[server]\napi_key = \"abc\"\n").unwrap();

        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.require_api_key().unwrap(), "abc");
        assert_eq!(cfg.providers.geocoding.base_url, DEFAULT_GEOCODING_URL);
        assert_eq!(cfg.database.path, PathBuf::from(DEFAULT_DATABASE_PATH));
    }

    #[test]
    fn partial_provider_section_keeps_default_url() {
        let cfg: Config = toml::from_str("[providers.geocoding]\nuser_agent = \"me\"\n").unwrap();

        assert_eq!(cfg.providers.geocoding.user_agent.as_deref(), Some("me"));
        assert_eq!(cfg.providers.geocoding.base_url, DEFAULT_GEOCODING_URL);
        assert_eq!(cfg.providers.weather.base_url, DEFAULT_WEATHER_URL);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert!(cfg.server.api_key.is_none());
    }
}
