use crate::config::error::ConfigError;
use crate::error::WetterError;
use crate::ingest::error::LiveDataError;
use crate::ingest::live::{OpenWeatherClient, DEFAULT_OWM_BASE_URL};
use crate::sync::cache::{SnapshotCache, DEFAULT_SNAPSHOT_TTL};
use crate::sync::transport::{
    GithubTransport, DEFAULT_API_BASE, DEFAULT_BRANCH, DEFAULT_DOCUMENT_PATH,
};
use crate::utils::get_cache_dir;
use log::debug;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_REPOSITORY: &str = "WETTERWEISER_GITHUB_REPO";
const ENV_BRANCH: &str = "WETTERWEISER_GITHUB_BRANCH";
const ENV_TOKEN: &str = "WETTERWEISER_GITHUB_TOKEN";
const ENV_OWM_API_KEY: &str = "WETTERWEISER_OWM_API_KEY";
const DEFAULT_TIMEOUT_SECONDS: u64 = 5;

/// Settings for a front end: where the shared document lives, how long pulls are cached and
/// how to reach the live weather provider.
///
/// Every key has a default except `remote.repository`, which is only needed once a
/// [`GithubTransport`] is built.
///
/// ```
/// use wetterweiser::WetterConfig;
///
/// let config = WetterConfig::from_toml_str(
///     r#"
///     [remote]
///     repository = "octo/wetter"
///
///     [cache]
///     ttl_seconds = 60
///     "#,
/// )?;
/// assert_eq!(config.remote.branch, "main");
/// assert_eq!(config.cache.ttl_seconds, 60);
/// # Ok::<(), wetterweiser::ConfigError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct WetterConfig {
    pub remote: RemoteConfig,
    pub cache: CacheConfig,
    pub live: LiveConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// `owner/name`
    pub repository: Option<String>,
    pub branch: String,
    pub path: String,
    pub token: Option<String>,
    pub api_base: String,
    pub timeout_seconds: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            repository: None,
            branch: DEFAULT_BRANCH.to_string(),
            path: DEFAULT_DOCUMENT_PATH.to_string(),
            token: None,
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
    /// Snapshot folder; the platform cache directory when unset.
    pub folder: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_SNAPSHOT_TTL.as_secs(),
            folder: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_OWM_BASE_URL.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

impl WetterConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_path_buf(), e))?;
        debug!("Loaded config from {}", path.display());
        Self::from_toml_str(&text)
    }

    /// Overlays the `WETTERWEISER_*` environment variables onto the loaded values.
    pub fn apply_env(self) -> Self {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    fn apply_env_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(repository) = var(ENV_REPOSITORY) {
            self.remote.repository = Some(repository);
        }
        if let Some(branch) = var(ENV_BRANCH) {
            self.remote.branch = branch;
        }
        if let Some(token) = var(ENV_TOKEN) {
            self.remote.token = Some(token);
        }
        if let Some(api_key) = var(ENV_OWM_API_KEY) {
            self.live.api_key = Some(api_key);
        }
        self
    }

    /// # Errors
    ///
    /// [`ConfigError::MissingKey`] without `remote.repository`, or the transport's own error.
    pub fn github_transport(&self) -> Result<GithubTransport, WetterError> {
        let repository = self
            .remote
            .repository
            .clone()
            .ok_or(ConfigError::MissingKey("remote.repository"))?;
        Ok(GithubTransport::builder()
            .repository(repository)
            .branch(self.remote.branch.clone())
            .path(self.remote.path.clone())
            .maybe_token(self.remote.token.clone())
            .api_base(self.remote.api_base.clone())
            .timeout(Duration::from_secs(self.remote.timeout_seconds))
            .build()?)
    }

    /// A snapshot cache persisted under `cache.folder`, or the platform cache directory.
    pub fn snapshot_cache(&self) -> Result<SnapshotCache, WetterError> {
        let folder = match &self.cache.folder {
            Some(folder) => folder.clone(),
            None => get_cache_dir().map_err(WetterError::CacheDirResolution)?,
        };
        let ttl = Duration::from_secs(self.cache.ttl_seconds);
        Ok(SnapshotCache::with_folder(ttl, &folder)?)
    }

    pub fn live_client(&self) -> Result<OpenWeatherClient, WetterError> {
        let api_key = self
            .live
            .api_key
            .clone()
            .ok_or(LiveDataError::MissingApiKey)?;
        Ok(OpenWeatherClient::builder()
            .api_key(api_key)
            .base_url(self.live.base_url.clone())
            .timeout(Duration::from_secs(self.live.timeout_seconds))
            .build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_config_uses_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let config = WetterConfig::from_toml_str("")?;
        assert_eq!(config, WetterConfig::default());
        assert_eq!(config.remote.path, "wetterdaten.json");
        assert_eq!(config.cache.ttl_seconds, 300);
        assert_eq!(config.live.timeout_seconds, 5);
        Ok(())
    }

    #[test]
    fn test_full_config() -> Result<(), Box<dyn std::error::Error>> {
        let config = WetterConfig::from_toml_str(
            r#"
            [remote]
            repository = "octo/wetter"
            branch = "daten"
            token = "secret"
            timeout_seconds = 10

            [cache]
            folder = "/tmp/wetter"

            [live]
            api_key = "owm"
            "#,
        )?;
        assert_eq!(config.remote.repository.as_deref(), Some("octo/wetter"));
        assert_eq!(config.remote.branch, "daten");
        assert_eq!(config.remote.timeout_seconds, 10);
        assert_eq!(config.cache.folder, Some(PathBuf::from("/tmp/wetter")));
        assert_eq!(config.live.api_key.as_deref(), Some("owm"));
        Ok(())
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            WetterConfig::from_toml_str("[remote\nrepository = 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            WetterConfig::load(Path::new("/nonexistent/wetterweiser.toml")),
            Err(ConfigError::FileRead(..))
        ));
    }

    #[test]
    fn test_env_overlay() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_REPOSITORY, "env/repo"),
            (ENV_TOKEN, "tok"),
            (ENV_BRANCH, "  "),
        ]);
        let config = WetterConfig::default()
            .apply_env_from(|name| env.get(name).map(|v| v.to_string()));
        assert_eq!(config.remote.repository.as_deref(), Some("env/repo"));
        assert_eq!(config.remote.token.as_deref(), Some("tok"));
        assert_eq!(config.remote.branch, "main");
        assert_eq!(config.live.api_key, None);
    }

    #[test]
    fn test_transport_requires_repository() -> Result<(), Box<dyn std::error::Error>> {
        assert!(matches!(
            WetterConfig::default().github_transport(),
            Err(WetterError::Config(ConfigError::MissingKey("remote.repository")))
        ));
        let mut config = WetterConfig::default();
        config.remote.repository = Some("octo/wetter".to_string());
        config.github_transport()?;
        Ok(())
    }

    #[test]
    fn test_live_client_requires_key() {
        assert!(matches!(
            WetterConfig::default().live_client(),
            Err(WetterError::LiveData(LiveDataError::MissingApiKey))
        ));
    }

    #[test]
    fn test_snapshot_cache_in_configured_folder() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        let mut config = WetterConfig::default();
        config.cache.folder = Some(tmp.path().join("snapshots"));
        config.cache.ttl_seconds = 42;
        let cache = config.snapshot_cache()?;
        assert_eq!(cache.ttl(), Duration::from_secs(42));
        assert!(tmp.path().join("snapshots").is_dir());
        Ok(())
    }
}
