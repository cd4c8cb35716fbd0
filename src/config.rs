use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::core::{DEFAULT_GRID_SIZE, DEFAULT_RADIUS_KM};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    pub redis_url: String,
    pub ttl_secs: Option<u64>,
    pub l1_cache_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    #[serde(default = "default_radius_km")]
    pub default_radius_km: f64,
    /// Upper bound on requested radii; unbounded unless configured
    #[serde(default = "default_max_radius_km")]
    pub max_radius_km: f64,
    #[serde(default = "default_grid_size")]
    pub heatmap_grid_size: f64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_radius_km: default_radius_km(),
            max_radius_km: default_max_radius_km(),
            heatmap_grid_size: default_grid_size(),
        }
    }
}

fn default_radius_km() -> f64 { DEFAULT_RADIUS_KM }
fn default_max_radius_km() -> f64 { f64::INFINITY }
fn default_grid_size() -> f64 { DEFAULT_GRID_SIZE }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with FINDER_)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., FINDER__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("FINDER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = apply_database_url(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("FINDER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

/// `DATABASE_URL` wins over any configured database URL
fn apply_database_url(settings: Config) -> Result<Config, ConfigError> {
    match std::env::var("DATABASE_URL") {
        Ok(url) => Config::builder()
            .add_source(settings)
            .set_override("database.url", url)?
            .build(),
        Err(_) => Ok(settings),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_search_settings() {
        let search = SearchSettings::default();
        assert_eq!(search.default_radius_km, 300.0);
        assert!(search.max_radius_km > std::f64::consts::PI * crate::core::distance::EARTH_RADIUS_KM);
        assert_eq!(search.heatmap_grid_size, 0.02);
    }

    #[test]
    fn test_default_logging() {
        let logging = LoggingSettings::default();
        assert_eq!(logging.level, "info");
        assert_eq!(logging.format, "json");
    }

    #[test]
    fn test_load_default_file() {
        let settings = Settings::load_from(concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml"))
            .expect("default config should parse");

        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.search.default_radius_km, 300.0);
        assert_eq!(settings.cache.ttl_secs, Some(300));
        assert_eq!(settings.search.max_radius_km, f64::INFINITY);
    }

    #[test]
    fn test_default_search_settings_reach_the_antipode() {
        use crate::core::{DiscoveryPipeline, SearchQuery};
        use crate::models::{GeoPoint, Resource};

        let search = SearchSettings::default();
        let pipeline = DiscoveryPipeline::new(
            search.default_radius_km,
            search.max_radius_km,
            search.heatmap_grid_size,
        );

        let far: Resource = serde_json::from_value(serde_json::json!({
            "id": 1,
            "title": "Far side",
            "description": "Almost antipodal",
            "category": "Housing",
            "latitude": 0.0,
            "longitude": 179.95,
            "is_approved": true
        }))
        .unwrap();

        let query = SearchQuery {
            center: Some(GeoPoint::new(0.0, 0.0)),
            radius_km: Some(25_000.0),
            ..SearchQuery::default()
        };

        assert!(GeoPoint::new(0.0, 0.0).distance_to(&far.location().unwrap()) > 20_000.0);
        assert_eq!(pipeline.run(vec![far], &query).total, 1);
    }
}
