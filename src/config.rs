use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

use crate::models::power::PvSystemParams;

pub const CONFIG_ENV: &str = "PV_VISUALIZER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub geocoder: GeocoderConfig,
    pub weather: WeatherConfig,
    pub cache: CacheConfig,
    pub retry: RetryConfig,
    pub pv_system: PvSystemParams,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080, static_dir: "static".to_string() }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeocoderConfig {
    /// Nominatim-compatible search service
    pub base_url: String,
    pub user_agent: String,
    pub suggestion_limit: usize,
    pub timeout_s: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: concat!("pv-visualizer/", env!("CARGO_PKG_VERSION")).to_string(),
            suggestion_limit: 10,
            timeout_s: 10,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum HistoricalBackend {
    OpenMeteo,
    OpenWeatherMap,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WeatherConfig {
    pub open_meteo_url: String,
    pub pvgis_url: String,
    pub openweathermap_url: String,
    pub openweathermap_api_key: Option<String>,
    pub historical_backend: HistoricalBackend,
    /// Longest span a single provider request may cover
    pub max_span_days: i64,
    pub timeout_s: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            open_meteo_url: "https://archive-api.open-meteo.com/v1/archive".to_string(),
            pvgis_url: "https://re.jrc.ec.europa.eu/api/v5_2".to_string(),
            openweathermap_url: "https://history.openweathermap.org/data/2.5/history/city".to_string(),
            openweathermap_api_key: None,
            historical_backend: HistoricalBackend::OpenMeteo,
            max_span_days: 30,
            timeout_s: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub dir: String,
    pub ttl_s: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { dir: "cache".to_string(), ttl_s: 3600 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 5, base_delay_ms: 500, max_delay_ms: 8000 }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Loads the file named by `PV_VISUALIZER_CONFIG` (or `config.json`).
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load_from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        if !std::path::Path::new(&path).exists() {
            warn!(path = %path, "config file not found, using defaults");
            return Ok(Config::default());
        }
        Self::load(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let json = r#"{ "server": { "port": 9000 }, "retry": { "max_attempts": 3 } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.static_dir, "static");
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay_ms, 500);
        assert_eq!(config.cache.ttl_s, 3600);
        assert_eq!(config.weather.max_span_days, 30);
        assert_eq!(config.weather.historical_backend, HistoricalBackend::OpenMeteo);
    }

    #[test]
    fn test_example_file_parses() {
        let config: Config = serde_json::from_str(include_str!("../config.example.json")).unwrap();
        assert_eq!(config.geocoder.suggestion_limit, 10);
        assert_eq!(config.pv_system.pac0_w, 250.0);
    }

    #[test]
    fn test_backend_names() {
        let json = r#"{ "weather": { "historical_backend": "open_weather_map" } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.weather.historical_backend, HistoricalBackend::OpenWeatherMap);
    }
}
