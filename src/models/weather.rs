use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Where a weather/irradiance series comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Computed locally from solar geometry, no network
    #[serde(alias = "clear_sky")]
    ClearSkyModel,
    /// Measured/reanalysis history from a remote provider
    #[serde(alias = "historical")]
    HistoricalProvider,
    /// Typical meteorological year from PVGIS
    #[serde(alias = "typical_year", alias = "tmy")]
    TypicalYearProvider,
}

impl Source {
    /// Appended to a column name when two sources deliver the same column.
    pub fn suffix(self) -> &'static str {
        match self {
            Source::ClearSkyModel => "clear_sky",
            Source::HistoricalProvider => "historical",
            Source::TypicalYearProvider => "typical_year",
        }
    }
}

// ─── Open-Meteo archive wire types ───────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct OpenMeteoArchiveResponse {
    pub hourly: OpenMeteoHourly,
}

/// Requested with `timeformat=unixtime`, so `time` holds UNIX seconds.
#[derive(Debug, Deserialize)]
pub struct OpenMeteoHourly {
    pub time: Vec<i64>,
    #[serde(default)]
    pub temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    pub relative_humidity_2m: Vec<Option<f64>>,
    /// hPa
    #[serde(default)]
    pub surface_pressure: Vec<Option<f64>>,
    /// m/s when requested with `wind_speed_unit=ms`
    #[serde(default)]
    pub wind_speed_10m: Vec<Option<f64>>,
    #[serde(default)]
    pub shortwave_radiation: Vec<Option<f64>>,
    #[serde(default)]
    pub direct_normal_irradiance: Vec<Option<f64>>,
    #[serde(default)]
    pub diffuse_radiation: Vec<Option<f64>>,
    #[serde(default)]
    pub cloud_cover: Vec<Option<f64>>,
}

// ─── PVGIS TMY wire types ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PvgisTmyResponse {
    pub outputs: PvgisTmyOutputs,
}

#[derive(Debug, Deserialize)]
pub struct PvgisTmyOutputs {
    pub tmy_hourly: Vec<PvgisTmyRow>,
}

#[derive(Debug, Deserialize)]
pub struct PvgisTmyRow {
    /// `YYYYMMDD:HHMM`, each month may come from a different year
    #[serde(rename = "time(UTC)")]
    pub time: String,
    #[serde(rename = "T2m")]
    pub temp_air: Option<f64>,
    #[serde(rename = "RH")]
    pub relative_humidity: Option<f64>,
    #[serde(rename = "G(h)")]
    pub ghi: Option<f64>,
    #[serde(rename = "Gb(n)")]
    pub dni: Option<f64>,
    #[serde(rename = "Gd(h)")]
    pub dhi: Option<f64>,
    #[serde(rename = "WS10m")]
    pub wind_speed: Option<f64>,
    /// Pa
    #[serde(rename = "SP")]
    pub pressure: Option<f64>,
}

// ─── OpenWeatherMap history wire types ───────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct OwmHistoryResponse {
    #[serde(default)]
    pub list: Vec<OwmEntry>,
}

#[derive(Debug, Deserialize)]
pub struct OwmEntry {
    pub dt: i64,
    pub main: OwmMain,
    #[serde(default)]
    pub wind: Option<OwmWind>,
    #[serde(default)]
    pub clouds: Option<OwmClouds>,
}

#[derive(Debug, Deserialize)]
pub struct OwmMain {
    /// Kelvin
    pub temp: Option<f64>,
    /// hPa
    pub pressure: Option<f64>,
    pub humidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct OwmWind {
    pub speed: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct OwmClouds {
    pub all: Option<f64>,
}

// ─── Nominatim wire types ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NominatimPlace {
    pub lat: String,
    pub lon: String,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct NominatimReverse {
    pub display_name: Option<String>,
    pub error: Option<String>,
}
