use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::models::location::{GeocodeCandidate, Location};
use crate::models::power::{PowerSummary, PvSystemParams};
use crate::models::series::{Aggregate, ColumnFill, DailyValue, SampleTable, SeriesTable};
use crate::models::weather::Source;

fn default_freq_minutes() -> i64 { 60 }
fn default_max_angle() -> f64 { 90.0 }
fn default_axis_azimuth() -> f64 { 180.0 }
fn default_plot_type() -> String { "line".to_string() }
fn default_sample_count() -> usize { 5 }

// ─── Analysis input ──────────────────────────────────────────────────────────

/// Form input for one analysis. Either `address` or `lat`/`lon` locates the site;
/// `tz` is derived from the coordinates when omitted.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AnalysisRequest {
    /// temp_air, wind_speed, ghi, dni, dhi, relative_humidity, pressure, true_tracker, ac_power
    pub visualizer: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub tz: Option<String>,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    #[serde(default = "default_freq_minutes")]
    pub freq_minutes: i64,
    #[serde(default = "default_max_angle")]
    pub max_angle: f64,
    #[serde(default)]
    pub axis_tilt: f64,
    #[serde(default = "default_axis_azimuth")]
    pub axis_azimuth: f64,
    #[serde(default)]
    pub source: Option<Source>,
    #[serde(default = "default_plot_type")]
    pub plot_type: String,
    #[serde(default)]
    pub plot_color: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub pv_system: Option<PvSystemParams>,
    #[serde(default = "default_sample_count")]
    pub sample_count: usize,
    #[serde(default)]
    pub daily: Option<DailyRequest>,
    /// Per-column gap treatment applied before the default fill
    #[serde(default)]
    pub fill: Vec<ColumnFill>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DailyRequest {
    pub column: String,
    pub aggregate: Aggregate,
}

// ─── Analysis output ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct VisualizeResponse {
    pub title: String,
    pub location: Location,
    /// Embeddable chart markup (Plotly)
    pub markup: String,
    pub sample: SampleTable,
    pub power: Option<PowerSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SeriesResponse {
    pub location: Location,
    pub series: SeriesTable,
    pub daily: Option<Vec<DailyValue>>,
    pub power: Option<PowerSummary>,
}

// ─── Lookup endpoints ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, IntoParams)]
pub struct SuggestionQuery {
    pub address: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AddressQuery {
    pub address: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CoordinatesQuery {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<GeocodeCandidate>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReverseResponse {
    pub address: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TimezoneResponse {
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
}
