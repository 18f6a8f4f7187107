use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ─── PV system parameters ────────────────────────────────────────────────────

/// PVWatts-style system description used for every power computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct PvSystemParams {
    /// DC nameplate at 1000 W/m² and 25 °C (W)
    pub pdc0_w: f64,
    /// Power temperature coefficient (1/°C), negative for c-Si
    pub gamma_pdc: f64,
    /// Nominal operating cell temperature (°C)
    pub noct_c: f64,
    /// Inverter conversion efficiency [0..1]
    pub inverter_efficiency: f64,
    /// Inverter AC limit (W)
    pub pac0_w: f64,
    /// Fixed surface tilt from horizontal (deg)
    pub surface_tilt: f64,
    /// Fixed surface azimuth, 180 = south (deg)
    pub surface_azimuth: f64,
    /// Ground reflectance
    pub albedo: f64,
}

impl Default for PvSystemParams {
    fn default() -> Self {
        Self {
            pdc0_w: 220.0,
            gamma_pdc: -0.00476,
            noct_c: 42.4,
            inverter_efficiency: 0.96,
            pac0_w: 250.0,
            surface_tilt: 20.0,
            surface_azimuth: 180.0,
            albedo: 0.20,
        }
    }
}

// ─── Power comparison output ─────────────────────────────────────────────────

/// Energy totals over an assembled range, actual vs. clear-sky.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct PowerSummary {
    pub energy_wh: f64,
    pub clear_sky_energy_wh: f64,
    /// actual / clear-sky energy, in %
    pub performance_ratio_percent: Option<f64>,
}
