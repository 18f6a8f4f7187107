use chrono::Utc;
use tracing::debug;

use crate::errors::PipelineError;
use crate::models::location::Location;
use crate::models::power::{PowerSummary, PvSystemParams};
use crate::models::series::{columns, WeatherSeries};
use crate::services::solar_algorithm::{self, ClearSky};

/// Ambient temperature assumed when a source carries none (°C).
const DEFAULT_TEMP_AIR_C: f64 = 25.0;

pub fn validate(params: &PvSystemParams) -> Result<(), PipelineError> {
    if params.pdc0_w <= 0.0 || params.pac0_w <= 0.0 {
        return Err(PipelineError::invalid("pdc0_w and pac0_w must be positive"));
    }
    if !(0.0..=1.0).contains(&params.inverter_efficiency) || params.inverter_efficiency == 0.0 {
        return Err(PipelineError::invalid("inverter_efficiency must be in (0, 1]"));
    }
    if !(0.0..=90.0).contains(&params.surface_tilt) || !(0.0..=360.0).contains(&params.surface_azimuth) {
        return Err(PipelineError::invalid("surface_tilt must be in [0, 90] and surface_azimuth in [0, 360]"));
    }
    if !(0.0..=1.0).contains(&params.albedo) {
        return Err(PipelineError::invalid("albedo must be in [0, 1]"));
    }
    Ok(())
}

pub fn estimate_cell_temperature(ambient_temp_c: f64, g_w_m2: f64, noct_c: f64) -> f64 {
    // NOCT model: T_cell = T_ambient + (NOCT - 20) * (G / 800)
    ambient_temp_c + (noct_c - 20.0) * (g_w_m2 / 800.0)
}

pub fn estimate_dc_power_w(g_w_m2: f64, cell_temp_c: f64, params: &PvSystemParams) -> f64 {
    // P = P_dc0 * (G / 1000) * [1 + gamma * (T_cell - 25)]
    let temp_factor = 1.0 + params.gamma_pdc * (cell_temp_c - 25.0);
    let raw_power = params.pdc0_w * (g_w_m2 / 1000.0);
    (raw_power * temp_factor).max(0.0)
}

pub fn estimate_ac_power_w(dc_power_w: f64, params: &PvSystemParams) -> f64 {
    (dc_power_w * params.inverter_efficiency).min(params.pac0_w).max(0.0)
}

/// AC output at every row of `series`, from the irradiance columns
/// `ghi{suffix}`, `dni{suffix}`, `dhi{suffix}` and `temp_air` (when present).
pub fn ac_power_column(
    series: &WeatherSeries,
    location: &Location,
    params: &PvSystemParams,
    suffix: &str,
) -> Result<Vec<f64>, PipelineError> {
    let ghi = series.values(&format!("{}{}", columns::GHI, suffix))?;
    let dni = series.values(&format!("{}{}", columns::DNI, suffix))?;
    let dhi = series.values(&format!("{}{}", columns::DHI, suffix))?;
    let temp_air = series.values(columns::TEMP_AIR).ok();

    let power = series
        .index()
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let pos = solar_algorithm::solar_position(location.latitude, location.longitude, t.with_timezone(&Utc));
            let irradiance = ClearSky {
                ghi: finite_or_zero(ghi[i]),
                dni: finite_or_zero(dni[i]),
                dhi: finite_or_zero(dhi[i]),
            };
            let poa = solar_algorithm::plane_of_array(
                &pos,
                &irradiance,
                params.surface_tilt,
                params.surface_azimuth,
                params.albedo,
            );
            let ambient = temp_air
                .as_ref()
                .map(|t| t[i])
                .filter(|t| t.is_finite())
                .unwrap_or(DEFAULT_TEMP_AIR_C);
            let cell = estimate_cell_temperature(ambient, poa.global, params.noct_c);
            estimate_ac_power_w(estimate_dc_power_w(poa.global, cell, params), params)
        })
        .collect();
    Ok(power)
}

/// Integrates both power columns over the index and compares them.
pub fn summarize(series: &WeatherSeries, actual: &str, clear_sky: &str) -> Result<PowerSummary, PipelineError> {
    let energy_wh = integrate_wh(series, actual)?;
    let clear_sky_energy_wh = integrate_wh(series, clear_sky)?;
    let performance_ratio_percent = if clear_sky_energy_wh > 0.0 {
        Some(energy_wh / clear_sky_energy_wh * 100.0)
    } else {
        None
    };
    debug!(energy_wh, clear_sky_energy_wh, ?performance_ratio_percent, "power summary");
    Ok(PowerSummary { energy_wh, clear_sky_energy_wh, performance_ratio_percent })
}

/// Left Riemann sum: each sample holds until the next one.
fn integrate_wh(series: &WeatherSeries, column: &str) -> Result<f64, PipelineError> {
    let values = series.values(column)?;
    let index = series.index();
    let energy = index
        .windows(2)
        .zip(&values)
        .map(|(w, p)| finite_or_zero(*p) * (w[1] - w[0]).num_seconds() as f64 / 3600.0)
        .sum();
    Ok(energy)
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}
