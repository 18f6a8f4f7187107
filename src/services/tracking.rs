use chrono::Utc;

use crate::errors::PipelineError;
use crate::models::location::Location;
use crate::models::series::{columns, WeatherSeries};
use crate::models::time_range::TimeRange;
use crate::services::solar_algorithm::{self, SolarPosition};

const DEG: f64 = std::f64::consts::PI / 180.0;

/// Fixed geometry of a single-axis tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerGeometry {
    /// Tilt of the rotation axis from horizontal (deg)
    pub axis_tilt: f64,
    /// Compass direction the axis points to, 180 = north-south axis (deg)
    pub axis_azimuth: f64,
    /// Rotation limit either side of horizontal (deg)
    pub max_angle: f64,
}

impl TrackerGeometry {
    pub fn new(axis_tilt: f64, axis_azimuth: f64, max_angle: f64) -> Result<Self, PipelineError> {
        if !(0.0..=90.0).contains(&axis_tilt) {
            return Err(PipelineError::invalid(format!("axis_tilt {} outside [0, 90]", axis_tilt)));
        }
        if !(0.0..=360.0).contains(&axis_azimuth) {
            return Err(PipelineError::invalid(format!("axis_azimuth {} outside [0, 360]", axis_azimuth)));
        }
        if !(0.0..=180.0).contains(&max_angle) {
            return Err(PipelineError::invalid(format!("max_angle {} outside [0, 180]", max_angle)));
        }
        Ok(Self { axis_tilt, axis_azimuth, max_angle })
    }

    /// True-tracking rotation (no backtracking) for one sun position.
    ///
    /// Returns 0 whenever the sun is at or below the horizon: no tracking
    /// solution exists there and the tracker is reported parked flat.
    pub fn rotation(&self, pos: &SolarPosition) -> f64 {
        if pos.elevation_deg <= 0.0 {
            return 0.0;
        }
        let zen = pos.zenith_deg * DEG;
        let azi = pos.azimuth_deg * DEG;
        let tilt = self.axis_tilt * DEG;
        let axis_az = self.axis_azimuth * DEG;

        // sun vector in east/north/up coordinates
        let sx = zen.sin() * azi.sin();
        let sy = zen.sin() * azi.cos();
        let sz = zen.cos();

        // rotate into the tracker frame (x across the axis, z normal to it)
        let xp = sx * axis_az.cos() - sy * axis_az.sin();
        let zp = sx * tilt.sin() * axis_az.sin() + sy * tilt.sin() * axis_az.cos() + sz * tilt.cos();

        let theta = xp.atan2(zp) / DEG;
        if !theta.is_finite() {
            return 0.0;
        }
        theta.clamp(-self.max_angle, self.max_angle)
    }
}

/// Tracker rotation at every timestamp of `range`, as a one-column series
/// named `tracker_theta`.
pub fn compute_tracking(
    location: &Location,
    range: &TimeRange,
    geometry: &TrackerGeometry,
) -> Result<WeatherSeries, PipelineError> {
    let index = range.index();
    let angles = index
        .iter()
        .map(|t| {
            let pos = solar_algorithm::solar_position(location.latitude, location.longitude, t.with_timezone(&Utc));
            geometry.rotation(&pos)
        })
        .collect();
    let mut series = WeatherSeries::new(range.timezone(), index, None);
    series.insert_values(columns::TRACKER_THETA, angles)?;
    Ok(series)
}
