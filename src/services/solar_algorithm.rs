/// ============================================================
///  Solar Geometry & Clear-Sky Irradiance Engine
///
///  Algorithm pipeline:
///   1. Solar geometry  – declination, equation of time, hour angle,
///                        elevation angle, azimuth angle
///   2. Extraterrestrial irradiance – eccentricity-corrected solar constant
///   3. Clear-sky model  – Bird & Hulstrom simplified:
///                         DNI, DHI, GHI on horizontal plane
///   4. Plane of array   – beam + isotropic sky diffuse + ground reflected
/// ============================================================

use chrono::{DateTime, Datelike, Timelike, Utc};
use std::f64::consts::PI;

// ─── Physical constants ──────────────────────────────────────
const SC: f64 = 1361.0; // Solar constant W/m²
const DEG: f64 = PI / 180.0;

// ─── Public output ───────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarPosition {
    pub zenith_deg: f64,
    pub elevation_deg: f64,
    /// Degrees from North, clockwise
    pub azimuth_deg: f64,
    /// Eccentricity-corrected extraterrestrial normal irradiance (W/m²)
    pub dni_extra: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearSky {
    pub ghi: f64,
    pub dni: f64,
    pub dhi: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoaIrradiance {
    pub global: f64,
    pub direct: f64,
    pub diffuse: f64,
}

/// Sun position for a UTC instant.
///
/// * `lat_deg`  – geographic latitude  (−90 … +90)
/// * `lon_deg`  – geographic longitude (−180 … +180, East positive)
pub fn solar_position(lat_deg: f64, lon_deg: f64, utc: DateTime<Utc>) -> SolarPosition {
    // ── 1. Time decomposition ──────────────────────────────────
    let doy = utc.ordinal() as f64; // 1-365/366
    let ut_h = utc.hour() as f64
        + utc.minute() as f64 / 60.0
        + utc.second() as f64 / 3600.0; // UTC decimal hour

    // ── 2. Solar geometry ──────────────────────────────────────
    // a) Declination (Spencer 1971)
    let b = 2.0 * PI * (doy - 1.0) / 365.0;
    let decl = 0.006918
        - 0.399912 * b.cos()
        + 0.070257 * b.sin()
        - 0.006758 * (2.0 * b).cos()
        + 0.000907 * (2.0 * b).sin()
        - 0.002697 * (3.0 * b).cos()
        + 0.00148 * (3.0 * b).sin();

    // b) Equation of Time (minutes, Spencer 1971)
    let eot_min = 229.18
        * (0.000075
            + 0.001868 * b.cos()
            - 0.032077 * b.sin()
            - 0.014615 * (2.0 * b).cos()
            - 0.04089 * (2.0 * b).sin());

    // c) True solar time straight from UTC and longitude
    let lst_h = ut_h + lon_deg / 15.0 + eot_min / 60.0;

    // d) Hour angle folded into (−180°, 180°]; negative in morning
    let mut omega_deg = (15.0 * (lst_h - 12.0)).rem_euclid(360.0);
    if omega_deg > 180.0 {
        omega_deg -= 360.0;
    }
    let omega = omega_deg * DEG;

    // e) Solar elevation angle
    let lat = lat_deg * DEG;
    let sin_alpha = (lat.sin() * decl.sin() + lat.cos() * decl.cos() * omega.cos()).clamp(-1.0, 1.0);
    let alpha_rad = sin_alpha.asin();
    let alpha_deg = alpha_rad / DEG;

    // f) Solar azimuth (degrees from North, clockwise)
    let denom = alpha_rad.cos() * lat.cos();
    let cos_az = if denom.abs() > 1e-9 {
        (decl.sin() - sin_alpha * lat.sin()) / denom
    } else if lat_deg >= 0.0 {
        -1.0 // pole or zenith sun: due south
    } else {
        1.0
    };
    let az_abs = cos_az.clamp(-1.0, 1.0).acos() / DEG;
    let azimuth_deg = if omega_deg > 0.0 { 360.0 - az_abs } else { az_abs };

    // ── 3. Extraterrestrial irradiance (eccentricity correction) ─
    let dni_extra = SC * (1.00011
        + 0.034221 * b.cos()
        + 0.00128 * b.sin()
        + 0.000719 * (2.0 * b).cos()
        + 0.000077 * (2.0 * b).sin());

    SolarPosition {
        zenith_deg: 90.0 - alpha_deg,
        elevation_deg: alpha_deg,
        azimuth_deg,
        dni_extra,
    }
}

/// Cloudless irradiance for a sun position. Zero whenever the sun is at or
/// below the horizon.
pub fn clear_sky(pos: &SolarPosition) -> ClearSky {
    let alpha_deg = pos.elevation_deg;
    if alpha_deg <= 0.1 {
        return ClearSky { ghi: 0.0, dni: 0.0, dhi: 0.0 };
    }
    let sin_alpha = (alpha_deg * DEG).sin();
    let e0 = pos.dni_extra;

    // Air mass – Kasten & Young (1989)
    let am = 1.0 / (sin_alpha + 0.50572 * (alpha_deg + 6.07995_f64).powf(-1.6364));
    let am = am.max(1.0);

    // Transmittance components (simplified Bird & Hulstrom)
    // Rayleigh
    let tr = (-0.0903 * am.powf(0.84) * (1.0 + am - am.powf(1.01))).exp();
    // Ozone (standard column 0.3 atm-cm)
    let to = 1.0 - 0.0013 * am;
    // Aerosol (Linke turbidity 3.0 – typical continental)
    let tk = 3.0_f64;
    let ta = (-0.09 * tk.powf(0.978) * am.powf(0.9455)).exp();
    // Water vapour (moderate precipitable water 1.5 cm)
    let tw = 1.0 - 0.0075 * am.powf(0.65);

    let total_t = tr * to * ta * tw;
    let dni = (0.9762 * e0 * total_t).max(0.0);
    // Diffuse (sky scatter + back-scatter)
    let dhi = (0.79 * e0 * sin_alpha * (1.0 - total_t)
        * (0.5 * (1.0 - tr) + ba_scatter_coeff(ta))
        / (1.0 - am + am.powf(1.02)))
    .max(0.0);
    let ghi = (dni * sin_alpha + dhi).max(0.0);

    ClearSky { ghi, dni, dhi }
}

/// Irradiance on a fixed plane (isotropic sky).
///
/// * `tilt_deg`    – surface tilt from horizontal
/// * `azimuth_deg` – surface azimuth, degrees from North clockwise
pub fn plane_of_array(
    pos: &SolarPosition,
    irradiance: &ClearSky,
    tilt_deg: f64,
    azimuth_deg: f64,
    albedo: f64,
) -> PoaIrradiance {
    let tilt = tilt_deg * DEG;
    let alpha_rad = pos.elevation_deg * DEG;

    // Angle of incidence (θ) between sun and panel normal
    let az_diff = (pos.azimuth_deg - azimuth_deg) * DEG;
    let cos_theta = if pos.elevation_deg > 0.0 {
        (alpha_rad.sin() * tilt.cos() + alpha_rad.cos() * tilt.sin() * az_diff.cos()).max(0.0)
    } else {
        0.0
    };

    let direct = irradiance.dni * cos_theta;
    let sky_diffuse = irradiance.dhi * (1.0 + tilt.cos()) / 2.0;
    let ground = irradiance.ghi * albedo * (1.0 - tilt.cos()) / 2.0;
    let diffuse = sky_diffuse + ground;

    PoaIrradiance {
        global: (direct + diffuse).max(0.0),
        direct: direct.max(0.0),
        diffuse: diffuse.max(0.0),
    }
}

// ─── Helper: back-scatter term for Bird diffuse ──────────────
#[inline]
fn ba_scatter_coeff(ta: f64) -> f64 {
    // Approximated from Bird (1981) Table 2
    0.5 * (0.92 - ta.ln().abs() / 10.0).clamp(0.2, 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_summer_noon_italy() {
        // Turin, Italy – summer solstice, solar noon ≈ 11:30 UTC
        let t = Utc.with_ymd_and_hms(2025, 6, 21, 11, 30, 0).unwrap();
        let pos = solar_position(45.07, 7.33, t);
        assert!(pos.elevation_deg > 65.0, "Elevation should be >65° at summer noon, got {:.1}", pos.elevation_deg);
        assert!((pos.azimuth_deg - 180.0).abs() < 15.0, "Sun should be near south, got {:.1}", pos.azimuth_deg);
        let cs = clear_sky(&pos);
        assert!(cs.ghi > 700.0, "GHI should be significant, got {:.1}", cs.ghi);
        assert!(cs.dni > cs.dhi);
    }

    #[test]
    fn test_midnight_zero() {
        let t = Utc.with_ymd_and_hms(2025, 6, 21, 23, 0, 0).unwrap();
        let pos = solar_position(45.07, 7.33, t);
        assert!(pos.elevation_deg < 0.0);
        assert_eq!(clear_sky(&pos), ClearSky { ghi: 0.0, dni: 0.0, dhi: 0.0 });
    }

    #[test]
    fn test_winter_solstice() {
        // Turin, winter solstice near solar noon
        let t = Utc.with_ymd_and_hms(2025, 12, 21, 11, 30, 0).unwrap();
        let pos = solar_position(45.07, 7.33, t);
        assert!(pos.elevation_deg > 15.0 && pos.elevation_deg < 25.0,
            "Winter elevation should be 15-25°, got {:.1}", pos.elevation_deg);
    }

    #[test]
    fn test_evening_azimuth_is_west() {
        // New York, 23:00 UTC in June: sun low in the west-northwest
        let t = Utc.with_ymd_and_hms(2023, 6, 21, 23, 0, 0).unwrap();
        let pos = solar_position(40.7128, -74.0060, t);
        assert!(pos.elevation_deg > 0.0 && pos.elevation_deg < 20.0);
        assert!(pos.azimuth_deg > 270.0 && pos.azimuth_deg < 320.0, "got {:.1}", pos.azimuth_deg);
    }

    #[test]
    fn test_poa_facing_sun_collects_more() {
        let t = Utc.with_ymd_and_hms(2025, 12, 21, 11, 30, 0).unwrap();
        let pos = solar_position(45.07, 7.33, t);
        let cs = clear_sky(&pos);
        let flat = plane_of_array(&pos, &cs, 0.0, 180.0, 0.2);
        let tilted = plane_of_array(&pos, &cs, 60.0, 180.0, 0.2);
        assert!((flat.global - cs.ghi).abs() < 1e-6);
        assert!(tilted.global > flat.global);
    }
}
