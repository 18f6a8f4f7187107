use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeDelta, Timelike, Utc};
use tracing::{debug, info};

use crate::config::{HistoricalBackend, WeatherConfig};
use crate::errors::PipelineError;
use crate::models::location::Location;
use crate::models::power::PvSystemParams;
use crate::models::series::{columns, Observation, WeatherSeries};
use crate::models::time_range::TimeRange;
use crate::models::weather::{
    OpenMeteoArchiveResponse, OwmHistoryResponse, PvgisTmyResponse, PvgisTmyRow, Source,
};
use crate::services::http_fetcher::{HttpFetcher, ProviderRequest};
use crate::services::solar_algorithm;

const OPEN_METEO: &str = "open-meteo";
const PVGIS: &str = "pvgis";
const OPENWEATHERMAP: &str = "openweathermap";

const OPEN_METEO_HOURLY: &str = "temperature_2m,relative_humidity_2m,surface_pressure,wind_speed_10m,\
shortwave_radiation,direct_normal_irradiance,diffuse_radiation,cloud_cover";

/// Hourly provider samples further apart than this are not interpolated across.
const MAX_INTERPOLATION_GAP_MIN: i64 = 90;

const KELVIN_OFFSET: f64 = 273.15;
const HPA_TO_PA: f64 = 100.0;

/// Fetches one source for a location and range and returns it on the range's
/// own index, in canonical column names.
#[derive(Debug, Clone)]
pub struct WeatherService {
    fetcher: HttpFetcher,
    config: WeatherConfig,
    surface: PvSystemParams,
}

impl WeatherService {
    /// `surface` is the fixed plane the clear-sky plane-of-array columns describe.
    pub fn new(config: WeatherConfig, fetcher: HttpFetcher, surface: PvSystemParams) -> Self {
        Self { fetcher, config, surface }
    }

    pub async fn fetch(&self, location: &Location, range: &TimeRange, source: Source) -> Result<WeatherSeries, PipelineError> {
        if source == Source::ClearSkyModel {
            return clear_sky_series(location, range, &self.surface);
        }

        let observations = match source {
            Source::TypicalYearProvider => self.fetch_tmy(location, range).await?,
            _ => match self.config.historical_backend {
                HistoricalBackend::OpenMeteo => self.fetch_open_meteo(location, range).await?,
                HistoricalBackend::OpenWeatherMap => self.fetch_openweathermap(location, range).await?,
            },
        };
        if observations.is_empty() {
            return Err(PipelineError::remote(provider_name(source, self.config.historical_backend), "no rows returned"));
        }

        let raw = WeatherSeries::from_observations(range.timezone(), &observations, Some(source));
        debug!(?source, rows = raw.len(), "normalized provider rows");
        Ok(raw.reindex(&range.index(), TimeDelta::minutes(MAX_INTERPOLATION_GAP_MIN)))
    }

    async fn fetch_open_meteo(&self, location: &Location, range: &TimeRange) -> Result<Vec<Observation>, PipelineError> {
        // one extra hour on each side brackets sub-hourly points at the edges
        let first = (range.start_utc() - TimeDelta::hours(1)).date_naive();
        let last = (range.end_utc() + TimeDelta::hours(1)).date_naive();
        let mut chunks = Vec::new();
        for (from, to) in chunk_days(first, last, self.config.max_span_days) {
            info!(provider = OPEN_METEO, %from, %to, "requesting archive chunk");
            let request = ProviderRequest::new(
                OPEN_METEO,
                &self.config.open_meteo_url,
                vec![
                    ("latitude", format!("{:.4}", location.latitude)),
                    ("longitude", format!("{:.4}", location.longitude)),
                    ("start_date", from.to_string()),
                    ("end_date", to.to_string()),
                    ("hourly", OPEN_METEO_HOURLY.to_string()),
                    ("timeformat", "unixtime".to_string()),
                    ("wind_speed_unit", "ms".to_string()),
                    ("timezone", "GMT".to_string()),
                ],
            );
            let response: OpenMeteoArchiveResponse = self.fetcher.get_json(&request).await?;
            chunks.push(normalize_open_meteo(&response));
        }
        Ok(merge_chunks(chunks))
    }

    async fn fetch_openweathermap(&self, location: &Location, range: &TimeRange) -> Result<Vec<Observation>, PipelineError> {
        let api_key = self
            .config
            .openweathermap_api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| PipelineError::invalid("openweathermap_api_key is not configured"))?;

        let cap = TimeDelta::days(self.config.max_span_days.max(1));
        let mut chunks = Vec::new();
        for (from, to) in chunk_window(range.start_utc() - TimeDelta::hours(1), range.end_utc() + TimeDelta::hours(1), cap) {
            info!(provider = OPENWEATHERMAP, %from, %to, "requesting history window");
            let request = ProviderRequest::new(
                OPENWEATHERMAP,
                &self.config.openweathermap_url,
                vec![
                    ("lat", format!("{:.4}", location.latitude)),
                    ("lon", format!("{:.4}", location.longitude)),
                    ("type", "hour".to_string()),
                    ("start", from.timestamp().to_string()),
                    ("end", to.timestamp().to_string()),
                ],
            )
            .with_secret("appid", api_key.clone());
            let response: OwmHistoryResponse = self.fetcher.get_json(&request).await?;
            chunks.push(normalize_openweathermap(&response));
        }
        Ok(merge_chunks(chunks))
    }

    async fn fetch_tmy(&self, location: &Location, range: &TimeRange) -> Result<Vec<Observation>, PipelineError> {
        let url = format!("{}/tmy", self.config.pvgis_url.trim_end_matches('/'));
        info!(provider = PVGIS, latitude = location.latitude, longitude = location.longitude, "requesting typical year");
        let request = ProviderRequest::new(
            PVGIS,
            &url,
            vec![
                ("lat", format!("{:.4}", location.latitude)),
                ("lon", format!("{:.4}", location.longitude)),
                ("outputformat", "json".to_string()),
            ],
        );
        let response: PvgisTmyResponse = self.fetcher.get_json(&request).await?;
        Ok(project_typical_year(&response.outputs.tmy_hourly, range.start_utc(), range.end_utc()))
    }
}

fn provider_name(source: Source, backend: HistoricalBackend) -> &'static str {
    match (source, backend) {
        (Source::TypicalYearProvider, _) => PVGIS,
        (_, HistoricalBackend::OpenWeatherMap) => OPENWEATHERMAP,
        _ => OPEN_METEO,
    }
}

// ─── Range chunking ──────────────────────────────────────────────────────────

/// Splits the inclusive date span `[start, end]` into contiguous,
/// non-overlapping inclusive spans of at most `max_days` days each.
pub fn chunk_days(start: NaiveDate, end: NaiveDate, max_days: i64) -> Vec<(NaiveDate, NaiveDate)> {
    let span = Days::new(max_days.max(1) as u64 - 1);
    let mut chunks = Vec::new();
    let mut from = start;
    while from <= end {
        let to = from.checked_add_days(span).map_or(end, |d| d.min(end));
        chunks.push((from, to));
        match to.succ_opt() {
            Some(next) => from = next,
            None => break,
        }
    }
    chunks
}

/// Splits `[start, end]` into inclusive windows no longer than `max`, one
/// second apart at the seams.
pub fn chunk_window(start: DateTime<Utc>, end: DateTime<Utc>, max: TimeDelta) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let max = max.max(TimeDelta::seconds(1));
    let mut windows = Vec::new();
    let mut from = start;
    while from <= end {
        let to = (from + max).min(end);
        windows.push((from, to));
        from = to + TimeDelta::seconds(1);
    }
    windows
}

/// Concatenates chunk results into one strictly increasing row list. On a
/// repeated timestamp the later chunk wins.
pub fn merge_chunks(chunks: Vec<Vec<Observation>>) -> Vec<Observation> {
    let mut merged: BTreeMap<DateTime<Utc>, Observation> = BTreeMap::new();
    for observation in chunks.into_iter().flatten() {
        merged.insert(observation.time, observation);
    }
    merged.into_values().collect()
}

// ─── Provider normalization ──────────────────────────────────────────────────

fn at(values: &[Option<f64>], i: usize) -> Option<f64> {
    values.get(i).copied().flatten()
}

pub fn normalize_open_meteo(response: &OpenMeteoArchiveResponse) -> Vec<Observation> {
    let h = &response.hourly;
    h.time
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            let time = DateTime::from_timestamp(*ts, 0)?;
            let mut values = BTreeMap::new();
            values.insert(columns::TEMP_AIR.to_string(), at(&h.temperature_2m, i));
            values.insert(columns::RELATIVE_HUMIDITY.to_string(), at(&h.relative_humidity_2m, i));
            values.insert(columns::PRESSURE.to_string(), at(&h.surface_pressure, i).map(|p| p * HPA_TO_PA));
            values.insert(columns::WIND_SPEED.to_string(), at(&h.wind_speed_10m, i));
            values.insert(columns::GHI.to_string(), at(&h.shortwave_radiation, i));
            values.insert(columns::DNI.to_string(), at(&h.direct_normal_irradiance, i));
            values.insert(columns::DHI.to_string(), at(&h.diffuse_radiation, i));
            values.insert(columns::CLOUD_COVER.to_string(), at(&h.cloud_cover, i));
            Some(Observation { time, values })
        })
        .collect()
}

pub fn normalize_openweathermap(response: &OwmHistoryResponse) -> Vec<Observation> {
    response
        .list
        .iter()
        .filter_map(|entry| {
            let time = DateTime::from_timestamp(entry.dt, 0)?;
            let mut values = BTreeMap::new();
            values.insert(columns::TEMP_AIR.to_string(), entry.main.temp.map(|k| k - KELVIN_OFFSET));
            values.insert(columns::PRESSURE.to_string(), entry.main.pressure.map(|p| p * HPA_TO_PA));
            values.insert(columns::RELATIVE_HUMIDITY.to_string(), entry.main.humidity);
            values.insert(columns::WIND_SPEED.to_string(), entry.wind.as_ref().and_then(|w| w.speed));
            values.insert(columns::CLOUD_COVER.to_string(), entry.clouds.as_ref().and_then(|c| c.all));
            Some(Observation { time, values })
        })
        .collect()
}

/// `YYYYMMDD:HHMM` → (month, day, hour)
fn tmy_slot(stamp: &str) -> Option<(u32, u32, u32)> {
    let (date, time) = stamp.split_once(':')?;
    let date = NaiveDate::parse_from_str(date, "%Y%m%d").ok()?;
    let hour = time.get(0..2)?.parse::<u32>().ok()?;
    Some((date.month(), date.day(), hour))
}

/// Lays the typical year over every hour of `[start, end]` (widened by one
/// hour each side for interpolation). 29 February reuses 28 February.
pub fn project_typical_year(rows: &[PvgisTmyRow], start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<Observation> {
    let slots: HashMap<(u32, u32, u32), &PvgisTmyRow> = rows
        .iter()
        .filter_map(|row| Some((tmy_slot(&row.time)?, row)))
        .collect();

    let first = start.timestamp() - start.timestamp().rem_euclid(3600) - 3600;
    let last = end.timestamp() + 3600;
    (first..=last)
        .step_by(3600)
        .filter_map(|ts| {
            let time = DateTime::from_timestamp(ts, 0)?;
            let day = if time.month() == 2 && time.day() == 29 { 28 } else { time.day() };
            let row = slots.get(&(time.month(), day, time.hour()))?;
            let mut values = BTreeMap::new();
            values.insert(columns::TEMP_AIR.to_string(), row.temp_air);
            values.insert(columns::RELATIVE_HUMIDITY.to_string(), row.relative_humidity);
            values.insert(columns::PRESSURE.to_string(), row.pressure);
            values.insert(columns::WIND_SPEED.to_string(), row.wind_speed);
            values.insert(columns::GHI.to_string(), row.ghi);
            values.insert(columns::DNI.to_string(), row.dni);
            values.insert(columns::DHI.to_string(), row.dhi);
            Some(Observation { time, values })
        })
        .collect()
}

// ─── Clear-sky model ─────────────────────────────────────────────────────────

/// Cloudless irradiance, plane-of-array irradiance on `surface` and solar
/// position at every timestamp of `range`. Computed locally.
pub fn clear_sky_series(
    location: &Location,
    range: &TimeRange,
    surface: &PvSystemParams,
) -> Result<WeatherSeries, PipelineError> {
    let index = range.index();
    let n = index.len();
    let mut cols: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for t in &index {
        let pos = solar_algorithm::solar_position(location.latitude, location.longitude, t.with_timezone(&Utc));
        let cs = solar_algorithm::clear_sky(&pos);
        let poa = solar_algorithm::plane_of_array(&pos, &cs, surface.surface_tilt, surface.surface_azimuth, surface.albedo);
        for (name, value) in [
            (columns::GHI, cs.ghi),
            (columns::DNI, cs.dni),
            (columns::DHI, cs.dhi),
            (columns::POA_GLOBAL, poa.global),
            (columns::POA_DIRECT, poa.direct),
            (columns::POA_DIFFUSE, poa.diffuse),
            (columns::SOLAR_ZENITH, pos.zenith_deg),
            (columns::SOLAR_AZIMUTH, pos.azimuth_deg),
            (columns::SOLAR_ELEVATION, pos.elevation_deg),
        ] {
            cols.entry(name).or_insert_with(|| Vec::with_capacity(n)).push(value);
        }
    }

    let mut series = WeatherSeries::new(range.timezone(), index, Some(Source::ClearSkyModel));
    for (name, values) in cols {
        series.insert_values(name, values)?;
    }
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WeatherConfig;
    use crate::test_support::{fetcher, serve, temp_cache_dir, HitCounter};
    use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
    use chrono::NaiveDateTime;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn new_york(tz: &str) -> Location {
        Location::new("New York", 40.7128, -74.0060, tz.parse().unwrap()).unwrap()
    }

    fn hourly_range(from: &str, to: &str, tz: &str) -> TimeRange {
        TimeRange::from_dates(date(from), date(to), TimeDelta::hours(1), tz.parse().unwrap()).unwrap()
    }

    /// Archive double: one row per UTC hour of the requested dates, ghi = hour of day.
    fn open_meteo_router(hits: HitCounter) -> Router {
        Router::new().route(
            "/archive",
            get(move |Query(q): Query<HashMap<String, String>>| {
                let hits = hits.clone();
                async move {
                    hits.hit();
                    let start: NaiveDate = q["start_date"].parse().unwrap();
                    let end: NaiveDate = q["end_date"].parse().unwrap();
                    let first = start.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp();
                    let last = end.and_hms_opt(23, 0, 0).unwrap().and_utc().timestamp();
                    let time: Vec<i64> = (first..=last).step_by(3600).collect();
                    let ghi: Vec<f64> = time.iter().map(|t| ((t / 3600) % 24) as f64).collect();
                    let pressure: Vec<f64> = time.iter().map(|_| 1013.0).collect();
                    Json(serde_json::json!({
                        "hourly": {
                            "time": time,
                            "shortwave_radiation": ghi,
                            "surface_pressure": pressure,
                        }
                    }))
                }
            }),
        )
    }

    fn service(base: &str, backend: HistoricalBackend) -> WeatherService {
        let config = WeatherConfig {
            open_meteo_url: format!("{}/archive", base),
            pvgis_url: base.to_string(),
            openweathermap_url: format!("{}/history", base),
            openweathermap_api_key: Some("key".into()),
            historical_backend: backend,
            ..WeatherConfig::default()
        };
        WeatherService::new(config, fetcher(temp_cache_dir()), PvSystemParams::default())
    }

    #[test]
    fn test_chunk_days_properties() {
        for (from, to) in [("2023-01-01", "2023-01-01"), ("2023-01-01", "2023-01-30"), ("2023-01-01", "2023-03-17"), ("2020-02-01", "2021-02-01")] {
            let (start, end) = (date(from), date(to));
            let chunks = chunk_days(start, end, 30);
            assert_eq!(chunks.first().unwrap().0, start);
            assert_eq!(chunks.last().unwrap().1, end);
            for (a, b) in &chunks {
                assert!(a <= b);
                assert!((*b - *a).num_days() < 30);
            }
            for pair in chunks.windows(2) {
                assert_eq!(pair[0].1.succ_opt().unwrap(), pair[1].0);
            }
        }
        assert_eq!(chunk_days(date("2023-01-01"), date("2023-01-30"), 30).len(), 1);
        assert_eq!(chunk_days(date("2023-01-01"), date("2023-01-31"), 30).len(), 2);
    }

    #[test]
    fn test_chunk_window_is_contiguous() {
        let start: DateTime<Utc> = "2023-01-01T00:00:00Z".parse().unwrap();
        let end: DateTime<Utc> = "2023-03-15T12:00:00Z".parse().unwrap();
        let windows = chunk_window(start, end, TimeDelta::days(30));
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0].0, start);
        assert_eq!(windows[2].1, end);
        for pair in windows.windows(2) {
            assert_eq!(pair[0].1 + TimeDelta::seconds(1), pair[1].0);
        }
    }

    #[test]
    fn test_merge_later_chunk_wins() {
        let t: DateTime<Utc> = "2023-01-31T00:00:00Z".parse().unwrap();
        let obs = |time, v| Observation { time, values: BTreeMap::from([("ghi".to_string(), Some(v))]) };
        let merged = merge_chunks(vec![
            vec![obs(t - TimeDelta::hours(1), 1.0), obs(t, 2.0)],
            vec![obs(t, 3.0), obs(t + TimeDelta::hours(1), 4.0)],
        ]);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[1].values["ghi"], Some(3.0));
        assert!(merged.windows(2).all(|w| w[0].time < w[1].time));
    }

    #[test]
    fn test_owm_units() {
        let response: OwmHistoryResponse = serde_json::from_str(
            r#"{"list":[{"dt":1687305600,"main":{"temp":293.15,"pressure":1010,"humidity":60},"wind":{"speed":3.5}}]}"#,
        )
        .unwrap();
        let rows = normalize_openweathermap(&response);
        assert_eq!(rows.len(), 1);
        assert!((rows[0].values["temp_air"].unwrap() - 20.0).abs() < 1e-9);
        assert_eq!(rows[0].values["pressure"], Some(101_000.0));
        assert_eq!(rows[0].values["wind_speed"], Some(3.5));
        assert_eq!(rows[0].values["cloud_cover"], None);
    }

    #[test]
    fn test_typical_year_covers_leap_day() {
        let rows: Vec<PvgisTmyRow> = (0..24)
            .map(|h| {
                serde_json::from_value(serde_json::json!({
                    "time(UTC)": format!("20070228:{:02}00", h),
                    "T2m": 5.0, "RH": 80.0, "G(h)": h as f64, "Gb(n)": 0.0, "Gd(h)": 0.0, "WS10m": 2.0, "SP": 101000.0
                }))
                .unwrap()
            })
            .collect();
        let start = NaiveDateTime::parse_from_str("2024-02-29 00:00", "%Y-%m-%d %H:%M").unwrap().and_utc();
        let end = NaiveDateTime::parse_from_str("2024-02-29 23:00", "%Y-%m-%d %H:%M").unwrap().and_utc();
        let projected = project_typical_year(&rows, start, end);
        // 28 Feb 23:00 plus all of the leap day; 1 March has no rows
        assert_eq!(projected.len(), 25);
        let noon = projected.iter().find(|o| o.time == start + TimeDelta::hours(12)).unwrap();
        assert_eq!(noon.values["ghi"], Some(12.0));
    }

    #[test]
    fn test_clear_sky_scenario_day() {
        let range = hourly_range("2023-06-21", "2023-06-21", "Etc/GMT+5");
        let series = clear_sky_series(&new_york("Etc/GMT+5"), &range, &PvSystemParams::default()).unwrap();
        assert_eq!(series.len(), 24);
        let ghi = series.values(columns::GHI).unwrap();
        assert_eq!(ghi[0], 0.0);
        assert_eq!(ghi[23], 0.0);
        assert!(ghi[12] > 0.0);
        assert!(series.has_column(columns::POA_GLOBAL));
    }

    #[tokio::test]
    async fn test_long_range_is_chunked_and_cached() {
        let hits = HitCounter::default();
        let base = serve(open_meteo_router(hits.clone())).await;
        let service = service(&base, HistoricalBackend::OpenMeteo);
        let location = new_york("UTC");
        let range = hourly_range("2023-01-01", "2023-02-14", "UTC");

        let series = service.fetch(&location, &range, Source::HistoricalProvider).await.unwrap();
        assert_eq!(hits.count(), 2);
        assert_eq!(series.len(), range.len());
        assert!(series.index().windows(2).all(|w| w[0] < w[1]));
        assert!(series.column(columns::GHI).unwrap().iter().all(Option::is_some));
        assert_eq!(series.values(columns::PRESSURE).unwrap()[0], 101_300.0);
        let ghi = series.values(columns::GHI).unwrap();
        assert_eq!(ghi[13], 13.0);

        let again = service.fetch(&location, &range, Source::HistoricalProvider).await.unwrap();
        assert_eq!(hits.count(), 2);
        assert_eq!(again, series);
    }

    #[tokio::test]
    async fn test_sub_hourly_edges_are_interpolated() {
        let hits = HitCounter::default();
        let base = serve(open_meteo_router(hits.clone())).await;
        let service = service(&base, HistoricalBackend::OpenMeteo);
        let day = date("2023-06-21");
        let range = TimeRange::from_dates(day, day, TimeDelta::minutes(15), chrono_tz::UTC).unwrap();

        let series = service.fetch(&new_york("UTC"), &range, Source::HistoricalProvider).await.unwrap();
        assert_eq!(hits.count(), 1);
        let ghi = series.column(columns::GHI).unwrap();
        assert_eq!(ghi.len(), 96);
        assert!(ghi.iter().all(Option::is_some));
        assert_eq!(ghi[2], Some(0.5));
        assert_eq!(ghi[94], Some(11.5));
    }

    #[tokio::test]
    async fn test_typical_year_fetch() {
        let hits = HitCounter::default();
        let counter = hits.clone();
        let router = Router::new().route(
            "/tmy",
            get(move |Query(q): Query<HashMap<String, String>>| {
                let counter = counter.clone();
                async move {
                    counter.hit();
                    assert_eq!(q["outputformat"], "json");
                    let rows: Vec<serde_json::Value> = (0..24)
                        .map(|h| {
                            serde_json::json!({
                                "time(UTC)": format!("20110621:{:02}00", h),
                                "T2m": 18.0, "RH": 70.0, "G(h)": h as f64, "Gb(n)": 0.0,
                                "Gd(h)": 0.0, "WS10m": 2.5, "SP": 101200.0
                            })
                        })
                        .collect();
                    Json(serde_json::json!({ "outputs": { "tmy_hourly": rows } }))
                }
            }),
        );
        let base = serve(router).await;
        let service = service(&base, HistoricalBackend::OpenMeteo);
        let range = hourly_range("2023-06-21", "2023-06-21", "UTC");

        let series = service.fetch(&new_york("UTC"), &range, Source::TypicalYearProvider).await.unwrap();
        assert_eq!(series.len(), 24);
        assert_eq!(series.origin(), Some(Source::TypicalYearProvider));
        for name in [
            columns::GHI,
            columns::DNI,
            columns::DHI,
            columns::TEMP_AIR,
            columns::RELATIVE_HUMIDITY,
            columns::WIND_SPEED,
            columns::PRESSURE,
        ] {
            assert!(series.column(name).unwrap().iter().all(Option::is_some), "{} has gaps", name);
        }
        assert_eq!(series.values(columns::GHI).unwrap()[12], 12.0);
        assert_eq!(series.values(columns::PRESSURE).unwrap()[0], 101_200.0);

        let again = service.fetch(&new_york("UTC"), &range, Source::TypicalYearProvider).await.unwrap();
        assert_eq!(hits.count(), 1);
        assert_eq!(again, series);
    }

    #[tokio::test]
    async fn test_provider_outage_is_typed_failure() {
        let hits = HitCounter::default();
        let counter = hits.clone();
        let router = Router::new().route(
            "/archive",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.hit();
                    StatusCode::SERVICE_UNAVAILABLE
                }
            }),
        );
        let base = serve(router).await;
        let service = service(&base, HistoricalBackend::OpenMeteo);
        let location = new_york("Etc/GMT+5");
        let range = hourly_range("2023-06-21", "2023-06-21", "Etc/GMT+5");

        let err = service.fetch(&location, &range, Source::HistoricalProvider).await.unwrap_err();
        assert!(matches!(err, PipelineError::RemoteFetchFailure { ref provider, .. } if provider == OPEN_METEO));
        assert_eq!(hits.count(), 5);
        let cache_dir = service.fetcher.cache().dir().to_path_buf();
        let written = std::fs::read_dir(&cache_dir).map(|d| d.count()).unwrap_or(0);
        assert_eq!(written, 0);
    }

    #[tokio::test]
    async fn test_openweathermap_requires_key() {
        let mut service = service("http://127.0.0.1:9", HistoricalBackend::OpenWeatherMap);
        service.config.openweathermap_api_key = None;
        let range = hourly_range("2023-06-21", "2023-06-21", "UTC");
        let err = service.fetch(&new_york("UTC"), &range, Source::HistoricalProvider).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_openweathermap_backend() {
        let router = Router::new().route(
            "/history",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                assert_eq!(q["appid"], "key");
                let start: i64 = q["start"].parse().unwrap();
                let end: i64 = q["end"].parse().unwrap();
                let first = start - start.rem_euclid(3600);
                let list: Vec<serde_json::Value> = (first..=end)
                    .step_by(3600)
                    .map(|dt| serde_json::json!({ "dt": dt, "main": { "temp": 283.15, "pressure": 1000, "humidity": 50 } }))
                    .collect();
                Json(serde_json::json!({ "list": list }))
            }),
        );
        let base = serve(router).await;
        let service = service(&base, HistoricalBackend::OpenWeatherMap);
        let range = hourly_range("2023-06-21", "2023-06-21", "UTC");
        let series = service.fetch(&new_york("UTC"), &range, Source::HistoricalProvider).await.unwrap();
        assert_eq!(series.len(), 24);
        assert!(series.values(columns::TEMP_AIR).unwrap().iter().all(|t| (t - 10.0).abs() < 1e-9));
    }
}
