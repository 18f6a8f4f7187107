use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::PipelineError;
use crate::models::weather::Source;

/// Canonical column names every adapter normalizes to.
pub mod columns {
    pub const GHI: &str = "ghi";
    pub const DNI: &str = "dni";
    pub const DHI: &str = "dhi";
    pub const TEMP_AIR: &str = "temp_air";
    pub const WIND_SPEED: &str = "wind_speed";
    /// Pa
    pub const PRESSURE: &str = "pressure";
    pub const RELATIVE_HUMIDITY: &str = "relative_humidity";
    pub const CLOUD_COVER: &str = "cloud_cover";
    pub const POA_GLOBAL: &str = "poa_global";
    pub const POA_DIRECT: &str = "poa_direct";
    pub const POA_DIFFUSE: &str = "poa_diffuse";
    pub const SOLAR_ZENITH: &str = "solar_zenith";
    pub const SOLAR_AZIMUTH: &str = "solar_azimuth";
    pub const SOLAR_ELEVATION: &str = "solar_elevation";
    pub const TRACKER_THETA: &str = "tracker_theta";
    pub const AC_POWER: &str = "ac_power";
    pub const AC_POWER_CLEAR_SKY: &str = "ac_power_clear_sky";

    /// Columns that are physically zero when missing (night, no sun).
    const ZERO_FILLED: &[&str] = &[GHI, DNI, DHI, POA_GLOBAL, POA_DIRECT, POA_DIFFUSE, AC_POWER];

    /// True for irradiance/power columns, including source-suffixed siblings
    /// such as `ghi_clear_sky`.
    pub fn is_zero_filled(name: &str) -> bool {
        ZERO_FILLED.iter().any(|base| {
            name == *base || name.strip_prefix(base).is_some_and(|rest| rest.starts_with('_'))
        })
    }
}

/// One timestamped row as delivered by a provider, already in canonical names.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub time: DateTime<Utc>,
    pub values: BTreeMap<String, Option<f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    Max,
    Mean,
    Sum,
}

/// Gap treatment a request can force on one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FillAction {
    Zero,
    Mean,
}

/// Applied before the default fill policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ColumnFill {
    pub column: String,
    pub action: FillAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DailyValue {
    pub date: NaiveDate,
    pub value: f64,
}

/// First rows of a series, for display next to a chart.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SampleTable {
    pub columns: Vec<String>,
    pub rows: Vec<SampleRow>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SampleRow {
    pub time: String,
    pub values: Vec<Option<f64>>,
}

/// Column-oriented JSON rendition of a series.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SeriesTable {
    pub timezone: String,
    pub index: Vec<String>,
    pub columns: BTreeMap<String, Vec<Option<f64>>>,
}

/// A timezone-aware table of named numeric columns sharing one index.
///
/// Missing values are `None` until [`WeatherSeries::fill_missing`] runs.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSeries {
    tz: Tz,
    index: Vec<DateTime<Tz>>,
    columns: BTreeMap<String, Vec<Option<f64>>>,
    origin: Option<Source>,
}

impl WeatherSeries {
    pub fn new(tz: Tz, index: Vec<DateTime<Tz>>, origin: Option<Source>) -> Self {
        let index = index.into_iter().map(|t| t.with_timezone(&tz)).collect();
        Self { tz, index, columns: BTreeMap::new(), origin }
    }

    /// Builds a series from rows that are already sorted and duplicate-free.
    pub fn from_observations(tz: Tz, observations: &[Observation], origin: Option<Source>) -> Self {
        let names: BTreeSet<&String> = observations.iter().flat_map(|o| o.values.keys()).collect();
        let index = observations.iter().map(|o| o.time.with_timezone(&tz)).collect();
        let columns = names
            .into_iter()
            .map(|name| {
                let values = observations
                    .iter()
                    .map(|o| o.values.get(name).copied().flatten())
                    .collect();
                (name.clone(), values)
            })
            .collect();
        Self { tz, index, columns, origin }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn origin(&self) -> Option<Source> {
        self.origin
    }

    pub fn index(&self) -> &[DateTime<Tz>] {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Result<&[Option<f64>], PipelineError> {
        self.columns
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| PipelineError::MissingColumn(name.to_string()))
    }

    /// Column values with gaps as NaN.
    pub fn values(&self, name: &str) -> Result<Vec<f64>, PipelineError> {
        Ok(self.column(name)?.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }

    pub fn insert_column(&mut self, name: &str, values: Vec<Option<f64>>) -> Result<(), PipelineError> {
        if values.len() != self.index.len() {
            return Err(PipelineError::invalid(format!(
                "column '{}' has {} values for {} timestamps",
                name,
                values.len(),
                self.index.len()
            )));
        }
        self.columns.insert(name.to_string(), values);
        Ok(())
    }

    pub fn insert_values(&mut self, name: &str, values: Vec<f64>) -> Result<(), PipelineError> {
        self.insert_column(name, values.into_iter().map(Some).collect())
    }

    /// Projects the series onto `target`. Exact timestamps are copied; a
    /// target falling between two samples no further apart than `max_gap`
    /// is linearly interpolated; anything else is missing.
    pub fn reindex(&self, target: &[DateTime<Tz>], max_gap: TimeDelta) -> WeatherSeries {
        let times: Vec<i64> = self.index.iter().map(DateTime::timestamp).collect();
        let mut out = WeatherSeries::new(self.tz, target.to_vec(), self.origin);
        for (name, values) in &self.columns {
            let projected = target
                .iter()
                .map(|t| interpolate(&times, values, t.timestamp(), max_gap.num_seconds()))
                .collect();
            out.columns.insert(name.clone(), projected);
        }
        out
    }

    /// Outer-joins `other` onto this series. The union index stays strictly
    /// increasing; a column name already present here is kept and the
    /// incoming one is renamed `<name>_<source suffix>`.
    pub fn outer_join(&mut self, other: &WeatherSeries) {
        let mut instants: BTreeSet<DateTime<Utc>> = self.index.iter().map(|t| t.with_timezone(&Utc)).collect();
        instants.extend(other.index.iter().map(|t| t.with_timezone(&Utc)));

        if instants.len() != self.index.len() {
            let positions: BTreeMap<DateTime<Utc>, usize> =
                instants.iter().enumerate().map(|(i, t)| (*t, i)).collect();
            let old_index = std::mem::take(&mut self.index);
            for values in self.columns.values_mut() {
                *values = remap(&old_index, values, &positions);
            }
            self.index = instants.iter().map(|t| t.with_timezone(&self.tz)).collect();
        }

        let positions: BTreeMap<DateTime<Utc>, usize> = self
            .index
            .iter()
            .enumerate()
            .map(|(i, t)| (t.with_timezone(&Utc), i))
            .collect();
        let suffix = other.origin.map(Source::suffix).unwrap_or("joined");
        for (name, values) in &other.columns {
            let target = if self.columns.contains_key(name) {
                format!("{}_{}", name, suffix)
            } else {
                name.clone()
            };
            self.columns.insert(target, remap(&other.index, values, &positions));
        }
    }

    /// Removes columns that hold no value at all and returns their names.
    pub fn drop_empty_columns(&mut self) -> Vec<String> {
        let empty: Vec<String> = self
            .columns
            .iter()
            .filter(|(_, values)| values.iter().all(Option::is_none))
            .map(|(name, _)| name.clone())
            .collect();
        for name in &empty {
            self.columns.remove(name);
        }
        empty
    }

    pub fn fill_zero(&mut self, name: &str) -> Result<(), PipelineError> {
        let values = self
            .columns
            .get_mut(name)
            .ok_or_else(|| PipelineError::MissingColumn(name.to_string()))?;
        zero_fill(values);
        Ok(())
    }

    /// Replaces gaps with the column mean; an all-missing column becomes zero.
    pub fn fill_mean(&mut self, name: &str) -> Result<(), PipelineError> {
        let values = self
            .columns
            .get_mut(name)
            .ok_or_else(|| PipelineError::MissingColumn(name.to_string()))?;
        mean_fill(values);
        Ok(())
    }

    pub fn fill(&mut self, name: &str, action: FillAction) -> Result<(), PipelineError> {
        match action {
            FillAction::Zero => self.fill_zero(name),
            FillAction::Mean => self.fill_mean(name),
        }
    }

    /// Applies the fill policy to every column: zero for irradiance and power,
    /// column mean for everything else.
    pub fn fill_missing(&mut self) {
        for (name, values) in self.columns.iter_mut() {
            if columns::is_zero_filled(name) {
                zero_fill(values);
            } else {
                mean_fill(values);
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        self.columns.values().all(|values| values.iter().all(Option::is_some))
    }

    /// Present values of `name` grouped by calendar month (1-12), January first.
    pub fn month_groups(&self, name: &str) -> Result<Vec<(u32, Vec<f64>)>, PipelineError> {
        let values = self.column(name)?;
        let mut groups: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
        for (t, v) in self.index.iter().zip(values) {
            if let Some(v) = v {
                groups.entry(t.month()).or_default().push(*v);
            }
        }
        Ok(groups.into_iter().collect())
    }

    /// One value per local calendar day.
    pub fn daily(&self, name: &str, aggregate: Aggregate) -> Result<Vec<DailyValue>, PipelineError> {
        let values = self.column(name)?;
        let mut days: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
        for (t, v) in self.index.iter().zip(values) {
            if let Some(v) = v {
                days.entry(t.date_naive()).or_default().push(*v);
            }
        }
        Ok(days
            .into_iter()
            .filter_map(|(date, vals)| {
                let value = match aggregate {
                    Aggregate::Max => vals.iter().copied().reduce(f64::max),
                    Aggregate::Mean => mean(&vals),
                    Aggregate::Sum => Some(vals.iter().sum()),
                }?;
                Some(DailyValue { date, value })
            })
            .collect())
    }

    pub fn head(&self, n: usize) -> SampleTable {
        let columns: Vec<String> = self.columns.keys().cloned().collect();
        let rows = self
            .index
            .iter()
            .take(n)
            .enumerate()
            .map(|(i, t)| SampleRow {
                time: t.to_rfc3339(),
                values: self.columns.values().map(|c| c[i]).collect(),
            })
            .collect();
        SampleTable { columns, rows }
    }

    pub fn to_table(&self) -> SeriesTable {
        SeriesTable {
            timezone: self.tz.name().to_string(),
            index: self.index.iter().map(|t| t.to_rfc3339()).collect(),
            columns: self.columns.clone(),
        }
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn zero_fill(values: &mut [Option<f64>]) {
    values.iter_mut().filter(|v| v.is_none()).for_each(|v| *v = Some(0.0));
}

fn mean_fill(values: &mut [Option<f64>]) {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let fill = mean(&present).unwrap_or(0.0);
    values.iter_mut().filter(|v| v.is_none()).for_each(|v| *v = Some(fill));
}

fn interpolate(times: &[i64], values: &[Option<f64>], t: i64, max_gap: i64) -> Option<f64> {
    match times.binary_search(&t) {
        Ok(i) => values[i],
        Err(0) => None,
        Err(i) if i >= times.len() => None,
        Err(i) => {
            let (t0, t1) = (times[i - 1], times[i]);
            if t1 - t0 > max_gap {
                return None;
            }
            let (v0, v1) = (values[i - 1]?, values[i]?);
            let w = (t - t0) as f64 / (t1 - t0) as f64;
            Some(v0 + (v1 - v0) * w)
        }
    }
}

fn remap(
    index: &[DateTime<Tz>],
    values: &[Option<f64>],
    positions: &BTreeMap<DateTime<Utc>, usize>,
) -> Vec<Option<f64>> {
    let mut out = vec![None; positions.len()];
    for (t, v) in index.iter().zip(values) {
        if let Some(&i) = positions.get(&t.with_timezone(&Utc)) {
            out[i] = *v;
        }
    }
    out
}
