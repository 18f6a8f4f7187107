use tracing::{debug, warn};

use crate::errors::PipelineError;
use crate::models::location::Location;
use crate::models::power::PvSystemParams;
use crate::models::series::{columns, Aggregate, ColumnFill, DailyValue, WeatherSeries};
use crate::models::time_range::TimeRange;
use crate::models::weather::Source;
use crate::services::power_service;
use crate::services::weather_service::WeatherService;

/// Outer-joins `parts` onto the index of `range` and fills the gaps.
///
/// Parts are joined in order; a column name already taken is suffixed with the
/// incoming part's source (`ghi_clear_sky`). Columns with no value at all are
/// dropped before filling, so asking for them later yields `MissingColumn`.
/// `fills` override the default policy for the columns they name.
pub fn assemble(
    location: &Location,
    range: &TimeRange,
    parts: &[WeatherSeries],
    fills: &[ColumnFill],
) -> Result<WeatherSeries, PipelineError> {
    let tz = location.timezone;
    if range.timezone() != tz {
        return Err(PipelineError::invalid(format!(
            "time range is in {} but the location is in {}",
            range.timezone(),
            tz
        )));
    }

    let mut series = WeatherSeries::new(tz, range.index(), None);
    for part in parts {
        if part.timezone() != tz {
            return Err(PipelineError::invalid(format!(
                "{:?} series is in {}, expected {}",
                part.origin(),
                part.timezone(),
                tz
            )));
        }
        series.outer_join(part);
    }

    let dropped = series.drop_empty_columns();
    if !dropped.is_empty() {
        warn!(columns = ?dropped, "dropping columns with no data");
    }
    for fill in fills {
        series.fill(&fill.column, fill.action)?;
    }
    series.fill_missing();
    debug!(rows = series.len(), columns = ?series.column_names().collect::<Vec<_>>(), "assembled series");
    Ok(series)
}

/// Adds an `ac_power` column computed from the part's own irradiance.
///
/// Irradiance columns that are absent or hold no value are `MissingColumn`;
/// power is never derived from data the source did not deliver.
pub fn derive_ac_power(part: &mut WeatherSeries, location: &Location, params: &PvSystemParams) -> Result<(), PipelineError> {
    for name in [columns::GHI, columns::DNI, columns::DHI] {
        if part.column(name)?.iter().all(Option::is_none) {
            return Err(PipelineError::MissingColumn(name.to_string()));
        }
    }
    let power = power_service::ac_power_column(part, location, params, "")?;
    part.insert_values(columns::AC_POWER, power)
}

pub fn daily_aggregate(series: &WeatherSeries, column: &str, aggregate: Aggregate) -> Result<Vec<DailyValue>, PipelineError> {
    series.daily(column, aggregate)
}

/// Fetches every requested source and assembles them.
#[derive(Debug, Clone)]
pub struct Assembler {
    weather: WeatherService,
}

impl Assembler {
    pub fn new(weather: WeatherService) -> Self {
        Self { weather }
    }

    /// With `power` set, each source gets its own `ac_power` column before the
    /// join, so the clear-sky sibling lands as `ac_power_clear_sky`.
    pub async fn assemble_sources(
        &self,
        location: &Location,
        range: &TimeRange,
        sources: &[Source],
        power: Option<&PvSystemParams>,
        fills: &[ColumnFill],
    ) -> Result<WeatherSeries, PipelineError> {
        let mut parts = Vec::with_capacity(sources.len());
        for source in sources {
            let mut part = self.weather.fetch(location, range, *source).await?;
            if let Some(params) = power {
                derive_ac_power(&mut part, location, params)?;
            }
            parts.push(part);
        }
        assemble(location, range, &parts, fills)
    }
}
