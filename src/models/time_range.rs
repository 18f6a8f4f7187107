use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

use crate::errors::PipelineError;

/// Upper bound on generated index points, keeps a mistyped frequency from
/// allocating millions of rows inside a request.
pub const MAX_INDEX_POINTS: usize = 400_000;

/// A wall-clock span `[start, end]` sampled every `frequency`, anchored in
/// one IANA zone.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeRange {
    start: DateTime<Tz>,
    end: DateTime<Tz>,
    frequency: TimeDelta,
}

impl TimeRange {
    pub fn new(start: DateTime<Tz>, end: DateTime<Tz>, frequency: TimeDelta) -> Result<Self, PipelineError> {
        if start.timezone() != end.timezone() {
            return Err(PipelineError::invalid("start and end must share one timezone"));
        }
        if start >= end {
            return Err(PipelineError::invalid(format!("start {} is not before end {}", start, end)));
        }
        if frequency.num_seconds() <= 0 {
            return Err(PipelineError::invalid("frequency must be at least one second"));
        }
        let range = Self { start, end, frequency };
        if range.len() > MAX_INDEX_POINTS {
            return Err(PipelineError::invalid(format!(
                "range would produce {} points (limit {})",
                range.len(),
                MAX_INDEX_POINTS
            )));
        }
        Ok(range)
    }

    /// Builds a range from wall-clock bounds interpreted in `tz`.
    pub fn localized(start: NaiveDateTime, end: NaiveDateTime, frequency: TimeDelta, tz: Tz) -> Result<Self, PipelineError> {
        Self::new(localize(tz, start)?, localize(tz, end)?, frequency)
    }

    /// Whole-day range: from midnight of `from` up to the last second of `to`.
    pub fn from_dates(from: NaiveDate, to: NaiveDate, frequency: TimeDelta, tz: Tz) -> Result<Self, PipelineError> {
        let end_of_day = NaiveTime::from_hms_opt(23, 59, 59)
            .ok_or_else(|| PipelineError::invalid("invalid end of day"))?;
        Self::localized(from.and_time(NaiveTime::MIN), to.and_time(end_of_day), frequency, tz)
    }

    pub fn start(&self) -> DateTime<Tz> {
        self.start
    }

    pub fn end(&self) -> DateTime<Tz> {
        self.end
    }

    pub fn start_utc(&self) -> DateTime<Utc> {
        self.start.with_timezone(&Utc)
    }

    pub fn end_utc(&self) -> DateTime<Utc> {
        self.end.with_timezone(&Utc)
    }

    pub fn timezone(&self) -> Tz {
        self.start.timezone()
    }

    /// Number of points `start + k * frequency` that do not pass `end`.
    pub fn len(&self) -> usize {
        let span = (self.end - self.start).num_seconds();
        (span / self.frequency.num_seconds()) as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Steps in absolute time, so DST transitions never duplicate or drop a sample.
    pub fn index(&self) -> Vec<DateTime<Tz>> {
        let step = self.frequency.num_seconds();
        (0..self.len())
            .map(|k| self.start + TimeDelta::seconds(step * k as i64))
            .collect()
    }
}

/// Attaches `tz` to a wall-clock time. Ambiguous times take the earlier
/// instant; times inside a DST gap are pushed forward by one hour.
pub fn localize(tz: Tz, naive: NaiveDateTime) -> Result<DateTime<Tz>, PipelineError> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + TimeDelta::hours(1))).earliest())
        .ok_or_else(|| PipelineError::invalid(format!("{} does not exist in {}", naive, tz)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn naive(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    #[test]
    fn test_hourly_day_has_24_points() {
        let tz: Tz = "Etc/GMT+5".parse().unwrap();
        let range = TimeRange::localized(
            naive("2023-06-21 00:00"),
            naive("2023-06-21 23:59"),
            TimeDelta::hours(1),
            tz,
        )
        .unwrap();
        let index = range.index();
        assert_eq!(index.len(), 24);
        assert_eq!(index[0].hour(), 0);
        assert_eq!(index[23].hour(), 23);
        assert!(index.iter().all(|t| t.timezone() == tz));
    }

    #[test]
    fn test_exact_multiple_includes_end() {
        let tz = chrono_tz::UTC;
        let range = TimeRange::localized(
            naive("2024-01-01 00:00"),
            naive("2024-01-01 01:00"),
            TimeDelta::minutes(15),
            tz,
        )
        .unwrap();
        assert_eq!(range.len(), 5);
        assert_eq!(range.index().last().copied(), Some(range.end()));
    }

    #[test]
    fn test_rejects_inverted_and_zero_frequency() {
        let tz = chrono_tz::UTC;
        assert!(TimeRange::localized(naive("2024-01-02 00:00"), naive("2024-01-01 00:00"), TimeDelta::hours(1), tz).is_err());
        assert!(TimeRange::localized(naive("2024-01-01 00:00"), naive("2024-01-02 00:00"), TimeDelta::zero(), tz).is_err());
    }

    #[test]
    fn test_index_strictly_increasing_across_dst() {
        let tz: Tz = "America/New_York".parse().unwrap();
        let range = TimeRange::from_dates(
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            TimeDelta::hours(1),
            tz,
        )
        .unwrap();
        let index = range.index();
        assert!(index.windows(2).all(|w| w[0] < w[1]));
        // the spring-forward day is only 23 hours long
        assert_eq!(index.len(), 23);
    }

    #[test]
    fn test_localize_gap_moves_forward() {
        let tz: Tz = "America/New_York".parse().unwrap();
        let dt = localize(tz, naive("2024-03-10 02:30")).unwrap();
        assert_eq!(dt.hour(), 3);
    }
}
