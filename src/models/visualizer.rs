use std::str::FromStr;

use crate::errors::PipelineError;
use crate::models::series::columns;
use crate::models::weather::Source;

/// The charts a user can ask for, keyed by the name the front end sends.
///
/// One variant per variable replaces a dedicated plotting routine per variable:
/// each maps to the column it draws and the sources that feed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visualizer {
    TempAir,
    WindSpeed,
    Ghi,
    Dni,
    Dhi,
    RelativeHumidity,
    Pressure,
    TrueTracker,
    AcPower,
}

impl Visualizer {
    pub const ALL: [Visualizer; 9] = [
        Visualizer::TempAir,
        Visualizer::WindSpeed,
        Visualizer::Ghi,
        Visualizer::Dni,
        Visualizer::Dhi,
        Visualizer::RelativeHumidity,
        Visualizer::Pressure,
        Visualizer::TrueTracker,
        Visualizer::AcPower,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Visualizer::TempAir => "temp_air",
            Visualizer::WindSpeed => "wind_speed",
            Visualizer::Ghi => "ghi",
            Visualizer::Dni => "dni",
            Visualizer::Dhi => "dhi",
            Visualizer::RelativeHumidity => "relative_humidity",
            Visualizer::Pressure => "pressure",
            Visualizer::TrueTracker => "true_tracker",
            Visualizer::AcPower => "ac_power",
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Visualizer::TempAir => columns::TEMP_AIR,
            Visualizer::WindSpeed => columns::WIND_SPEED,
            Visualizer::Ghi => columns::GHI,
            Visualizer::Dni => columns::DNI,
            Visualizer::Dhi => columns::DHI,
            Visualizer::RelativeHumidity => columns::RELATIVE_HUMIDITY,
            Visualizer::Pressure => columns::PRESSURE,
            Visualizer::TrueTracker => columns::TRACKER_THETA,
            Visualizer::AcPower => columns::AC_POWER,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Visualizer::TempAir => "Temperature Variation Over Time",
            Visualizer::WindSpeed => "Wind Speed Variation Over Time",
            Visualizer::Ghi => "GHI Variation Over Time",
            Visualizer::Dni => "DNI Variation Over Time",
            Visualizer::Dhi => "DHI Variation Over Time",
            Visualizer::RelativeHumidity => "Humidity Variation Over Time",
            Visualizer::Pressure => "Pressure Variation Over Time",
            Visualizer::TrueTracker => "True Tracking Angle",
            Visualizer::AcPower => "AC Power: Actual vs Clear Sky",
        }
    }

    /// Sources to assemble, in join order. `preferred` overrides the default
    /// weather source where the visualizer allows a choice.
    pub fn sources(self, preferred: Option<Source>) -> Vec<Source> {
        match self {
            Visualizer::TrueTracker => Vec::new(),
            Visualizer::AcPower => {
                let actual = match preferred {
                    Some(Source::TypicalYearProvider) => Source::TypicalYearProvider,
                    _ => Source::HistoricalProvider,
                };
                vec![actual, Source::ClearSkyModel]
            }
            Visualizer::Ghi | Visualizer::Dni | Visualizer::Dhi => {
                vec![preferred.unwrap_or(Source::ClearSkyModel)]
            }
            _ => match preferred {
                Some(Source::TypicalYearProvider) => vec![Source::TypicalYearProvider],
                _ => vec![Source::HistoricalProvider],
            },
        }
    }
}

impl FromStr for Visualizer {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        Visualizer::ALL
            .into_iter()
            .find(|v| v.key() == key)
            .ok_or_else(|| PipelineError::invalid(format!("unknown visualizer '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_round_trip() {
        for v in Visualizer::ALL {
            assert_eq!(v.key().parse::<Visualizer>().unwrap(), v);
        }
        assert!("humidity".parse::<Visualizer>().is_err());
    }

    #[test]
    fn test_source_selection() {
        assert_eq!(Visualizer::Ghi.sources(None), vec![Source::ClearSkyModel]);
        assert_eq!(Visualizer::TempAir.sources(Some(Source::ClearSkyModel)), vec![Source::HistoricalProvider]);
        assert_eq!(
            Visualizer::AcPower.sources(None),
            vec![Source::HistoricalProvider, Source::ClearSkyModel]
        );
        assert!(Visualizer::TrueTracker.sources(None).is_empty());
    }
}
