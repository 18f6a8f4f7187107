use chrono::TimeDelta;
use tracing::info;

use crate::errors::PipelineError;
use crate::models::api::{AnalysisRequest, SeriesResponse, VisualizeResponse};
use crate::models::location::Location;
use crate::models::plot::PlotSpec;
use crate::models::power::{PowerSummary, PvSystemParams};
use crate::models::series::{columns, WeatherSeries};
use crate::models::time_range::TimeRange;
use crate::models::visualizer::Visualizer;
use crate::services::assembler::{self, Assembler};
use crate::services::location_service::LocationService;
use crate::services::plot_renderer;
use crate::services::power_service;
use crate::services::tracking::{self, TrackerGeometry};

const MAX_SAMPLE_ROWS: usize = 100;

/// One analysis run: where, when, and the assembled table.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub visualizer: Visualizer,
    pub location: Location,
    pub range: TimeRange,
    pub series: WeatherSeries,
    pub power: Option<PowerSummary>,
}

/// Turns form input into an assembled series, a chart or a table.
#[derive(Clone)]
pub struct AnalysisService {
    locations: LocationService,
    assembler: Assembler,
    default_pv: PvSystemParams,
}

impl AnalysisService {
    pub fn new(locations: LocationService, assembler: Assembler, default_pv: PvSystemParams) -> Self {
        Self { locations, assembler, default_pv }
    }

    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<Analysis, PipelineError> {
        let visualizer: Visualizer = request.visualizer.parse()?;
        let frequency = TimeDelta::try_minutes(request.freq_minutes)
            .filter(|f| *f > TimeDelta::zero())
            .ok_or_else(|| PipelineError::invalid(format!("freq_minutes {} is out of range", request.freq_minutes)))?;
        if request.from_date > request.to_date {
            return Err(PipelineError::invalid("from_date is after to_date"));
        }

        let location = self
            .locations
            .locate(request.address.as_deref(), request.lat, request.lon, request.tz.as_deref())
            .await?;
        let range = TimeRange::from_dates(
            request.from_date,
            request.to_date,
            frequency,
            location.timezone,
        )?;
        info!(
            visualizer = visualizer.key(),
            address = %location.address,
            timezone = %location.timezone,
            points = range.len(),
            "running analysis"
        );

        let (series, power) = match visualizer {
            Visualizer::TrueTracker => {
                let geometry = TrackerGeometry::new(request.axis_tilt, request.axis_azimuth, request.max_angle)?;
                let angles = tracking::compute_tracking(&location, &range, &geometry)?;
                (assembler::assemble(&location, &range, &[angles], &request.fill)?, None)
            }
            Visualizer::AcPower => {
                let params = request.pv_system.unwrap_or(self.default_pv);
                power_service::validate(&params)?;
                let sources = visualizer.sources(request.source);
                let series = self.assembler.assemble_sources(&location, &range, &sources, Some(&params), &request.fill).await?;
                let summary = power_service::summarize(&series, columns::AC_POWER, columns::AC_POWER_CLEAR_SKY)?;
                (series, Some(summary))
            }
            _ => {
                let sources = visualizer.sources(request.source);
                (self.assembler.assemble_sources(&location, &range, &sources, None, &request.fill).await?, None)
            }
        };

        Ok(Analysis { visualizer, location, range, series, power })
    }

    pub async fn visualize(&self, request: &AnalysisRequest) -> Result<VisualizeResponse, PipelineError> {
        let visualizer: Visualizer = request.visualizer.parse()?;
        // chart options are checked before any remote call
        let spec = PlotSpec::new(
            visualizer.column(),
            &request.plot_type,
            request.plot_color.as_deref(),
            request.title.as_deref(),
        )?;

        let analysis = self.analyze(request).await?;
        let markup = plot_renderer::render(&analysis.series, &spec)?;
        Ok(VisualizeResponse {
            title: spec.title.clone().unwrap_or_else(|| visualizer.title().to_string()),
            location: analysis.location,
            markup,
            sample: analysis.series.head(request.sample_count.min(MAX_SAMPLE_ROWS)),
            power: analysis.power,
        })
    }

    pub async fn series(&self, request: &AnalysisRequest) -> Result<SeriesResponse, PipelineError> {
        let analysis = self.analyze(request).await?;
        let daily = request
            .daily
            .as_ref()
            .map(|d| assembler::daily_aggregate(&analysis.series, &d.column, d.aggregate))
            .transpose()?;
        Ok(SeriesResponse {
            location: analysis.location,
            series: analysis.series.to_table(),
            daily,
            power: analysis.power,
        })
    }
}
