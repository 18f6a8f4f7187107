use utoipa::OpenApi;
use crate::config;
use crate::controllers::{analysis_controller, location_controller};
use crate::models::{api, location, plot, power, series, weather};

#[derive(OpenApi)]
#[openapi(
    paths(
        analysis_controller::visualize,
        analysis_controller::series,
        location_controller::suggestions,
        location_controller::resolve,
        location_controller::reverse,
        location_controller::timezone
    ),
    components(
        schemas(
            api::AnalysisRequest,
            api::DailyRequest,
            api::VisualizeResponse,
            api::SeriesResponse,
            api::SuggestionsResponse,
            api::ReverseResponse,
            api::TimezoneResponse,
            location::Location,
            location::GeocodeCandidate,
            plot::ChartKind,
            power::PvSystemParams,
            power::PowerSummary,
            series::Aggregate,
            series::ColumnFill,
            series::FillAction,
            series::DailyValue,
            series::SampleTable,
            series::SampleRow,
            series::SeriesTable,
            weather::Source,
            config::HistoricalBackend
        )
    ),
    tags(
        (name = "pv-visualizer", description = "PV site modeling and visualization API")
    )
)]
pub struct ApiDoc;
