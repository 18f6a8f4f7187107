use axum::{extract::State, response::IntoResponse, Json};
use tracing::warn;

use crate::models::api::{AnalysisRequest, SeriesResponse, VisualizeResponse};
use crate::shared_state::AppState;

/// POST /api/visualize
/// Render one visualizer as an interactive chart
///
/// Locates the site (address, or coordinates with an optional timezone), assembles
/// the series the visualizer needs over `[from_date, to_date]` and renders the
/// requested chart kind. The response carries embeddable Plotly markup and the
/// first rows of the assembled table.
#[utoipa::path(
    post,
    path = "/api/visualize",
    request_body = AnalysisRequest,
    responses(
        (status = 200, description = "Rendered chart and data sample", body = VisualizeResponse),
        (status = 400, description = "Invalid input or unsupported chart kind"),
        (status = 404, description = "Location or column not found"),
        (status = 502, description = "Weather provider failed after retries")
    )
)]
pub async fn visualize(State(state): State<AppState>, Json(request): Json<AnalysisRequest>) -> impl IntoResponse {
    match state.analysis.visualize(&request).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            warn!(visualizer = %request.visualizer, error = %e, "visualize failed");
            e.into_response()
        }
    }
}

/// POST /api/series
/// Assembled series as JSON columns
///
/// Same inputs as `/api/visualize`. Optionally adds one daily aggregate
/// (`max`, `mean` or `sum`) of a column.
#[utoipa::path(
    post,
    path = "/api/series",
    request_body = AnalysisRequest,
    responses(
        (status = 200, description = "Assembled series", body = SeriesResponse),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Location or column not found"),
        (status = 502, description = "Weather provider failed after retries")
    )
)]
pub async fn series(State(state): State<AppState>, Json(request): Json<AnalysisRequest>) -> impl IntoResponse {
    match state.analysis.series(&request).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            warn!(visualizer = %request.visualizer, error = %e, "series failed");
            e.into_response()
        }
    }
}
