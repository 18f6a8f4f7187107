use axum::{
    routing::{get, post},
    Router,
};

use crate::controllers::analysis_controller::{series, visualize};
use crate::controllers::location_controller::{resolve, reverse, suggestions, timezone};
use crate::shared_state::AppState;

/// Build the `/api/*` sub-router.
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/visualize",           post(visualize))
        .route("/series",              post(series))
        .route("/geocode/suggestions", get(suggestions))
        .route("/geocode/resolve",     get(resolve))
        .route("/geocode/reverse",     get(reverse))
        .route("/timezone",            get(timezone))
        .with_state(state)
}
