use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};

use crate::errors::PipelineError;
use crate::models::api::{
    AddressQuery, CoordinatesQuery, ReverseResponse, SuggestionQuery, SuggestionsResponse, TimezoneResponse,
};
use crate::models::location::{coordinates_label, Location};
use crate::shared_state::AppState;

/// GET /api/geocode/suggestions
/// Address suggestions for a free-text query
///
/// Always answers 200; an unreachable geocoder yields an empty list.
#[utoipa::path(
    get,
    path = "/api/geocode/suggestions",
    params(SuggestionQuery),
    responses(
        (status = 200, description = "Candidates in relevance order", body = SuggestionsResponse)
    )
)]
pub async fn suggestions(State(state): State<AppState>, Query(query): Query<SuggestionQuery>) -> impl IntoResponse {
    let suggestions = state.locations.geocoder().suggest(&query.address, query.limit).await;
    Json(SuggestionsResponse { suggestions })
}

/// GET /api/geocode/resolve
#[utoipa::path(
    get,
    path = "/api/geocode/resolve",
    params(AddressQuery),
    responses(
        (status = 200, description = "Resolved location with timezone", body = Location),
        (status = 404, description = "No match")
    )
)]
pub async fn resolve(State(state): State<AppState>, Query(query): Query<AddressQuery>) -> impl IntoResponse {
    match state.locations.from_address(&query.address).await {
        Ok(location) => Json(location).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /api/geocode/reverse
#[utoipa::path(
    get,
    path = "/api/geocode/reverse",
    params(CoordinatesQuery),
    responses(
        (status = 200, description = "Address of the coordinates", body = ReverseResponse),
        (status = 404, description = "No match")
    )
)]
pub async fn reverse(State(state): State<AppState>, Query(query): Query<CoordinatesQuery>) -> impl IntoResponse {
    match state.locations.geocoder().reverse(query.lat, query.lon).await {
        Ok(address) => Json(ReverseResponse { address }).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /api/timezone
/// IANA timezone of a coordinate pair, looked up offline
#[utoipa::path(
    get,
    path = "/api/timezone",
    params(CoordinatesQuery),
    responses(
        (status = 200, description = "Timezone name", body = TimezoneResponse),
        (status = 404, description = "No zone for these coordinates")
    )
)]
pub async fn timezone(State(state): State<AppState>, Query(query): Query<CoordinatesQuery>) -> impl IntoResponse {
    match state.locations.timezones().timezone_for(query.lat, query.lon) {
        Some(tz) => Json(TimezoneResponse {
            latitude: query.lat,
            longitude: query.lon,
            timezone: tz.name().to_string(),
        })
        .into_response(),
        None => PipelineError::ResolutionFailure {
            query: format!("timezone of {}", coordinates_label(query.lat, query.lon)),
        }
        .into_response(),
    }
}
