use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use crate::config::GeocoderConfig;
use crate::errors::PipelineError;
use crate::models::location::{validate_coordinates, GeocodeCandidate};
use crate::models::weather::{NominatimPlace, NominatimReverse};

const MAX_SUGGESTIONS: usize = 100;

/// Nominatim-compatible forward and reverse geocoding.
///
/// Transport and decode failures never leave this type: suggestions come back
/// empty and single lookups as `ResolutionFailure`.
#[derive(Debug, Clone)]
pub struct Geocoder {
    client: Client,
    base_url: String,
    suggestion_limit: usize,
}

impl Geocoder {
    pub fn new(config: &GeocoderConfig) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_s))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| PipelineError::invalid(format!("geocoder client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            suggestion_limit: config.suggestion_limit.clamp(1, MAX_SUGGESTIONS),
        })
    }

    /// Up to `limit` candidates in provider relevance order.
    pub async fn suggest(&self, address: &str, limit: Option<usize>) -> Vec<GeocodeCandidate> {
        let address = address.trim();
        if address.is_empty() {
            return Vec::new();
        }
        let limit = limit.unwrap_or(self.suggestion_limit).clamp(1, MAX_SUGGESTIONS);
        match self.search(address, limit).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(address, error = %e, "geocoder search failed");
                Vec::new()
            }
        }
    }

    /// Best match for `address`.
    pub async fn resolve(&self, address: &str) -> Result<GeocodeCandidate, PipelineError> {
        self.suggest(address, Some(1))
            .await
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::ResolutionFailure { query: address.to_string() })
    }

    pub async fn reverse(&self, latitude: f64, longitude: f64) -> Result<String, PipelineError> {
        let query = format!("{}, {}", latitude, longitude);
        let not_found = || PipelineError::ResolutionFailure { query: query.clone() };
        validate_coordinates(latitude, longitude).map_err(|_| not_found())?;

        let url = format!("{}/reverse", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("format", "jsonv2".to_string()),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status());
        let place: NominatimReverse = match response {
            Ok(r) => r.json().await.map_err(|e| {
                warn!(latitude, longitude, error = %e, "undecodable reverse geocoding response");
                not_found()
            })?,
            Err(e) => {
                warn!(latitude, longitude, error = %e, "reverse geocoding failed");
                return Err(not_found());
            }
        };
        if let Some(error) = place.error {
            debug!(latitude, longitude, %error, "no reverse match");
        }
        place.display_name.filter(|n| !n.is_empty()).ok_or_else(not_found)
    }

    async fn search(&self, address: &str, limit: usize) -> Result<Vec<GeocodeCandidate>, reqwest::Error> {
        let url = format!("{}/search", self.base_url);
        let places: Vec<NominatimPlace> = self
            .client
            .get(&url)
            .query(&[("q", address.to_string()), ("format", "jsonv2".to_string()), ("limit", limit.to_string())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(address, matches = places.len(), "geocoder search");
        Ok(places.into_iter().filter_map(candidate).take(limit).collect())
    }
}

/// Nominatim sends coordinates as strings; unparsable or out-of-range ones are skipped.
fn candidate(place: NominatimPlace) -> Option<GeocodeCandidate> {
    let latitude = place.lat.parse::<f64>().ok()?;
    let longitude = place.lon.parse::<f64>().ok()?;
    validate_coordinates(latitude, longitude).ok()?;
    Some(GeocodeCandidate { address: place.display_name, latitude, longitude })
}
