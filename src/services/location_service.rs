use std::sync::Arc;

use chrono_tz::Tz;
use tracing::info;

use crate::errors::PipelineError;
use crate::models::location::{coordinates_label, parse_timezone, validate_coordinates, Location};
use crate::services::geocoder::Geocoder;
use crate::services::timezone_service::TimezoneResolver;

/// Completes a partially specified site into a consistent [`Location`].
#[derive(Clone)]
pub struct LocationService {
    geocoder: Geocoder,
    timezones: Arc<TimezoneResolver>,
}

impl LocationService {
    pub fn new(geocoder: Geocoder, timezones: Arc<TimezoneResolver>) -> Self {
        Self { geocoder, timezones }
    }

    pub fn geocoder(&self) -> &Geocoder {
        &self.geocoder
    }

    pub fn timezones(&self) -> &TimezoneResolver {
        &self.timezones
    }

    /// Geocodes `address` and looks up the zone of the match.
    pub async fn from_address(&self, address: &str) -> Result<Location, PipelineError> {
        let candidate = self.geocoder.resolve(address).await?;
        let timezone = self.zone_for(candidate.latitude, candidate.longitude)?;
        info!(address, latitude = candidate.latitude, longitude = candidate.longitude, %timezone, "resolved address");
        Location::new(candidate.address, candidate.latitude, candidate.longitude, timezone)
    }

    /// Completes a coordinate pair. The address comes from reverse geocoding,
    /// or is the coordinates themselves when that finds nothing. An explicit
    /// `timezone` is trusted as given.
    pub async fn from_coordinates(&self, latitude: f64, longitude: f64, timezone: Option<&str>) -> Result<Location, PipelineError> {
        validate_coordinates(latitude, longitude)?;
        let timezone = match timezone.map(str::trim).filter(|t| !t.is_empty()) {
            Some(name) => parse_timezone(name)?,
            None => self.zone_for(latitude, longitude)?,
        };
        let address = self
            .geocoder
            .reverse(latitude, longitude)
            .await
            .unwrap_or_else(|_| coordinates_label(latitude, longitude));
        Location::new(address, latitude, longitude, timezone)
    }

    /// Builds a location from whichever of address or coordinates is present,
    /// coordinates first.
    pub async fn locate(
        &self,
        address: Option<&str>,
        latitude: Option<f64>,
        longitude: Option<f64>,
        timezone: Option<&str>,
    ) -> Result<Location, PipelineError> {
        match (latitude, longitude, address.map(str::trim).filter(|a| !a.is_empty())) {
            (Some(lat), Some(lon), _) => self.from_coordinates(lat, lon, timezone).await,
            (_, _, Some(address)) => {
                let mut location = self.from_address(address).await?;
                if let Some(name) = timezone.map(str::trim).filter(|t| !t.is_empty()) {
                    location.timezone = parse_timezone(name)?;
                }
                Ok(location)
            }
            _ => Err(PipelineError::invalid("either an address or both lat and lon are required")),
        }
    }

    fn zone_for(&self, latitude: f64, longitude: f64) -> Result<Tz, PipelineError> {
        self.timezones.timezone_for(latitude, longitude).ok_or_else(|| PipelineError::ResolutionFailure {
            query: format!("timezone of {}", coordinates_label(latitude, longitude)),
        })
    }
}
