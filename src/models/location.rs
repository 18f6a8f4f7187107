use chrono_tz::Tz;
use serde::{Serialize, Serializer};
use utoipa::ToSchema;

use crate::errors::PipelineError;

/// A resolved site. Once built, coordinates and timezone agree with each other.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Location {
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(serialize_with = "serialize_tz")]
    #[schema(value_type = String, example = "America/New_York")]
    pub timezone: Tz,
}

impl Location {
    pub fn new(address: impl Into<String>, latitude: f64, longitude: f64, timezone: Tz) -> Result<Self, PipelineError> {
        validate_coordinates(latitude, longitude)?;
        Ok(Self { address: address.into(), latitude, longitude, timezone })
    }
}

/// A geocoder match, in provider relevance order.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct GeocodeCandidate {
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), PipelineError> {
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(PipelineError::invalid(format!(
            "coordinates out of range: ({}, {})",
            latitude, longitude
        )));
    }
    Ok(())
}

pub fn parse_timezone(name: &str) -> Result<Tz, PipelineError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| PipelineError::invalid(format!("unknown timezone '{}'", name)))
}

/// Label used when no address can be derived for a coordinate pair.
pub fn coordinates_label(latitude: f64, longitude: f64) -> String {
    format!("{:.4}, {:.4}", latitude, longitude)
}

fn serialize_tz<S: Serializer>(tz: &Tz, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(tz.name())
}
