use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::errors::PipelineError;
use crate::services::analysis_service::AnalysisService;
use crate::services::assembler::Assembler;
use crate::services::geocoder::Geocoder;
use crate::services::http_fetcher::{HttpFetcher, RetryPolicy};
use crate::services::location_service::LocationService;
use crate::services::response_cache::ResponseCache;
use crate::services::timezone_service::TimezoneResolver;
use crate::services::weather_service::WeatherService;

/// Services shared by every request handler. Built once at startup; cheap to
/// clone into each handler.
#[derive(Clone)]
pub struct AppState {
    pub analysis: Arc<AnalysisService>,
    pub locations: LocationService,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self, PipelineError> {
        let cache = ResponseCache::new(&config.cache.dir, Duration::from_secs(config.cache.ttl_s));
        let fetcher = HttpFetcher::new(
            Duration::from_secs(config.weather.timeout_s),
            cache,
            RetryPolicy::from_config(&config.retry),
        )?;
        let weather = WeatherService::new(config.weather.clone(), fetcher, config.pv_system);

        let timezones = Arc::new(TimezoneResolver::new());
        let locations = LocationService::new(Geocoder::new(&config.geocoder)?, timezones);
        let analysis = AnalysisService::new(locations.clone(), Assembler::new(weather), config.pv_system);

        Ok(Self { analysis: Arc::new(analysis), locations })
    }
}
