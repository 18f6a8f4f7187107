pub mod analysis_service;
pub mod assembler;
pub mod geocoder;
pub mod http_fetcher;
pub mod location_service;
pub mod plot_renderer;
pub mod power_service;
pub mod response_cache;
pub mod solar_algorithm;
pub mod timezone_service;
pub mod tracking;
pub mod weather_service;
