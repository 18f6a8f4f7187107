pub mod api;
pub mod location;
pub mod plot;
pub mod power;
pub mod series;
pub mod time_range;
pub mod visualizer;
pub mod weather;
