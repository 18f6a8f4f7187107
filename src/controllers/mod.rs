pub mod analysis_controller;
pub mod location_controller;
