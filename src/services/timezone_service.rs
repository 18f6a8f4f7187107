use chrono_tz::Tz;
use tracing::debug;
use tzf_rs::DefaultFinder;

use crate::models::location::validate_coordinates;

/// Offline coordinate → IANA zone lookup over the bundled boundary polygons.
///
/// Building the finder decodes the polygon set, so one instance is built at
/// startup and shared.
pub struct TimezoneResolver {
    finder: DefaultFinder,
}

impl TimezoneResolver {
    pub fn new() -> Self {
        Self { finder: DefaultFinder::new() }
    }

    /// `None` for invalid coordinates or when the lookup yields a name chrono-tz
    /// does not know.
    pub fn timezone_for(&self, latitude: f64, longitude: f64) -> Option<Tz> {
        validate_coordinates(latitude, longitude).ok()?;
        let name = self.finder.get_tz_name(longitude, latitude);
        if name.is_empty() {
            return None;
        }
        let tz = name.parse::<Tz>().ok();
        debug!(latitude, longitude, zone = name, "timezone lookup");
        tz
    }
}

impl Default for TimezoneResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_cities() {
        let resolver = TimezoneResolver::new();
        assert_eq!(resolver.timezone_for(40.7128, -74.0060), Some(chrono_tz::America::New_York));
        assert_eq!(resolver.timezone_for(45.07, 7.68), Some(chrono_tz::Europe::Rome));
    }

    #[test]
    fn test_deterministic() {
        let resolver = TimezoneResolver::new();
        let first = resolver.timezone_for(35.6762, 139.6503);
        for _ in 0..3 {
            assert_eq!(resolver.timezone_for(35.6762, 139.6503), first);
        }
        assert!(first.is_some());
    }

    #[test]
    fn test_out_of_range_is_unknown() {
        let resolver = TimezoneResolver::new();
        assert_eq!(resolver.timezone_for(95.0, 0.0), None);
        assert_eq!(resolver.timezone_for(0.0, 200.0), None);
    }
}
