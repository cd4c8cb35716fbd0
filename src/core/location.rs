use crate::models::GeoPoint;

/// ZIP codes the directory can resolve without a geocoder
const ZIP_CODES: [(&str, f64, f64); 10] = [
    ("10001", 40.7484, -73.9857),  // New York, NY
    ("90210", 34.0901, -118.4065), // Beverly Hills, CA
    ("60601", 41.8781, -87.6298),  // Chicago, IL
    ("33101", 25.7617, -80.1918),  // Miami, FL
    ("98101", 47.6062, -122.3321), // Seattle, WA
    ("02101", 42.3601, -71.0589),  // Boston, MA
    ("85001", 33.4484, -112.0740), // Phoenix, AZ
    ("80202", 39.7392, -104.9903), // Denver, CO
    ("77001", 29.7604, -95.3698),  // Houston, TX
    ("19101", 39.9526, -75.1652),  // Philadelphia, PA
];

/// Resolve a ZIP code to a reference point
///
/// Accepts ZIP+4 ("10001-1234"); unknown codes resolve to `None`.
pub fn zip_to_point(zip: &str) -> Option<GeoPoint> {
    let code = zip.trim().split('-').next()?;

    ZIP_CODES
        .iter()
        .find(|(known, _, _)| *known == code)
        .map(|(_, lat, lon)| GeoPoint::new(*lat, *lon))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_zip() {
        assert_eq!(zip_to_point("60601"), Some(GeoPoint::new(41.8781, -87.6298)));
        assert_eq!(zip_to_point(" 02101-0001 "), Some(GeoPoint::new(42.3601, -71.0589)));
    }

    #[test]
    fn test_unknown_zip() {
        assert_eq!(zip_to_point("99999"), None);
        assert_eq!(zip_to_point(""), None);
    }
}
