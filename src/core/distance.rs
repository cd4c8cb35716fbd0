use crate::models::{GeoPoint, Resource, ResourceHit};

/// Earth's radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Slack added to bounding box edges so rounding never drops a point on the circle
const BBOX_EPSILON_DEG: f64 = 1e-6;

/// Calculate the Haversine distance between two points in kilometers
///
/// # Arguments
/// * `lat1` - Latitude of first point in degrees
/// * `lon1` - Longitude of first point in degrees
/// * `lat2` - Latitude of second point in degrees
/// * `lon2` - Longitude of second point in degrees
///
/// # Returns
/// Distance in kilometers
#[inline]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Geospatial bounding box around a search circle
///
/// Longitudes may extend past ±180 when the circle crosses the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// True when the circle reaches a pole, so every longitude is inside
    pub fn spans_all_longitudes(&self) -> bool {
        self.max_lon - self.min_lon >= 360.0
    }

    /// True when the longitude window crosses the antimeridian
    pub fn wraps(&self) -> bool {
        !self.spans_all_longitudes() && (self.min_lon < -180.0 || self.max_lon > 180.0)
    }

    /// Check if a point is within the box
    #[inline]
    pub fn contains(&self, point: &GeoPoint) -> bool {
        if point.latitude < self.min_lat || point.latitude > self.max_lat {
            return false;
        }
        if self.spans_all_longitudes() {
            return true;
        }

        let lon = point.longitude;
        [lon, lon + 360.0, lon - 360.0]
            .iter()
            .any(|l| *l >= self.min_lon && *l <= self.max_lon)
    }
}

/// Calculate a bounding box around a center point
///
/// This is much faster than Haversine for pre-filtering. The box is the exact
/// spherical envelope of the circle (plus a tiny slack), so a point inside the
/// radius is never outside the box.
pub fn calculate_bounding_box(center: GeoPoint, radius_km: f64) -> BoundingBox {
    let angular = radius_km / EARTH_RADIUS_KM;
    let lat_delta = angular.to_degrees() + BBOX_EPSILON_DEG;

    let min_lat = (center.latitude - lat_delta).max(-90.0);
    let max_lat = (center.latitude + lat_delta).min(90.0);

    // A circle touching a pole covers every meridian
    if min_lat <= -90.0 || max_lat >= 90.0 {
        return BoundingBox { min_lat, max_lat, min_lon: -180.0, max_lon: 180.0 };
    }

    let ratio = angular.sin() / center.latitude.to_radians().cos();
    let lon_delta = ratio.clamp(-1.0, 1.0).asin().to_degrees() + BBOX_EPSILON_DEG;

    BoundingBox {
        min_lat,
        max_lat,
        min_lon: center.longitude - lon_delta,
        max_lon: center.longitude + lon_delta,
    }
}

/// Keep the resources within `radius_km` of `center`, preserving input order
///
/// Resources without coordinates are never retained. A NaN or negative
/// radius retains nothing.
pub fn filter_by_radius(resources: Vec<Resource>, center: GeoPoint, radius_km: f64) -> Vec<Resource> {
    if radius_km.is_nan() || radius_km < 0.0 || !center.is_finite() {
        return Vec::new();
    }

    let bbox = calculate_bounding_box(center, radius_km);

    resources
        .into_iter()
        .filter(|resource| match resource.location() {
            Some(point) => bbox.contains(&point) && center.distance_to(&point) <= radius_km,
            None => false,
        })
        .collect()
}

/// Pair each resource with its distance from `center`
///
/// Resources without coordinates get `None`.
pub fn annotate_distances(resources: Vec<Resource>, center: Option<GeoPoint>) -> Vec<ResourceHit> {
    resources
        .into_iter()
        .map(|resource| {
            let distance_km = center
                .zip(resource.location())
                .map(|(c, p)| c.distance_to(&p));
            ResourceHit { resource, distance_km }
        })
        .collect()
}
