use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Categories a resource can be filed under
pub const CATEGORIES: [&str; 12] = [
    "Food Assistance",
    "Healthcare",
    "Housing",
    "Employment",
    "Education",
    "Senior Services",
    "Mental Health",
    "Legal Aid",
    "Transportation",
    "Child Care",
    "Veterans Services",
    "Financial Assistance",
];

/// Check whether a category name is one of the known categories (exact match)
pub fn is_known_category(category: &str) -> bool {
    CATEGORIES.contains(&category)
}

/// A (latitude, longitude) pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Great-circle distance to another point in kilometers
    #[inline]
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        crate::core::distance::haversine_distance(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

impl From<GeoPoint> for geo::Point<f64> {
    fn from(point: GeoPoint) -> Self {
        geo::Point::new(point.longitude, point.latitude)
    }
}

/// A directory entry describing a community assistance service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Resource {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub services: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
    #[serde(default)]
    pub hours: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_approved: bool,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
}

impl Resource {
    /// The resource's location, if both coordinates are present and finite
    pub fn location(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => {
                Some(GeoPoint::new(lat, lon))
            }
            _ => None,
        }
    }
}

/// A resource paired with its distance from the caller's reference point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceHit {
    #[serde(flatten)]
    pub resource: Resource,
    #[serde(rename = "distance_km", skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

/// A grid bucket aggregating nearby resources into one weighted display point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatCell {
    pub center: GeoPoint,
    pub count: usize,
    /// Display radius in meters
    pub radius: f64,
    pub opacity: f64,
    /// Resources folded into this cell, in input order
    pub resource_ids: Vec<i32>,
}

/// Per-category resource count
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

/// Aggregate numbers about the directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryStats {
    #[serde(rename = "totalResources")]
    pub total_resources: i64,
    pub categories: Vec<CategoryCount>,
    #[serde(rename = "pendingSubmissions")]
    pub pending_submissions: i64,
}
