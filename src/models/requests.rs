use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::location::zip_to_point;
use crate::core::query::FilterRequest;
use crate::models::domain::GeoPoint;

/// Query string of the resource search endpoint
///
/// Every field is kept as a raw string so that malformed values degrade to
/// "not provided" instead of rejecting the request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub category: Option<String>,
    pub featured: Option<String>,
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub zip: Option<String>,
    pub radius_km: Option<String>,
    pub heatmap: Option<String>,
    pub grid_size: Option<String>,
}

impl SearchParams {
    pub fn filter_request(&self) -> FilterRequest {
        FilterRequest::from_params(
            self.q.as_deref(),
            self.category.as_deref(),
            self.featured.as_deref(),
        )
    }

    /// Reference point from explicit coordinates, falling back to the ZIP code
    pub fn center(&self) -> Option<GeoPoint> {
        let lat = parse_f64(self.lat.as_deref()).filter(|v| (-90.0..=90.0).contains(v));
        let lng = parse_f64(self.lng.as_deref()).filter(|v| (-180.0..=180.0).contains(v));

        match (lat, lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
            _ => self.zip.as_deref().and_then(zip_to_point),
        }
    }

    pub fn radius_km(&self) -> Option<f64> {
        parse_f64(self.radius_km.as_deref()).filter(|r| *r >= 0.0)
    }

    pub fn heatmap(&self) -> bool {
        parse_flag(self.heatmap.as_deref())
    }

    pub fn grid_size(&self) -> Option<f64> {
        parse_f64(self.grid_size.as_deref()).filter(|g| *g > 0.0)
    }
}

fn parse_f64(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Only the literal "true" (any case) turns a flag on
pub(crate) fn parse_flag(raw: Option<&str>) -> bool {
    raw.map(|s| s.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// A suggestion for a new resource, queued for review
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmissionRequest {
    #[validate(length(min = 3, message = "Title must be at least 3 characters"))]
    pub title: String,
    #[validate(length(min = 20, message = "Description must be at least 20 characters"))]
    pub description: String,
    #[validate(length(min = 1, message = "Please select a category"))]
    pub category: String,
    #[validate(length(min = 2, message = "Contact name is required"))]
    pub contact_name: String,
    #[validate(email(message = "Valid email is required"))]
    pub contact_email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    #[validate(url(message = "Must be a valid URL"))]
    pub website: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

impl SubmissionRequest {
    /// Trim free-text fields and turn blank optional fields into `None`
    pub fn normalize(&mut self) {
        self.title = self.title.trim().to_string();
        self.description = self.description.trim().to_string();
        self.category = self.category.trim().to_string();
        self.contact_name = self.contact_name.trim().to_string();
        self.contact_email = self.contact_email.trim().to_string();

        for field in [
            &mut self.phone,
            &mut self.website,
            &mut self.address,
            &mut self.city,
            &mut self.state,
        ] {
            *field = field
                .take()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty());
        }
    }
}

/// Request to save a resource as a favorite
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FavoriteRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    #[validate(range(min = 1))]
    #[serde(alias = "resource_id", rename = "resourceId")]
    pub resource_id: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_prefers_coordinates_over_zip() {
        let params = SearchParams {
            lat: Some("37.77".to_string()),
            lng: Some("-122.42".to_string()),
            zip: Some("10001".to_string()),
            ..Default::default()
        };
        assert_eq!(params.center(), Some(GeoPoint::new(37.77, -122.42)));
    }

    #[test]
    fn test_center_falls_back_to_zip() {
        let params = SearchParams {
            lat: Some("not-a-number".to_string()),
            lng: Some("-122.42".to_string()),
            zip: Some("10001".to_string()),
            ..Default::default()
        };
        assert_eq!(params.center(), Some(GeoPoint::new(40.7484, -73.9857)));
    }

    #[test]
    fn test_malformed_numbers_are_ignored() {
        let params = SearchParams {
            lat: Some("95".to_string()),
            lng: Some("10".to_string()),
            radius_km: Some("-4".to_string()),
            grid_size: Some("NaN".to_string()),
            heatmap: Some("yes".to_string()),
            ..Default::default()
        };
        assert_eq!(params.center(), None);
        assert_eq!(params.radius_km(), None);
        assert_eq!(params.grid_size(), None);
        assert!(!params.heatmap());
    }

    #[test]
    fn test_submission_normalize_and_validate() {
        let mut submission = SubmissionRequest {
            title: "  Eastside Pantry ".to_string(),
            description: "Weekly grocery distribution for families.".to_string(),
            category: "Food Assistance".to_string(),
            contact_name: "Sam".to_string(),
            contact_email: "sam@example.org".to_string(),
            phone: Some("   ".to_string()),
            website: Some("".to_string()),
            address: None,
            city: Some(" Oakland ".to_string()),
            state: None,
        };

        submission.normalize();

        assert_eq!(submission.title, "Eastside Pantry");
        assert_eq!(submission.phone, None);
        assert_eq!(submission.website, None);
        assert_eq!(submission.city.as_deref(), Some("Oakland"));
        assert!(submission.validate().is_ok());
    }

    #[test]
    fn test_submission_rejects_bad_email_and_url() {
        let submission = SubmissionRequest {
            title: "Clinic".to_string(),
            description: "Free walk-in clinic for uninsured adults.".to_string(),
            category: "Healthcare".to_string(),
            contact_name: "Ana".to_string(),
            contact_email: "not-an-email".to_string(),
            phone: None,
            website: Some("clinic dot org".to_string()),
            address: None,
            city: None,
            state: None,
        };

        let errors = submission.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("contact_email"));
        assert!(fields.contains_key("website"));
    }
}
