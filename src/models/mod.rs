// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{Resource, ResourceHit, GeoPoint, HeatCell, CategoryCount, DirectoryStats, CATEGORIES, is_known_category};
pub use requests::{SearchParams, SubmissionRequest, FavoriteRequest};
pub use responses::{SearchResponse, HealthResponse, ErrorResponse, SubmissionResponse, SuccessResponse};
