// Core algorithm exports
pub mod distance;
pub mod heatmap;
pub mod location;
pub mod pipeline;
pub mod query;

pub use distance::{haversine_distance, calculate_bounding_box, filter_by_radius, annotate_distances, BoundingBox};
pub use heatmap::{HeatmapAggregator, CellKey, DEFAULT_GRID_SIZE};
pub use location::zip_to_point;
pub use pipeline::{DiscoveryPipeline, DiscoveryOutcome, DiscoveryView, SearchQuery, DEFAULT_RADIUS_KM};
pub use query::{FilterRequest, Predicate, QueryBuilder};
