//! Resource Finder - discovery service for the community resource directory
//!
//! This library provides the search pipeline behind the directory: predicate
//! filtering, radius filtering around the caller's location, and grid-based
//! heatmap aggregation, plus the HTTP and storage layers around it.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{DiscoveryPipeline, FilterRequest, HeatmapAggregator, QueryBuilder, SearchQuery, distance::{haversine_distance, filter_by_radius}};
pub use models::{Resource, GeoPoint, HeatCell, SearchParams, SearchResponse};
