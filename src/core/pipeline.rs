use crate::models::{GeoPoint, HeatCell, Resource, ResourceHit, SearchParams};
use crate::core::{
    distance::{annotate_distances, filter_by_radius},
    heatmap::{HeatmapAggregator, DEFAULT_GRID_SIZE},
    query::{FilterRequest, QueryBuilder},
};

/// Radius applied when the caller gives a location but no radius ("local" scope)
pub const DEFAULT_RADIUS_KM: f64 = 300.0;

/// A complete discovery request: filters, optional proximity, output mode
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub filter: FilterRequest,
    pub center: Option<GeoPoint>,
    pub radius_km: Option<f64>,
    pub heatmap: bool,
    pub grid_size: Option<f64>,
}

impl From<&SearchParams> for SearchQuery {
    fn from(params: &SearchParams) -> Self {
        Self {
            filter: params.filter_request(),
            center: params.center(),
            radius_km: params.radius_km(),
            heatmap: params.heatmap(),
            grid_size: params.grid_size(),
        }
    }
}

/// What the pipeline hands back to the caller
#[derive(Debug, Clone)]
pub enum DiscoveryView {
    Resources(Vec<ResourceHit>),
    Heatmap(Vec<HeatCell>),
}

/// Result of the discovery process
#[derive(Debug)]
pub struct DiscoveryOutcome {
    pub view: DiscoveryView,
    /// Resources handed to the pipeline
    pub total_candidates: usize,
    /// Resources surviving every filter stage
    pub total: usize,
}

/// Resource discovery orchestrator
///
/// # Pipeline Stages
/// 1. Predicate filtering and featured-first ordering
/// 2. Radius filtering around the caller's location (when one is given)
/// 3. Either distance annotation or heatmap aggregation
#[derive(Debug, Clone)]
pub struct DiscoveryPipeline {
    default_radius_km: f64,
    max_radius_km: f64,
    grid_size: f64,
}

impl DiscoveryPipeline {
    pub fn new(default_radius_km: f64, max_radius_km: f64, grid_size: f64) -> Self {
        Self {
            default_radius_km,
            max_radius_km,
            grid_size,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_RADIUS_KM, f64::INFINITY, DEFAULT_GRID_SIZE)
    }

    /// Effective search radius for a request
    pub fn radius_for(&self, query: &SearchQuery) -> f64 {
        query
            .radius_km
            .unwrap_or(self.default_radius_km)
            .min(self.max_radius_km)
    }

    /// Run every stage over an in-memory resource collection
    pub fn run(&self, resources: Vec<Resource>, query: &SearchQuery) -> DiscoveryOutcome {
        let total_candidates = resources.len();

        // Stage 1: predicates
        let mut matched = QueryBuilder::new(&query.filter).apply(resources);

        // Stage 2: proximity
        if let Some(center) = query.center {
            let radius_km = self.radius_for(query);
            matched = filter_by_radius(matched, center, radius_km);
            tracing::debug!(
                "Radius filter: {} resources within {}km of ({}, {})",
                matched.len(),
                radius_km,
                center.latitude,
                center.longitude
            );
        }

        let total = matched.len();

        // Stage 3: presentation
        let view = if query.heatmap {
            let aggregator = HeatmapAggregator::new(query.grid_size.unwrap_or(self.grid_size));
            DiscoveryView::Heatmap(aggregator.aggregate(&matched))
        } else {
            DiscoveryView::Resources(annotate_distances(matched, query.center))
        };

        DiscoveryOutcome {
            view,
            total_candidates,
            total,
        }
    }
}

impl Default for DiscoveryPipeline {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_resource(id: i32, category: &str, featured: bool, lat: f64, lon: f64) -> Resource {
        Resource {
            id,
            title: format!("Resource {}", id),
            description: "Community support".to_string(),
            category: category.to_string(),
            tags: None,
            services: None,
            audience: None,
            hours: None,
            phone: None,
            email: None,
            website: None,
            address: None,
            city: None,
            state: None,
            zip: None,
            image_url: None,
            latitude: Some(lat),
            longitude: Some(lon),
            is_featured: featured,
            is_approved: true,
            created_at: None,
            updated_at: None,
        }
    }

    fn resource_ids(outcome: &DiscoveryOutcome) -> Vec<i32> {
        match &outcome.view {
            DiscoveryView::Resources(hits) => hits.iter().map(|h| h.resource.id).collect(),
            DiscoveryView::Heatmap(_) => panic!("expected resource view"),
        }
    }

    #[test]
    fn test_filters_without_location() {
        let pipeline = DiscoveryPipeline::with_defaults();
        let query = SearchQuery {
            filter: FilterRequest::default().with_category("Healthcare"),
            ..Default::default()
        };

        let outcome = pipeline.run(
            vec![
                create_resource(1, "Healthcare", false, 37.77, -122.42),
                create_resource(2, "Housing", false, 37.77, -122.42),
            ],
            &query,
        );

        assert_eq!(resource_ids(&outcome), vec![1]);
        assert_eq!(outcome.total_candidates, 2);
        assert_eq!(outcome.total, 1);
    }

    #[test]
    fn test_default_radius_applies_with_center() {
        let pipeline = DiscoveryPipeline::with_defaults();
        let query = SearchQuery {
            center: Some(GeoPoint::new(37.77, -122.42)),
            ..Default::default()
        };

        let outcome = pipeline.run(
            vec![
                create_resource(1, "Healthcare", false, 38.58, -121.49), // Sacramento, ~120km
                create_resource(2, "Healthcare", false, 34.05, -118.24), // Los Angeles, ~560km
            ],
            &query,
        );

        assert_eq!(resource_ids(&outcome), vec![1]);
        match outcome.view {
            DiscoveryView::Resources(hits) => assert!(hits[0].distance_km.unwrap() < 300.0),
            DiscoveryView::Heatmap(_) => unreachable!(),
        }
    }

    #[test]
    fn test_radius_is_capped() {
        let pipeline = DiscoveryPipeline::new(300.0, 1000.0, DEFAULT_GRID_SIZE);
        let query = SearchQuery {
            center: Some(GeoPoint::new(37.77, -122.42)),
            radius_km: Some(50_000.0),
            ..Default::default()
        };
        assert_eq!(pipeline.radius_for(&query), 1000.0);
    }

    #[test]
    fn test_heatmap_view() {
        let pipeline = DiscoveryPipeline::with_defaults();
        let query = SearchQuery {
            heatmap: true,
            ..Default::default()
        };

        let outcome = pipeline.run(
            vec![
                create_resource(1, "Healthcare", false, 37.775, -122.419),
                create_resource(2, "Housing", false, 37.776, -122.418),
            ],
            &query,
        );

        match outcome.view {
            DiscoveryView::Heatmap(cells) => {
                assert_eq!(cells.len(), 1);
                assert_eq!(cells[0].count, 2);
            }
            DiscoveryView::Resources(_) => panic!("expected heatmap view"),
        }
    }
}
