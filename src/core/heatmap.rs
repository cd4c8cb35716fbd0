use std::collections::BTreeMap;

use crate::models::{GeoPoint, HeatCell, Resource};

/// Default grid cell size in decimal degrees (roughly 2km at mid-latitudes)
pub const DEFAULT_GRID_SIZE: f64 = 0.02;

const MIN_RADIUS_M: f64 = 100.0;
const RADIUS_SPAN_M: f64 = 200.0;
const MIN_OPACITY: f64 = 0.3;
const OPACITY_SPAN: f64 = 0.4;

/// Grid cell index: each coordinate divided by the cell size, rounded half up
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellKey {
    pub lat_index: i64,
    pub lon_index: i64,
}

/// Nearest integer, exact halves going toward positive infinity
#[inline]
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Running state of one cell while resources are folded in
#[derive(Debug)]
struct CellAccumulator {
    latitude: f64,
    longitude: f64,
    count: usize,
    resource_ids: Vec<i32>,
}

impl CellAccumulator {
    fn new(point: GeoPoint, id: i32) -> Self {
        Self {
            latitude: point.latitude,
            longitude: point.longitude,
            count: 1,
            resource_ids: vec![id],
        }
    }

    /// Incremental mean: new = (old * n + point) / (n + 1)
    fn fold(&mut self, point: GeoPoint, id: i32) {
        let n = self.count as f64;
        self.latitude = (self.latitude * n + point.latitude) / (n + 1.0);
        self.longitude = (self.longitude * n + point.longitude) / (n + 1.0);
        self.count += 1;
        self.resource_ids.push(id);
    }
}

/// Buckets resources into a coordinate grid for heatmap display
///
/// Every call is a fresh, stateless transformation of its input.
#[derive(Debug, Clone, Copy)]
pub struct HeatmapAggregator {
    grid_size: f64,
}

impl HeatmapAggregator {
    /// Create an aggregator; a non-finite or non-positive grid size falls back to the default
    pub fn new(grid_size: f64) -> Self {
        let grid_size = if grid_size.is_finite() && grid_size > 0.0 {
            grid_size
        } else {
            DEFAULT_GRID_SIZE
        };
        Self { grid_size }
    }

    pub fn grid_size(&self) -> f64 {
        self.grid_size
    }

    /// Grid cell a point falls into
    #[inline]
    pub fn cell_key(&self, point: &GeoPoint) -> CellKey {
        CellKey {
            lat_index: round_half_up(point.latitude / self.grid_size),
            lon_index: round_half_up(point.longitude / self.grid_size),
        }
    }

    /// Grid cell a resource belongs to, if it has coordinates
    pub fn cell_for(&self, resource: &Resource) -> Option<CellKey> {
        resource.location().map(|point| self.cell_key(&point))
    }

    /// Aggregate resources into density-weighted cells, ordered by cell key
    ///
    /// Resources without coordinates are skipped. Empty input yields no cells.
    pub fn aggregate(&self, resources: &[Resource]) -> Vec<HeatCell> {
        let mut cells: BTreeMap<CellKey, CellAccumulator> = BTreeMap::new();

        for resource in resources {
            let Some(point) = resource.location() else {
                continue;
            };

            cells
                .entry(self.cell_key(&point))
                .and_modify(|cell| cell.fold(point, resource.id))
                .or_insert_with(|| CellAccumulator::new(point, resource.id));
        }

        let max_count = match cells.values().map(|c| c.count).max() {
            Some(max) if max > 0 => max as f64,
            _ => return Vec::new(),
        };

        tracing::trace!(cells = cells.len(), max_count, "Aggregated heatmap grid");

        cells
            .into_values()
            .map(|cell| {
                let ratio = cell.count as f64 / max_count;
                HeatCell {
                    center: GeoPoint::new(cell.latitude, cell.longitude),
                    count: cell.count,
                    radius: MIN_RADIUS_M + ratio * RADIUS_SPAN_M,
                    opacity: MIN_OPACITY + ratio * OPACITY_SPAN,
                    resource_ids: cell.resource_ids,
                }
            })
            .collect()
    }
}

impl Default for HeatmapAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_GRID_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point_resource(id: i32, lat: f64, lon: f64) -> Resource {
        Resource {
            id,
            title: format!("Resource {}", id),
            description: "Test resource".to_string(),
            category: "Housing".to_string(),
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
            is_featured: false,
            is_approved: true,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(HeatmapAggregator::default().aggregate(&[]).is_empty());
    }

    #[test]
    fn test_single_resource_gets_full_weight() {
        let cells = HeatmapAggregator::default().aggregate(&[point_resource(1, 37.77, -122.42)]);

        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].count, 1);
        assert!((cells[0].radius - 300.0).abs() < 1e-9);
        assert!((cells[0].opacity - 0.7).abs() < 1e-9);
        assert_eq!(cells[0].resource_ids, vec![1]);
    }

    #[test]
    fn test_incremental_mean_center() {
        let cells = HeatmapAggregator::default().aggregate(&[
            point_resource(1, 37.775, -122.415),
            point_resource(2, 37.777, -122.413),
            point_resource(3, 37.779, -122.417),
        ]);

        assert_eq!(cells.len(), 1);
        assert!((cells[0].center.latitude - 37.777).abs() < 1e-9);
        assert!((cells[0].center.longitude - -122.415).abs() < 1e-9);
    }

    #[test]
    fn test_relative_density() {
        let cells = HeatmapAggregator::default().aggregate(&[
            point_resource(1, 37.775, -122.419),
            point_resource(2, 37.776, -122.418),
            point_resource(3, 40.712, -74.006),
        ]);

        assert_eq!(cells.len(), 2);
        let dense = cells.iter().find(|c| c.count == 2).unwrap();
        let sparse = cells.iter().find(|c| c.count == 1).unwrap();
        assert!((dense.radius - 300.0).abs() < 1e-9);
        assert!((sparse.radius - 200.0).abs() < 1e-9);
        assert!((sparse.opacity - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_skips_missing_coordinates() {
        let mut missing = point_resource(2, 0.0, 0.0);
        missing.longitude = None;

        let cells = HeatmapAggregator::default()
            .aggregate(&[point_resource(1, 37.77, -122.42), missing]);

        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].resource_ids, vec![1]);
    }

    #[test]
    fn test_invalid_grid_size_falls_back() {
        assert_eq!(HeatmapAggregator::new(0.0).grid_size(), DEFAULT_GRID_SIZE);
        assert_eq!(HeatmapAggregator::new(-1.0).grid_size(), DEFAULT_GRID_SIZE);
        assert_eq!(HeatmapAggregator::new(f64::NAN).grid_size(), DEFAULT_GRID_SIZE);
        assert_eq!(HeatmapAggregator::new(0.5).grid_size(), 0.5);
    }

    #[test]
    fn test_fold_order_does_not_change_cells() {
        let resources = vec![
            point_resource(1, 37.775, -122.415),
            point_resource(2, 37.777, -122.413),
            point_resource(3, 37.779, -122.417),
            point_resource(4, 40.712, -74.006),
            point_resource(5, 40.713, -74.005),
        ];
        let mut reversed = resources.clone();
        reversed.reverse();

        let aggregator = HeatmapAggregator::default();
        let forward = aggregator.aggregate(&resources);
        let backward = aggregator.aggregate(&reversed);

        assert_eq!(forward.len(), backward.len());
        for (a, b) in forward.iter().zip(&backward) {
            assert_eq!(a.count, b.count);
            assert!((a.center.latitude - b.center.latitude).abs() < 1e-9);
            assert!((a.center.longitude - b.center.longitude).abs() < 1e-9);
            assert!((a.radius - b.radius).abs() < 1e-9);
            assert!((a.opacity - b.opacity).abs() < 1e-9);

            let mut ids_a = a.resource_ids.clone();
            let mut ids_b = b.resource_ids.clone();
            ids_a.sort();
            ids_b.sort();
            assert_eq!(ids_a, ids_b);
        }
    }

    #[test]
    fn test_exact_halves_round_up() {
        let aggregator = HeatmapAggregator::new(0.02);
        // 0.01 / 0.02 = 0.5 -> 1, -0.01 / 0.02 = -0.5 -> 0
        let key = aggregator.cell_key(&GeoPoint::new(0.01, -0.01));
        assert_eq!(key, CellKey { lat_index: 1, lon_index: 0 });

        let key = aggregator.cell_key(&GeoPoint::new(-0.031, 0.029));
        assert_eq!(key, CellKey { lat_index: -2, lon_index: 1 });
    }

    #[test]
    fn test_cell_key_rounds_to_nearest_multiple() {
        let aggregator = HeatmapAggregator::new(0.02);
        let key = aggregator.cell_key(&GeoPoint::new(37.775, -122.419));
        // 37.775 / 0.02 = 1888.75 -> 1889, -122.419 / 0.02 = -6120.95 -> -6121
        assert_eq!(key, CellKey { lat_index: 1889, lon_index: -6121 });
    }
}
