mod controller;
mod worker;

pub use controller::*;
pub use worker::*;

use std::collections::BTreeMap;
use std::sync::Arc;

use bevy::prelude::*;
use rstar::{AABB, RTree};

use crate::types::{BBox, PointFeature};

/// The bbox + zoom for which cluster data is known to be fresh. `zoom` is the
/// viewport zoom that triggered the refresh and feeds the 0.5 hysteresis;
/// `cluster_zoom` is the integer level the data was clustered at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClusterWindow {
    pub bbox: BBox,
    pub zoom: f64,
    pub cluster_zoom: i32,
}

/// The layer's data source: the full point set in a spatial index, plus the
/// cached cluster window. With clustering disabled the controller is inert
/// and the layer draws the raw points.
#[derive(Resource, Clone)]
pub struct ClusterSource {
    pub enabled: bool,
    /// Cluster merge radius in screen pixels at the cluster zoom.
    pub radius_px: f64,
    points: Arc<RTree<PointFeature>>,
    pub window: Option<ClusterWindow>,
}

impl Default for ClusterSource {
    fn default() -> Self {
        Self {
            enabled: false,
            radius_px: 48.0,
            points: Arc::new(RTree::new()),
            window: None,
        }
    }
}

impl ClusterSource {
    pub fn set_points(&mut self, features: Vec<PointFeature>) {
        self.points = Arc::new(RTree::bulk_load(features));
        self.window = None;
    }

    pub fn points(&self) -> Arc<RTree<PointFeature>> {
        self.points.clone()
    }

    pub fn len(&self) -> usize {
        self.points.size()
    }

    pub fn is_empty(&self) -> bool {
        self.points.size() == 0
    }
}

/// Grid reduction of the indexed points within `bbox` at `zoom`: every
/// occupied cell with more than one point collapses to a cluster feature
/// carrying a `point_count` property; singletons pass through unchanged.
/// Cell size derives from the merge radius the way tiled supercluster
/// implementations do it.
pub fn build_clusters(
    points: &RTree<PointFeature>,
    bbox: BBox,
    zoom: i32,
    radius_px: f64,
    tile_quality: f64,
) -> Vec<PointFeature> {
    let cell = (radius_px / tile_quality) * 360.0 / 2.0_f64.powi(zoom.max(0));
    let envelope = AABB::from_corners([bbox[0], bbox[1]], [bbox[2], bbox[3]]);

    let mut bins: BTreeMap<(i64, i64), Vec<&PointFeature>> = BTreeMap::new();
    for feature in points.locate_in_envelope_intersecting(&envelope) {
        let key = (
            (feature.position.x() / cell).floor() as i64,
            (feature.position.y() / cell).floor() as i64,
        );
        bins.entry(key).or_default().push(feature);
    }

    let mut out = Vec::with_capacity(bins.len());
    for ((cx, cy), members) in bins {
        if members.len() == 1 {
            out.push(members[0].clone());
            continue;
        }
        let n = members.len() as f64;
        let lon = members.iter().map(|f| f.position.x()).sum::<f64>() / n;
        let lat = members.iter().map(|f| f.position.y()).sum::<f64>() / n;
        let mut cluster = PointFeature::new(format!("cluster-{cx}-{cy}"), lon, lat);
        cluster.properties = serde_json::json!({
            "cluster": true,
            "point_count": members.len(),
        });
        out.push(cluster);
    }
    out
}

pub struct ClusterPlugin;

impl Plugin for ClusterPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ClusterSource>()
            .add_plugins(ClusterWorkerPlugin)
            .add_systems(Update, check_cluster_window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(points: &[(f64, f64)]) -> RTree<PointFeature> {
        RTree::bulk_load(
            points
                .iter()
                .enumerate()
                .map(|(i, (lon, lat))| PointFeature::new(format!("p{i}"), *lon, *lat))
                .collect(),
        )
    }

    const WORLD: BBox = [-180.0, -90.0, 180.0, 90.0];

    #[test]
    fn dense_cell_collapses_to_one_cluster() {
        let tree = tree(&[(0.01, 0.01), (0.02, 0.02), (0.03, 0.01)]);
        let clusters = build_clusters(&tree, WORLD, 4, 48.0, 256.0);
        assert_eq!(clusters.len(), 1);
        let cluster = &clusters[0];
        assert_eq!(
            cluster.properties.get("point_count").and_then(|v| v.as_u64()),
            Some(3)
        );
        assert!((cluster.position.x() - 0.02).abs() < 1e-9);
    }

    #[test]
    fn distant_points_pass_through() {
        let tree = tree(&[(0.0, 0.0), (90.0, 40.0)]);
        let clusters = build_clusters(&tree, WORLD, 4, 48.0, 256.0);
        assert_eq!(clusters.len(), 2);
        assert!(clusters.iter().all(|f| f.properties.get("cluster").is_none()));
    }

    #[test]
    fn points_outside_the_bbox_are_excluded() {
        let tree = tree(&[(0.0, 0.0), (90.0, 40.0)]);
        let clusters = build_clusters(&tree, [-10.0, -10.0, 10.0, 10.0], 4, 48.0, 256.0);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].position.x(), 0.0);
    }

    #[test]
    fn higher_zoom_splits_clusters() {
        let tree = tree(&[(0.01, 0.01), (0.5, 0.5)]);
        let coarse = build_clusters(&tree, WORLD, 1, 48.0, 256.0);
        let fine = build_clusters(&tree, WORLD, 10, 48.0, 256.0);
        assert_eq!(coarse.len(), 1);
        assert_eq!(fine.len(), 2);
    }

    #[test]
    fn clustering_is_deterministic() {
        let tree = tree(&[(0.01, 0.01), (0.02, 0.02), (5.0, 5.0), (-3.0, 2.0)]);
        let a = build_clusters(&tree, WORLD, 6, 48.0, 256.0);
        let b = build_clusters(&tree, WORLD, 6, 48.0, 256.0);
        assert_eq!(a, b);
    }
}
