use bevy::prelude::*;

use super::{ClusterSource, ClusterWindow, ClusterWorker};
use crate::camera::{DragEndEvent, MapTransform, ViewportState, ZoomChangedEvent};
use crate::types::BBox;

const ZOOM_HYSTERESIS: f64 = 0.5;

/// Integer level cluster data is requested at for a viewport zoom.
pub fn cluster_zoom_for(zoom: f64) -> i32 {
    (zoom - 1.0).floor() as i32
}

/// Half the larger viewport dimension; the padding added on every side of a
/// refresh bbox so small pans stay inside the cached window.
pub fn bbox_step(bbox: BBox) -> f64 {
    f64::max(bbox[2] - bbox[0], bbox[3] - bbox[1]) / 2.0
}

pub fn padded_bbox(bbox: BBox) -> BBox {
    let step = bbox_step(bbox);
    [
        bbox[0] - step,
        bbox[1] - step,
        bbox[2] + step,
        bbox[3] + step,
    ]
}

/// Cached-window validity: the window must strictly contain the viewport on
/// all four bounds and be within the zoom hysteresis. Strict comparison means
/// a window equal to the viewport is already stale.
pub fn window_covers(window: &ClusterWindow, viewport: BBox, zoom: f64) -> bool {
    window.bbox[0] < viewport[0]
        && window.bbox[1] < viewport[1]
        && window.bbox[2] > viewport[2]
        && window.bbox[3] > viewport[3]
        && (zoom - window.zoom).abs() < ZOOM_HYSTERESIS
}

/// Whether a refresh is due for this viewport, and at what window. `None`
/// when clustering is disabled or the cached window still covers the view;
/// otherwise the padded bbox and `floor(zoom - 1)` level to re-cluster at.
pub fn plan_refresh(source: &ClusterSource, viewport: BBox, zoom: f64) -> Option<ClusterWindow> {
    if !source.enabled {
        return None;
    }
    if let Some(window) = &source.window {
        if window_covers(window, viewport, zoom) {
            return None;
        }
    }
    Some(ClusterWindow {
        bbox: padded_bbox(viewport),
        zoom,
        cluster_zoom: cluster_zoom_for(zoom),
    })
}

/// The re-clustering check, run on every zoom change and drag end. Stale
/// window → queue a refresh over the padded bbox and remember the new
/// window; the worker delivers results asynchronously and newer requests
/// supersede older ones.
pub fn check_cluster_window(
    mut zoom_events: EventReader<ZoomChangedEvent>,
    mut drag_events: EventReader<DragEndEvent>,
    viewport: Res<ViewportState>,
    map: Res<MapTransform>,
    mut source: ResMut<ClusterSource>,
    worker: Res<ClusterWorker>,
) {
    if zoom_events.is_empty() && drag_events.is_empty() {
        return;
    }
    zoom_events.clear();
    drag_events.clear();

    let Some(window) = plan_refresh(&source, viewport.bounds, viewport.zoom) else {
        return;
    };
    worker.queue_request(
        source.points(),
        window.bbox,
        window.cluster_zoom,
        source.radius_px,
        map.tile_quality,
    );
    info!("re-clustering at z{} over {:?}", window.cluster_zoom, window.bbox);
    source.window = Some(window);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(bbox: BBox, zoom: f64) -> ClusterWindow {
        ClusterWindow {
            bbox,
            zoom,
            cluster_zoom: cluster_zoom_for(zoom),
        }
    }

    #[test]
    fn contained_viewport_within_hysteresis_is_stable() {
        let cached = window([-1.0, -1.0, 11.0, 11.0], 5.1);
        assert!(window_covers(&cached, [0.0, 0.0, 10.0, 10.0], 5.0));
    }

    #[test]
    fn north_overflow_invalidates_the_window() {
        // Viewport [0,0,10,10] at zoom 5 against a cached window whose north
        // bound sits below the viewport's north edge.
        let cached = window([-1.0, -1.0, 11.0, 9.0], 5.0);
        let viewport = [0.0, 0.0, 10.0, 10.0];
        assert!(!window_covers(&cached, viewport, 5.0));

        let padded = padded_bbox(viewport);
        assert_eq!(padded, [-5.0, -5.0, 15.0, 15.0]);
        assert_eq!(cluster_zoom_for(5.0), 4);
    }

    #[test]
    fn east_overflow_refreshes_with_step_margin() {
        let cached = window([-1.0, -1.0, 11.0, 11.0], 5.0);
        let viewport = [2.0, 0.0, 12.0, 10.0];
        assert!(!window_covers(&cached, viewport, 5.0));

        let padded = padded_bbox(viewport);
        let step = bbox_step(viewport);
        assert!(padded[2] >= viewport[2] + step);
    }

    #[test]
    fn equal_bounds_fail_the_strict_containment() {
        // Identical bbox, zoom difference inside the hysteresis: strict `<`
        // still fails, so a refresh triggers.
        let cached = window([0.0, 0.0, 10.0, 10.0], 5.3);
        assert!(!window_covers(&cached, [0.0, 0.0, 10.0, 10.0], 5.0));
    }

    #[test]
    fn zoom_hysteresis_bounds_are_half_a_level() {
        let cached = window([-5.0, -5.0, 15.0, 15.0], 5.0);
        let viewport = [0.0, 0.0, 10.0, 10.0];
        assert!(window_covers(&cached, viewport, 5.4));
        assert!(!window_covers(&cached, viewport, 5.6));
        assert!(!window_covers(&cached, viewport, 4.4));
    }

    #[test]
    fn cluster_zoom_floors_below_current() {
        assert_eq!(cluster_zoom_for(5.0), 4);
        assert_eq!(cluster_zoom_for(5.9), 4);
        assert_eq!(cluster_zoom_for(6.0), 5);
        assert_eq!(cluster_zoom_for(0.4), -1);
    }

    #[test]
    fn disabled_clustering_plans_nothing() {
        let mut source = ClusterSource::default();
        source.enabled = false;
        source.window = Some(window([0.0, 0.0, 1.0, 1.0], 5.0));
        // A viewport well outside the cached window would normally refresh.
        assert!(plan_refresh(&source, [50.0, 50.0, 60.0, 60.0], 8.0).is_none());
        assert_eq!(source.window, Some(window([0.0, 0.0, 1.0, 1.0], 5.0)));
    }

    #[test]
    fn stale_window_plans_a_padded_refresh() {
        let mut source = ClusterSource::default();
        source.enabled = true;
        source.window = Some(window([-1.0, -1.0, 11.0, 9.0], 5.0));
        let planned = plan_refresh(&source, [0.0, 0.0, 10.0, 10.0], 5.0).unwrap();
        assert_eq!(planned.bbox, [-5.0, -5.0, 15.0, 15.0]);
        assert_eq!(planned.cluster_zoom, 4);

        source.window = Some(planned);
        assert!(plan_refresh(&source, [0.0, 0.0, 10.0, 10.0], 5.0).is_none());
    }

    #[test]
    fn padding_uses_the_larger_dimension() {
        // Wide viewport: step comes from the width.
        let padded = padded_bbox([0.0, 0.0, 20.0, 10.0]);
        assert_eq!(padded, [-10.0, -10.0, 30.0, 20.0]);
    }
}
