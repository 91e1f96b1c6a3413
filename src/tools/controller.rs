//! Two-point surface measurement.
//!
//! [`MeasurementController`] owns the selected points, the visuals that
//! mirror them and the distance readout. It never talks to the renderer:
//! hit testing goes through a [`RayIntersector`], and the visuals are plain
//! data that `sync_measurement_visuals` mirrors into scene entities.

use bevy::prelude::*;

use super::ndc::screen_to_ndc;

/// Points per measurement cycle.
pub const MAX_POINTS: usize = 2;

/// A surface point struck by a pick ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    /// World-space intersection point
    pub point: Vec3,
    /// Distance from the ray origin
    pub distance: f32,
    /// Scene object that owns the intersected geometry
    pub entity: Entity,
}

/// Which scene content a ray cast may hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickFilter {
    /// Everything in the scene, measurement visuals included
    All,
    /// Everything except measurement markers and segments
    SkipMeasurementVisuals,
}

/// Casts rays from the current camera into the scene.
pub trait RayIntersector {
    /// Hits along the ray through `ndc`, sorted nearest first.
    fn intersect(&mut self, ndc: Vec2, filter: PickFilter) -> Vec<SurfaceHit>;
}

/// Ordered list of 0, 1 or 2 selected world-space points.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementState {
    points: Vec<Vec3>,
}

impl MeasurementState {
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.points.len() == MAX_POINTS
    }

    /// Euclidean distance between the two points of a complete pair.
    pub fn distance(&self) -> Option<f32> {
        match self.points.as_slice() {
            [a, b] => Some(a.distance(*b)),
            _ => None,
        }
    }

    fn push(&mut self, point: Vec3) {
        debug_assert!(self.points.len() < MAX_POINTS);
        self.points.push(point);
    }

    fn clear(&mut self) {
        self.points.clear();
    }
}

/// One renderable element of the measurement overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarkerVisual {
    Point(Vec3),
    Segment { start: Vec3, end: Vec3 },
}

/// Visual elements mirroring a [`MeasurementState`].
///
/// `generation` changes on every mutation so the scene mirror can tell when
/// it has to rebuild.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerGroup {
    visuals: Vec<MarkerVisual>,
    generation: u64,
}

impl MarkerGroup {
    pub fn visuals(&self) -> &[MarkerVisual] {
        &self.visuals
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn marker_count(&self) -> usize {
        self.visuals
            .iter()
            .filter(|v| matches!(v, MarkerVisual::Point(_)))
            .count()
    }

    pub fn segment(&self) -> Option<(Vec3, Vec3)> {
        self.visuals.iter().find_map(|v| match v {
            MarkerVisual::Segment { start, end } => Some((*start, *end)),
            MarkerVisual::Point(_) => None,
        })
    }

    fn push(&mut self, visual: MarkerVisual) {
        self.visuals.push(visual);
        self.generation += 1;
    }

    fn clear(&mut self) {
        self.visuals.clear();
        self.generation += 1;
    }
}

/// Distance of the last completed measurement and its display text.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceReadout {
    distance: f32,
    text: String,
}

impl DistanceReadout {
    pub fn new(distance: f32) -> Self {
        Self {
            distance,
            text: format_distance(distance),
        }
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Readout text: always two decimals, suffixed with world units.
pub fn format_distance(distance: f32) -> String {
    format!("Distance: {:.2} units", distance)
}

/// Result of a single click.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClickOutcome {
    /// Nothing was hit; no state changed
    Missed,
    /// A point was added and the cycle is not yet complete
    Placed { point: Vec3 },
    /// The second point was added and a distance computed
    Completed { point: Vec3, distance: f32 },
}

/// Picking and measurement state for one viewport.
#[derive(Resource, Debug, Clone)]
pub struct MeasurementController {
    state: MeasurementState,
    markers: MarkerGroup,
    readout: Option<DistanceReadout>,
    /// Whether measurement visuals are valid targets mid-cycle
    pick_markers: bool,
}

impl Default for MeasurementController {
    fn default() -> Self {
        Self::new(true)
    }
}

impl MeasurementController {
    pub fn new(pick_markers: bool) -> Self {
        Self {
            state: MeasurementState::default(),
            markers: MarkerGroup::default(),
            readout: None,
            pick_markers,
        }
    }

    pub fn state(&self) -> &MeasurementState {
        &self.state
    }

    pub fn markers(&self) -> &MarkerGroup {
        &self.markers
    }

    pub fn readout(&self) -> Option<&DistanceReadout> {
        self.readout.as_ref()
    }

    /// Handle a click at `screen` (window pixels) in a viewport of size
    /// `viewport`.
    ///
    /// A click after a completed pair starts a new cycle. The hit test runs
    /// before anything is mutated, so a miss leaves every piece of state
    /// untouched.
    pub fn handle_click(
        &mut self,
        screen: Vec2,
        viewport: Vec2,
        intersector: &mut impl RayIntersector,
    ) -> ClickOutcome {
        let ndc = screen_to_ndc(screen, viewport);
        if !ndc.is_finite() {
            return ClickOutcome::Missed;
        }

        // Visuals of a completed pair are cleared before the new point lands,
        // so they must not be hit by this click either.
        let filter = if self.state.is_complete() || !self.pick_markers {
            PickFilter::SkipMeasurementVisuals
        } else {
            PickFilter::All
        };

        let Some(hit) = intersector.intersect(ndc, filter).into_iter().next() else {
            return ClickOutcome::Missed;
        };
        if !hit.point.is_finite() {
            return ClickOutcome::Missed;
        }

        if self.state.is_complete() {
            self.state.clear();
            self.markers.clear();
        }

        self.state.push(hit.point);
        self.markers.push(MarkerVisual::Point(hit.point));

        let Some(distance) = self.state.distance() else {
            return ClickOutcome::Placed { point: hit.point };
        };

        let [start, end] = [self.state.points()[0], self.state.points()[1]];
        self.markers.push(MarkerVisual::Segment { start, end });
        self.readout = Some(DistanceReadout::new(distance));

        ClickOutcome::Completed {
            point: hit.point,
            distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Vec2 = Vec2::new(800.0, 600.0);
    const CENTER: Vec2 = Vec2::new(400.0, 300.0);

    /// Returns queued hits in order; an empty slot is a miss.
    #[derive(Default)]
    struct ScriptedIntersector {
        script: Vec<Option<Vec3>>,
        calls: Vec<(Vec2, PickFilter)>,
    }

    impl ScriptedIntersector {
        fn hits(points: &[Option<Vec3>]) -> Self {
            Self {
                script: points.iter().rev().copied().collect(),
                calls: Vec::new(),
            }
        }
    }

    impl RayIntersector for ScriptedIntersector {
        fn intersect(&mut self, ndc: Vec2, filter: PickFilter) -> Vec<SurfaceHit> {
            self.calls.push((ndc, filter));
            match self.script.pop().flatten() {
                Some(point) => vec![
                    SurfaceHit {
                        point,
                        distance: 1.0,
                        entity: Entity::PLACEHOLDER,
                    },
                    SurfaceHit {
                        point: point + Vec3::splat(100.0),
                        distance: 2.0,
                        entity: Entity::PLACEHOLDER,
                    },
                ],
                None => Vec::new(),
            }
        }
    }

    fn click(controller: &mut MeasurementController, ray: &mut ScriptedIntersector) -> ClickOutcome {
        controller.handle_click(CENTER, VIEWPORT, ray)
    }

    #[test]
    fn starts_empty() {
        let controller = MeasurementController::default();
        assert!(controller.state().is_empty());
        assert!(controller.markers().visuals().is_empty());
        assert!(controller.readout().is_none());
    }

    #[test]
    fn miss_changes_nothing() {
        let mut controller = MeasurementController::default();
        let mut ray = ScriptedIntersector::hits(&[Some(Vec3::ZERO), None]);
        click(&mut controller, &mut ray);

        let before = controller.clone();
        assert_eq!(click(&mut controller, &mut ray), ClickOutcome::Missed);
        assert_eq!(controller.state(), before.state());
        assert_eq!(controller.markers(), before.markers());
        assert_eq!(controller.readout(), before.readout());
    }

    #[test]
    fn miss_after_completed_pair_keeps_pair_and_readout() {
        let mut controller = MeasurementController::default();
        let mut ray = ScriptedIntersector::hits(&[
            Some(Vec3::ZERO),
            Some(Vec3::new(3.0, 4.0, 0.0)),
            None,
        ]);
        click(&mut controller, &mut ray);
        click(&mut controller, &mut ray);

        let before = controller.clone();
        assert_eq!(click(&mut controller, &mut ray), ClickOutcome::Missed);
        assert_eq!(controller.state().len(), 2);
        assert_eq!(controller.markers(), before.markers());
        assert_eq!(controller.readout().map(|r| r.text()), Some("Distance: 5.00 units"));
    }

    #[test]
    fn cycle_length_follows_one_two_one_two() {
        let mut controller = MeasurementController::default();
        let points: Vec<Option<Vec3>> = (0..7).map(|i| Some(Vec3::splat(i as f32))).collect();
        let mut ray = ScriptedIntersector::hits(&points);

        let lengths: Vec<usize> = (0..7)
            .map(|_| {
                click(&mut controller, &mut ray);
                controller.state().len()
            })
            .collect();
        assert_eq!(lengths, vec![1, 2, 1, 2, 1, 2, 1]);
    }

    #[test]
    fn marker_count_matches_point_count_after_every_click() {
        let mut controller = MeasurementController::default();
        let mut ray = ScriptedIntersector::hits(&[
            Some(Vec3::X),
            None,
            Some(Vec3::Y),
            Some(Vec3::Z),
            None,
            Some(Vec3::ONE),
        ]);
        for _ in 0..6 {
            click(&mut controller, &mut ray);
            assert_eq!(controller.markers().marker_count(), controller.state().len());
        }
    }

    #[test]
    fn completed_pair_reports_euclidean_distance() {
        let mut controller = MeasurementController::default();
        let mut ray = ScriptedIntersector::hits(&[Some(Vec3::ZERO), Some(Vec3::new(3.0, 4.0, 0.0))]);

        assert_eq!(
            click(&mut controller, &mut ray),
            ClickOutcome::Placed { point: Vec3::ZERO }
        );
        assert_eq!(
            click(&mut controller, &mut ray),
            ClickOutcome::Completed {
                point: Vec3::new(3.0, 4.0, 0.0),
                distance: 5.0
            }
        );

        let readout = controller.readout().unwrap();
        assert_eq!(readout.distance(), 5.0);
        assert_eq!(readout.text(), "Distance: 5.00 units");
        assert_eq!(
            controller.markers().segment(),
            Some((Vec3::ZERO, Vec3::new(3.0, 4.0, 0.0)))
        );
    }

    #[test]
    fn uses_only_the_nearest_hit() {
        let mut controller = MeasurementController::default();
        let mut ray = ScriptedIntersector::hits(&[Some(Vec3::new(1.0, 2.0, 3.0))]);
        click(&mut controller, &mut ray);
        assert_eq!(controller.state().points(), &[Vec3::new(1.0, 2.0, 3.0)]);
    }

    #[test]
    fn third_hit_restarts_cycle_with_single_marker() {
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 1.0, 0.0);
        let c = Vec3::new(0.0, 0.0, 1.0);
        let mut controller = MeasurementController::default();
        let mut ray = ScriptedIntersector::hits(&[Some(a), Some(b), Some(c)]);
        click(&mut controller, &mut ray);
        click(&mut controller, &mut ray);

        assert_eq!(click(&mut controller, &mut ray), ClickOutcome::Placed { point: c });
        assert_eq!(controller.state().points(), &[c]);
        assert_eq!(controller.markers().visuals(), &[MarkerVisual::Point(c)]);
        assert!(controller.markers().segment().is_none());
    }

    #[test]
    fn readout_survives_reset_and_is_overwritten_on_next_pair() {
        let mut controller = MeasurementController::default();
        let mut ray = ScriptedIntersector::hits(&[
            Some(Vec3::ZERO),
            Some(Vec3::new(0.1, 0.0, 0.0)),
            Some(Vec3::ZERO),
            Some(Vec3::new(0.0, 123.456, 0.0)),
        ]);
        click(&mut controller, &mut ray);
        click(&mut controller, &mut ray);
        assert_eq!(controller.readout().unwrap().text(), "Distance: 0.10 units");

        click(&mut controller, &mut ray);
        assert_eq!(controller.readout().unwrap().text(), "Distance: 0.10 units");

        click(&mut controller, &mut ray);
        assert_eq!(controller.readout().unwrap().text(), "Distance: 123.46 units");
    }

    #[test]
    fn no_segment_before_completion() {
        let mut controller = MeasurementController::default();
        let mut ray = ScriptedIntersector::hits(&[Some(Vec3::ZERO), None, Some(Vec3::X), Some(Vec3::Y)]);
        for _ in 0..4 {
            click(&mut controller, &mut ray);
            if controller.state().len() < MAX_POINTS {
                assert!(controller.markers().segment().is_none());
            }
        }
    }

    #[test]
    fn visuals_are_skipped_when_pair_is_complete() {
        let mut controller = MeasurementController::default();
        let mut ray = ScriptedIntersector::hits(&[Some(Vec3::ZERO), Some(Vec3::X), Some(Vec3::Y)]);
        for _ in 0..3 {
            click(&mut controller, &mut ray);
        }
        let filters: Vec<PickFilter> = ray.calls.iter().map(|(_, f)| *f).collect();
        assert_eq!(
            filters,
            vec![PickFilter::All, PickFilter::All, PickFilter::SkipMeasurementVisuals]
        );
    }

    #[test]
    fn visuals_always_skipped_when_marker_picking_disabled() {
        let mut controller = MeasurementController::new(false);
        let mut ray = ScriptedIntersector::hits(&[Some(Vec3::ZERO), Some(Vec3::X)]);
        click(&mut controller, &mut ray);
        click(&mut controller, &mut ray);
        assert!(ray
            .calls
            .iter()
            .all(|(_, f)| *f == PickFilter::SkipMeasurementVisuals));
    }

    #[test]
    fn click_position_is_passed_as_ndc() {
        let mut controller = MeasurementController::default();
        let mut ray = ScriptedIntersector::hits(&[None]);
        controller.handle_click(Vec2::new(0.0, 0.0), VIEWPORT, &mut ray);
        assert_eq!(ray.calls[0].0, Vec2::new(-1.0, 1.0));
    }

    #[test]
    fn degenerate_viewport_is_a_miss_without_ray_cast() {
        let mut controller = MeasurementController::default();
        let mut ray = ScriptedIntersector::hits(&[Some(Vec3::ZERO)]);
        let outcome = controller.handle_click(CENTER, Vec2::ZERO, &mut ray);
        assert_eq!(outcome, ClickOutcome::Missed);
        assert!(ray.calls.is_empty());
        assert!(controller.state().is_empty());
    }

    #[test]
    fn generation_changes_on_every_visual_mutation() {
        let mut controller = MeasurementController::default();
        let mut ray = ScriptedIntersector::hits(&[Some(Vec3::ZERO), None, Some(Vec3::X)]);
        let g0 = controller.markers().generation();
        click(&mut controller, &mut ray);
        let g1 = controller.markers().generation();
        click(&mut controller, &mut ray);
        let g2 = controller.markers().generation();
        click(&mut controller, &mut ray);
        let g3 = controller.markers().generation();
        assert!(g1 > g0);
        assert_eq!(g2, g1);
        assert!(g3 > g2);
    }

    #[test]
    fn format_distance_always_has_two_decimals() {
        assert_eq!(format_distance(0.1), "Distance: 0.10 units");
        assert_eq!(format_distance(123.456), "Distance: 123.46 units");
        assert_eq!(format_distance(12.0), "Distance: 12.00 units");
        assert_eq!(format_distance(0.0), "Distance: 0.00 units");
    }
}
