use bevy::picking::mesh_picking::ray_cast::{MeshRayCast, MeshRayCastSettings};
use bevy::prelude::*;

use super::controller::{PickFilter, RayIntersector, SurfaceHit};
use super::ndc::ndc_to_screen;

/// [`RayIntersector`] backed by Bevy mesh ray casting from the viewer camera.
///
/// Every mesh in the scene is a candidate: the loaded model, map tiles and
/// measurement visuals (unless the filter excludes them).
pub struct SceneRayIntersector<'a, 'w, 's> {
    pub camera: &'a Camera,
    pub camera_transform: &'a GlobalTransform,
    pub viewport: Vec2,
    pub ray_cast: &'a mut MeshRayCast<'w, 's>,
    /// Entities currently rendering measurement markers and segments
    pub measurement_visuals: &'a [Entity],
}

impl RayIntersector for SceneRayIntersector<'_, '_, '_> {
    fn intersect(&mut self, ndc: Vec2, filter: PickFilter) -> Vec<SurfaceHit> {
        let cursor = ndc_to_screen(ndc, self.viewport);
        let Ok(ray) = self.camera.viewport_to_world(self.camera_transform, cursor) else {
            return Vec::new();
        };
        cast_surface_ray(self.ray_cast, ray, filter, self.measurement_visuals)
    }
}

/// Every mesh hit along `ray`, nearest first. Entities in
/// `measurement_visuals` are dropped when `filter` asks for it.
pub fn cast_surface_ray(
    ray_cast: &mut MeshRayCast,
    ray: Ray3d,
    filter: PickFilter,
    measurement_visuals: &[Entity],
) -> Vec<SurfaceHit> {
    let accept = |entity: Entity| match filter {
        PickFilter::All => true,
        PickFilter::SkipMeasurementVisuals => !measurement_visuals.contains(&entity),
    };
    // Collect every hit along the ray rather than stopping at the first.
    let never_stop = |_: Entity| false;
    let settings = MeshRayCastSettings::default()
        .with_filter(&accept)
        .with_early_exit_test(&never_stop);

    ray_cast
        .cast_ray(ray, &settings)
        .iter()
        .map(|(entity, hit)| SurfaceHit {
            point: hit.point,
            distance: hit.distance,
            entity: *entity,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::measurement::MeasurementVisual;
    use bevy::camera::primitives::MeshAabb;
    use bevy::camera::visibility::SetViewVisibility;
    use bevy::ecs::system::RunSystemOnce;

    /// Spawn a ray-castable mesh the way the renderer would leave it:
    /// bounds computed and visible in a view.
    fn spawn_mesh(app: &mut App, mesh: Mesh, translation: Vec3) -> Entity {
        let aabb = mesh.compute_aabb().unwrap();
        let handle = app.world_mut().resource_mut::<Assets<Mesh>>().add(mesh);
        let transform = Transform::from_translation(translation);
        let entity = app
            .world_mut()
            .spawn((
                Mesh3d(handle),
                transform,
                GlobalTransform::from(transform),
                aabb,
                InheritedVisibility::VISIBLE,
                ViewVisibility::default(),
            ))
            .id();
        app.world_mut()
            .get_mut::<ViewVisibility>(entity)
            .unwrap()
            .set_visible();
        entity
    }

    /// A model slab at the origin with a marker sphere between it and the
    /// ray origin.
    fn marker_in_front_of_model() -> (App, Entity, Entity) {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins).init_resource::<Assets<Mesh>>();

        let model = spawn_mesh(&mut app, Cuboid::new(4.0, 4.0, 1.0).into(), Vec3::ZERO);
        let marker = spawn_mesh(&mut app, Sphere::new(0.5).into(), Vec3::new(0.0, 0.0, 3.0));
        app.world_mut().entity_mut(marker).insert(MeasurementVisual);
        (app, model, marker)
    }

    fn cast_from_front(app: &mut App, filter: PickFilter) -> Vec<SurfaceHit> {
        let ray = Ray3d::new(Vec3::new(0.0, 0.0, 10.0), Dir3::NEG_Z);
        app.world_mut()
            .run_system_once(
                move |mut ray_cast: MeshRayCast, visuals: Query<Entity, With<MeasurementVisual>>| {
                    let visuals: Vec<Entity> = visuals.iter().collect();
                    cast_surface_ray(&mut ray_cast, ray, filter, &visuals)
                },
            )
            .unwrap()
    }

    #[test]
    fn all_filter_returns_every_hit_nearest_first() {
        let (mut app, model, marker) = marker_in_front_of_model();
        let hits = cast_from_front(&mut app, PickFilter::All);

        let entities: Vec<Entity> = hits.iter().map(|hit| hit.entity).collect();
        assert_eq!(entities, vec![marker, model]);
        assert!(hits[0].distance < hits[1].distance);
        // Sphere tessellation keeps the surface slightly inside the radius
        assert!((hits[0].point.z - 3.5).abs() < 0.05);
        assert!((hits[1].point.z - 0.5).abs() < 1e-3);
    }

    #[test]
    fn skipping_visuals_hits_only_the_model() {
        let (mut app, model, _) = marker_in_front_of_model();
        let hits = cast_from_front(&mut app, PickFilter::SkipMeasurementVisuals);

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entity, model);
        assert!((hits[0].point.z - 0.5).abs() < 1e-3);
    }

    #[test]
    fn ray_past_everything_misses() {
        let (mut app, _, _) = marker_in_front_of_model();
        let ray = Ray3d::new(Vec3::new(50.0, 0.0, 10.0), Dir3::NEG_Z);
        let hits = app
            .world_mut()
            .run_system_once(move |mut ray_cast: MeshRayCast| {
                cast_surface_ray(&mut ray_cast, ray, PickFilter::All, &[])
            })
            .unwrap();
        assert!(hits.is_empty());
    }
}
