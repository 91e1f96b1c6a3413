use bevy::picking::mesh_picking::ray_cast::MeshRayCast;
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};

use super::controller::{ClickOutcome, MarkerVisual, MeasurementController};
use super::raycast::SceneRayIntersector;
use crate::camera::ViewerCamera;
use crate::config::AppConfig;
use crate::input::SurfaceClick;

/// Screen position of the distance overlay (logical pixels from top-left)
const READOUT_POS: egui::Pos2 = egui::pos2(10.0, 60.0);
/// Font size of the distance overlay
const READOUT_FONT_SIZE: f32 = 18.0;

/// Root entity of the measurement visuals. Lives for the whole session;
/// only its children come and go.
#[derive(Component)]
pub struct MeasurementGroup;

/// Marker or segment entity mirrored from the controller's marker group.
#[derive(Component)]
pub struct MeasurementVisual;

/// Shared meshes and materials for measurement visuals.
#[derive(Resource)]
pub struct MeasurementAssets {
    pub point_mesh: Handle<Mesh>,
    /// Unit-height cylinder, scaled along Y to the segment length
    pub segment_mesh: Handle<Mesh>,
    pub point_material: Handle<StandardMaterial>,
    pub segment_material: Handle<StandardMaterial>,
}

/// Startup system: creates the controller, the visual group root and the
/// shared marker assets.
pub fn setup_measurement(
    mut commands: Commands,
    config: Res<AppConfig>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let settings = &config.measurement;

    commands.insert_resource(MeasurementController::new(settings.pick_markers));
    commands.insert_resource(MeasurementAssets {
        point_mesh: meshes.add(Sphere::new(settings.marker_radius)),
        segment_mesh: meshes.add(Cylinder::new(settings.segment_radius, 1.0)),
        point_material: materials.add(StandardMaterial {
            base_color: Color::srgb(1.0, 0.0, 0.0),
            unlit: true,
            ..default()
        }),
        segment_material: materials.add(StandardMaterial {
            base_color: Color::srgb(0.0, 0.0, 1.0),
            unlit: true,
            ..default()
        }),
    });
    commands.spawn((
        Name::new("Measurement"),
        Transform::default(),
        Visibility::default(),
        MeasurementGroup,
    ));
}

/// Feed surface clicks into the controller, ray casting from the viewer camera.
pub fn handle_measurement_clicks(
    mut clicks: MessageReader<SurfaceClick>,
    camera_query: Query<(&Camera, &GlobalTransform), With<ViewerCamera>>,
    mut ray_cast: MeshRayCast,
    visual_query: Query<Entity, With<MeasurementVisual>>,
    mut controller: ResMut<MeasurementController>,
) {
    if clicks.is_empty() {
        return;
    }
    let Ok((camera, camera_transform)) = camera_query.single() else {
        clicks.clear();
        return;
    };
    let measurement_visuals: Vec<Entity> = visual_query.iter().collect();

    for click in clicks.read() {
        let mut intersector = SceneRayIntersector {
            camera,
            camera_transform,
            viewport: click.viewport,
            ray_cast: &mut ray_cast,
            measurement_visuals: &measurement_visuals,
        };

        match controller.handle_click(click.position, click.viewport, &mut intersector) {
            ClickOutcome::Missed => debug!("Measurement click at {} hit nothing", click.position),
            ClickOutcome::Placed { point } => {
                info!("Measurement start: ({:.3}, {:.3}, {:.3})", point.x, point.y, point.z);
            }
            ClickOutcome::Completed { point, distance } => {
                info!("Measurement end: ({:.3}, {:.3}, {:.3})", point.x, point.y, point.z);
                info!("Distance: {:.2} units", distance);
            }
        }
    }
}

/// Mirror the controller's marker group into child entities of the
/// [`MeasurementGroup`] root. Rebuilds only when the group changed.
pub fn sync_measurement_visuals(
    mut commands: Commands,
    controller: Res<MeasurementController>,
    assets: Res<MeasurementAssets>,
    group_query: Query<Entity, With<MeasurementGroup>>,
    mut synced_generation: Local<u64>,
) {
    let markers = controller.markers();
    if markers.generation() == *synced_generation {
        return;
    }
    let Ok(group) = group_query.single() else {
        return;
    };
    *synced_generation = markers.generation();

    commands.entity(group).despawn_related::<Children>();
    commands.entity(group).with_children(|parent| {
        for visual in markers.visuals() {
            match *visual {
                MarkerVisual::Point(point) => {
                    parent.spawn((
                        Name::new("Measurement Point"),
                        Mesh3d(assets.point_mesh.clone()),
                        MeshMaterial3d(assets.point_material.clone()),
                        Transform::from_translation(point),
                        MeasurementVisual,
                    ));
                }
                MarkerVisual::Segment { start, end } => {
                    parent.spawn((
                        Name::new("Measurement Segment"),
                        Mesh3d(assets.segment_mesh.clone()),
                        MeshMaterial3d(assets.segment_material.clone()),
                        segment_transform(start, end),
                        MeasurementVisual,
                    ));
                }
            }
        }
    });
}

/// Transform that stretches a unit-height, Y-aligned cylinder from `start`
/// to `end`.
pub fn segment_transform(start: Vec3, end: Vec3) -> Transform {
    let delta = end - start;
    let rotation = Dir3::new(delta)
        .map(|dir| Quat::from_rotation_arc(Vec3::Y, *dir))
        .unwrap_or(Quat::IDENTITY);

    Transform {
        translation: (start + end) * 0.5,
        rotation,
        scale: Vec3::new(1.0, delta.length(), 1.0),
    }
}

/// Fixed-position overlay showing the latest distance, once one exists.
pub fn render_distance_readout(
    mut contexts: EguiContexts,
    controller: Res<MeasurementController>,
) {
    let Some(readout) = controller.readout() else {
        return;
    };
    let Ok(ctx) = contexts.ctx_mut() else {
        return;
    };

    egui::Area::new(egui::Id::new("distance_readout"))
        .fixed_pos(READOUT_POS)
        .order(egui::Order::Foreground)
        .interactable(false)
        .show(ctx, |ui| draw_readout(ui, readout.text()));
}

/// Draw the readout label. Split from the system so it can be tested
/// without Bevy.
pub fn draw_readout(ui: &mut egui::Ui, text: &str) {
    ui.label(
        egui::RichText::new(text)
            .color(egui::Color32::BLACK)
            .size(READOUT_FONT_SIZE),
    );
}
