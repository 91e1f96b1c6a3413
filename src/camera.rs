use bevy::input::gestures::PinchGesture;
use bevy::input::mouse::{MouseMotion, MouseScrollUnit, MouseWheel};
use bevy::prelude::*;

use crate::config::AppConfig;
use crate::input::EguiWantsPointer;

/// Pitch limit, just inside straight up/down so `looking_at` stays stable.
const MAX_PITCH: f32 = std::f32::consts::FRAC_PI_2 - 0.001;
/// Distance multiplier per wheel line at zoom speed 1.0
const DOLLY_STEP: f32 = 0.95;
/// Pixel-unit scroll deltas are roughly this many times a line delta
const PIXELS_PER_LINE: f32 = 100.0;
/// Pinch magnification to wheel lines
const PINCH_TO_LINES: f32 = 10.0;
/// Pending input below this is dropped so the camera comes to rest
const SETTLE_EPSILON: f32 = 1e-4;

// =============================================================================
// Components and Resources
// =============================================================================

/// Marker for the perspective camera that views the model.
#[derive(Component)]
pub struct ViewerCamera;

/// Orbit camera around a target point, with damped input.
///
/// Drag, pan and dolly input is accumulated into pending deltas; each frame
/// applies `damping` of what is pending and keeps the rest for later frames.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    pub target: Vec3,
    /// Radians around +Y; zero puts the camera on +Z
    pub yaw: f32,
    /// Radians above the ground plane
    pub pitch: f32,
    pub distance: f32,
    pending_rotate: Vec2,
    pending_pan: Vec2,
    pending_dolly: f32,
    pub damping: f32,
    pub rotate_speed: f32,
    pub pan_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Vertical field of view in radians, used to scale panning
    pub fov: f32,
    home: (Vec3, Vec3),
}

impl OrbitCamera {
    pub fn from_config(config: &AppConfig) -> Self {
        let camera = &config.camera;
        let mut orbit = Self {
            target: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            distance: 1.0,
            pending_rotate: Vec2::ZERO,
            pending_pan: Vec2::ZERO,
            pending_dolly: 0.0,
            damping: camera.damping_factor.clamp(0.0, 1.0),
            rotate_speed: camera.rotate_speed,
            pan_speed: camera.pan_speed,
            zoom_speed: camera.zoom_speed,
            min_distance: camera.min_distance,
            max_distance: camera.max_distance.max(camera.min_distance),
            fov: camera.fov_degrees.to_radians(),
            home: (config.camera_position(), config.camera_target()),
        };
        orbit.reset();
        orbit
    }

    /// Place the camera at `position` looking at `target`.
    pub fn set_pose(&mut self, position: Vec3, target: Vec3) {
        let offset = position - target;
        let distance = offset.length();
        self.target = target;
        self.distance = distance.clamp(self.min_distance, self.max_distance);
        if distance > 0.0 {
            self.yaw = offset.x.atan2(offset.z);
            self.pitch = (offset.y / distance).asin().clamp(-MAX_PITCH, MAX_PITCH);
        }
    }

    /// Return to the configured start pose and drop pending input.
    pub fn reset(&mut self) {
        let (position, target) = self.home;
        self.pending_rotate = Vec2::ZERO;
        self.pending_pan = Vec2::ZERO;
        self.pending_dolly = 0.0;
        self.set_pose(position, target);
    }

    /// Queue a rotation from a pointer drag of `delta` pixels.
    pub fn rotate(&mut self, delta: Vec2) {
        self.pending_rotate += delta;
    }

    /// Queue a ground-plane pan from a pointer drag of `delta` pixels.
    pub fn pan(&mut self, delta: Vec2) {
        self.pending_pan += delta;
    }

    /// Queue a dolly. Positive values move toward the target.
    pub fn dolly(&mut self, lines: f32) {
        self.pending_dolly += lines;
    }

    pub fn is_settled(&self) -> bool {
        self.pending_rotate.length_squared() < SETTLE_EPSILON
            && self.pending_pan.length_squared() < SETTLE_EPSILON
            && self.pending_dolly.abs() < SETTLE_EPSILON
    }

    /// Apply one frame of damped input for a viewport `viewport_height`
    /// logical pixels tall.
    pub fn step(&mut self, viewport_height: f32) {
        if self.is_settled() {
            self.pending_rotate = Vec2::ZERO;
            self.pending_pan = Vec2::ZERO;
            self.pending_dolly = 0.0;
            return;
        }
        let height = viewport_height.max(1.0);

        let rotate = self.pending_rotate * self.damping;
        let pan = self.pending_pan * self.damping;
        let dolly = self.pending_dolly * self.damping;
        self.pending_rotate -= rotate;
        self.pending_pan -= pan;
        self.pending_dolly -= dolly;

        // A full-height drag turns the camera all the way around
        let radians_per_pixel = std::f32::consts::TAU / height * self.rotate_speed;
        self.yaw -= rotate.x * radians_per_pixel;
        self.pitch = (self.pitch + rotate.y * radians_per_pixel).clamp(-MAX_PITCH, MAX_PITCH);

        // Keep the point under the cursor fixed at the target's depth
        let units_per_pixel = 2.0 * self.distance * (self.fov * 0.5).tan() / height * self.pan_speed;
        let (right, forward) = self.ground_axes();
        self.target += (-right * pan.x + forward * pan.y) * units_per_pixel;

        let scale = DOLLY_STEP.powf(dolly * self.zoom_speed);
        self.distance = (self.distance * scale).clamp(self.min_distance, self.max_distance);
    }

    /// Camera right and view-forward directions projected onto the ground.
    fn ground_axes(&self) -> (Vec3, Vec3) {
        let right = Vec3::new(self.yaw.cos(), 0.0, -self.yaw.sin());
        let forward = Vec3::new(-self.yaw.sin(), 0.0, -self.yaw.cos());
        (right, forward)
    }

    pub fn position(&self) -> Vec3 {
        let horizontal = self.distance * self.pitch.cos();
        self.target
            + Vec3::new(
                horizontal * self.yaw.sin(),
                self.distance * self.pitch.sin(),
                horizontal * self.yaw.cos(),
            )
    }

    pub fn transform(&self) -> Transform {
        Transform::from_translation(self.position()).looking_at(self.target, Vec3::Y)
    }
}

// =============================================================================
// Plugin
// =============================================================================

pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_camera).add_systems(
            Update,
            (
                handle_orbit_input.after(crate::input::check_egui_wants_input),
                update_orbit_camera.after(handle_orbit_input),
            ),
        );
    }
}

pub fn setup_camera(mut commands: Commands, config: Res<AppConfig>) {
    let orbit = OrbitCamera::from_config(&config);
    let camera = &config.camera;

    commands.spawn((
        Name::new("Viewer Camera"),
        Camera3d::default(),
        Projection::from(PerspectiveProjection {
            fov: camera.fov_degrees.to_radians(),
            near: camera.near,
            far: camera.far,
            ..default()
        }),
        orbit.transform(),
        ViewerCamera,
    ));
    commands.insert_resource(orbit);
}

// =============================================================================
// Camera Systems
// =============================================================================

/// Feed mouse and gesture input into the orbit camera.
///
/// - **Left drag**: orbit around the target
/// - **Right drag**: pan the target across the ground plane
/// - **Scroll / pinch**: dolly toward or away from the target
pub fn handle_orbit_input(
    mouse_button: Res<ButtonInput<MouseButton>>,
    mut mouse_motion: MessageReader<MouseMotion>,
    mut scroll_events: MessageReader<MouseWheel>,
    mut pinch_events: MessageReader<PinchGesture>,
    egui_wants: Res<EguiWantsPointer>,
    mut orbit: ResMut<OrbitCamera>,
) {
    if egui_wants.0 {
        mouse_motion.clear();
        scroll_events.clear();
        pinch_events.clear();
        return;
    }

    let rotating = mouse_button.pressed(MouseButton::Left);
    let panning = mouse_button.pressed(MouseButton::Right);
    if rotating || panning {
        for event in mouse_motion.read() {
            if rotating {
                orbit.rotate(event.delta);
            } else {
                orbit.pan(event.delta);
            }
        }
    } else {
        mouse_motion.clear();
    }

    for event in scroll_events.read() {
        let lines = match event.unit {
            MouseScrollUnit::Line => event.y,
            MouseScrollUnit::Pixel => event.y / PIXELS_PER_LINE,
        };
        orbit.dolly(lines);
    }

    for event in pinch_events.read() {
        orbit.dolly(event.0 * PINCH_TO_LINES);
    }
}

/// Advance the damped orbit and write the result to the viewer camera.
pub fn update_orbit_camera(
    mut orbit: ResMut<OrbitCamera>,
    window_query: Query<&Window>,
    mut camera_query: Query<&mut Transform, With<ViewerCamera>>,
) {
    let Ok(mut transform) = camera_query.single_mut() else {
        return;
    };
    if !orbit.is_settled() {
        let height = window_query.single().map(|w| w.height()).unwrap_or(720.0);
        orbit.step(height);
    }
    *transform = orbit.transform();
}
